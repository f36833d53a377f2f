//! Rotation merging and degenerate-angle cleanup.

use tracing::debug;

use qforge_ir::{CircuitDag, NodeIndex};

use crate::error::CompileResult;
use crate::library::{Rewrite, RuleContext, RuleFamily};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

use super::rewrite_pairs;

/// Rotation merge pass.
///
/// Sums adjacent same-axis rotations on the same qubits (`rx`, `ry`, `rz`,
/// `p`, `rzz`, `rxx`, `cp`, `crz`, and `prx` with equal phase), drops
/// results that collapse to the identity, and brings every remaining angle
/// into its canonical range. A rotation equal to a fixed gate (`Rz(π)` is
/// `Z`) becomes that gate when the configured basis has it.
pub struct MergeRotations;

impl MergeRotations {
    /// Create a new rotation merge pass.
    pub fn new() -> Self {
        Self
    }
}

impl Default for MergeRotations {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for MergeRotations {
    fn name(&self) -> &'static str {
        "merge_rotations"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<bool> {
        let library = properties.library.clone();
        let ctx = RuleContext {
            basis: properties.basis_gates.as_ref(),
        };

        let merged = rewrite_pairs(dag, &library, RuleFamily::Merge, &ctx)?;

        let nodes: Vec<NodeIndex> = dag.op_nodes().map(|(idx, _)| idx).collect();
        let mut collapsed = 0usize;
        for node in nodes {
            let Some(inst) = dag.instruction(node) else {
                continue;
            };
            if let Some(Rewrite::Replace(seq)) =
                library.first_rewrite(RuleFamily::Degenerate, &[inst], &ctx)
            {
                dag.substitute_node(node, seq)?;
                collapsed += 1;
            }
        }

        if merged + collapsed > 0 {
            debug!(merged, collapsed, "Merged rotations");
        }
        Ok(merged + collapsed > 0)
    }
}
