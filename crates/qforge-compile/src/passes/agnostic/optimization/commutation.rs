//! Commutation-based cancellation.

use tracing::{debug, trace};

use qforge_ir::{CircuitDag, Instruction, NodeIndex, QubitId};

use crate::error::CompileResult;
use crate::library::{EquivalenceLibrary, Rewrite, RuleContext, RuleFamily};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// How far along a wire a gate may travel looking for a partner.
const MAX_WALK: usize = 64;

/// Commutative cancellation pass.
///
/// For each gate, walks forward along its first wire through operations
/// it commutes with. On reaching a gate on the same qubits that it cancels
/// or merges with, it checks that everything between them on its other
/// wires commutes with it too, then performs the rewrite at the partner's
/// position. Non-commuting operations are never reordered.
///
/// Commutation relations come from the library:
/// - gates on disjoint qubits
/// - diagonal gates with each other
/// - Z-diagonal gates on a control, X-axis gates on a CX target
/// - CX pairs sharing only their control or only their target
pub struct CommutativeCancellation;

impl CommutativeCancellation {
    /// Create a new commutative cancellation pass.
    pub fn new() -> Self {
        Self
    }

    /// Find a partner for `node` and the rewrite of the pair.
    fn find_partner(
        dag: &CircuitDag,
        library: &EquivalenceLibrary,
        ctx: &RuleContext<'_>,
        node: NodeIndex,
    ) -> Option<(NodeIndex, Vec<Instruction>)> {
        let inst = dag.instruction(node)?;
        inst.rewritable()?;
        let first = *inst.qubits.first()?;

        let mut cursor = dag.next_on_wire(node, first);
        let mut steps = 0;
        while let Some(candidate) = cursor {
            steps += 1;
            if steps > MAX_WALK {
                return None;
            }
            let other = dag.instruction(candidate)?;
            if same_qubits(inst, other) {
                let rewrite = library
                    .first_rewrite(RuleFamily::Inverse, &[inst, other], ctx)
                    .or_else(|| library.first_rewrite(RuleFamily::Merge, &[inst, other], ctx));
                if let Some(Rewrite::Replace(seq)) = rewrite {
                    if Self::clear_path(dag, library, node, candidate, &inst.qubits[1..]) {
                        return Some((candidate, seq));
                    }
                }
            }
            if !library.commutes(inst, other) {
                return None;
            }
            cursor = dag.next_on_wire(candidate, first);
        }
        None
    }

    /// Everything between `node` and `partner` on `wires` commutes with `node`.
    fn clear_path(
        dag: &CircuitDag,
        library: &EquivalenceLibrary,
        node: NodeIndex,
        partner: NodeIndex,
        wires: &[QubitId],
    ) -> bool {
        let Some(inst) = dag.instruction(node) else {
            return false;
        };
        wires.iter().all(|&wire| {
            let mut cursor = dag.next_on_wire(node, wire);
            loop {
                match cursor {
                    Some(n) if n == partner => return true,
                    Some(n) => match dag.instruction(n) {
                        Some(between) if library.commutes(inst, between) => {
                            cursor = dag.next_on_wire(n, wire);
                        }
                        _ => return false,
                    },
                    None => return false,
                }
            }
        })
    }
}

fn same_qubits(a: &Instruction, b: &Instruction) -> bool {
    a.qubits.len() == b.qubits.len() && a.qubits.iter().all(|q| b.qubits.contains(q))
}

impl Default for CommutativeCancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for CommutativeCancellation {
    fn name(&self) -> &'static str {
        "commutative_cancellation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<bool> {
        let library = properties.library.clone();
        let ctx = RuleContext {
            basis: properties.basis_gates.as_ref(),
        };
        let mut rewrites = 0usize;

        for node in dag.topological_order() {
            let Some((partner, seq)) = Self::find_partner(dag, &library, &ctx, node) else {
                continue;
            };
            trace!(?node, ?partner, "Commuting gate onto its partner");
            dag.substitute_node(partner, seq)?;
            dag.remove_op(node)?;
            rewrites += 1;
        }

        if rewrites > 0 {
            debug!(rewrites, "Commutative cancellation");
        }
        Ok(rewrites > 0)
    }
}
