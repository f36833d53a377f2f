//! Single-qubit gate fusion.

use tracing::{debug, trace};

use qforge_ir::{CircuitDag, Instruction, NodeIndex, QubitId};

use crate::error::CompileResult;
use crate::library::{
    BasisPlan, EquivalenceLibrary, GateCountCost, Rewrite, RuleContext, RuleFamily, settle,
};
use crate::pass::{Pass, PassKind};
use crate::property::{BasisGates, PropertySet};

/// Single-qubit gate fusion pass.
///
/// Collapses every run of two or more consecutive single-qubit gates on a
/// wire into one `U(θ, φ, λ)` from the ZYZ decomposition of their product.
/// Identity products disappear.
///
/// When a basis without `u` is configured, the fused gate is expanded back
/// into the basis and only kept if that is strictly shorter than the run
/// it replaces.
pub struct Fuse1qGates;

impl Fuse1qGates {
    /// Create a new fusion pass.
    pub fn new() -> Self {
        Self
    }

    /// Maximal runs of rewritable single-qubit gates on one wire.
    fn runs(dag: &CircuitDag, qubit: QubitId) -> Vec<Vec<NodeIndex>> {
        let mut runs = Vec::new();
        let mut current = Vec::new();
        for node in dag.wire_ops(qubit) {
            let fusible = dag
                .instruction(node)
                .is_some_and(|inst| inst.qubits.len() == 1 && inst.rewritable().is_some());
            if fusible {
                current.push(node);
            } else if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs.retain(|run| run.len() >= 2);
        runs
    }

    /// Express a fused gate in the basis, dropping trivial leftovers.
    fn lower(
        library: &EquivalenceLibrary,
        plan: &BasisPlan,
        basis: &BasisGates,
        fused: Vec<Instruction>,
    ) -> CompileResult<Vec<Instruction>> {
        let mut out = Vec::new();
        for inst in fused {
            for part in library.expand(&inst, plan, basis)? {
                match part.rewritable().copied() {
                    Some(gate) if gate.num_qubits() == 1 => {
                        if let Some(kept) = settle(gate) {
                            out.push(Instruction::single_qubit_gate(kept, part.qubits[0]));
                        }
                    }
                    _ => out.push(part),
                }
            }
        }
        Ok(out)
    }
}

impl Default for Fuse1qGates {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for Fuse1qGates {
    fn name(&self) -> &'static str {
        "fuse_1q"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<bool> {
        let library = properties.library.clone();
        let basis = properties
            .basis_gates
            .as_ref()
            .filter(|b| !b.contains("u"));
        // A basis that cannot express `u` at all leaves runs alone.
        let plan = match basis {
            Some(b) => match library.plan_basis(["u"], b, &GateCountCost) {
                Ok(plan) => Some((plan, b)),
                Err(_) => return Ok(false),
            },
            None => None,
        };

        let qubits: Vec<QubitId> = dag.qubits().collect();
        let mut fused = 0usize;
        for qubit in qubits {
            for run in Self::runs(dag, qubit) {
                let insts: Vec<&Instruction> =
                    run.iter().filter_map(|&n| dag.instruction(n)).collect();
                let Some(Rewrite::Replace(seq)) =
                    library.first_rewrite(RuleFamily::Compose, &insts, &RuleContext::default())
                else {
                    continue;
                };
                let seq = match &plan {
                    Some((plan, basis)) if !seq.is_empty() => {
                        Self::lower(&library, plan, basis, seq)?
                    }
                    _ => seq,
                };
                if seq.len() >= run.len() {
                    trace!(qubit = %qubit, run = run.len(), "Fusion would not shorten run");
                    continue;
                }
                let Some((&head, rest)) = run.split_first() else {
                    continue;
                };
                for &node in rest {
                    dag.remove_op(node)?;
                }
                dag.substitute_node(head, seq)?;
                fused += 1;
            }
        }

        if fused > 0 {
            debug!(runs = fused, "Fused single-qubit runs");
        }
        Ok(fused > 0)
    }
}
