//! Optimization passes.

mod cancel;
mod commutation;
mod fuse;
mod merge;

#[cfg(test)]
mod tests;

pub use cancel::CancelInverses;
pub use commutation::CommutativeCancellation;
pub use fuse::Fuse1qGates;
pub use merge::MergeRotations;

use qforge_ir::{CircuitDag, NodeIndex};

use crate::error::CompileResult;
use crate::library::{EquivalenceLibrary, Rewrite, RuleContext, RuleFamily};

/// The operation directly after `node` on every one of its qubits, when
/// it acts on exactly the same qubits.
pub(super) fn adjacent_partner(dag: &CircuitDag, node: NodeIndex) -> Option<NodeIndex> {
    let inst = dag.instruction(node)?;
    let next = dag.next_on_wire(node, *inst.qubits.first()?)?;
    let other = dag.instruction(next)?;
    let aligned = other.qubits.len() == inst.qubits.len()
        && inst
            .qubits
            .iter()
            .all(|&q| other.qubits.contains(&q) && dag.next_on_wire(node, q) == Some(next));
    aligned.then_some(next)
}

/// Rewrite adjacent same-qubit pairs with the first rule of `family`.
///
/// Sweeps in topological order. A merged result is retried against its
/// new neighbour at once; a pair that vanishes sends its predecessors
/// back onto the worklist, since they may now be adjacent to something.
pub(super) fn rewrite_pairs(
    dag: &mut CircuitDag,
    library: &EquivalenceLibrary,
    family: RuleFamily,
    ctx: &RuleContext<'_>,
) -> CompileResult<usize> {
    let mut work = dag.topological_order();
    work.reverse();
    let mut rewrites = 0;

    while let Some(node) = work.pop() {
        let Some(partner) = adjacent_partner(dag, node) else {
            continue;
        };
        let (Some(a), Some(b)) = (dag.instruction(node), dag.instruction(partner)) else {
            continue;
        };
        let Some(Rewrite::Replace(seq)) = library.first_rewrite(family, &[a, b], ctx) else {
            continue;
        };
        let qubits = a.qubits.clone();
        let preds = dag.predecessors_on(node, &qubits);

        dag.remove_op(partner)?;
        let created = dag.substitute_node(node, seq)?;
        rewrites += 1;
        if created.is_empty() {
            work.extend(preds);
        } else {
            work.extend(created);
        }
    }
    Ok(rewrites)
}
