//! Basis translation passes.

use tracing::{debug, trace};

use qforge_ir::{CircuitDag, Instruction, NodeIndex};

use crate::error::{CompileError, CompileResult};
use crate::library::{CostModel, EquivalenceLibrary, GateCountCost};
use crate::pass::{Pass, PassKind};
use crate::property::{BasisGates, PropertySet};

/// Rewrite every out-of-basis operation into `basis`.
///
/// The plan and every expansion are computed before the DAG is touched, so
/// a [`CompileError::DecompositionGap`] leaves the circuit unchanged.
/// Returns the number of operations replaced.
pub(crate) fn translate(
    dag: &mut CircuitDag,
    library: &EquivalenceLibrary,
    basis: &BasisGates,
    cost: &dyn CostModel,
) -> CompileResult<usize> {
    let counts = dag.count_ops();
    let foreign: Vec<&str> = counts
        .keys()
        .map(String::as_str)
        .filter(|name| !basis.contains(name))
        .collect();
    if foreign.is_empty() {
        return Ok(0);
    }
    let plan = library.plan_basis(foreign.iter().copied(), basis, cost)?;

    let mut rewrites: Vec<(NodeIndex, Vec<Instruction>)> = Vec::new();
    for (node, inst) in dag.op_nodes() {
        if basis.contains(inst.name()) {
            continue;
        }
        let seq = library.expand(inst, &plan, basis)?;
        trace!(op = inst.name(), into = seq.len(), "Expanding");
        rewrites.push((node, seq));
    }

    let replaced = rewrites.len();
    for (node, seq) in rewrites {
        dag.substitute_node(node, seq)?;
    }
    Ok(replaced)
}

/// Basis translation pass.
///
/// Decomposes every operation whose name is not in the configured basis
/// through the cheapest chain of library rules (by gate count). Fails with
/// [`CompileError::DecompositionGap`] naming the first operator no chain
/// reaches, before anything is rewritten. Measurements, resets and
/// barriers always pass through.
pub struct BasisTranslation {
    cost: Box<dyn CostModel>,
}

impl BasisTranslation {
    /// Translate with the gate-count cost model.
    pub fn new() -> Self {
        Self::with_cost(GateCountCost)
    }

    /// Translate with a custom cost model.
    pub fn with_cost(cost: impl CostModel + 'static) -> Self {
        Self {
            cost: Box::new(cost),
        }
    }
}

impl Default for BasisTranslation {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for BasisTranslation {
    fn name(&self) -> &'static str {
        "basis_translation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<bool> {
        let basis = properties
            .basis_gates
            .as_ref()
            .ok_or(CompileError::MissingBasisGates)?;
        let replaced = translate(dag, &properties.library, basis, self.cost.as_ref())?;
        if replaced > 0 {
            debug!(replaced, ops = dag.num_ops(), "Translated to basis");
        }
        Ok(replaced > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unitary::Operator;
    use qforge_ir::{Circuit, CustomGate, QubitId};

    fn translated(circuit: &Circuit, basis: BasisGates) -> CircuitDag {
        let mut dag = circuit.dag().clone();
        let mut props = PropertySet::new().with_basis(basis.clone());
        BasisTranslation::new().run(&mut dag, &mut props).unwrap();
        dag.verify_integrity().unwrap();
        for name in dag.count_ops().keys() {
            assert!(basis.contains(name), "'{name}' left after translation");
        }
        let before = Operator::from_dag(circuit.dag()).unwrap();
        let after = Operator::from_dag(&dag).unwrap();
        assert!(before.equiv_up_to_phase(&after, 1e-9));
        dag
    }

    fn sample() -> Circuit {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.t(QubitId(1)).unwrap();
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        circuit.rzz(0.4, QubitId(2), QubitId(0)).unwrap();
        circuit.swap(QubitId(1), QubitId(2)).unwrap();
        circuit
    }

    #[test]
    fn test_translate_every_preset() {
        let circuit = sample();
        for basis in [
            BasisGates::iqm(),
            BasisGates::ibm(),
            BasisGates::heron(),
            BasisGates::trapped_ion(),
            BasisGates::neutral_atom(),
        ] {
            translated(&circuit, basis);
        }
    }

    #[test]
    fn test_native_circuit_unchanged() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.prx(0.3, 0.1, QubitId(0)).unwrap();
        circuit.cz(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new().with_basis(BasisGates::iqm());

        assert!(!BasisTranslation::new().run(&mut dag, &mut props).unwrap());
        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn test_gap_leaves_circuit_untouched() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit
            .gate(CustomGate::new("oracle", 2), [QubitId(0), QubitId(1)])
            .unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new().with_basis(BasisGates::iqm());

        let err = BasisTranslation::new().run(&mut dag, &mut props).unwrap_err();
        assert!(matches!(err, CompileError::DecompositionGap { operator } if operator == "oracle"));
        assert_eq!(dag.count_ops().get("h"), Some(&1));
    }

    #[test]
    fn test_missing_basis() {
        let mut dag = Circuit::bell().unwrap().into_dag();
        let result = BasisTranslation::new().run(&mut dag, &mut PropertySet::new());
        assert!(matches!(result, Err(CompileError::MissingBasisGates)));
    }

    #[test]
    fn test_measurements_pass_through() {
        let mut circuit = Circuit::with_size("test", 1, 1);
        circuit.h(QubitId(0)).unwrap();
        circuit.measure(QubitId(0), qforge_ir::ClbitId(0)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new().with_basis(BasisGates::iqm());

        BasisTranslation::new().run(&mut dag, &mut props).unwrap();
        assert_eq!(dag.count_ops().get("measure"), Some(&1));
        assert!(dag.count_ops().get("h").is_none());
    }
}
