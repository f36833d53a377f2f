//! End-to-end tests of the compilation pipeline.
//!
//! These exercise the guarantees every compiled circuit owes its target:
//! the operator is unchanged, every operation is native, two-qubit
//! operations sit on coupled pairs, and iterated groups either reach a
//! fixed point or say they did not.

use std::f64::consts::PI;

use qforge_compile::unitary::Operator;
use qforge_compile::{
    BasisGates, CancelInverses, CommutativeCancellation, CompileError, CompileResult, CouplingMap,
    DeviceFamily, Layout, MergeRotations, Pass, PassKind, PassManager, PassManagerBuilder,
    PipelineState, PropertySet, VerifyEquivalence, VerifyTarget,
};
use qforge_ir::{Circuit, CircuitDag, CustomGate, QubitId, StandardGate};
use tracing_subscriber::EnvFilter;

/// Route pipeline logs to the test harness; `RUST_LOG=qforge_compile=debug`
/// shows every state transition.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Helper: check that every two-qubit operation sits on a coupled pair.
fn assert_adjacent(dag: &CircuitDag, coupling: &CouplingMap) {
    for (_, inst) in dag.op_nodes() {
        if let [a, b] = inst.qubits.as_slice() {
            assert!(
                coupling.is_connected(a.0, b.0),
                "{} on uncoupled {a} and {b}",
                inst.name()
            );
        }
    }
}

/// Helper: check that every operation is in the basis.
fn assert_closed(dag: &CircuitDag, basis: &BasisGates) {
    for name in dag.count_ops().keys() {
        assert!(basis.contains(name), "'{name}' escaped the basis");
    }
}

fn sample_circuit() -> Circuit {
    let mut circuit = Circuit::with_size("sample", 3, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.cx(QubitId(0), QubitId(2)).unwrap();
    circuit.t(QubitId(1)).unwrap();
    circuit.rzz(0.4, QubitId(1), QubitId(2)).unwrap();
    circuit.swap(QubitId(0), QubitId(1)).unwrap();
    circuit.ry(0.7, QubitId(2)).unwrap();
    circuit.cz(QubitId(2), QubitId(0)).unwrap();
    circuit
}

// ============================================================================
// Routing
// ============================================================================

#[test]
fn test_routing_on_linear_chain() {
    init_tracing();
    let mut circuit = Circuit::with_size("route", 3, 0);
    circuit.cx(QubitId(0), QubitId(2)).unwrap();
    let mut dag = circuit.into_dag();

    let coupling = CouplingMap::linear(3);
    let (pm, mut props) = PassManagerBuilder::new()
        .with_optimization_level(0)
        .with_target(coupling.clone(), BasisGates::new(["cx", "swap", "h"]))
        .with_verification(true)
        .build();
    let report = pm.run(&mut dag, &mut props).unwrap();

    assert_eq!(report.metrics.count("swap"), 1);
    assert_eq!(report.metrics.count("cx"), 1);
    assert_adjacent(&dag, &coupling);

    assert_eq!(props.initial_layout, Some(Layout::trivial(3)));
    let last = props.layout.as_ref().unwrap();
    assert_eq!(last.get_physical(QubitId(0)), Some(1));
    assert_eq!(last.get_physical(QubitId(1)), Some(0));
    assert_eq!(last.get_physical(QubitId(2)), Some(2));
}

#[test]
fn test_routing_verified_end_to_end() {
    init_tracing();
    let mut dag = sample_circuit().into_dag();
    let coupling = CouplingMap::linear(4);
    let (pm, mut props) = PassManagerBuilder::new()
        .with_optimization_level(2)
        .with_target(coupling.clone(), BasisGates::iqm())
        .with_verification(true)
        .build();

    let report = pm.run(&mut dag, &mut props).unwrap();
    assert_eq!(report.state, PipelineState::Done);
    assert_adjacent(&dag, &coupling);
    assert_closed(&dag, &BasisGates::iqm());
}

// ============================================================================
// Translation
// ============================================================================

#[test]
fn test_basis_closure_for_every_family() {
    for family in [
        DeviceFamily::Ibm,
        DeviceFamily::IbmHeron,
        DeviceFamily::Iqm,
        DeviceFamily::TrappedIon,
        DeviceFamily::NeutralAtom,
    ] {
        let original = sample_circuit().into_dag();
        let mut dag = original.clone();
        let (pm, mut props) = PassManagerBuilder::new()
            .with_optimization_level(1)
            .with_device_family(family)
            .build();
        pm.run(&mut dag, &mut props).unwrap();

        assert_closed(&dag, &family.basis());
        let expected = Operator::from_dag(&original).unwrap();
        let actual = Operator::from_dag_padded(&dag, 3).unwrap();
        assert!(expected.equiv_up_to_phase(&actual, 1e-8), "{family:?}");
    }
}

#[test]
fn test_decomposition_gap_leaves_circuit_alone() {
    let mut circuit = Circuit::with_size("oracle", 2, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit
        .gate(CustomGate::new("oracle", 2), [QubitId(0), QubitId(1)])
        .unwrap();
    let mut dag = circuit.into_dag();
    let before = dag.to_description();

    let (pm, mut props) = PassManagerBuilder::new()
        .with_optimization_level(0)
        .with_properties(PropertySet::new().with_basis(BasisGates::iqm()))
        .build();
    let (report, err) = pm.run_partial(&mut dag, &mut props);

    assert!(matches!(
        err,
        Some(CompileError::DecompositionGap { operator }) if operator == "oracle"
    ));
    assert!(matches!(report.state, PipelineState::Failed { .. }));
    assert_eq!(dag.to_description(), before);
}

#[test]
fn test_basis_with_custom_gate_keeps_it() {
    let mut circuit = Circuit::with_size("oracle", 2, 0);
    circuit
        .gate(CustomGate::new("oracle", 2), [QubitId(0), QubitId(1)])
        .unwrap();
    circuit.h(QubitId(1)).unwrap();
    let mut dag = circuit.into_dag();

    let basis = BasisGates::iqm().with_custom("oracle", 2);
    let (pm, mut props) = PassManagerBuilder::new()
        .with_properties(PropertySet::new().with_basis(basis.clone()))
        .build();
    pm.run(&mut dag, &mut props).unwrap();

    assert_closed(&dag, &basis);
    assert_eq!(dag.count_ops().get("oracle"), Some(&1));
}

// ============================================================================
// Optimization
// ============================================================================

#[test]
fn test_cancellation_preserves_operator() {
    let mut circuit = Circuit::with_size("cancel", 2, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.rz(PI / 3.0, QubitId(1)).unwrap();
    circuit.z(QubitId(0)).unwrap();
    circuit.rz(-PI / 3.0, QubitId(1)).unwrap();
    circuit.h(QubitId(0)).unwrap();
    let original = circuit.into_dag();
    let mut dag = original.clone();

    let (pm, mut props) = PassManagerBuilder::new()
        .with_optimization_level(3)
        .with_verification(true)
        .build();
    pm.run(&mut dag, &mut props).unwrap();

    // H Z H is X; everything else cancels.
    assert_eq!(dag.num_ops(), 1);
    let expected = Operator::from_dag(&original).unwrap();
    let actual = Operator::from_dag(&dag).unwrap();
    assert!(expected.equiv_up_to_phase(&actual, 1e-8));
}

#[test]
fn test_repeated_phase_gates_survive_routing() {
    // S·S is Z, not the identity.
    let mut circuit = Circuit::with_size("phase", 3, 0);
    circuit.s(QubitId(1)).unwrap();
    circuit.s(QubitId(1)).unwrap();
    let mut dag = circuit.into_dag();

    let (pm, mut props) = PassManagerBuilder::new()
        .with_optimization_level(1)
        .with_target(CouplingMap::linear(4), BasisGates::ibm())
        .with_verification(true)
        .build();
    pm.run(&mut dag, &mut props).unwrap();
    assert!(dag.num_ops() > 0);
}

#[test]
fn test_converged_group_is_idempotent() {
    let mut dag = sample_circuit().into_dag();
    let (pm, mut props) = PassManagerBuilder::new()
        .with_optimization_level(3)
        .with_properties(PropertySet::new().with_basis(BasisGates::ibm()))
        .build();
    pm.run(&mut dag, &mut props).unwrap();
    let settled = dag.to_description();

    // A second sweep over the same group finds nothing left to do.
    let mut again = PassManager::new();
    again
        .add_group(
            "again",
            vec![
                Box::new(CancelInverses),
                Box::new(MergeRotations),
                Box::new(CommutativeCancellation),
            ],
            1,
        )
        .unwrap();
    let report = again.run(&mut dag, &mut props).unwrap();
    assert!(!report.changed());
    assert_eq!(report.iterations.get("again"), Some(&1));
    assert_eq!(dag.to_description(), settled);
}

// ============================================================================
// Convergence
// ============================================================================

/// Rewrites every X into Y.
struct XToY;

/// Rewrites every Y into X.
struct YToX;

fn flip(dag: &mut CircuitDag, from: StandardGate, to: StandardGate) -> CompileResult<bool> {
    let nodes: Vec<_> = dag
        .op_nodes()
        .filter(|(_, inst)| inst.rewritable() == Some(&from))
        .map(|(node, _)| node)
        .collect();
    for &node in &nodes {
        dag.replace_gate(node, to.into())?;
    }
    Ok(!nodes.is_empty())
}

impl Pass for XToY {
    fn name(&self) -> &str {
        "x_to_y"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<bool> {
        flip(dag, StandardGate::X, StandardGate::Y)
    }
}

impl Pass for YToX {
    fn name(&self) -> &str {
        "y_to_x"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<bool> {
        flip(dag, StandardGate::Y, StandardGate::X)
    }
}

#[test]
fn test_contradictory_group_stops_at_cap() {
    init_tracing();
    let mut circuit = Circuit::with_size("flip", 1, 0);
    circuit.x(QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    let mut pm = PassManager::new();
    pm.add_group("flip", vec![Box::new(XToY), Box::new(YToX)], 3)
        .unwrap();
    let (report, err) = pm.run_partial(&mut dag, &mut PropertySet::new());

    assert!(matches!(
        err,
        Some(CompileError::NonConvergence { ref group, max_iterations: 3 }) if group == "flip"
    ));
    assert_eq!(report.iterations.get("flip"), Some(&3));
    assert_eq!(report.records.len(), 6);
    // The circuit is left valid, as the last sweep left it.
    dag.verify_integrity().unwrap();
    assert_eq!(dag.count_ops().get("x"), Some(&1));
}

// ============================================================================
// Verification
// ============================================================================

#[test]
fn test_verify_target_after_routing() {
    let mut dag = Circuit::ghz(4).unwrap().into_dag();
    let coupling = CouplingMap::star(4);
    let (pm, mut props) = PassManagerBuilder::new()
        .with_optimization_level(1)
        .with_target(coupling.clone(), BasisGates::ibm())
        .build();
    pm.run(&mut dag, &mut props).unwrap();

    VerifyTarget.run(&mut dag, &mut props).unwrap();
    assert_adjacent(&dag, &coupling);
}

#[test]
fn test_verify_equivalence_catches_broken_pass() {
    /// Drops the first gate it finds.
    struct DropFirst;

    impl Pass for DropFirst {
        fn name(&self) -> &str {
            "drop_first"
        }

        fn kind(&self) -> PassKind {
            PassKind::Transformation
        }

        fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<bool> {
            let first = dag.op_nodes().map(|(node, _)| node).next();
            if let Some(node) = first {
                dag.remove_op(node)?;
            }
            Ok(first.is_some())
        }
    }

    let mut dag = Circuit::ghz(3).unwrap().into_dag();
    let mut pm = PassManager::new();
    pm.add_pass(VerifyEquivalence::new());
    pm.add_pass(DropFirst);
    pm.add_pass(VerifyEquivalence::new());

    let err = pm.run(&mut dag, &mut PropertySet::new()).unwrap_err();
    assert!(matches!(err, CompileError::VerificationFailed(_)));
}
