//! Tests for optimization passes.

use std::f64::consts::PI;

use qforge_ir::{Circuit, CircuitDag, ClbitId, QubitId, StandardGate};

use crate::pass::Pass;
use crate::property::{BasisGates, PropertySet};
use crate::unitary::Operator;

use super::{CancelInverses, CommutativeCancellation, Fuse1qGates, MergeRotations};

fn run(pass: &dyn Pass, circuit: Circuit) -> (CircuitDag, bool) {
    run_with(pass, circuit, &mut PropertySet::new())
}

fn run_with(pass: &dyn Pass, circuit: Circuit, props: &mut PropertySet) -> (CircuitDag, bool) {
    let before = circuit.dag().clone();
    let mut dag = circuit.into_dag();
    let changed = pass.run(&mut dag, props).unwrap();
    dag.verify_integrity().unwrap();
    if let (Ok(a), Ok(b)) = (Operator::from_dag(&before), Operator::from_dag(&dag)) {
        assert!(a.equiv_up_to_phase(&b, 1e-9), "{} changed the operator", pass.name());
    }
    (dag, changed)
}

#[test]
fn test_cancel_cx_adjacent() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();

    let (dag, changed) = run(&CancelInverses, circuit);
    assert!(changed);
    assert_eq!(dag.num_ops(), 0);
}

#[test]
fn test_cancel_cx_not_adjacent() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.h(QubitId(0)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();

    let (dag, changed) = run(&CancelInverses, circuit);
    assert!(!changed);
    assert_eq!(dag.num_ops(), 3);
}

#[test]
fn test_cancel_reversed_cx_is_kept() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(1), QubitId(0)).unwrap();

    let (dag, changed) = run(&CancelInverses, circuit);
    assert!(!changed);
    assert_eq!(dag.num_ops(), 2);
}

#[test]
fn test_cancel_nested_pairs() {
    // H S Sdg H collapses completely once the inner pair is gone.
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.s(QubitId(0)).unwrap();
    circuit.sdg(QubitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();

    let (dag, _) = run(&CancelInverses, circuit);
    assert_eq!(dag.num_ops(), 0);
}

#[test]
fn test_cancel_keeps_repeated_phase_gates() {
    // S·S is Z and T·T is S; neither pair is an identity.
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.s(QubitId(0)).unwrap();
    circuit.s(QubitId(0)).unwrap();
    circuit.t(QubitId(1)).unwrap();
    circuit.t(QubitId(1)).unwrap();

    let (dag, changed) = run(&CancelInverses, circuit);
    assert!(!changed);
    assert_eq!(dag.num_ops(), 4);
}

#[test]
fn test_cancel_dagger_pairs() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.t(QubitId(0)).unwrap();
    circuit.tdg(QubitId(0)).unwrap();
    circuit.sxdg(QubitId(1)).unwrap();
    circuit.sx(QubitId(1)).unwrap();

    let (dag, changed) = run(&CancelInverses, circuit);
    assert!(changed);
    assert_eq!(dag.num_ops(), 0);
}

#[test]
fn test_cancel_stops_at_measurement() {
    let mut circuit = Circuit::with_size("test", 1, 1);
    circuit.x(QubitId(0)).unwrap();
    circuit.measure(QubitId(0), ClbitId(0)).unwrap();
    circuit.x(QubitId(0)).unwrap();

    let mut dag = circuit.into_dag();
    let changed = CancelInverses.run(&mut dag, &mut PropertySet::new()).unwrap();
    assert!(!changed);
    assert_eq!(dag.num_ops(), 3);
}

#[test]
fn test_fuse_hh_cancels() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();

    let (dag, changed) = run(&Fuse1qGates, circuit);
    assert!(changed);
    assert_eq!(dag.num_ops(), 0);
}

#[test]
fn test_fuse_reduces_to_one_u() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.t(QubitId(0)).unwrap();
    circuit.t(QubitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();

    let (dag, _) = run(&Fuse1qGates, circuit);
    assert_eq!(dag.num_ops(), 1);
    assert_eq!(dag.count_ops().get("u"), Some(&1));
}

#[test]
fn test_fuse_keeps_shorter_native_run() {
    // Already three IBM natives; expanding a U costs five before cleanup.
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.rz(0.3, QubitId(0)).unwrap();
    circuit.sx(QubitId(0)).unwrap();
    circuit.rz(0.7, QubitId(0)).unwrap();

    let mut props = PropertySet::new().with_basis(BasisGates::ibm());
    let (dag, changed) = run_with(&Fuse1qGates, circuit, &mut props);
    assert!(!changed);
    assert_eq!(dag.num_ops(), 3);
}

#[test]
fn test_fuse_lowers_into_basis_when_shorter() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    for _ in 0..6 {
        circuit.rx(0.1, QubitId(0)).unwrap();
        circuit.rz(0.2, QubitId(0)).unwrap();
    }

    let mut props = PropertySet::new().with_basis(BasisGates::trapped_ion());
    let (dag, changed) = run_with(&Fuse1qGates, circuit, &mut props);
    assert!(changed);
    assert!(dag.num_ops() <= 3);
    assert!(dag.count_ops().keys().all(|k| ["rx", "ry", "rz"].contains(&k.as_str())));
}

#[test]
fn test_merge_adjacent_rotations() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.rz(0.5, QubitId(0)).unwrap();
    circuit.rz(0.25, QubitId(0)).unwrap();
    circuit.rzz(0.3, QubitId(0), QubitId(1)).unwrap();
    circuit.rzz(0.4, QubitId(1), QubitId(0)).unwrap();

    let (dag, changed) = run(&MergeRotations, circuit);
    assert!(changed);
    assert_eq!(dag.num_ops(), 2);
}

#[test]
fn test_merge_to_identity() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.rx(PI, QubitId(0)).unwrap();
    circuit.rx(PI, QubitId(0)).unwrap();

    let (dag, _) = run(&MergeRotations, circuit);
    assert_eq!(dag.num_ops(), 0);
}

#[test]
fn test_merge_collapses_to_fixed_gate_only_in_basis() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.rz(PI / 4.0, QubitId(0)).unwrap();
    let (dag, changed) = run(&MergeRotations, circuit.clone());
    assert!(changed);
    assert_eq!(dag.count_ops().get("t"), Some(&1));

    let mut props = PropertySet::new().with_basis(BasisGates::ibm());
    let (dag, changed) = run_with(&MergeRotations, circuit, &mut props);
    assert!(!changed);
    assert_eq!(dag.count_ops().get("rz"), Some(&1));
}

#[test]
fn test_merge_is_a_fixed_point() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.rz(0.5 + 4.0 * PI, QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();
    let mut props = PropertySet::new();
    assert!(MergeRotations.run(&mut dag, &mut props).unwrap());
    assert!(!MergeRotations.run(&mut dag, &mut props).unwrap());
}

#[test]
fn test_commutative_cancellation_through_control() {
    // Rz on the control commutes with CX, so the two Rz merge.
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.rz(0.3, QubitId(0)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.rz(-0.3, QubitId(0)).unwrap();

    let (dag, changed) = run(&CommutativeCancellation, circuit);
    assert!(changed);
    assert_eq!(dag.num_ops(), 1);
}

#[test]
fn test_commutative_cancellation_cx_sharing_control() {
    let mut circuit = Circuit::with_size("test", 3, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(0), QubitId(2)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();

    let (dag, changed) = run(&CommutativeCancellation, circuit);
    assert!(changed);
    assert_eq!(dag.num_ops(), 1);
}

#[test]
fn test_commutative_cancellation_blocked() {
    // H on the CX target does not commute with CX.
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.h(QubitId(1)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();

    let (dag, changed) = run(&CommutativeCancellation, circuit);
    assert!(!changed);
    assert_eq!(dag.num_ops(), 3);
}

#[test]
fn test_commutative_cancellation_checks_other_wire() {
    // Walking the control wire is clear, but an H sits on the target.
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.rz(0.2, QubitId(0)).unwrap();
    circuit.h(QubitId(1)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();

    let (dag, changed) = run(&CommutativeCancellation, circuit);
    assert!(!changed);
    assert_eq!(dag.num_ops(), 4);
}

#[test]
fn test_opaque_gates_are_untouched() {
    use qforge_ir::{ClassicalCondition, Gate, Instruction};

    let mut dag = CircuitDag::with_size(1, 1);
    let conditioned = Instruction::gate(
        Gate::standard(StandardGate::X).with_condition(ClassicalCondition::new([ClbitId(0)], 1)),
        [QubitId(0)],
    );
    dag.apply(Instruction::single_qubit_gate(StandardGate::X, QubitId(0)))
        .unwrap();
    dag.apply(conditioned).unwrap();
    dag.apply(Instruction::single_qubit_gate(StandardGate::X, QubitId(0)))
        .unwrap();

    let mut props = PropertySet::new();
    for pass in [
        &CancelInverses as &dyn Pass,
        &Fuse1qGates,
        &MergeRotations,
        &CommutativeCancellation,
    ] {
        assert!(!pass.run(&mut dag, &mut props).unwrap(), "{}", pass.name());
    }
    assert_eq!(dag.num_ops(), 3);
}
