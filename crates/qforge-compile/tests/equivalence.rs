//! Property tests: compilation never changes what a circuit computes.
//!
//! Random circuits on up to three qubits go through every optimization
//! level and a range of targets with verification enabled, so the
//! pipeline itself checks the operator after routing. Unrouted runs are
//! additionally compared here against the input.
//!
//! Case counts follow proptest's defaults; set `PROPTEST_CASES` for a longer
//! soak.

use proptest::prelude::*;

use qforge_compile::unitary::Operator;
use qforge_compile::{BasisGates, CouplingMap, DeviceFamily, PassManagerBuilder, PipelineState};
use qforge_ir::{Circuit, CircuitDag, QubitId};

/// One random operation: kind, two qubit choices, an angle.
type RawOp = (u8, u32, u32, f64);

fn raw_op() -> impl Strategy<Value = RawOp> {
    (0u8..12, 0u32..3, 1u32..3, -3.2f64..3.2)
}

fn build(num_qubits: u32, ops: &[RawOp]) -> CircuitDag {
    let mut circuit = Circuit::with_size("random", num_qubits, 0);
    for &(kind, q, offset, angle) in ops {
        let a = QubitId(q % num_qubits);
        // Distinct second operand whenever there are two qubits to pick from.
        let b = QubitId((q + offset) % num_qubits);
        let two_qubit = num_qubits > 1 && a != b;
        let applied = match kind {
            0 => circuit.h(a),
            1 => circuit.x(a),
            2 => circuit.t(a),
            3 => circuit.s(a),
            4 => circuit.rz(angle, a),
            5 => circuit.ry(angle, a),
            6 => circuit.rx(angle, a),
            7 if two_qubit => circuit.cx(a, b),
            8 if two_qubit => circuit.cz(a, b),
            9 if two_qubit => circuit.swap(a, b),
            10 if two_qubit => circuit.rzz(angle, a, b),
            11 if two_qubit => circuit.cp(angle, a, b),
            _ => circuit.sdg(a),
        };
        applied.unwrap();
    }
    circuit.into_dag()
}

fn family() -> impl Strategy<Value = DeviceFamily> {
    prop_oneof![
        Just(DeviceFamily::Ibm),
        Just(DeviceFamily::Iqm),
        Just(DeviceFamily::TrappedIon),
        Just(DeviceFamily::NeutralAtom),
    ]
}

proptest! {
    #[test]
    fn compiled_operator_matches_input(
        num_qubits in 1u32..=3,
        ops in prop::collection::vec(raw_op(), 0..16),
        level in 0u8..=3,
        family in family(),
    ) {
        let original = build(num_qubits, &ops);
        let mut dag = original.clone();
        let (pm, mut props) = PassManagerBuilder::new()
            .with_optimization_level(level)
            .with_device_family(family)
            .with_verification(true)
            .build();
        let report = pm.run(&mut dag, &mut props).unwrap();
        prop_assert_eq!(report.state, PipelineState::Done);

        let basis = family.basis();
        for name in dag.count_ops().keys() {
            prop_assert!(basis.contains(name), "'{}' escaped the basis", name);
        }

        let expected = Operator::from_dag_padded(&original, num_qubits as usize).unwrap();
        let actual = Operator::from_dag_padded(&dag, num_qubits as usize).unwrap();
        prop_assert!(expected.equiv_up_to_phase(&actual, 1e-8));
    }

    #[test]
    fn routed_circuits_respect_topology(
        ops in prop::collection::vec(raw_op(), 1..16),
        level in 0u8..=3,
        ring in any::<bool>(),
    ) {
        let mut dag = build(3, &ops);
        let coupling = if ring { CouplingMap::ring(4) } else { CouplingMap::linear(4) };
        let (pm, mut props) = PassManagerBuilder::new()
            .with_optimization_level(level)
            .with_target(coupling.clone(), BasisGates::ibm())
            .with_verification(true)
            .build();
        pm.run(&mut dag, &mut props).unwrap();

        dag.verify_integrity().unwrap();
        for (_, inst) in dag.op_nodes() {
            if let [a, b] = inst.qubits.as_slice() {
                prop_assert!(coupling.is_connected(a.0, b.0));
            }
        }
        prop_assert!(props.initial_layout.is_some());
        prop_assert!(props.layout.is_some());
    }
}
