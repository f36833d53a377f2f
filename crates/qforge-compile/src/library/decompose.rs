//! Exact decompositions of standard gates into other standard gates.
//!
//! All identities hold up to global phase. Sequences are listed in circuit
//! order (first element applied first).

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use qforge_ir::{Instruction, QubitId, StandardGate};

use super::{EquivalenceRule, OpMatch, Pattern, Rewrite, RuleContext, RuleFamily, RuleFn, Validity};
use crate::unitary::Unitary2x2;

const NON_U_1Q: &[&str] = &[
    "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "sxdg", "rx", "ry", "rz", "p", "prx",
];

const fn decomposition(
    name: &'static str,
    sources: &'static [&'static str],
    produces: &'static [&'static str],
    apply: RuleFn,
) -> EquivalenceRule {
    EquivalenceRule {
        name,
        family: RuleFamily::Decomposition,
        pattern: Pattern::Single(OpMatch::Names(sources)),
        validity: Validity::AnyAngle,
        produces,
        apply,
    }
}

pub(super) fn rules() -> Vec<EquivalenceRule> {
    vec![
        // Single-qubit
        decomposition("one_qubit_to_u", NON_U_1Q, &["u"], one_qubit_to_u),
        decomposition("u_to_zyz", &["u"], &["rz", "ry", "rz"], u_to_zyz),
        decomposition("u_to_zsx", &["u"], &["rz", "sx", "rz", "sx", "rz"], u_to_zsx),
        decomposition("u_to_prx", &["u"], &["prx", "rz"], u_to_prx),
        decomposition("u_to_zxz", &["u"], &["rz", "rx", "rz"], u_to_zxz),
        decomposition("rx_to_prx", &["rx"], &["prx"], rx_to_prx),
        decomposition("ry_to_prx", &["ry"], &["prx"], ry_to_prx),
        decomposition("rz_to_prx", &["rz"], &["prx", "prx"], rz_to_prx),
        decomposition("p_to_rz", &["p"], &["rz"], p_to_rz),
        decomposition("x_to_rx", &["x"], &["rx"], fixed_to_rotation),
        decomposition("y_to_ry", &["y"], &["ry"], fixed_to_rotation),
        decomposition("phase_to_rz", &["z", "s", "sdg", "t", "tdg"], &["rz"], fixed_to_rotation),
        decomposition("sx_to_rx", &["sx", "sxdg"], &["rx"], fixed_to_rotation),
        decomposition("h_to_ry_rx", &["h"], &["ry", "rx"], h_to_ry_rx),
        decomposition("h_to_zsx", &["h"], &["rz", "sx", "rz"], h_to_zsx),
        decomposition("x_to_sx_sx", &["x"], &["sx", "sx"], x_to_sx_sx),
        decomposition("id_elide", &["id"], &[], |_, _| Some(Rewrite::Replace(vec![]))),
        // Two-qubit
        decomposition("cx_to_cz", &["cx"], &["h", "cz", "h"], cx_to_cz),
        decomposition("cz_to_cx", &["cz"], &["h", "cx", "h"], cz_to_cx),
        decomposition("cx_to_rxx", &["cx"], &["ry", "rxx", "rx", "rx", "ry"], cx_to_rxx),
        decomposition("cy_to_cx", &["cy"], &["sdg", "cx", "s"], cy_to_cx),
        decomposition("swap_to_cx", &["swap"], &["cx", "cx", "cx"], swap_to_cx),
        decomposition("cp_to_cx", &["cp"], &["p", "cx", "p", "cx", "p"], cp_to_cx),
        decomposition("crz_to_cx", &["crz"], &["rz", "cx", "rz", "cx"], crz_to_cx),
        decomposition("rzz_to_cx", &["rzz"], &["cx", "rz", "cx"], rzz_to_cx),
        decomposition("rxx_to_rzz", &["rxx"], &["h", "h", "rzz", "h", "h"], rxx_to_rzz),
        // Three-qubit
        decomposition(
            "ccx_to_cx",
            &["ccx"],
            &[
                "h", "cx", "tdg", "cx", "t", "cx", "tdg", "cx", "t", "t", "h", "cx", "t", "tdg", "cx",
            ],
            ccx_to_cx,
        ),
        decomposition("cswap_to_ccx", &["cswap"], &["cx", "ccx", "cx"], cswap_to_ccx),
    ]
}

fn single(ops: &[&Instruction]) -> Option<(StandardGate, QubitId)> {
    let [op] = ops else { return None };
    let gate = *op.rewritable()?;
    match op.qubits.as_slice() {
        [q] => Some((gate, *q)),
        _ => None,
    }
}

fn two(ops: &[&Instruction]) -> Option<(StandardGate, QubitId, QubitId)> {
    let [op] = ops else { return None };
    let gate = *op.rewritable()?;
    match op.qubits.as_slice() {
        [a, b] => Some((gate, *a, *b)),
        _ => None,
    }
}

fn three(ops: &[&Instruction]) -> Option<(QubitId, QubitId, QubitId)> {
    let [op] = ops else { return None };
    op.rewritable()?;
    match op.qubits.as_slice() {
        [a, b, c] => Some((*a, *b, *c)),
        _ => None,
    }
}

fn on(qubit: QubitId, gates: impl IntoIterator<Item = StandardGate>) -> Option<Rewrite> {
    Some(Rewrite::Replace(
        gates
            .into_iter()
            .map(|g| Instruction::single_qubit_gate(g, qubit))
            .collect(),
    ))
}

fn g1(gate: StandardGate, q: QubitId) -> Instruction {
    Instruction::single_qubit_gate(gate, q)
}

fn g2(gate: StandardGate, a: QubitId, b: QubitId) -> Instruction {
    Instruction::two_qubit_gate(gate, a, b)
}

fn one_qubit_to_u(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (gate, q) = single(ops)?;
    let (theta, phi, lambda) = Unitary2x2::from_gate(&gate)?.to_u_angles();
    on(q, [StandardGate::U(theta, phi, lambda)])
}

fn u_angles(ops: &[&Instruction]) -> Option<(f64, f64, f64, QubitId)> {
    match single(ops)? {
        (StandardGate::U(theta, phi, lambda), q) => Some((theta, phi, lambda, q)),
        _ => None,
    }
}

fn u_to_zyz(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (theta, phi, lambda, q) = u_angles(ops)?;
    on(q, [StandardGate::Rz(lambda), StandardGate::Ry(theta), StandardGate::Rz(phi)])
}

fn u_to_zsx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (theta, phi, lambda, q) = u_angles(ops)?;
    on(
        q,
        [
            StandardGate::Rz(lambda),
            StandardGate::SX,
            StandardGate::Rz(theta + PI),
            StandardGate::SX,
            StandardGate::Rz(phi + PI),
        ],
    )
}

fn u_to_prx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (theta, phi, lambda, q) = u_angles(ops)?;
    on(
        q,
        [
            StandardGate::PRX(theta, FRAC_PI_2 - lambda),
            StandardGate::Rz(phi + lambda),
        ],
    )
}

fn u_to_zxz(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (theta, phi, lambda, q) = u_angles(ops)?;
    on(
        q,
        [
            StandardGate::Rz(lambda - FRAC_PI_2),
            StandardGate::Rx(theta),
            StandardGate::Rz(phi + FRAC_PI_2),
        ],
    )
}

fn rx_to_prx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    match single(ops)? {
        (StandardGate::Rx(a), q) => on(q, [StandardGate::PRX(a, 0.0)]),
        _ => None,
    }
}

fn ry_to_prx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    match single(ops)? {
        (StandardGate::Ry(a), q) => on(q, [StandardGate::PRX(a, FRAC_PI_2)]),
        _ => None,
    }
}

fn rz_to_prx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    match single(ops)? {
        (StandardGate::Rz(a), q) => on(
            q,
            [StandardGate::PRX(PI, 0.0), StandardGate::PRX(PI, a / 2.0)],
        ),
        _ => None,
    }
}

fn p_to_rz(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    match single(ops)? {
        (StandardGate::P(a), q) => on(q, [StandardGate::Rz(a)]),
        _ => None,
    }
}

fn fixed_to_rotation(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (gate, q) = single(ops)?;
    let rotation = match gate {
        StandardGate::X => StandardGate::Rx(PI),
        StandardGate::Y => StandardGate::Ry(PI),
        StandardGate::Z => StandardGate::Rz(PI),
        StandardGate::S => StandardGate::Rz(FRAC_PI_2),
        StandardGate::Sdg => StandardGate::Rz(-FRAC_PI_2),
        StandardGate::T => StandardGate::Rz(FRAC_PI_4),
        StandardGate::Tdg => StandardGate::Rz(-FRAC_PI_4),
        StandardGate::SX => StandardGate::Rx(FRAC_PI_2),
        StandardGate::SXdg => StandardGate::Rx(-FRAC_PI_2),
        _ => return None,
    };
    on(q, [rotation])
}

fn h_to_ry_rx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    match single(ops)? {
        (StandardGate::H, q) => on(q, [StandardGate::Ry(FRAC_PI_2), StandardGate::Rx(PI)]),
        _ => None,
    }
}

fn h_to_zsx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    match single(ops)? {
        (StandardGate::H, q) => on(
            q,
            [
                StandardGate::Rz(FRAC_PI_2),
                StandardGate::SX,
                StandardGate::Rz(FRAC_PI_2),
            ],
        ),
        _ => None,
    }
}

fn x_to_sx_sx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    match single(ops)? {
        (StandardGate::X, q) => on(q, [StandardGate::SX, StandardGate::SX]),
        _ => None,
    }
}

fn cx_to_cz(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (StandardGate::CX, c, t) = two(ops)? else { return None };
    Some(Rewrite::Replace(vec![
        g1(StandardGate::H, t),
        g2(StandardGate::CZ, c, t),
        g1(StandardGate::H, t),
    ]))
}

fn cz_to_cx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (StandardGate::CZ, c, t) = two(ops)? else { return None };
    Some(Rewrite::Replace(vec![
        g1(StandardGate::H, t),
        g2(StandardGate::CX, c, t),
        g1(StandardGate::H, t),
    ]))
}

/// Mølmer–Sørensen form of CX.
fn cx_to_rxx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (StandardGate::CX, c, t) = two(ops)? else { return None };
    Some(Rewrite::Replace(vec![
        g1(StandardGate::Ry(FRAC_PI_2), c),
        g2(StandardGate::RXX(FRAC_PI_2), c, t),
        g1(StandardGate::Rx(-FRAC_PI_2), c),
        g1(StandardGate::Rx(-FRAC_PI_2), t),
        g1(StandardGate::Ry(-FRAC_PI_2), c),
    ]))
}

fn cy_to_cx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (StandardGate::CY, c, t) = two(ops)? else { return None };
    Some(Rewrite::Replace(vec![
        g1(StandardGate::Sdg, t),
        g2(StandardGate::CX, c, t),
        g1(StandardGate::S, t),
    ]))
}

fn swap_to_cx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (StandardGate::Swap, a, b) = two(ops)? else { return None };
    Some(Rewrite::Replace(vec![
        g2(StandardGate::CX, a, b),
        g2(StandardGate::CX, b, a),
        g2(StandardGate::CX, a, b),
    ]))
}

fn cp_to_cx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (StandardGate::CP(angle), c, t) = two(ops)? else { return None };
    let half = angle / 2.0;
    Some(Rewrite::Replace(vec![
        g1(StandardGate::P(half), c),
        g2(StandardGate::CX, c, t),
        g1(StandardGate::P(-half), t),
        g2(StandardGate::CX, c, t),
        g1(StandardGate::P(half), t),
    ]))
}

fn crz_to_cx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (StandardGate::CRz(angle), c, t) = two(ops)? else { return None };
    let half = angle / 2.0;
    Some(Rewrite::Replace(vec![
        g1(StandardGate::Rz(half), t),
        g2(StandardGate::CX, c, t),
        g1(StandardGate::Rz(-half), t),
        g2(StandardGate::CX, c, t),
    ]))
}

fn rzz_to_cx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (StandardGate::RZZ(angle), a, b) = two(ops)? else { return None };
    Some(Rewrite::Replace(vec![
        g2(StandardGate::CX, a, b),
        g1(StandardGate::Rz(angle), b),
        g2(StandardGate::CX, a, b),
    ]))
}

fn rxx_to_rzz(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let (StandardGate::RXX(angle), a, b) = two(ops)? else { return None };
    Some(Rewrite::Replace(vec![
        g1(StandardGate::H, a),
        g1(StandardGate::H, b),
        g2(StandardGate::RZZ(angle), a, b),
        g1(StandardGate::H, a),
        g1(StandardGate::H, b),
    ]))
}

fn ccx_to_cx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    use StandardGate::{CX, H, T, Tdg};

    if ops.first()?.name() != "ccx" {
        return None;
    }
    let (a, b, c) = three(ops)?;
    Some(Rewrite::Replace(vec![
        g1(H, c),
        g2(CX, b, c),
        g1(Tdg, c),
        g2(CX, a, c),
        g1(T, c),
        g2(CX, b, c),
        g1(Tdg, c),
        g2(CX, a, c),
        g1(T, b),
        g1(T, c),
        g1(H, c),
        g2(CX, a, b),
        g1(T, a),
        g1(Tdg, b),
        g2(CX, a, b),
    ]))
}

fn cswap_to_ccx(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    if ops.first()?.name() != "cswap" {
        return None;
    }
    let (c, a, b) = three(ops)?;
    Some(Rewrite::Replace(vec![
        g2(StandardGate::CX, b, a),
        Instruction::gate(StandardGate::CCX, [c, a, b]),
        g2(StandardGate::CX, b, a),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::EquivalenceLibrary;
    use crate::unitary::Operator;
    use qforge_ir::CircuitDag;

    fn operator(ops: &[Instruction]) -> Operator {
        let mut dag = CircuitDag::with_size(3, 0);
        for op in ops {
            dag.apply(op.clone()).unwrap();
        }
        Operator::from_dag(&dag).unwrap()
    }

    /// Every decomposition emits exactly the operators it advertises.
    #[test]
    fn test_produces_matches_output() {
        let library = EquivalenceLibrary::standard();
        let samples = [
            Instruction::single_qubit_gate(StandardGate::U(0.4, 1.1, -0.7), QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::Rx(0.3), QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::Ry(0.3), QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::Rz(0.3), QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::P(0.3), QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::X, QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::Y, QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::T, QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::SXdg, QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::H, QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::I, QubitId(0)),
            g2(StandardGate::CX, QubitId(0), QubitId(1)),
            g2(StandardGate::CZ, QubitId(0), QubitId(1)),
            g2(StandardGate::CY, QubitId(0), QubitId(1)),
            g2(StandardGate::Swap, QubitId(0), QubitId(1)),
            g2(StandardGate::CP(0.3), QubitId(0), QubitId(1)),
            g2(StandardGate::CRz(0.3), QubitId(0), QubitId(1)),
            g2(StandardGate::RZZ(0.3), QubitId(0), QubitId(1)),
            g2(StandardGate::RXX(0.3), QubitId(0), QubitId(1)),
            Instruction::gate(StandardGate::CCX, [QubitId(0), QubitId(1), QubitId(2)]),
            Instruction::gate(StandardGate::CSwap, [QubitId(0), QubitId(1), QubitId(2)]),
        ];
        for sample in &samples {
            let expected = operator(std::slice::from_ref(sample));
            for m in library.lookup_family(
                RuleFamily::Decomposition,
                &[sample],
                &RuleContext::default(),
            ) {
                let Rewrite::Replace(seq) = m.rewrite else {
                    panic!("{} did not replace", m.rule.name)
                };
                let names: Vec<&str> = seq.iter().map(Instruction::name).collect();
                assert_eq!(names, m.rule.produces, "{}", m.rule.name);
                assert!(
                    expected.equiv_up_to_phase(&operator(&seq), 1e-9),
                    "{} is not exact",
                    m.rule.name
                );
            }
        }
    }

    #[test]
    fn test_every_standard_name_has_a_rule() {
        let library = EquivalenceLibrary::standard();
        for (name, _, _) in qforge_ir::STANDARD_GATE_SHAPES {
            let covered = library.rules().iter().any(|r| {
                r.family == RuleFamily::Decomposition
                    && matches!(r.pattern, Pattern::Single(OpMatch::Names(ns)) if ns.contains(name))
            });
            assert!(covered, "{name}");
        }
    }
}
