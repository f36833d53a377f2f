//! Algebraic rules: inverse pairs, rotation merges, degenerate angles,
//! single-qubit composition and commutation.

use std::f64::consts::PI;

use qforge_ir::{Instruction, QubitId, StandardGate};

use super::{EquivalenceRule, OpMatch, Pattern, Rewrite, RuleContext, RuleFamily, Validity};
use crate::unitary::{EPSILON, Unitary2x2, normalize_angle};

const MERGEABLE: &[&str] = &["rx", "ry", "rz", "p", "rzz", "rxx", "cp", "crz", "prx"];

/// Fixed gates a degenerate rotation may collapse into, in preference order.
const FIXED_1Q: [StandardGate; 10] = [
    StandardGate::X,
    StandardGate::Y,
    StandardGate::Z,
    StandardGate::H,
    StandardGate::S,
    StandardGate::Sdg,
    StandardGate::T,
    StandardGate::Tdg,
    StandardGate::SX,
    StandardGate::SXdg,
];

pub(super) fn rules() -> Vec<EquivalenceRule> {
    vec![
        EquivalenceRule {
            name: "inverse_pair",
            family: RuleFamily::Inverse,
            pattern: Pattern::Pair(OpMatch::Any, OpMatch::Any),
            validity: Validity::ExactAngle,
            produces: &[],
            apply: cancel_inverse,
        },
        EquivalenceRule {
            name: "merge_rotations",
            family: RuleFamily::Merge,
            pattern: Pattern::Pair(OpMatch::Names(MERGEABLE), OpMatch::Names(MERGEABLE)),
            validity: Validity::AnyAngle,
            produces: &[],
            apply: merge_pair,
        },
        EquivalenceRule {
            name: "collapse_degenerate",
            family: RuleFamily::Degenerate,
            pattern: Pattern::Single(OpMatch::Any),
            validity: Validity::DegenerateAngle,
            produces: &[],
            apply: collapse,
        },
        EquivalenceRule {
            name: "compose_1q_run",
            family: RuleFamily::Compose,
            pattern: Pattern::Run,
            validity: Validity::AnyAngle,
            produces: &["u"],
            apply: compose_run,
        },
        EquivalenceRule {
            name: "commute_disjoint",
            family: RuleFamily::Commutation,
            pattern: Pattern::Pair(OpMatch::Any, OpMatch::Any),
            validity: Validity::DisjointQubits,
            produces: &[],
            apply: |ops, _| commute_if(ops, |a, b| !a.qubits.iter().any(|q| b.qubits.contains(q))),
        },
        EquivalenceRule {
            name: "commute_diagonal",
            family: RuleFamily::Commutation,
            pattern: Pattern::Pair(OpMatch::Any, OpMatch::Any),
            validity: Validity::Commutation,
            produces: &[],
            apply: |ops, _| commute_if(ops, |a, b| gate(a).is_diagonal() && gate(b).is_diagonal()),
        },
        EquivalenceRule {
            name: "commute_identical",
            family: RuleFamily::Commutation,
            pattern: Pattern::Pair(OpMatch::Any, OpMatch::Any),
            validity: Validity::Commutation,
            produces: &[],
            apply: |ops, _| commute_if(ops, |a, b| a == b),
        },
        EquivalenceRule {
            name: "commute_diagonal_on_control",
            family: RuleFamily::Commutation,
            pattern: Pattern::Pair(OpMatch::Any, OpMatch::Any),
            validity: Validity::Commutation,
            produces: &[],
            apply: |ops, _| commute_either(ops, diagonal_on_control),
        },
        EquivalenceRule {
            name: "commute_x_on_target",
            family: RuleFamily::Commutation,
            pattern: Pattern::Pair(OpMatch::Any, OpMatch::Any),
            validity: Validity::Commutation,
            produces: &[],
            apply: |ops, _| commute_either(ops, x_axis_on_target),
        },
        EquivalenceRule {
            name: "commute_cx_shared_end",
            family: RuleFamily::Commutation,
            pattern: Pattern::Pair(OpMatch::Names(&["cx"]), OpMatch::Names(&["cx"])),
            validity: Validity::Commutation,
            produces: &[],
            apply: |ops, _| {
                commute_if(ops, |a, b| {
                    let (ca, ta) = (a.qubits[0], a.qubits[1]);
                    let (cb, tb) = (b.qubits[0], b.qubits[1]);
                    (ca == cb && ta != tb && ta != cb && tb != ca)
                        || (ta == tb && ca != cb && ca != tb && cb != ta)
                })
            },
        },
    ]
}

fn gate(inst: &Instruction) -> StandardGate {
    inst.rewritable().copied().unwrap_or(StandardGate::I)
}

fn std_gate(inst: &Instruction) -> Option<(StandardGate, &[QubitId])> {
    inst.rewritable().map(|g| (*g, inst.qubits.as_slice()))
}

fn place(gate: StandardGate, qubits: &[QubitId]) -> Instruction {
    Instruction::gate(gate, qubits.iter().copied())
}

fn params_close(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < EPSILON)
}

fn angles_close(a: f64, b: f64) -> bool {
    normalize_angle(a - b).abs() < EPSILON
}

fn same_set(a: &[QubitId], b: &[QubitId]) -> bool {
    a.len() == b.len() && a.iter().all(|q| b.contains(q))
}

/// Whether `gate` on `a` and on `b` is the same operator.
fn acts_alike(gate: &StandardGate, a: &[QubitId], b: &[QubitId]) -> bool {
    if a == b {
        return true;
    }
    match gate {
        g if g.is_symmetric() => same_set(a, b),
        StandardGate::CCX => a.len() == 3 && b.len() == 3 && a[2] == b[2] && same_set(&a[..2], &b[..2]),
        StandardGate::CSwap => a.len() == 3 && b.len() == 3 && a[0] == b[0] && same_set(&a[1..], &b[1..]),
        _ => false,
    }
}

fn cancel_inverse(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let [a, b] = ops else { return None };
    let (ga, qa) = std_gate(a)?;
    let (gb, qb) = std_gate(b)?;
    (ga.inverse().name() == gb.name()
        && acts_alike(&ga, qa, qb)
        && params_close(&ga.inverse().params(), &gb.params()))
    .then(|| Rewrite::Replace(vec![]))
}

fn merge_pair(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    use StandardGate::{CP, CRz, P, PRX, RXX, RZZ, Rx, Ry, Rz};

    let [a, b] = ops else { return None };
    let (ga, qa) = std_gate(a)?;
    let (gb, qb) = std_gate(b)?;
    if !acts_alike(&ga, qa, qb) {
        return None;
    }
    let merged = match (ga, gb) {
        (Rx(x), Rx(y)) => Rx(x + y),
        (Ry(x), Ry(y)) => Ry(x + y),
        (Rz(x), Rz(y)) => Rz(x + y),
        (P(x), P(y)) => P(x + y),
        (RZZ(x), RZZ(y)) => RZZ(x + y),
        (RXX(x), RXX(y)) => RXX(x + y),
        (CP(x), CP(y)) => CP(x + y),
        (CRz(x), CRz(y)) => CRz(x + y),
        (PRX(x, phi), PRX(y, psi)) if angles_close(phi, psi) => PRX(x + y, phi),
        _ => return None,
    };
    Some(Rewrite::Replace(
        settle(merged).map(|g| vec![place(g, qa)]).unwrap_or_default(),
    ))
}

/// Bring a gate's angles into their canonical range.
///
/// Every angle is taken mod 2π except the CRz angle, which is only
/// 4π-periodic up to global phase.
pub(crate) fn normalize_gate(gate: StandardGate) -> StandardGate {
    match gate {
        StandardGate::CRz(a) => StandardGate::CRz(2.0 * normalize_angle(a / 2.0)),
        g => g.map_params(normalize_angle),
    }
}

fn is_trivial(gate: &StandardGate) -> bool {
    use StandardGate::{CP, CRz, I, P, PRX, RXX, RZZ, Rx, Ry, Rz, U};
    match *gate {
        I => true,
        Rx(a) | Ry(a) | Rz(a) | P(a) | CP(a) | CRz(a) | RXX(a) | RZZ(a) => a.abs() < EPSILON,
        PRX(theta, _) => theta.abs() < EPSILON,
        U(..) => Unitary2x2::from_gate(gate).is_some_and(|u| u.is_identity()),
        _ => false,
    }
}

/// Normalize a gate; `None` when it is the identity up to global phase.
pub(crate) fn settle(gate: StandardGate) -> Option<StandardGate> {
    let normal = normalize_gate(gate);
    (!is_trivial(&normal)).then_some(normal)
}

fn fixed_equivalent(gate: &StandardGate, ctx: &RuleContext<'_>) -> Option<StandardGate> {
    if let StandardGate::CP(a) = *gate {
        return ((a - PI).abs() < EPSILON && ctx.allows("cz")).then_some(StandardGate::CZ);
    }
    let matrix = Unitary2x2::from_gate(gate)?;
    FIXED_1Q.into_iter().find(|fixed| {
        ctx.allows(fixed.name())
            && Unitary2x2::from_gate(fixed).is_some_and(|m| m.equiv_up_to_phase(&matrix))
    })
}

fn collapse(ops: &[&Instruction], ctx: &RuleContext<'_>) -> Option<Rewrite> {
    let [op] = ops else { return None };
    let (gate, qubits) = std_gate(op)?;
    if !gate.is_parameterized() && gate != StandardGate::I {
        return None;
    }
    let Some(normal) = settle(gate) else {
        return Some(Rewrite::Replace(vec![]));
    };
    if let Some(fixed) = fixed_equivalent(&normal, ctx) {
        return Some(Rewrite::Replace(vec![place(fixed, qubits)]));
    }
    (!params_close(&normal.params(), &gate.params()))
        .then(|| Rewrite::Replace(vec![place(normal, qubits)]))
}

fn compose_run(ops: &[&Instruction], _: &RuleContext<'_>) -> Option<Rewrite> {
    let qubit = *ops.first()?.qubits.first()?;
    let mut product = Unitary2x2::identity();
    for op in ops {
        product = Unitary2x2::from_gate(op.rewritable()?)? * product;
    }
    if product.is_identity() {
        return Some(Rewrite::Replace(vec![]));
    }
    let (theta, phi, lambda) = product.to_u_angles();
    Some(Rewrite::Replace(vec![Instruction::single_qubit_gate(
        StandardGate::U(theta, phi, lambda),
        qubit,
    )]))
}

fn commute_if(
    ops: &[&Instruction],
    relation: impl Fn(&Instruction, &Instruction) -> bool,
) -> Option<Rewrite> {
    let [a, b] = ops else { return None };
    relation(a, b).then_some(Rewrite::Commute)
}

fn commute_either(
    ops: &[&Instruction],
    relation: fn(&Instruction, &Instruction) -> bool,
) -> Option<Rewrite> {
    commute_if(ops, |a, b| relation(a, b) || relation(b, a))
}

/// Control qubits of a controlled gate.
fn controls(inst: &Instruction) -> &[QubitId] {
    match gate(inst) {
        StandardGate::CX | StandardGate::CY | StandardGate::CP(_) | StandardGate::CRz(_) => {
            &inst.qubits[..1]
        }
        StandardGate::CCX => &inst.qubits[..2],
        StandardGate::CSwap => &inst.qubits[..1],
        _ => &[],
    }
}

/// A 1q Z-diagonal gate sitting on a control of `b`.
fn diagonal_on_control(a: &Instruction, b: &Instruction) -> bool {
    a.qubits.len() == 1 && gate(a).is_diagonal() && controls(b).contains(&a.qubits[0])
}

/// A 1q X-axis gate on the target of a CX/CCX, or on either qubit of an RXX.
fn x_axis_on_target(a: &Instruction, b: &Instruction) -> bool {
    if a.qubits.len() != 1 || !gate(a).is_x_axis() {
        return false;
    }
    let q = a.qubits[0];
    match gate(b) {
        StandardGate::CX => b.qubits[1] == q,
        StandardGate::CCX => b.qubits[2] == q,
        StandardGate::RXX(_) => b.qubits.contains(&q),
        _ => false,
    }
}
