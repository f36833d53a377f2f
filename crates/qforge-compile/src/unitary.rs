//! Unitary matrix utilities.
//!
//! [`Unitary2x2`] backs single-qubit fusion (products and ZYZ Euler angles).
//! [`Operator`] is a dense matrix over a handful of qubits, used to check
//! that a rewritten circuit still implements the same linear operator up to
//! global phase.

use num_complex::Complex64;
use std::f64::consts::PI;

use qforge_ir::{CircuitDag, InstructionKind, StandardGate};

use crate::error::{CompileError, CompileResult};

/// Tolerance for floating point comparisons.
pub const EPSILON: f64 = 1e-10;

/// Largest register [`Operator`] will build.
pub const MAX_OPERATOR_QUBITS: usize = 10;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// A 2x2 unitary matrix in row-major order.
#[derive(Debug, Clone, Copy)]
pub struct Unitary2x2 {
    /// The matrix elements in row-major order: [[a, b], [c, d]].
    pub data: [Complex64; 4],
}

impl Unitary2x2 {
    /// Create a new 2x2 unitary matrix.
    pub fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { data: [a, b, c, d] }
    }

    /// Create the identity matrix.
    pub fn identity() -> Self {
        Self::diagonal(ONE, ONE)
    }

    fn diagonal(a: Complex64, d: Complex64) -> Self {
        Self::new(a, ZERO, ZERO, d)
    }

    /// Create a Hadamard matrix.
    pub fn h() -> Self {
        let s = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
        Self::new(s, s, s, -s)
    }

    /// Create an RX rotation matrix.
    pub fn rx(theta: f64) -> Self {
        let c = Complex64::new((theta / 2.0).cos(), 0.0);
        let s = Complex64::new(0.0, -(theta / 2.0).sin());
        Self::new(c, s, s, c)
    }

    /// Create an RY rotation matrix.
    pub fn ry(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(-s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(c, 0.0),
        )
    }

    /// Create an RZ rotation matrix.
    pub fn rz(theta: f64) -> Self {
        Self::diagonal(
            Complex64::from_polar(1.0, -theta / 2.0),
            Complex64::from_polar(1.0, theta / 2.0),
        )
    }

    /// Create a phase gate P(lambda).
    pub fn p(lambda: f64) -> Self {
        Self::diagonal(ONE, Complex64::from_polar(1.0, lambda))
    }

    /// Create a U gate U(theta, phi, lambda).
    pub fn u(theta: f64, phi: f64, lambda: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        )
    }

    /// Create a phased RX gate PRX(theta, phi).
    pub fn prx(theta: f64, phi: f64) -> Self {
        let c = Complex64::new((theta / 2.0).cos(), 0.0);
        let s = (theta / 2.0).sin();
        Self::new(
            c,
            Complex64::new(0.0, -1.0) * Complex64::from_polar(s, -phi),
            Complex64::new(0.0, -1.0) * Complex64::from_polar(s, phi),
            c,
        )
    }

    /// Matrix of a single-qubit standard gate; `None` for wider gates.
    pub fn from_gate(gate: &StandardGate) -> Option<Self> {
        let i = Complex64::new(0.0, 1.0);
        let m = match *gate {
            StandardGate::I => Self::identity(),
            StandardGate::X => Self::new(ZERO, ONE, ONE, ZERO),
            StandardGate::Y => Self::new(ZERO, -i, i, ZERO),
            StandardGate::Z => Self::diagonal(ONE, -ONE),
            StandardGate::H => Self::h(),
            StandardGate::S => Self::diagonal(ONE, i),
            StandardGate::Sdg => Self::diagonal(ONE, -i),
            StandardGate::T => Self::p(PI / 4.0),
            StandardGate::Tdg => Self::p(-PI / 4.0),
            StandardGate::SX => {
                let (a, b) = (Complex64::new(0.5, 0.5), Complex64::new(0.5, -0.5));
                Self::new(a, b, b, a)
            }
            StandardGate::SXdg => {
                let (a, b) = (Complex64::new(0.5, -0.5), Complex64::new(0.5, 0.5));
                Self::new(a, b, b, a)
            }
            StandardGate::Rx(t) => Self::rx(t),
            StandardGate::Ry(t) => Self::ry(t),
            StandardGate::Rz(t) => Self::rz(t),
            StandardGate::P(l) => Self::p(l),
            StandardGate::U(t, p, l) => Self::u(t, p, l),
            StandardGate::PRX(t, p) => Self::prx(t, p),
            _ => return None,
        };
        Some(m)
    }

    /// Multiply this matrix by another: self * other.
    #[allow(clippy::many_single_char_names)]
    pub fn mul(&self, other: &Self) -> Self {
        let [a, b, c, d] = self.data;
        let [e, f, g, h] = other.data;
        Self::new(a * e + b * g, a * f + b * h, c * e + d * g, c * f + d * h)
    }

    /// Check if this is approximately identity (up to global phase).
    pub fn is_identity(&self) -> bool {
        let [a, b, c, d] = self.data;
        b.norm() < EPSILON && c.norm() < EPSILON && (a - d).norm() < EPSILON
    }

    /// Conjugate transpose.
    pub fn adjoint(&self) -> Self {
        let [a, b, c, d] = self.data;
        Self::new(a.conj(), c.conj(), b.conj(), d.conj())
    }

    /// Whether two matrices differ only by a global phase.
    pub fn equiv_up_to_phase(&self, other: &Self) -> bool {
        self.mul(&other.adjoint()).is_identity()
    }

    /// Decompose into `e^{i·phase} · RZ(alpha) · RY(beta) · RZ(gamma)`.
    ///
    /// Returns `(alpha, beta, gamma, phase)`. In circuit order the gate
    /// is `U(beta, alpha, gamma)`.
    pub fn zyz_decomposition(&self) -> (f64, f64, f64, f64) {
        let [a, b, c, d] = self.data;
        let phase = (a * d - b * c).arg() / 2.0;

        // Strip the phase to land in SU(2).
        let strip = Complex64::from_polar(1.0, -phase);
        let (a, b, c) = (a * strip, b * strip, c * strip);

        let beta = 2.0 * c.norm().atan2(a.norm());
        if beta.abs() < EPSILON {
            let sum = -2.0 * a.arg();
            return (sum / 2.0, 0.0, sum / 2.0, phase);
        }
        if (beta - PI).abs() < EPSILON {
            let diff = -2.0 * (-b).arg();
            return (diff / 2.0, PI, -diff / 2.0, phase);
        }

        let sum = -2.0 * a.arg();
        let diff = 2.0 * c.arg();
        (f64::midpoint(sum, diff), beta, (sum - diff) / 2.0, phase)
    }

    /// Canonical `U(θ, φ, λ)` angles of this matrix, normalized to (-π, π].
    pub fn to_u_angles(&self) -> (f64, f64, f64) {
        let (alpha, beta, gamma, _) = self.zyz_decomposition();
        (
            normalize_angle(beta),
            normalize_angle(alpha),
            normalize_angle(gamma),
        )
    }
}

impl Default for Unitary2x2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Unitary2x2 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Unitary2x2::mul(&self, &rhs)
    }
}

/// Normalize an angle to (-π, π].
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let a = angle.rem_euclid(2.0 * PI);
    if a > PI { a - 2.0 * PI } else { a }
}

/// Check whether an angle is a multiple of `period` within [`EPSILON`].
pub fn is_multiple_of(angle: f64, period: f64) -> bool {
    let r = angle.rem_euclid(period);
    r < EPSILON || period - r < EPSILON
}

/// Dense operator on a small register.
///
/// Qubit `k` is bit `k` of the basis index. Built by left-multiplying gate
/// matrices in topological order, so the result is the operator the
/// circuit applies.
#[derive(Debug, Clone)]
pub struct Operator {
    num_qubits: usize,
    dim: usize,
    /// Row-major `dim x dim` entries.
    data: Vec<Complex64>,
}

impl Operator {
    /// The identity on `num_qubits` qubits.
    pub fn identity(num_qubits: usize) -> CompileResult<Self> {
        if num_qubits > MAX_OPERATOR_QUBITS {
            return Err(CompileError::VerificationFailed(format!(
                "{num_qubits} qubits exceed the {MAX_OPERATOR_QUBITS}-qubit operator limit"
            )));
        }
        let dim = 1usize << num_qubits;
        let mut data = vec![ZERO; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = ONE;
        }
        Ok(Self {
            num_qubits,
            dim,
            data,
        })
    }

    /// The operator a DAG applies to qubit wires `0..=max qubit index`.
    ///
    /// Barriers are skipped. Measurements, resets, custom gates and
    /// conditioned gates have no unitary and are rejected.
    pub fn from_dag(dag: &CircuitDag) -> CompileResult<Self> {
        Self::from_dag_padded(dag, 0)
    }

    /// Like [`from_dag`](Self::from_dag), on at least `min_qubits` qubits.
    pub fn from_dag_padded(dag: &CircuitDag, min_qubits: usize) -> CompileResult<Self> {
        let width = dag
            .qubits()
            .map(|q| q.index() + 1)
            .max()
            .unwrap_or(0)
            .max(min_qubits);
        let mut op = Self::identity(width)?;
        for (_, inst) in dag.topological_ops() {
            if matches!(inst.kind, InstructionKind::Barrier) {
                continue;
            }
            let gate = inst.rewritable().ok_or_else(|| {
                CompileError::VerificationFailed(format!("'{}' has no unitary", inst.name()))
            })?;
            let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
            op.apply(gate, &qubits);
        }
        Ok(op)
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Left-multiply by `gate` acting on `qubits` (first qubit = most
    /// significant bit of the gate's own matrix).
    pub fn apply(&mut self, gate: &StandardGate, qubits: &[usize]) {
        let local = gate_matrix(gate);
        let k = qubits.len();
        let ldim = 1usize << k;
        let mask: usize = qubits.iter().map(|&q| 1usize << q).sum();
        let offsets: Vec<usize> = (0..ldim)
            .map(|l| {
                (0..k)
                    .filter(|&i| l >> (k - 1 - i) & 1 == 1)
                    .map(|i| 1usize << qubits[i])
                    .sum()
            })
            .collect();

        let mut amps = vec![ZERO; ldim];
        for col in 0..self.dim {
            for base in (0..self.dim).filter(|b| b & mask == 0) {
                for (l, off) in offsets.iter().enumerate() {
                    amps[l] = self.data[(base | off) * self.dim + col];
                }
                for (r, off) in offsets.iter().enumerate() {
                    let row = &local[r * ldim..(r + 1) * ldim];
                    let value: Complex64 = row.iter().zip(&amps).map(|(m, a)| m * a).sum();
                    self.data[(base | off) * self.dim + col] = value;
                }
            }
        }
    }

    /// Move output qubit `p` to position `map[p]`.
    #[must_use]
    pub fn relabel_outputs(&self, map: &[usize]) -> Self {
        let mut data = vec![ZERO; self.data.len()];
        for row in 0..self.dim {
            let target: usize = (0..self.num_qubits)
                .filter(|&p| row >> p & 1 == 1)
                .map(|p| 1usize << map[p])
                .sum();
            data[target * self.dim..(target + 1) * self.dim]
                .copy_from_slice(&self.data[row * self.dim..(row + 1) * self.dim]);
        }
        Self {
            num_qubits: self.num_qubits,
            dim: self.dim,
            data,
        }
    }

    /// Equality up to a global phase, entry-wise within `tol`.
    pub fn equiv_up_to_phase(&self, other: &Self, tol: f64) -> bool {
        if self.dim != other.dim {
            return false;
        }
        let Some((pivot, _)) = self
            .data
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.norm().total_cmp(&b.norm()))
        else {
            return true;
        };
        if other.data[pivot].norm() < tol {
            return false;
        }
        let phase = other.data[pivot] / self.data[pivot];
        self.data
            .iter()
            .zip(&other.data)
            .all(|(a, b)| (a * phase - b).norm() < tol)
    }
}

/// Row-major matrix of a standard gate, first qubit most significant.
fn gate_matrix(gate: &StandardGate) -> Vec<Complex64> {
    if let Some(u) = Unitary2x2::from_gate(gate) {
        return u.data.to_vec();
    }
    let controlled = |u: Unitary2x2| {
        let mut m = identity_matrix(4);
        m[2 * 4 + 2] = u.data[0];
        m[2 * 4 + 3] = u.data[1];
        m[3 * 4 + 2] = u.data[2];
        m[3 * 4 + 3] = u.data[3];
        m
    };
    let one = |g: StandardGate| Unitary2x2::from_gate(&g).unwrap_or_default();
    match *gate {
        StandardGate::CX => controlled(one(StandardGate::X)),
        StandardGate::CY => controlled(one(StandardGate::Y)),
        StandardGate::CZ => controlled(one(StandardGate::Z)),
        StandardGate::CP(a) => controlled(Unitary2x2::p(a)),
        StandardGate::CRz(a) => controlled(Unitary2x2::rz(a)),
        StandardGate::Swap => permutation_matrix(&[0, 2, 1, 3]),
        StandardGate::RXX(t) => {
            let c = Complex64::new((t / 2.0).cos(), 0.0);
            let s = Complex64::new(0.0, -(t / 2.0).sin());
            let mut m = vec![ZERO; 16];
            for i in 0..4 {
                m[i * 4 + i] = c;
                m[i * 4 + (3 - i)] = s;
            }
            m
        }
        StandardGate::RZZ(t) => {
            let even = Complex64::from_polar(1.0, -t / 2.0);
            let odd = Complex64::from_polar(1.0, t / 2.0);
            let mut m = vec![ZERO; 16];
            for (i, v) in [even, odd, odd, even].into_iter().enumerate() {
                m[i * 4 + i] = v;
            }
            m
        }
        StandardGate::CCX => permutation_matrix(&[0, 1, 2, 3, 4, 5, 7, 6]),
        StandardGate::CSwap => permutation_matrix(&[0, 1, 2, 3, 4, 6, 5, 7]),
        _ => identity_matrix(2),
    }
}

fn identity_matrix(dim: usize) -> Vec<Complex64> {
    let mut m = vec![ZERO; dim * dim];
    for i in 0..dim {
        m[i * dim + i] = ONE;
    }
    m
}

fn permutation_matrix(perm: &[usize]) -> Vec<Complex64> {
    let dim = perm.len();
    let mut m = vec![ZERO; dim * dim];
    for (col, &row) in perm.iter().enumerate() {
        m[row * dim + col] = ONE;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use qforge_ir::{Circuit, QubitId};

    fn assert_same_up_to_phase(a: &Unitary2x2, b: &Unitary2x2) {
        let mut pa = Operator::identity(1).unwrap();
        pa.data.copy_from_slice(&a.data);
        let mut pb = Operator::identity(1).unwrap();
        pb.data.copy_from_slice(&b.data);
        assert!(pa.equiv_up_to_phase(&pb, 1e-9), "{a:?} vs {b:?}");
    }

    #[test]
    fn test_hadamard_squared() {
        let h = Unitary2x2::h();
        assert!((h * h).is_identity());
    }

    #[test]
    fn test_zyz_reconstructs_gates() {
        for gate in [
            StandardGate::H,
            StandardGate::X,
            StandardGate::Y,
            StandardGate::S,
            StandardGate::SX,
            StandardGate::U(0.3, -1.2, 2.5),
            StandardGate::PRX(1.1, 0.4),
        ] {
            let m = Unitary2x2::from_gate(&gate).unwrap();
            let (theta, phi, lambda) = m.to_u_angles();
            assert_same_up_to_phase(&m, &Unitary2x2::u(theta, phi, lambda));
        }
    }

    #[test]
    fn test_prx_matches_definition() {
        let (theta, phi) = (0.7, 1.3);
        let expected = Unitary2x2::rz(phi) * Unitary2x2::rx(theta) * Unitary2x2::rz(-phi);
        assert_same_up_to_phase(&Unitary2x2::prx(theta, phi), &expected);
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(3.0 * PI) - PI).abs() < EPSILON);
        assert!((normalize_angle(-PI) - PI).abs() < EPSILON);
        assert!(normalize_angle(2.0 * PI).abs() < EPSILON);
        assert_eq!(normalize_angle(f64::NAN), 0.0);
        assert!(is_multiple_of(4.0 * PI + 1e-12, 4.0 * PI));
        assert!(!is_multiple_of(2.0 * PI, 4.0 * PI));
    }

    #[test]
    fn test_operator_cz_from_cx() {
        let mut a = Circuit::with_size("a", 2, 0);
        a.cz(QubitId(0), QubitId(1)).unwrap();
        let mut b = Circuit::with_size("b", 2, 0);
        b.h(QubitId(1))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .h(QubitId(1))
            .unwrap();
        let oa = Operator::from_dag(a.dag()).unwrap();
        let ob = Operator::from_dag(b.dag()).unwrap();
        assert!(oa.equiv_up_to_phase(&ob, 1e-9));

        let mut c = Circuit::with_size("c", 2, 0);
        c.cx(QubitId(0), QubitId(1)).unwrap();
        assert!(!oa.equiv_up_to_phase(&Operator::from_dag(c.dag()).unwrap(), 1e-9));
    }

    #[test]
    fn test_swap_equals_relabel() {
        let mut a = Circuit::with_size("a", 2, 0);
        a.h(QubitId(0)).unwrap().swap(QubitId(0), QubitId(1)).unwrap();
        let mut b = Circuit::with_size("b", 2, 0);
        b.h(QubitId(0)).unwrap();
        let routed = Operator::from_dag(a.dag()).unwrap();
        let plain = Operator::from_dag(b.dag()).unwrap().relabel_outputs(&[1, 0]);
        assert!(routed.equiv_up_to_phase(&plain, 1e-9));
    }

    #[test]
    fn test_measure_has_no_operator() {
        let circuit = Circuit::bell().unwrap();
        assert!(matches!(
            Operator::from_dag(circuit.dag()),
            Err(CompileError::VerificationFailed(_))
        ));
    }
}
