//! Gate vocabulary.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::qubit::ClbitId;

/// Standard gates with known semantics.
///
/// Angles are concrete radians. Two-qubit gates list the control first
/// where the gate has one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(f64),
    /// Rotation around Y axis.
    Ry(f64),
    /// Rotation around Z axis.
    Rz(f64),
    /// Phase gate.
    P(f64),
    /// Universal single-qubit gate U(θ, φ, λ) = Rz(φ) · Ry(θ) · Rz(λ).
    U(f64, f64, f64),
    /// Phased RX gate: PRX(θ, φ) = RZ(φ) · RX(θ) · RZ(-φ).
    PRX(f64, f64),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// SWAP gate.
    Swap,
    /// Controlled phase gate.
    CP(f64),
    /// Controlled rotation around Z.
    CRz(f64),
    /// XX rotation gate (Mølmer–Sørensen interaction).
    RXX(f64),
    /// ZZ rotation gate.
    RZZ(f64),

    // Three-qubit gates
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

/// Every name [`StandardGate::from_name`] accepts, with its parameter count.
pub const STANDARD_GATE_SHAPES: &[(&str, u32, usize)] = &[
    ("id", 1, 0),
    ("x", 1, 0),
    ("y", 1, 0),
    ("z", 1, 0),
    ("h", 1, 0),
    ("s", 1, 0),
    ("sdg", 1, 0),
    ("t", 1, 0),
    ("tdg", 1, 0),
    ("sx", 1, 0),
    ("sxdg", 1, 0),
    ("rx", 1, 1),
    ("ry", 1, 1),
    ("rz", 1, 1),
    ("p", 1, 1),
    ("u", 1, 3),
    ("prx", 1, 2),
    ("cx", 2, 0),
    ("cy", 2, 0),
    ("cz", 2, 0),
    ("swap", 2, 0),
    ("cp", 2, 1),
    ("crz", 2, 1),
    ("rxx", 2, 1),
    ("rzz", 2, 1),
    ("ccx", 3, 0),
    ("cswap", 3, 0),
];

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(..) => "u",
            StandardGate::PRX(..) => "prx",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::Swap => "swap",
            StandardGate::CP(_) => "cp",
            StandardGate::CRz(_) => "crz",
            StandardGate::RXX(_) => "rxx",
            StandardGate::RZZ(_) => "rzz",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::Swap
            | StandardGate::CP(_)
            | StandardGate::CRz(_)
            | StandardGate::RXX(_)
            | StandardGate::RZZ(_) => 2,

            StandardGate::CCX | StandardGate::CSwap => 3,

            _ => 1,
        }
    }

    /// Get the angle parameters of this gate.
    pub fn params(&self) -> Vec<f64> {
        match *self {
            StandardGate::Rx(a)
            | StandardGate::Ry(a)
            | StandardGate::Rz(a)
            | StandardGate::P(a)
            | StandardGate::CP(a)
            | StandardGate::CRz(a)
            | StandardGate::RXX(a)
            | StandardGate::RZZ(a) => vec![a],
            StandardGate::U(theta, phi, lambda) => vec![theta, phi, lambda],
            StandardGate::PRX(theta, phi) => vec![theta, phi],
            _ => vec![],
        }
    }

    /// Check if this gate carries angle parameters.
    pub fn is_parameterized(&self) -> bool {
        !self.params().is_empty()
    }

    /// Rebuild this gate with every angle passed through `f`.
    #[must_use]
    pub fn map_params(&self, f: impl Fn(f64) -> f64) -> StandardGate {
        match *self {
            StandardGate::Rx(a) => StandardGate::Rx(f(a)),
            StandardGate::Ry(a) => StandardGate::Ry(f(a)),
            StandardGate::Rz(a) => StandardGate::Rz(f(a)),
            StandardGate::P(a) => StandardGate::P(f(a)),
            StandardGate::CP(a) => StandardGate::CP(f(a)),
            StandardGate::CRz(a) => StandardGate::CRz(f(a)),
            StandardGate::RXX(a) => StandardGate::RXX(f(a)),
            StandardGate::RZZ(a) => StandardGate::RZZ(f(a)),
            StandardGate::U(t, p, l) => StandardGate::U(f(t), f(p), f(l)),
            StandardGate::PRX(t, p) => StandardGate::PRX(f(t), f(p)),
            other => other,
        }
    }

    /// The exact inverse of this gate on the same qubit tuple.
    #[must_use]
    pub fn inverse(&self) -> StandardGate {
        match *self {
            StandardGate::S => StandardGate::Sdg,
            StandardGate::Sdg => StandardGate::S,
            StandardGate::T => StandardGate::Tdg,
            StandardGate::Tdg => StandardGate::T,
            StandardGate::SX => StandardGate::SXdg,
            StandardGate::SXdg => StandardGate::SX,
            StandardGate::U(theta, phi, lambda) => StandardGate::U(-theta, -lambda, -phi),
            StandardGate::PRX(theta, phi) => StandardGate::PRX(-theta, phi),
            StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_)
            | StandardGate::P(_)
            | StandardGate::CP(_)
            | StandardGate::CRz(_)
            | StandardGate::RXX(_)
            | StandardGate::RZZ(_) => self.map_params(|a| -a),
            other => other,
        }
    }

    /// Whether the gate acts identically under any permutation of its qubits.
    pub fn is_symmetric(&self) -> bool {
        matches!(
            self,
            StandardGate::CZ
                | StandardGate::Swap
                | StandardGate::CP(_)
                | StandardGate::RXX(_)
                | StandardGate::RZZ(_)
        )
    }

    /// Whether the gate's matrix is diagonal in the computational basis.
    pub fn is_diagonal(&self) -> bool {
        matches!(
            self,
            StandardGate::I
                | StandardGate::Z
                | StandardGate::S
                | StandardGate::Sdg
                | StandardGate::T
                | StandardGate::Tdg
                | StandardGate::Rz(_)
                | StandardGate::P(_)
                | StandardGate::CZ
                | StandardGate::CP(_)
                | StandardGate::CRz(_)
                | StandardGate::RZZ(_)
        )
    }

    /// Whether the single-qubit gate is a function of Pauli X only.
    pub fn is_x_axis(&self) -> bool {
        matches!(
            self,
            StandardGate::I
                | StandardGate::X
                | StandardGate::SX
                | StandardGate::SXdg
                | StandardGate::Rx(_)
        ) || matches!(self, StandardGate::PRX(_, phi) if *phi == 0.0)
    }

    /// Look up a standard gate by name.
    ///
    /// Returns `Ok(None)` for names outside the standard vocabulary and an
    /// error when a standard name is given the wrong number of parameters.
    pub fn from_name(name: &str, params: &[f64]) -> IrResult<Option<StandardGate>> {
        let lower = name.to_ascii_lowercase();
        let Some(&(canonical, _, expected)) = STANDARD_GATE_SHAPES
            .iter()
            .find(|(n, _, _)| *n == lower)
        else {
            return Ok(None);
        };
        if params.len() != expected {
            return Err(IrError::ParamCountMismatch {
                gate_name: canonical.to_string(),
                expected,
                got: params.len(),
            });
        }
        let gate = match canonical {
            "id" => StandardGate::I,
            "x" => StandardGate::X,
            "y" => StandardGate::Y,
            "z" => StandardGate::Z,
            "h" => StandardGate::H,
            "s" => StandardGate::S,
            "sdg" => StandardGate::Sdg,
            "t" => StandardGate::T,
            "tdg" => StandardGate::Tdg,
            "sx" => StandardGate::SX,
            "sxdg" => StandardGate::SXdg,
            "rx" => StandardGate::Rx(params[0]),
            "ry" => StandardGate::Ry(params[0]),
            "rz" => StandardGate::Rz(params[0]),
            "p" => StandardGate::P(params[0]),
            "u" => StandardGate::U(params[0], params[1], params[2]),
            "prx" => StandardGate::PRX(params[0], params[1]),
            "cx" => StandardGate::CX,
            "cy" => StandardGate::CY,
            "cz" => StandardGate::CZ,
            "swap" => StandardGate::Swap,
            "cp" => StandardGate::CP(params[0]),
            "crz" => StandardGate::CRz(params[0]),
            "rxx" => StandardGate::RXX(params[0]),
            "rzz" => StandardGate::RZZ(params[0]),
            "ccx" => StandardGate::CCX,
            _ => StandardGate::CSwap,
        };
        Ok(Some(gate))
    }

    /// Arity of a standard gate name, if the name is standard.
    pub fn arity_of(name: &str) -> Option<u32> {
        STANDARD_GATE_SHAPES
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|&(_, arity, _)| arity)
    }
}

/// A gate, either standard or custom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// A standard gate with known semantics.
    Standard(StandardGate),
    /// A gate known only by name and shape.
    Custom(CustomGate),
}

impl GateKind {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            GateKind::Standard(g) => g.name(),
            GateKind::Custom(g) => &g.name,
        }
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Custom(g) => g.num_qubits,
        }
    }

    /// Get the angle parameters.
    pub fn params(&self) -> Vec<f64> {
        match self {
            GateKind::Standard(g) => g.params(),
            GateKind::Custom(g) => g.params.clone(),
        }
    }
}

/// A gate outside the standard vocabulary.
///
/// Its matrix is unknown, so the optimizer treats it as opaque; only
/// basis translation looks at it, and only by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomGate {
    /// The name of the gate.
    pub name: String,
    /// The number of qubits it operates on.
    pub num_qubits: u32,
    /// Parameters of the gate.
    #[serde(default)]
    pub params: Vec<f64>,
}

impl CustomGate {
    /// Create a new custom gate.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            params: vec![],
        }
    }

    /// Add parameters to the gate.
    #[must_use]
    pub fn with_params(mut self, params: Vec<f64>) -> Self {
        self.params = params;
        self
    }
}

/// Classical condition: the gate fires only when `clbits`, read as a
/// little-endian integer, equal `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicalCondition {
    /// The bits the condition reads.
    pub clbits: Vec<ClbitId>,
    /// The value to compare against.
    pub value: u64,
}

impl ClassicalCondition {
    /// Create a new classical condition.
    pub fn new(clbits: impl IntoIterator<Item = ClbitId>, value: u64) -> Self {
        Self {
            clbits: clbits.into_iter().collect(),
            value,
        }
    }
}

/// A gate with associated metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The kind of gate.
    pub kind: GateKind,
    /// Optional classical condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

impl Gate {
    /// Create a new gate from a standard gate.
    pub fn standard(gate: StandardGate) -> Self {
        Self {
            kind: GateKind::Standard(gate),
            condition: None,
        }
    }

    /// Create a new gate from a custom gate.
    pub fn custom(gate: CustomGate) -> Self {
        Self {
            kind: GateKind::Custom(gate),
            condition: None,
        }
    }

    /// Add a classical condition to the gate.
    #[must_use]
    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Get the name of this gate.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.kind.num_qubits()
    }

    /// The standard gate, if this is one.
    pub fn as_standard(&self) -> Option<&StandardGate> {
        match &self.kind {
            GateKind::Standard(g) => Some(g),
            GateKind::Custom(_) => None,
        }
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

impl From<CustomGate> for Gate {
    fn from(gate: CustomGate) -> Self {
        Gate::custom(gate)
    }
}
