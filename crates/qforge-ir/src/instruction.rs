//! Circuit instructions combining gates with operands.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::dag::WireId;
use crate::error::{IrError, IrResult};
use crate::gate::{Gate, GateKind, StandardGate};
use crate::qubit::{ClbitId, QubitId};

/// The kind of instruction in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A quantum gate operation.
    Gate(Gate),
    /// Measurement operation.
    Measure,
    /// Reset qubit to |0⟩.
    Reset,
    /// Barrier (synchronization point).
    Barrier,
}

/// A complete instruction with operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Qubits this instruction operates on.
    pub qubits: Vec<QubitId>,
    /// Classical bits this instruction writes (for measure).
    pub clbits: Vec<ClbitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: impl Into<Gate>, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate.into()),
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Create a single-qubit gate instruction.
    pub fn single_qubit_gate(gate: StandardGate, qubit: QubitId) -> Self {
        Self::gate(gate, [qubit])
    }

    /// Create a two-qubit gate instruction.
    pub fn two_qubit_gate(gate: StandardGate, q1: QubitId, q2: QubitId) -> Self {
        Self::gate(gate, [q1, q2])
    }

    /// Create a measurement instruction.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            kind: InstructionKind::Measure,
            qubits: vec![qubit],
            clbits: vec![clbit],
        }
    }

    /// Create a reset instruction.
    pub fn reset(qubit: QubitId) -> Self {
        Self {
            kind: InstructionKind::Reset,
            qubits: vec![qubit],
            clbits: vec![],
        }
    }

    /// Create a barrier instruction.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Barrier,
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self.kind, InstructionKind::Measure)
    }

    /// Check if this is a barrier.
    pub fn is_barrier(&self) -> bool {
        matches!(self.kind, InstructionKind::Barrier)
    }

    /// Get the gate if this is a gate instruction.
    pub fn as_gate(&self) -> Option<&Gate> {
        match &self.kind {
            InstructionKind::Gate(g) => Some(g),
            _ => None,
        }
    }

    /// The standard gate of an unconditioned gate instruction.
    ///
    /// This is the view rewrite rules work on: measurements, resets,
    /// barriers, custom gates and classically-conditioned gates all
    /// return `None` and are left untouched by the optimizer.
    pub fn rewritable(&self) -> Option<&StandardGate> {
        match &self.kind {
            InstructionKind::Gate(Gate {
                kind: GateKind::Standard(g),
                condition: None,
            }) => Some(g),
            _ => None,
        }
    }

    /// Get the name of the instruction.
    pub fn name(&self) -> &str {
        match &self.kind {
            InstructionKind::Gate(g) => g.name(),
            InstructionKind::Measure => "measure",
            InstructionKind::Reset => "reset",
            InstructionKind::Barrier => "barrier",
        }
    }

    /// Angle parameters, empty for non-gate instructions.
    pub fn params(&self) -> Vec<f64> {
        self.as_gate().map(|g| g.kind.params()).unwrap_or_default()
    }

    /// Every wire this instruction occupies, qubits first.
    ///
    /// Classical bits read by a condition are included so that a
    /// conditioned gate stays ordered after the measurement feeding it.
    pub fn wires(&self) -> Vec<WireId> {
        let mut wires: Vec<WireId> = self.qubits.iter().map(|&q| WireId::Qubit(q)).collect();
        wires.extend(self.clbits.iter().map(|&c| WireId::Clbit(c)));
        if let Some(cond) = self.as_gate().and_then(|g| g.condition.as_ref()) {
            for &c in &cond.clbits {
                if !self.clbits.contains(&c) {
                    wires.push(WireId::Clbit(c));
                }
            }
        }
        wires
    }

    /// Check arity, operand uniqueness and parameter finiteness.
    #[allow(clippy::cast_possible_truncation)]
    pub fn validate(&self) -> IrResult<()> {
        let gate_name = || Some(self.name().to_string());

        match &self.kind {
            InstructionKind::Gate(gate) => {
                let expected = gate.num_qubits();
                let got = self.qubits.len() as u32;
                if expected != got {
                    return Err(IrError::QubitCountMismatch {
                        gate_name: gate.name().to_string(),
                        expected,
                        got,
                    });
                }
                if gate.kind.params().iter().any(|p| !p.is_finite()) {
                    return Err(IrError::NonFiniteParameter {
                        gate_name: gate.name().to_string(),
                    });
                }
            }
            InstructionKind::Measure if self.qubits.len() != self.clbits.len() => {
                return Err(IrError::InvalidDag(format!(
                    "measure: qubit count ({}) does not match clbit count ({})",
                    self.qubits.len(),
                    self.clbits.len(),
                )));
            }
            _ => {}
        }

        let mut seen = FxHashSet::default();
        for &qubit in &self.qubits {
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: gate_name(),
                });
            }
        }
        let mut seen = FxHashSet::default();
        for &clbit in &self.clbits {
            if !seen.insert(clbit) {
                return Err(IrError::DuplicateClbit {
                    clbit,
                    gate_name: gate_name(),
                });
            }
        }
        Ok(())
    }
}
