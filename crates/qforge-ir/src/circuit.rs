//! Fluent circuit builder.

use crate::dag::CircuitDag;
use crate::description::CircuitDescription;
use crate::error::IrResult;
use crate::gate::{ClassicalCondition, Gate, StandardGate};
use crate::instruction::Instruction;
use crate::qubit::{ClbitId, QubitId};

/// A named circuit under construction.
///
/// Thin builder over [`CircuitDag`]: every method appends one operation and
/// returns `&mut Self` so calls chain with `?`.
#[derive(Debug, Clone)]
pub struct Circuit {
    name: String,
    dag: CircuitDag,
}

macro_rules! fixed_1q {
    ($($(#[$doc:meta])* $method:ident => $gate:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $method(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
                self.push(Instruction::single_qubit_gate(StandardGate::$gate, qubit))
            }
        )*
    };
}

macro_rules! rotation_1q {
    ($($(#[$doc:meta])* $method:ident => $gate:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $method(&mut self, angle: f64, qubit: QubitId) -> IrResult<&mut Self> {
                self.push(Instruction::single_qubit_gate(StandardGate::$gate(angle), qubit))
            }
        )*
    };
}

macro_rules! fixed_2q {
    ($($(#[$doc:meta])* $method:ident => $gate:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $method(&mut self, a: QubitId, b: QubitId) -> IrResult<&mut Self> {
                self.push(Instruction::two_qubit_gate(StandardGate::$gate, a, b))
            }
        )*
    };
}

macro_rules! rotation_2q {
    ($($(#[$doc:meta])* $method:ident => $gate:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $method(&mut self, angle: f64, a: QubitId, b: QubitId) -> IrResult<&mut Self> {
                self.push(Instruction::two_qubit_gate(StandardGate::$gate(angle), a, b))
            }
        )*
    };
}

impl Circuit {
    /// Create a circuit with qubits `0..num_qubits` and clbits `0..num_clbits`.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            name: name.into(),
            dag: CircuitDag::with_size(num_qubits, num_clbits),
        }
    }

    fn push(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        self.dag.apply(instruction)?;
        Ok(self)
    }

    fixed_1q! {
        /// Apply Hadamard gate.
        h => H;
        /// Apply Pauli-X gate.
        x => X;
        /// Apply Pauli-Y gate.
        y => Y;
        /// Apply Pauli-Z gate.
        z => Z;
        /// Apply S gate.
        s => S;
        /// Apply S-dagger gate.
        sdg => Sdg;
        /// Apply T gate.
        t => T;
        /// Apply T-dagger gate.
        tdg => Tdg;
        /// Apply sqrt(X) gate.
        sx => SX;
        /// Apply sqrt(X)-dagger gate.
        sxdg => SXdg;
    }

    rotation_1q! {
        /// Apply RX rotation.
        rx => Rx;
        /// Apply RY rotation.
        ry => Ry;
        /// Apply RZ rotation.
        rz => Rz;
        /// Apply phase gate.
        p => P;
    }

    fixed_2q! {
        /// Apply CNOT gate (control first).
        cx => CX;
        /// Apply controlled-Y gate.
        cy => CY;
        /// Apply controlled-Z gate.
        cz => CZ;
        /// Apply SWAP gate.
        swap => Swap;
    }

    rotation_2q! {
        /// Apply controlled phase gate.
        cp => CP;
        /// Apply controlled RZ gate.
        crz => CRz;
        /// Apply XX rotation.
        rxx => RXX;
        /// Apply ZZ rotation.
        rzz => RZZ;
    }

    /// Apply U(θ, φ, λ).
    pub fn u(&mut self, theta: f64, phi: f64, lambda: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(
            StandardGate::U(theta, phi, lambda),
            qubit,
        ))
    }

    /// Apply PRX(θ, φ).
    pub fn prx(&mut self, theta: f64, phi: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(
            StandardGate::PRX(theta, phi),
            qubit,
        ))
    }

    /// Apply Toffoli gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::gate(StandardGate::CCX, [c1, c2, target]))
    }

    /// Apply Fredkin gate.
    pub fn cswap(&mut self, control: QubitId, t1: QubitId, t2: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::gate(StandardGate::CSwap, [control, t1, t2]))
    }

    /// Apply any gate.
    pub fn gate(
        &mut self,
        gate: impl Into<Gate>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.push(Instruction::gate(gate, qubits))
    }

    /// Apply a gate that only fires when `condition` holds.
    pub fn conditioned(
        &mut self,
        gate: StandardGate,
        qubits: impl IntoIterator<Item = QubitId>,
        condition: ClassicalCondition,
    ) -> IrResult<&mut Self> {
        self.push(Instruction::gate(
            Gate::standard(gate).with_condition(condition),
            qubits,
        ))
    }

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.push(Instruction::measure(qubit, clbit))
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::reset(qubit))
    }

    /// Apply a barrier to specified qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.push(Instruction::barrier(qubits))
    }

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.dag.num_qubits()
    }

    /// Get the circuit depth.
    pub fn depth(&self) -> usize {
        self.dag.depth()
    }

    /// Get a reference to the underlying DAG.
    pub fn dag(&self) -> &CircuitDag {
        &self.dag
    }

    /// Consume the circuit and return the DAG.
    pub fn into_dag(self) -> CircuitDag {
        self.dag
    }

    /// The external description of the circuit.
    pub fn to_description(&self) -> CircuitDescription {
        self.dag.to_description()
    }

    /// Create a Bell state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        circuit
            .h(QubitId(0))?
            .cx(QubitId(0), QubitId(1))?
            .measure(QubitId(0), ClbitId(0))?
            .measure(QubitId(1), ClbitId(1))?;
        Ok(circuit)
    }

    /// Create a GHZ preparation over `n` qubits (no measurement).
    pub fn ghz(n: u32) -> IrResult<Self> {
        let mut circuit = Self::with_size("ghz", n, 0);
        if n == 0 {
            return Ok(circuit);
        }
        circuit.h(QubitId(0))?;
        for i in 1..n {
            circuit.cx(QubitId(i - 1), QubitId(i))?;
        }
        Ok(circuit)
    }

    /// Create a QFT circuit (with the final bit-reversal swaps).
    pub fn qft(n: u32) -> IrResult<Self> {
        use std::f64::consts::PI;

        let mut circuit = Self::with_size("qft", n, 0);
        for i in 0..n {
            circuit.h(QubitId(i))?;
            for j in (i + 1)..n {
                let angle = PI / f64::from(1u32 << (j - i));
                circuit.cp(angle, QubitId(j), QubitId(i))?;
            }
        }
        for i in 0..n / 2 {
            circuit.swap(QubitId(i), QubitId(n - 1 - i))?;
        }
        Ok(circuit)
    }
}
