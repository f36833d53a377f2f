//! Error types for the IR crate.

use crate::dag::{NodeIndex, WireId};
use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit not found in circuit.
    #[error("Qubit {qubit} not found in circuit{}", format_gate_context(.gate_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit not found in circuit.
    #[error("Classical bit {clbit} not found in circuit{}", format_gate_context(.gate_name))]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Gate requires different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Gate was given the wrong number of angle parameters.
    #[error("Gate '{gate_name}' takes {expected} parameters, got {got}")]
    ParamCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of parameters.
        expected: usize,
        /// Actual number of parameters provided.
        got: usize,
    },

    /// A rotation angle is NaN or infinite.
    #[error("Gate '{gate_name}' has a non-finite parameter")]
    NonFiniteParameter {
        /// Name of the gate.
        gate_name: String,
    },

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Duplicate classical bit in operation.
    #[error("Duplicate classical bit {clbit} in operation{}", format_gate_context(.gate_name))]
    DuplicateClbit {
        /// The duplicate classical bit.
        clbit: ClbitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Node index does not refer to a live operation.
    #[error("Invalid node index {0:?}")]
    InvalidNode(NodeIndex),

    /// An insertion anchor does not lie on the wire it was given for.
    #[error("Node {node:?} is not on wire {wire}")]
    AnchorNotOnWire {
        /// The anchor node.
        node: NodeIndex,
        /// The wire it was expected on.
        wire: WireId,
    },

    /// A replacement sequence touches a wire the replaced node does not.
    #[error("Replacement for node {node:?} touches foreign wire {wire}")]
    ForeignWire {
        /// The node being replaced.
        node: NodeIndex,
        /// The wire outside the node's wires.
        wire: WireId,
    },

    /// A qubit relabeling is not a bijection on the circuit's wires.
    #[error("Invalid qubit relabeling: {0}")]
    InvalidRelabel(String),

    /// Invalid DAG structure.
    #[error("Invalid DAG structure: {0}")]
    InvalidDag(String),
}

#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
