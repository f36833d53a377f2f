//! Error types for the compilation crate.

use thiserror::Error;

/// Errors that can occur during compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] qforge_ir::IrError),

    /// Malformed pipeline configuration or pass options.
    #[error("Invalid pipeline configuration: {0}")]
    Configuration(String),

    /// A pipeline entry names a pass the registry does not know.
    #[error("Unknown pass '{0}'")]
    UnknownPass(String),

    /// Coupling topology rejected before compilation.
    #[error("Invalid coupling topology: {0}")]
    InvalidTopology(String),

    /// Native basis rejected before compilation.
    #[error("Invalid basis: {0}")]
    InvalidBasis(String),

    /// Missing coupling map for routing.
    #[error("Missing coupling map for routing")]
    MissingCouplingMap,

    /// Missing basis gates.
    #[error("Missing basis gates for translation")]
    MissingBasisGates,

    /// Missing layout for routing.
    #[error("Missing layout for routing")]
    MissingLayout,

    /// Circuit too large for target.
    #[error("Circuit requires {required} qubits but target only has {available}")]
    CircuitTooLarge { required: usize, available: u32 },

    /// No rule sequence reaches the requested basis for an operator.
    #[error("No decomposition of '{operator}' into the target basis")]
    DecompositionGap { operator: String },

    /// Two physical qubits that must interact lie in different components.
    #[error("Routing failed: physical qubits {qubit1} and {qubit2} are not connected")]
    Unroutable { qubit1: u32, qubit2: u32 },

    /// Routing only handles one- and two-qubit operations.
    #[error("Cannot route '{operator}' on {num_qubits} qubits; decompose it first")]
    MultiQubitGate { operator: String, num_qubits: usize },

    /// An iterated pass group hit its cap without reaching a fixed point.
    #[error("Pass group '{group}' did not converge within {max_iterations} iterations")]
    NonConvergence { group: String, max_iterations: usize },

    /// Operator check after a pipeline stage failed.
    #[error("Verification failed: {0}")]
    VerificationFailed(String),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
