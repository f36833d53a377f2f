//! qforge circuit intermediate representation
//!
//! This crate provides the gate DAG every qforge pass rewrites in place.
//!
//! # Overview
//!
//! A circuit is an arena of nodes with two sentinels (`In`/`Out`) per wire.
//! Each node keeps a doubly linked position on every wire it touches, so a
//! wire is always one path from its input to its output, and splicing a
//! node in or out is local. Node indices are stable for the life of the
//! DAG.
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`]
//! - **Gates**: [`StandardGate`] for the built-in vocabulary and [`CustomGate`]
//!   for opaque named operations
//! - **Instructions**: [`Instruction`] combining gates with their operands
//! - **DAG**: [`CircuitDag`], the mutable graph
//! - **Description**: [`CircuitDescription`], the flat serde form circuits
//!   enter and leave in
//! - **Circuit**: [`Circuit`], a fluent builder
//!
//! # Example
//!
//! ```rust
//! use qforge_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell", 2, 0);
//! circuit.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
//!
//! let dag = circuit.into_dag();
//! assert_eq!(dag.num_ops(), 2);
//! assert_eq!(dag.depth(), 2);
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Parameters |
//! |------|--------|------------|
//! | `id`, `x`, `y`, `z`, `h` | 1 | – |
//! | `s`, `sdg`, `t`, `tdg`, `sx`, `sxdg` | 1 | – |
//! | `rx`, `ry`, `rz`, `p` | 1 | angle |
//! | `u` | 1 | θ, φ, λ |
//! | `prx` | 1 | θ, φ |
//! | `cx`, `cy`, `cz`, `swap` | 2 | – |
//! | `cp`, `crz`, `rxx`, `rzz` | 2 | angle |
//! | `ccx`, `cswap` | 3 | – |

pub mod circuit;
pub mod dag;
pub mod description;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod qubit;

pub use circuit::Circuit;
pub use dag::{CircuitDag, DagNode, NodeIndex, WireId, WireLink};
pub use description::{CircuitDescription, OperationSpec};
pub use error::{IrError, IrResult};
pub use gate::{ClassicalCondition, CustomGate, Gate, GateKind, STANDARD_GATE_SHAPES, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use qubit::{ClbitId, QubitId};
