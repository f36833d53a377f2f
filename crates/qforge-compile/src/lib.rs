//! qforge Compilation and Optimization Framework
//!
//! This crate rewrites a [`qforge_ir::CircuitDag`] in place into a smaller,
//! shallower circuit a target device can run, without changing the linear
//! operator the circuit implements (up to global phase). It implements a
//! pass-based architecture similar to LLVM, enabling modular and extensible
//! compilation.
//!
//! # Overview
//!
//! The compilation process transforms an input circuit through a series of
//! passes that:
//! 1. **Optimization**: Cancel, merge and fuse gates until nothing changes
//! 2. **Translation**: Decompose into the target's native gate set
//! 3. **Layout**: Map logical qubits to physical qubits on the device
//! 4. **Routing**: Insert SWAP gates to satisfy connectivity constraints
//! 5. **Cleanup**: Optimize again around what translation and routing added
//!
//! Every rewrite comes from the shared [`EquivalenceLibrary`].
//!
//! # Architecture
//!
//! ```text
//! CircuitDescription ──► CircuitDag
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │ PassManager │ ◄── PropertySet (basis, coupling map,
//!                     └─────────────┘      layout, Arc<EquivalenceLibrary>)
//!                            │
//!                            ├── Converge[CancelInverses, MergeRotations, Fuse1qGates, ...]
//!                            ├── BasisTranslation / DeviceOptimization
//!                            ├── TrivialLayout / InteractionLayout
//!                            ├── SwapRouting
//!                            └── Converge[...]
//!                            │
//!                            ▼
//!          CircuitDag + PipelineReport (metrics, per-pass records)
//! ```
//!
//! # Example: Basic Compilation
//!
//! ```rust
//! use qforge_compile::{BasisGates, CouplingMap, PassManagerBuilder};
//! use qforge_ir::Circuit;
//!
//! let circuit = Circuit::ghz(3).unwrap();
//!
//! // Build pass manager for an IQM-style target
//! let (pm, mut props) = PassManagerBuilder::new()
//!     .with_optimization_level(2)
//!     .with_target(CouplingMap::star(5), BasisGates::iqm())
//!     .build();
//!
//! let mut dag = circuit.into_dag();
//! let report = pm.run(&mut dag, &mut props).unwrap();
//!
//! assert!(report.metrics.gate_count_by_kind.keys().all(|k| k == "prx" || k == "cz"));
//! println!("Compiled depth: {}", report.metrics.depth);
//! ```
//!
//! # Optimization Levels
//!
//! | Level | Passes Included |
//! |-------|-----------------|
//! | 0 | Translation + layout + routing only |
//! | 1 | + inverse cancellation, rotation merging (iterated) |
//! | 2 | + single-qubit fusion |
//! | 3 | + commutative cancellation, interaction-aware layout |
//!
//! # Built-in Passes
//!
//! ## Optimization Passes
//! - [`passes::CancelInverses`]: Remove adjacent mutually inverse pairs
//! - [`passes::MergeRotations`]: Sum adjacent same-axis rotations
//! - [`passes::Fuse1qGates`]: Fuse single-qubit runs via ZYZ decomposition
//! - [`passes::CommutativeCancellation`]: Cancel or merge across commuting gates
//!
//! ## Target Passes
//! - [`passes::BasisTranslation`]: Cheapest rule chain into the basis
//! - [`passes::DeviceOptimization`]: Family-tuned translation (IBM, Heron, IQM,
//!   trapped ion, neutral atom)
//! - [`passes::TrivialLayout`], [`passes::InteractionLayout`]: Initial placement
//! - [`passes::SwapRouting`]: Shortest-path SWAP insertion
//!
//! ## Verification Passes
//! - [`passes::VerifyEquivalence`]: Dense operator check on small circuits
//! - [`passes::VerifyTarget`]: Basis closure and coupling adjacency
//!
//! # Custom Passes
//!
//! Implement the [`Pass`] trait to create custom compilation passes:
//!
//! ```rust
//! use qforge_compile::{CompileResult, Pass, PassKind, PropertySet};
//! use qforge_ir::CircuitDag;
//!
//! struct DropBarriers;
//!
//! impl Pass for DropBarriers {
//!     fn name(&self) -> &str { "drop_barriers" }
//!     fn kind(&self) -> PassKind { PassKind::Transformation }
//!
//!     fn run(&self, dag: &mut CircuitDag, _props: &mut PropertySet) -> CompileResult<bool> {
//!         let barriers: Vec<_> = dag
//!             .op_nodes()
//!             .filter(|(_, inst)| inst.is_barrier())
//!             .map(|(node, _)| node)
//!             .collect();
//!         for &node in &barriers {
//!             dag.remove_op(node)?;
//!         }
//!         Ok(!barriers.is_empty())
//!     }
//! }
//! ```

pub mod error;
pub mod library;
pub mod manager;
pub mod metrics;
pub mod pass;
pub mod property;
pub mod registry;
pub mod unitary;

// Built-in passes
pub mod passes;

pub use error::{CompileError, CompileResult};
pub use library::{CostModel, EquivalenceLibrary, EquivalenceRule, GateCountCost, RuleFamily};
pub use manager::{
    PassManager, PassManagerBuilder, PassRecord, PipelineReport, PipelineState, Stage,
};
pub use metrics::CircuitMetrics;
pub use pass::{Pass, PassKind};
pub use passes::{
    BasisTranslation, CancelInverses, CommutativeCancellation, DeviceFamily, DeviceOptimization,
    Fuse1qGates, InteractionLayout, MergeRotations, SwapRouting, TrivialLayout, VerifyEquivalence,
    VerifyTarget,
};
pub use property::{BasisGates, CouplingMap, Layout, PropertySet, Target};
pub use registry::{PassConfig, PassRegistry, PipelineConfig, StageConfig, compile};
