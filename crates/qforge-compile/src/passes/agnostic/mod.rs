//! Target-agnostic compilation passes.
//!
//! These passes operate purely on the DAG structure and the equivalence
//! library. A configured basis only narrows which rewrites they pick, so
//! they are safe to run on any circuit regardless of the target hardware.

pub mod optimization;
pub mod verification;

pub use optimization::{CancelInverses, CommutativeCancellation, Fuse1qGates, MergeRotations};
pub use verification::{ReferenceCircuit, VerifyEquivalence, VerifyTarget};
