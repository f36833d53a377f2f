//! Built-in compilation passes.
//!
//! Passes are organized into two categories:
//! - [`agnostic`]: passes that only need the DAG and the equivalence library
//! - [`target`]: passes that require hardware properties

pub mod agnostic;
pub mod target;

pub use agnostic::{
    CancelInverses, CommutativeCancellation, Fuse1qGates, MergeRotations, VerifyEquivalence,
    VerifyTarget,
};
pub use target::{
    BasisTranslation, DeviceFamily, DeviceOptimization, InteractionLayout, SwapRouting,
    TrivialLayout,
};
