//! Target-specific compilation passes.
//!
//! These passes require target hardware properties from the PropertySet
//! (coupling map, basis gates, layout) and produce hardware-compatible
//! circuits for specific quantum devices.

pub mod device;
pub mod layout;
pub mod routing;
pub mod translation;

pub use device::{DeviceFamily, DeviceOptimization, FamilyCost};
pub use layout::{InteractionLayout, TrivialLayout};
pub use routing::SwapRouting;
pub use translation::BasisTranslation;
