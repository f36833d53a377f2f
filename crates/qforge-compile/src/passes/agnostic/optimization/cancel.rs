//! Inverse-pair cancellation.

use tracing::debug;

use qforge_ir::CircuitDag;

use crate::error::CompileResult;
use crate::library::{RuleContext, RuleFamily};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

use super::rewrite_pairs;

/// Inverse cancellation pass.
///
/// Removes adjacent pairs on the same qubits that are exact mutual
/// inverses: `CX·CX`, `S·Sdg`, `Rz(a)·Rz(-a)`, `CZ(a,b)·CZ(b,a)` and so on.
/// A repeated gate only cancels when it is its own inverse, so `S·S` stays.
/// Two gates are adjacent only when nothing else sits between them on any
/// of their wires.
pub struct CancelInverses;

impl CancelInverses {
    /// Create a new inverse cancellation pass.
    pub fn new() -> Self {
        Self
    }
}

impl Default for CancelInverses {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for CancelInverses {
    fn name(&self) -> &'static str {
        "cancel_inverses"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<bool> {
        let library = properties.library.clone();
        let cancelled = rewrite_pairs(dag, &library, RuleFamily::Inverse, &RuleContext::default())?;
        if cancelled > 0 {
            debug!(pairs = cancelled, "Cancelled inverse pairs");
        }
        Ok(cancelled > 0)
    }
}
