//! Pass trait and types for compilation passes.

use qforge_ir::CircuitDag;

use crate::error::CompileResult;
use crate::property::PropertySet;

/// The kind of compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Reads the DAG, may write the `PropertySet`, never edits the circuit.
    Analysis,
    /// Rewrites the DAG in place.
    Transformation,
}

/// A compilation pass that operates on a circuit DAG.
///
/// Passes are the unit of compilation in qforge. Each one consumes a valid
/// DAG and leaves a valid DAG behind, implementing the same operator up to
/// global phase.
pub trait Pass: Send + Sync {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Get the kind of this pass.
    fn kind(&self) -> PassKind;

    /// Run the pass on the given DAG.
    ///
    /// Returns `true` when the circuit changed. Convergence groups repeat
    /// until every member returns `false` in the same sweep, so a pass must
    /// not report a change it did not make.
    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<bool>;

    /// Check if this pass should run based on current state.
    ///
    /// A skipped pass counts as unchanged.
    fn should_run(&self, _dag: &CircuitDag, _properties: &PropertySet) -> bool {
        true
    }
}
