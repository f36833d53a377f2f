//! Verification passes for ensuring compilation correctness.
//!
//! [`VerifyEquivalence`] snapshots the circuit the first time it runs and,
//! on every later run, checks that the current circuit still implements the
//! snapshot's operator up to global phase. [`VerifyTarget`] checks the
//! structural guarantees a compiled circuit owes its target.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use qforge_ir::{CircuitDag, QubitId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{Layout, PropertySet};
use crate::unitary::{MAX_OPERATOR_QUBITS, Operator};

/// Default matrix-entry tolerance for operator comparison.
pub const DEFAULT_TOLERANCE: f64 = 1e-8;

/// Snapshot stored in the property set by [`VerifyEquivalence`].
#[derive(Debug, Clone)]
pub struct ReferenceCircuit(pub CircuitDag);

/// Operator equivalence check.
///
/// The first run stores a copy of the DAG. Later runs rebuild both operators
/// and fail with [`CompileError::VerificationFailed`] when they differ by
/// more than a global phase. Once routing has run, the reference is placed
/// on the initial layout and the routed operator's outputs are moved from
/// the final layout back to the initial one before comparing.
///
/// Circuits wider than [`MAX_OPERATOR_QUBITS`], or holding measurements,
/// resets, custom or conditioned gates, are only checked for the number of
/// measurements and resets.
pub struct VerifyEquivalence {
    tolerance: f64,
}

impl VerifyEquivalence {
    /// Create a verification pass with the default tolerance.
    pub fn new() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Set the comparison tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn unitary_only(dag: &CircuitDag) -> bool {
        dag.op_nodes()
            .all(|(_, inst)| inst.is_barrier() || inst.rewritable().is_some())
    }

    fn directive_counts(dag: &CircuitDag) -> (usize, usize) {
        let counts = dag.count_ops();
        let get = |name: &str| counts.get(name).copied().unwrap_or(0);
        (get("measure"), get("reset"))
    }

    /// Reference circuit moved onto the physical wires routing started from.
    fn placed_reference(
        reference: &CircuitDag,
        initial: &Layout,
    ) -> CompileResult<CircuitDag> {
        let mut placed = reference.clone();
        for (logical, _) in initial.iter() {
            if !placed.has_qubit(logical) {
                placed.add_qubit(logical);
            }
        }
        let mapping: FxHashMap<QubitId, QubitId> = placed
            .qubits()
            .map(|q| {
                initial
                    .get_physical(q)
                    .map(|p| (q, QubitId(p)))
                    .ok_or(CompileError::MissingLayout)
            })
            .collect::<CompileResult<_>>()?;
        placed.relabel_qubits(&mapping)?;
        Ok(placed)
    }

    fn compare(&self, reference: &CircuitDag, dag: &CircuitDag, props: &PropertySet) -> CompileResult<()> {
        if Self::directive_counts(reference) != Self::directive_counts(dag) {
            return Err(CompileError::VerificationFailed(
                "measurements or resets were added or removed".into(),
            ));
        }
        let width = reference.num_qubits().max(dag.num_qubits());
        if width > MAX_OPERATOR_QUBITS || !Self::unitary_only(reference) || !Self::unitary_only(dag)
        {
            debug!(width, "Skipping operator comparison");
            return Ok(());
        }

        let (expected, actual) = match (&props.initial_layout, &props.layout) {
            (Some(initial), Some(last)) => {
                let placed = Self::placed_reference(reference, initial)?;
                let width = width.max(placed.num_qubits());
                let expected = Operator::from_dag_padded(&placed, width)?;
                let mut outputs: Vec<usize> = (0..width).collect();
                for (logical, from) in last.iter() {
                    let to = initial
                        .get_physical(logical)
                        .ok_or(CompileError::MissingLayout)?;
                    if let Some(slot) = outputs.get_mut(from as usize) {
                        *slot = to as usize;
                    }
                }
                let actual = Operator::from_dag_padded(dag, width)?.relabel_outputs(&outputs);
                (expected, actual)
            }
            _ => (
                Operator::from_dag_padded(reference, width)?,
                Operator::from_dag_padded(dag, width)?,
            ),
        };

        if expected.equiv_up_to_phase(&actual, self.tolerance) {
            debug!(qubits = width, "Operator preserved");
            Ok(())
        } else {
            warn!(qubits = width, "Operator mismatch");
            Err(CompileError::VerificationFailed(format!(
                "operator on {width} qubits differs from the reference beyond global phase"
            )))
        }
    }
}

impl Default for VerifyEquivalence {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for VerifyEquivalence {
    fn name(&self) -> &'static str {
        "verify_equivalence"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<bool> {
        match properties.get::<ReferenceCircuit>() {
            Some(ReferenceCircuit(reference)) => self.compare(reference, dag, properties)?,
            None => {
                debug!(ops = dag.num_ops(), "Storing reference circuit");
                properties.insert(ReferenceCircuit(dag.clone()));
            }
        }
        Ok(false)
    }
}

/// Structural target check.
///
/// Verifies DAG integrity, that every operation is in the basis (when one
/// is set) and, once routing has run, that every two-qubit operation sits
/// on a coupled pair and nothing wider than two qubits remains apart from
/// barriers.
pub struct VerifyTarget;

impl VerifyTarget {
    fn check_basis(dag: &CircuitDag, props: &PropertySet) -> CompileResult<()> {
        let Some(basis) = &props.basis_gates else {
            return Ok(());
        };
        for (name, _) in dag.count_ops() {
            if !basis.contains(&name) {
                return Err(CompileError::VerificationFailed(format!(
                    "operator '{name}' is not in the target basis"
                )));
            }
        }
        Ok(())
    }

    fn check_coupling(dag: &CircuitDag, props: &PropertySet) -> CompileResult<()> {
        let (Some(coupling), Some(_)) = (&props.coupling_map, &props.initial_layout) else {
            return Ok(());
        };
        for (_, inst) in dag.op_nodes() {
            if inst.is_barrier() {
                continue;
            }
            match inst.qubits.as_slice() {
                [a, b] if !coupling.is_connected(a.0, b.0) => {
                    return Err(CompileError::VerificationFailed(format!(
                        "'{}' on uncoupled qubits {} and {}",
                        inst.name(),
                        a.0,
                        b.0
                    )));
                }
                qubits if qubits.len() > 2 => {
                    return Err(CompileError::VerificationFailed(format!(
                        "'{}' acts on {} qubits",
                        inst.name(),
                        qubits.len()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl Pass for VerifyTarget {
    fn name(&self) -> &'static str {
        "verify_target"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<bool> {
        dag.verify_integrity()?;
        Self::check_basis(dag, properties)?;
        Self::check_coupling(dag, properties)?;
        debug!("Target constraints hold");
        Ok(false)
    }
}
