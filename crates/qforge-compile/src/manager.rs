//! Pass manager for orchestrating compilation.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use qforge_ir::CircuitDag;

use crate::error::{CompileError, CompileResult};
use crate::metrics::CircuitMetrics;
use crate::pass::Pass;
use crate::passes::{
    BasisTranslation, CancelInverses, CommutativeCancellation, DeviceFamily, DeviceOptimization,
    Fuse1qGates, InteractionLayout, MergeRotations, SwapRouting, TrivialLayout, VerifyEquivalence,
    VerifyTarget,
};
use crate::property::{BasisGates, CouplingMap, PropertySet, Target};

/// Default iteration cap of the preset convergence groups.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// One step of a pipeline.
pub enum Stage {
    /// Run a pass once.
    Pass(Box<dyn Pass>),
    /// Sweep the passes in order until a full sweep changes nothing.
    Converge {
        /// Group name, used in logs and errors.
        name: String,
        /// Member passes, run in order on every sweep.
        passes: Vec<Box<dyn Pass>>,
        /// Sweeps allowed before giving up.
        max_iterations: usize,
    },
}

impl Stage {
    /// Name of the pass or group.
    pub fn name(&self) -> &str {
        match self {
            Self::Pass(pass) => pass.name(),
            Self::Converge { name, .. } => name,
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(pass) => f.debug_tuple("Pass").field(&pass.name()).finish(),
            Self::Converge {
                name,
                passes,
                max_iterations,
            } => f
                .debug_struct("Converge")
                .field("name", name)
                .field("passes", &passes.iter().map(|p| p.name()).collect::<Vec<_>>())
                .field("max_iterations", max_iterations)
                .finish(),
        }
    }
}

/// Where a pipeline run is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    /// Not started.
    Idle,
    /// Running stage `index` of `of`.
    Running {
        /// Pass or group name.
        pass: String,
        /// Zero-based stage index.
        index: usize,
        /// Number of stages.
        of: usize,
    },
    /// Sweeping a convergence group.
    Converging {
        /// Group name.
        group: String,
        /// One-based sweep number.
        iteration: usize,
    },
    /// Every stage finished.
    Done,
    /// A stage returned an error.
    Failed {
        /// The error, rendered.
        reason: String,
    },
}

/// Outcome of one pass execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassRecord {
    /// Pass name.
    pub pass: String,
    /// Whether the pass reported a change.
    pub changed: bool,
    /// Whether `should_run` declined the pass.
    pub skipped: bool,
    /// Operation count after the pass.
    pub ops_after: usize,
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Metrics of the DAG as the run left it.
    pub metrics: CircuitMetrics,
    /// Every pass execution, in order.
    pub records: Vec<PassRecord>,
    /// Sweeps performed per convergence group.
    pub iterations: BTreeMap<String, usize>,
    /// Final state.
    pub state: PipelineState,
}

impl PipelineReport {
    /// Whether any pass changed the circuit.
    pub fn changed(&self) -> bool {
        self.records.iter().any(|r| r.changed)
    }
}

/// Manages and executes a sequence of compilation stages.
#[derive(Debug, Default)]
pub struct PassManager {
    stages: Vec<Stage>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { stages: vec![] }
    }

    /// Add a pass that runs once.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.stages.push(Stage::Pass(Box::new(pass)));
    }

    /// Add a boxed pass that runs once.
    pub fn add_boxed(&mut self, pass: Box<dyn Pass>) {
        self.stages.push(Stage::Pass(pass));
    }

    /// Add a convergence group.
    ///
    /// Fails on an empty group or a zero iteration cap.
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        passes: Vec<Box<dyn Pass>>,
        max_iterations: usize,
    ) -> CompileResult<()> {
        let name = name.into();
        if passes.is_empty() {
            return Err(CompileError::Configuration(format!(
                "group '{name}' has no passes"
            )));
        }
        if max_iterations == 0 {
            return Err(CompileError::Configuration(format!(
                "group '{name}' needs an iteration cap of at least 1"
            )));
        }
        self.stages.push(Stage::Converge {
            name,
            passes,
            max_iterations,
        });
        Ok(())
    }

    /// The configured stages.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Get the number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if the manager has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage on the DAG.
    ///
    /// On error the DAG is left as the failing stage left it.
    #[instrument(skip_all, fields(stages = self.stages.len()))]
    pub fn run(
        &self,
        dag: &mut CircuitDag,
        properties: &mut PropertySet,
    ) -> CompileResult<PipelineReport> {
        match self.run_partial(dag, properties) {
            (report, None) => Ok(report),
            (_, Some(err)) => Err(err),
        }
    }

    /// Run every stage, returning the report even when a stage fails.
    ///
    /// This is how a caller inspects (and possibly accepts) the circuit a
    /// [`CompileError::NonConvergence`] left behind.
    pub fn run_partial(
        &self,
        dag: &mut CircuitDag,
        properties: &mut PropertySet,
    ) -> (PipelineReport, Option<CompileError>) {
        info!(
            "Running pass manager with {} stages on circuit with {} qubits",
            self.stages.len(),
            dag.num_qubits()
        );
        let mut run = Run {
            state: PipelineState::Idle,
            records: Vec::new(),
            iterations: BTreeMap::new(),
        };

        let mut failure = None;
        for (index, stage) in self.stages.iter().enumerate() {
            run.transition(PipelineState::Running {
                pass: stage.name().to_string(),
                index,
                of: self.stages.len(),
            });
            let result = match stage {
                Stage::Pass(pass) => run.execute(pass.as_ref(), dag, properties).map(|_| ()),
                Stage::Converge {
                    name,
                    passes,
                    max_iterations,
                } => run.converge(name, passes, *max_iterations, dag, properties),
            };
            if let Err(err) = result {
                warn!(stage = stage.name(), error = %err, "Stage failed");
                run.transition(PipelineState::Failed {
                    reason: err.to_string(),
                });
                failure = Some(err);
                break;
            }
        }
        if failure.is_none() {
            run.transition(PipelineState::Done);
        }

        let metrics = CircuitMetrics::from_dag(dag);
        info!(
            "Pass manager completed, final depth: {}, ops: {}",
            metrics.depth, metrics.size
        );
        let report = PipelineReport {
            metrics,
            records: run.records,
            iterations: run.iterations,
            state: run.state,
        };
        (report, failure)
    }
}

/// Mutable bookkeeping of one run.
struct Run {
    state: PipelineState,
    records: Vec<PassRecord>,
    iterations: BTreeMap<String, usize>,
}

impl Run {
    fn transition(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "Pipeline state");
        self.state = next;
    }

    fn execute(
        &mut self,
        pass: &dyn Pass,
        dag: &mut CircuitDag,
        properties: &mut PropertySet,
    ) -> CompileResult<bool> {
        if !pass.should_run(dag, properties) {
            debug!("Skipping pass: {}", pass.name());
            self.records.push(PassRecord {
                pass: pass.name().to_string(),
                changed: false,
                skipped: true,
                ops_after: dag.num_ops(),
            });
            return Ok(false);
        }
        debug!("Running pass: {}", pass.name());
        let changed = pass.run(dag, properties)?;
        debug!(changed, "Pass {} completed, ops: {}", pass.name(), dag.num_ops());
        self.records.push(PassRecord {
            pass: pass.name().to_string(),
            changed,
            skipped: false,
            ops_after: dag.num_ops(),
        });
        Ok(changed)
    }

    fn converge(
        &mut self,
        group: &str,
        passes: &[Box<dyn Pass>],
        max_iterations: usize,
        dag: &mut CircuitDag,
        properties: &mut PropertySet,
    ) -> CompileResult<()> {
        for iteration in 1..=max_iterations {
            self.transition(PipelineState::Converging {
                group: group.to_string(),
                iteration,
            });
            self.iterations.insert(group.to_string(), iteration);
            let mut changed = false;
            for pass in passes {
                changed |= self.execute(pass.as_ref(), dag, properties)?;
            }
            if !changed {
                debug!(group, iteration, "Converged");
                return Ok(());
            }
        }
        Err(CompileError::NonConvergence {
            group: group.to_string(),
            max_iterations,
        })
    }
}

/// Builder for creating pass managers with preset configurations.
///
/// Stage order: an optimization group, translation into the basis (or the
/// device-family pass), layout and routing, then a second optimization
/// group that cleans up after routing. Stages whose inputs are missing
/// (no basis, no coupling map) are left out.
pub struct PassManagerBuilder {
    /// Optimization level (0-3).
    optimization_level: u8,
    /// Target properties.
    properties: PropertySet,
    family: Option<DeviceFamily>,
    verify: bool,
    max_iterations: usize,
}

impl PassManagerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            optimization_level: 1,
            properties: PropertySet::new(),
            family: None,
            verify: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set the optimization level.
    ///
    /// - Level 0: No optimization, only required transformations
    /// - Level 1: Inverse cancellation and rotation merging (default)
    /// - Level 2: + single-qubit fusion
    /// - Level 3: + commutative cancellation and interaction-aware layout
    #[must_use]
    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level.min(3);
        self
    }

    /// Set the target properties.
    #[must_use]
    pub fn with_properties(mut self, properties: PropertySet) -> Self {
        self.properties = properties;
        self
    }

    /// Set the target coupling map and basis gates.
    #[must_use]
    pub fn with_target(mut self, coupling_map: CouplingMap, basis_gates: BasisGates) -> Self {
        self.properties.coupling_map = Some(coupling_map);
        self.properties.basis_gates = Some(basis_gates);
        self
    }

    /// Use a validated [`Target`].
    #[must_use]
    pub fn with_device(mut self, target: &Target) -> Self {
        self.properties.coupling_map.clone_from(&target.coupling);
        self.properties.basis_gates = Some(target.basis.clone());
        self
    }

    /// Translate with a device family's rules and costs.
    ///
    /// The family's basis is used unless a basis is already set.
    #[must_use]
    pub fn with_device_family(mut self, family: DeviceFamily) -> Self {
        self.family = Some(family);
        self
    }

    /// Check operator equivalence and target constraints at the end.
    #[must_use]
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Iteration cap for the optimization groups.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    fn optimization_group(&self) -> Vec<Box<dyn Pass>> {
        let mut passes: Vec<Box<dyn Pass>> = vec![Box::new(CancelInverses), Box::new(MergeRotations)];
        if self.optimization_level >= 2 {
            passes.push(Box::new(Fuse1qGates));
        }
        if self.optimization_level >= 3 {
            passes.push(Box::new(CommutativeCancellation));
        }
        passes
    }

    /// Build the pass manager and return it with the properties.
    pub fn build(self) -> (PassManager, PropertySet) {
        let mut pm = PassManager::new();
        let optimize = self.optimization_level >= 1;
        let groups = optimize.then(|| (self.optimization_group(), self.optimization_group()));
        let mut properties = self.properties;

        if self.verify {
            pm.add_pass(VerifyEquivalence::new());
        }

        let (pre, post) = groups.unzip();
        if let Some(passes) = pre {
            pm.stages.push(Stage::Converge {
                name: "optimize".into(),
                passes,
                max_iterations: self.max_iterations,
            });
        }

        if let Some(family) = self.family {
            if properties.basis_gates.is_none() {
                properties.basis_gates = Some(family.basis());
            }
            pm.add_pass(DeviceOptimization::new(family));
        } else if properties.basis_gates.is_some() {
            pm.add_pass(BasisTranslation::new());
        }

        if properties.coupling_map.is_some() {
            if self.optimization_level >= 3 {
                pm.add_pass(InteractionLayout);
            } else {
                pm.add_pass(TrivialLayout);
            }
            pm.add_pass(SwapRouting);
        }

        if let Some(passes) = post {
            pm.stages.push(Stage::Converge {
                name: "post_routing".into(),
                passes,
                max_iterations: self.max_iterations,
            });
        }

        if self.verify {
            pm.add_pass(VerifyEquivalence::new());
            pm.add_pass(VerifyTarget);
        }

        (pm, properties)
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
