//! Pass registry and serde-driven pipeline configuration.
//!
//! A [`PipelineConfig`] names passes instead of constructing them, so a
//! pipeline can be stored as JSON:
//!
//! ```json
//! {
//!   "stages": [
//!     { "group": "optimize", "max_iterations": 8,
//!       "passes": [{ "pass": "cancel_inverses" }, { "pass": "merge_rotations" }] },
//!     { "pass": "device_optimization", "options": { "family": "iqm" } },
//!     { "pass": "trivial_layout" },
//!     { "pass": "swap_routing" }
//!   ]
//! }
//! ```
//!
//! [`PipelineConfig::build`] resolves every name and parses every option
//! block before returning a manager, so a bad config never touches a
//! circuit.

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use qforge_ir::{CircuitDag, CircuitDescription};

use crate::error::{CompileError, CompileResult};
use crate::manager::PassManager;
use crate::metrics::CircuitMetrics;
use crate::pass::Pass;
use crate::passes::{
    BasisTranslation, CancelInverses, CommutativeCancellation, DeviceFamily, DeviceOptimization,
    Fuse1qGates, InteractionLayout, MergeRotations, SwapRouting, TrivialLayout, VerifyEquivalence,
    VerifyTarget,
};
use crate::property::Target;

/// Builds a pass from its option block.
pub type PassConstructor = fn(&Value) -> CompileResult<Box<dyn Pass>>;

/// Options of passes that take none.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoOptions {}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct VerifyOptions {
    tolerance: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceOptions {
    family: DeviceFamily,
}

fn parse<T: DeserializeOwned>(pass: &str, options: &Value) -> CompileResult<T> {
    let options = if options.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        options.clone()
    };
    serde_json::from_value(options)
        .map_err(|e| CompileError::Configuration(format!("invalid options for '{pass}': {e}")))
}

macro_rules! plain {
    ($name:literal, $pass:expr) => {
        (
            $name,
            (|options: &Value| {
                parse::<NoOptions>($name, options)?;
                Ok(Box::new($pass) as Box<dyn Pass>)
            }) as PassConstructor,
        )
    };
}

/// Name-to-constructor table of known passes.
pub struct PassRegistry {
    constructors: FxHashMap<&'static str, PassConstructor>,
}

impl PassRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            constructors: FxHashMap::default(),
        }
    }

    /// Every built-in pass.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let table: [(&'static str, PassConstructor); 11] = [
            plain!("cancel_inverses", CancelInverses),
            plain!("merge_rotations", MergeRotations),
            plain!("fuse_1q", Fuse1qGates),
            plain!("commutative_cancellation", CommutativeCancellation),
            plain!("basis_translation", BasisTranslation::new()),
            plain!("trivial_layout", TrivialLayout),
            plain!("interaction_layout", InteractionLayout),
            plain!("swap_routing", SwapRouting),
            plain!("verify_target", VerifyTarget),
            ("verify_equivalence", |options: &Value| {
                let opts: VerifyOptions = parse("verify_equivalence", options)?;
                let mut pass = VerifyEquivalence::new();
                if let Some(tolerance) = opts.tolerance {
                    pass = pass.with_tolerance(tolerance);
                }
                Ok(Box::new(pass) as Box<dyn Pass>)
            }),
            ("device_optimization", |options: &Value| {
                let opts: DeviceOptions = parse("device_optimization", options)?;
                Ok(Box::new(DeviceOptimization::new(opts.family)) as Box<dyn Pass>)
            }),
        ];
        for (name, constructor) in table {
            registry.register(name, constructor);
        }
        registry
    }

    /// Register a pass constructor, replacing any previous one.
    pub fn register(&mut self, name: &'static str, constructor: PassConstructor) {
        self.constructors.insert(name, constructor);
    }

    /// Construct a pass by name.
    pub fn create(&self, name: &str, options: &Value) -> CompileResult<Box<dyn Pass>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| CompileError::UnknownPass(name.to_string()))?;
        constructor(options)
    }

    /// Check if a pass exists.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.constructors.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A pass and its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PassConfig {
    /// Registered pass name.
    pub pass: String,
    /// Pass-specific options; absent means defaults.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl PassConfig {
    /// A pass with default options.
    pub fn named(pass: impl Into<String>) -> Self {
        Self {
            pass: pass.into(),
            options: Value::Null,
        }
    }
}

/// A convergence group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    /// Group name.
    pub group: String,
    /// Sweeps allowed before [`CompileError::NonConvergence`].
    pub max_iterations: usize,
    /// Member passes, in order.
    pub passes: Vec<PassConfig>,
}

/// One entry of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageConfig {
    /// Run once.
    Pass(PassConfig),
    /// Iterate to a fixed point.
    Group(GroupConfig),
}

/// Ordered pipeline description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Stages, in execution order.
    pub stages: Vec<StageConfig>,
}

impl PipelineConfig {
    /// Parse from JSON.
    pub fn from_json(json: &str) -> CompileResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CompileError::Configuration(format!("invalid pipeline config: {e}")))
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> CompileResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CompileError::Configuration(e.to_string()))
    }

    /// Append a single pass.
    #[must_use]
    pub fn with_pass(mut self, pass: PassConfig) -> Self {
        self.stages.push(StageConfig::Pass(pass));
        self
    }

    /// Append a convergence group.
    #[must_use]
    pub fn with_group(
        mut self,
        group: impl Into<String>,
        max_iterations: usize,
        passes: Vec<PassConfig>,
    ) -> Self {
        self.stages.push(StageConfig::Group(GroupConfig {
            group: group.into(),
            max_iterations,
            passes,
        }));
        self
    }

    /// Resolve every stage into a manager.
    ///
    /// Fails on an unknown pass, malformed options, an empty group or a
    /// zero iteration cap.
    pub fn build(&self, registry: &PassRegistry) -> CompileResult<PassManager> {
        let mut pm = PassManager::new();
        for stage in &self.stages {
            match stage {
                StageConfig::Pass(p) => pm.add_boxed(registry.create(&p.pass, &p.options)?),
                StageConfig::Group(g) => {
                    let passes = g
                        .passes
                        .iter()
                        .map(|p| registry.create(&p.pass, &p.options))
                        .collect::<CompileResult<Vec<_>>>()?;
                    pm.add_group(g.group.clone(), passes, g.max_iterations)?;
                }
            }
        }
        debug!(stages = pm.len(), "Pipeline built");
        Ok(pm)
    }
}

/// Compile a circuit description for a target.
///
/// The target and the pipeline are validated before the circuit is built.
pub fn compile(
    desc: &CircuitDescription,
    target: &Target,
    config: &PipelineConfig,
) -> CompileResult<(CircuitDescription, CircuitMetrics)> {
    target.validate()?;
    let pm = config.build(&PassRegistry::builtin())?;
    let mut dag = CircuitDag::from_description(desc)?;
    let mut properties = target.properties();

    let report = pm.run(&mut dag, &mut properties)?;
    info!(
        size = report.metrics.size,
        depth = report.metrics.depth,
        "Compiled circuit"
    );
    Ok((dag.to_description(), report.metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{BasisGates, CouplingMap};
    use qforge_ir::{Circuit, QubitId};

    #[test]
    fn test_registry_basic() {
        let registry = PassRegistry::builtin();
        assert!(registry.contains("swap_routing"));
        let pass = registry.create("fuse_1q", &Value::Null).unwrap();
        assert_eq!(pass.name(), "fuse_1q");

        let result = registry.create("nonexistent", &Value::Null);
        assert!(matches!(result, Err(CompileError::UnknownPass(name)) if name == "nonexistent"));
    }

    #[test]
    fn test_registry_names_match_passes() {
        let registry = PassRegistry::builtin();
        for name in registry.names() {
            let options = if name == "device_optimization" {
                serde_json::json!({ "family": "ibm" })
            } else {
                Value::Null
            };
            assert_eq!(registry.create(name, &options).unwrap().name(), name);
        }
    }

    #[test]
    fn test_options_are_checked() {
        let registry = PassRegistry::builtin();
        assert!(registry.create("device_optimization", &Value::Null).is_err());
        assert!(
            registry
                .create("device_optimization", &serde_json::json!({ "family": "dwave" }))
                .is_err()
        );
        assert!(
            registry
                .create("cancel_inverses", &serde_json::json!({ "aggressive": true }))
                .is_err()
        );
        assert!(
            registry
                .create("verify_equivalence", &serde_json::json!({ "tolerance": 1e-6 }))
                .is_ok()
        );
    }

    #[test]
    fn test_config_from_json() {
        let config = PipelineConfig::from_json(
            r#"{
                "stages": [
                    { "group": "optimize", "max_iterations": 4,
                      "passes": [{ "pass": "cancel_inverses" }, { "pass": "merge_rotations" }] },
                    { "pass": "device_optimization", "options": { "family": "iqm" } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.stages.len(), 2);
        assert!(matches!(&config.stages[0], StageConfig::Group(g) if g.passes.len() == 2));

        let pm = config.build(&PassRegistry::builtin()).unwrap();
        assert_eq!(pm.len(), 2);
    }

    #[test]
    fn test_config_rejects_bad_entries() {
        let registry = PassRegistry::builtin();
        let zero = PipelineConfig::default().with_group("g", 0, vec![PassConfig::named("fuse_1q")]);
        assert!(matches!(zero.build(&registry), Err(CompileError::Configuration(_))));

        let unknown = PipelineConfig::default().with_pass(PassConfig::named("sabre"));
        assert!(matches!(unknown.build(&registry), Err(CompileError::UnknownPass(_))));

        assert!(PipelineConfig::from_json(r#"{ "stages": [{ "pas": "fuse_1q" }] }"#).is_err());
    }

    #[test]
    fn test_compile_end_to_end() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        circuit.t(QubitId(2)).unwrap();
        circuit.tdg(QubitId(2)).unwrap();

        let target = Target::new(BasisGates::iqm()).with_coupling(CouplingMap::linear(3));
        let config = PipelineConfig::default()
            .with_group(
                "optimize",
                5,
                vec![PassConfig::named("cancel_inverses"), PassConfig::named("merge_rotations")],
            )
            .with_pass(PassConfig::named("basis_translation"))
            .with_pass(PassConfig::named("trivial_layout"))
            .with_pass(PassConfig::named("swap_routing"))
            .with_pass(PassConfig::named("verify_target"));

        let (out, metrics) = compile(&circuit.to_description(), &target, &config).unwrap();
        assert_eq!(metrics.count("t"), 0);
        assert!(metrics.gate_count_by_kind.keys().all(|k| k == "prx" || k == "cz"));
        assert_eq!(out.num_qubits, 3);
    }

    #[test]
    fn test_compile_validates_target_first() {
        let circuit = Circuit::ghz(2).unwrap();
        let target = Target::new(BasisGates::new(["measure"]));
        let result = compile(&circuit.to_description(), &target, &PipelineConfig::default());
        assert!(matches!(result, Err(CompileError::InvalidBasis(_))));
    }
}
