//! Equivalence library: the rewrite rules every pass draws from.
//!
//! A rule pairs a [`Pattern`] over one instruction, two adjacent
//! instructions or a run of single-qubit instructions with a replacement
//! function. Rules are pure: they see only the instructions they are given,
//! never their position in the circuit.
//!
//! The library is built once and shared through an [`Arc`]:
//!
//! ```
//! use qforge_compile::library::{EquivalenceLibrary, RuleContext};
//! use qforge_ir::{Instruction, QubitId, StandardGate};
//!
//! let library = EquivalenceLibrary::shared();
//! let a = Instruction::single_qubit_gate(StandardGate::S, QubitId(0));
//! let b = Instruction::single_qubit_gate(StandardGate::Sdg, QubitId(0));
//!
//! let matches = library.lookup(&[&a, &b], &RuleContext::default());
//! assert!(matches.iter().any(|m| m.rule.name == "inverse_pair"));
//! ```

mod decompose;
mod rules;

use std::fmt;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;
use tracing::debug;

use qforge_ir::{Instruction, InstructionKind, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::property::BasisGates;

pub(crate) use rules::settle;

/// Longest decomposition chain [`EquivalenceLibrary::expand`] follows.
const MAX_EXPANSION_DEPTH: usize = 32;

/// Which instructions a pattern slot accepts.
#[derive(Debug, Clone, Copy)]
pub enum OpMatch {
    /// Any rewritable gate.
    Any,
    /// Any rewritable single-qubit gate.
    OneQubit,
    /// Gates with one of these names.
    Names(&'static [&'static str]),
}

impl OpMatch {
    fn accepts(self, inst: &Instruction) -> bool {
        match self {
            OpMatch::Any => true,
            OpMatch::OneQubit => inst.qubits.len() == 1,
            OpMatch::Names(names) => names.contains(&inst.name()),
        }
    }
}

/// Shape of the instruction sequence a rule rewrites.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    /// One instruction.
    Single(OpMatch),
    /// Two instructions adjacent on every shared wire, in circuit order.
    Pair(OpMatch, OpMatch),
    /// Two or more single-qubit instructions on one wire.
    Run,
}

impl Pattern {
    /// Whether the candidates have this shape.
    pub fn matches(&self, ops: &[&Instruction]) -> bool {
        match *self {
            Pattern::Single(m) => matches!(ops, [a] if m.accepts(a)),
            Pattern::Pair(m1, m2) => matches!(ops, [a, b] if m1.accepts(a) && m2.accepts(b)),
            Pattern::Run => {
                ops.len() >= 2
                    && ops
                        .iter()
                        .all(|op| op.qubits.len() == 1 && op.qubits[0] == ops[0].qubits[0])
            }
        }
    }
}

/// Under which condition a rule's rewrite is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Holds for every angle.
    AnyAngle,
    /// Holds only when the angles match exactly (within tolerance).
    ExactAngle,
    /// Holds because the operations share no qubit.
    DisjointQubits,
    /// Holds by an algebraic commutation relation.
    Commutation,
    /// Holds when an angle collapses to a special value.
    DegenerateAngle,
}

/// Rule families, each consumed by a different pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleFamily {
    /// Pair of exact mutual inverses.
    Inverse,
    /// Pair of same-axis rotations.
    Merge,
    /// Run of single-qubit gates into one `u`.
    Compose,
    /// Single gate whose angle is degenerate.
    Degenerate,
    /// Pair that may be reordered.
    Commutation,
    /// Single gate into a sequence of other operators.
    Decomposition,
}

/// Result of applying a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    /// Replace the matched instructions by this sequence (empty removes them).
    Replace(Vec<Instruction>),
    /// The two matched instructions may swap places.
    Commute,
}

impl Rewrite {
    fn is_finite(&self) -> bool {
        match self {
            Rewrite::Replace(seq) => seq.iter().all(|i| i.params().iter().all(|p| p.is_finite())),
            Rewrite::Commute => true,
        }
    }
}

/// Target context a rule may consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleContext<'a> {
    /// Native basis, if one is configured.
    pub basis: Option<&'a BasisGates>,
}

impl<'a> RuleContext<'a> {
    /// Context restricted to a basis.
    pub fn with_basis(basis: &'a BasisGates) -> Self {
        Self { basis: Some(basis) }
    }

    /// Whether an operator may be emitted; everything is allowed without a basis.
    pub fn allows(&self, name: &str) -> bool {
        self.basis.is_none_or(|b| b.contains(name))
    }
}

/// Replacement function of a rule.
pub type RuleFn = fn(&[&Instruction], &RuleContext<'_>) -> Option<Rewrite>;

/// A single rewrite rule.
#[derive(Clone)]
pub struct EquivalenceRule {
    /// Unique rule name.
    pub name: &'static str,
    /// Family the rule belongs to.
    pub family: RuleFamily,
    /// What it matches.
    pub pattern: Pattern,
    /// Why the rewrite is valid.
    pub validity: Validity,
    /// Operator names the replacement emits, with multiplicity.
    pub produces: &'static [&'static str],
    /// Replacement function; `None` when the candidates do not qualify.
    pub apply: RuleFn,
}

impl fmt::Debug for EquivalenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EquivalenceRule")
            .field("name", &self.name)
            .field("family", &self.family)
            .field("pattern", &self.pattern)
            .field("validity", &self.validity)
            .field("produces", &self.produces)
            .finish_non_exhaustive()
    }
}

/// An applicable rule and the rewrite it proposes.
#[derive(Debug, Clone)]
pub struct RuleMatch<'a> {
    /// The rule that matched.
    pub rule: &'a EquivalenceRule,
    /// What it would do.
    pub rewrite: Rewrite,
}

/// Operator costs used by basis planning.
pub trait CostModel: Send + Sync {
    /// Cost of one native operator.
    fn cost(&self, name: &str) -> u32;

    /// Whether a decomposition rule may be used at all.
    fn allows(&self, _rule: &EquivalenceRule) -> bool {
        true
    }
}

/// Counts gates, weighting by arity.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateCountCost;

impl CostModel for GateCountCost {
    fn cost(&self, name: &str) -> u32 {
        match StandardGate::arity_of(name) {
            Some(1) => 1,
            Some(3) => 30,
            _ => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PlanStep {
    cost: u32,
    depth: u32,
    rule: usize,
}

/// Chosen decomposition per non-native operator name.
#[derive(Debug, Clone, Default)]
pub struct BasisPlan {
    steps: FxHashMap<String, PlanStep>,
}

impl BasisPlan {
    /// Name of the rule chosen for an operator.
    pub fn rule_for<'a>(&self, library: &'a EquivalenceLibrary, name: &str) -> Option<&'a EquivalenceRule> {
        self.steps.get(name).map(|s| &library.rules[s.rule])
    }

    /// Total cost of expanding an operator.
    pub fn cost(&self, name: &str) -> Option<u32> {
        self.steps.get(name).map(|s| s.cost)
    }

    fn rule_index(&self, name: &str) -> Option<usize> {
        self.steps.get(name).map(|s| s.rule)
    }
}

/// The immutable rule set.
#[derive(Debug)]
pub struct EquivalenceLibrary {
    rules: Vec<EquivalenceRule>,
}

impl EquivalenceLibrary {
    /// Every built-in rule, in registration order.
    pub fn standard() -> Self {
        let mut rules = rules::rules();
        rules.extend(decompose::rules());
        debug!(rules = rules.len(), "Loaded equivalence library");
        Self { rules }
    }

    /// Process-wide shared instance of [`standard`](Self::standard).
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<EquivalenceLibrary>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::standard())))
    }

    /// Build a library from an explicit rule list.
    pub fn from_rules(rules: Vec<EquivalenceRule>) -> Self {
        Self { rules }
    }

    /// All rules.
    pub fn rules(&self) -> &[EquivalenceRule] {
        &self.rules
    }

    /// Rule by name.
    pub fn rule(&self, name: &str) -> Option<&EquivalenceRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Every rule that applies to the candidates, in registration order.
    ///
    /// Measurements, barriers, custom and conditioned gates match nothing.
    pub fn lookup(&self, candidates: &[&Instruction], ctx: &RuleContext<'_>) -> Vec<RuleMatch<'_>> {
        self.matching(candidates, ctx, |_| true)
    }

    /// [`lookup`](Self::lookup) restricted to one family.
    pub fn lookup_family(
        &self,
        family: RuleFamily,
        candidates: &[&Instruction],
        ctx: &RuleContext<'_>,
    ) -> Vec<RuleMatch<'_>> {
        self.matching(candidates, ctx, |r| r.family == family)
    }

    /// The first applicable rewrite of a family.
    pub fn first_rewrite(
        &self,
        family: RuleFamily,
        candidates: &[&Instruction],
        ctx: &RuleContext<'_>,
    ) -> Option<Rewrite> {
        self.lookup_family(family, candidates, ctx)
            .into_iter()
            .next()
            .map(|m| m.rewrite)
    }

    fn matching(
        &self,
        candidates: &[&Instruction],
        ctx: &RuleContext<'_>,
        keep: impl Fn(&EquivalenceRule) -> bool,
    ) -> Vec<RuleMatch<'_>> {
        if candidates.is_empty() || candidates.iter().any(|c| c.rewritable().is_none()) {
            return vec![];
        }
        self.rules
            .iter()
            .filter(|r| keep(r) && r.pattern.matches(candidates))
            .filter_map(|rule| {
                let rewrite = (rule.apply)(candidates, ctx)?;
                rewrite.is_finite().then_some(RuleMatch { rule, rewrite })
            })
            .collect()
    }

    /// Whether `a` followed by `b` may be reordered.
    pub fn commutes(&self, a: &Instruction, b: &Instruction) -> bool {
        !self
            .lookup_family(RuleFamily::Commutation, &[a, b], &RuleContext::default())
            .is_empty()
    }

    /// Cheapest decomposition of every operator in `names` into `basis`.
    ///
    /// Costs are relaxed over rule outputs until stable; ties go to the
    /// shallower derivation, then to the earlier rule. Names already in the
    /// basis need no plan. Fails on the first name no rule chain reaches.
    pub fn plan_basis<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
        basis: &BasisGates,
        cost: &dyn CostModel,
    ) -> CompileResult<BasisPlan> {
        let mut known: FxHashMap<&str, (u32, u32)> = basis
            .gates()
            .iter()
            .map(|g| (g.as_str(), (cost.cost(g), 0)))
            .collect();
        let mut steps: FxHashMap<String, PlanStep> = FxHashMap::default();

        let candidates: Vec<(usize, &EquivalenceRule)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.family == RuleFamily::Decomposition && cost.allows(r))
            .collect();

        loop {
            let mut changed = false;
            for &(index, rule) in &candidates {
                let Pattern::Single(OpMatch::Names(sources)) = rule.pattern else {
                    continue;
                };
                let mut total = 0u32;
                let mut depth = 0u32;
                let mut reachable = true;
                for product in rule.produces {
                    match known.get(product) {
                        Some(&(c, d)) => {
                            total = total.saturating_add(c);
                            depth = depth.max(d + 1);
                        }
                        None => {
                            reachable = false;
                            break;
                        }
                    }
                }
                if !reachable {
                    continue;
                }
                let depth = depth.max(1);
                for &source in sources {
                    if basis.contains(source) || rule.produces.contains(&source) {
                        continue;
                    }
                    let step = PlanStep {
                        cost: total,
                        depth,
                        rule: index,
                    };
                    let better = steps.get(source).is_none_or(|current| step < *current);
                    if better {
                        steps.insert(source.to_string(), step);
                        known.insert(source, (total, depth));
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        for name in names {
            if !basis.contains(name) && !steps.contains_key(name) {
                return Err(CompileError::DecompositionGap {
                    operator: name.to_string(),
                });
            }
        }
        Ok(BasisPlan { steps })
    }

    /// Rewrite an instruction into basis operators following a plan.
    ///
    /// A classical condition is stripped before decomposing and attached to
    /// every emitted instruction.
    pub fn expand(
        &self,
        inst: &Instruction,
        plan: &BasisPlan,
        basis: &BasisGates,
    ) -> CompileResult<Vec<Instruction>> {
        let mut out = Vec::new();
        self.expand_into(inst.clone(), plan, basis, 0, &mut out)?;
        Ok(out)
    }

    fn expand_into(
        &self,
        inst: Instruction,
        plan: &BasisPlan,
        basis: &BasisGates,
        depth: usize,
        out: &mut Vec<Instruction>,
    ) -> CompileResult<()> {
        if basis.contains(inst.name()) {
            out.push(inst);
            return Ok(());
        }
        let gap = || CompileError::DecompositionGap {
            operator: inst.name().to_string(),
        };
        let rule = plan
            .rule_index(inst.name())
            .filter(|_| depth < MAX_EXPANSION_DEPTH)
            .map(|i| &self.rules[i])
            .ok_or_else(gap)?;

        let mut bare = inst.clone();
        let mut condition = None;
        if let InstructionKind::Gate(gate) = &mut bare.kind {
            condition = gate.condition.take();
        }
        let Some(Rewrite::Replace(parts)) = (rule.apply)(&[&bare], &RuleContext::default()) else {
            return Err(gap());
        };
        for mut part in parts {
            if let (Some(cond), InstructionKind::Gate(gate)) = (&condition, &mut part.kind) {
                gate.condition = Some(cond.clone());
            }
            self.expand_into(part, plan, basis, depth + 1, out)?;
        }
        Ok(())
    }
}

impl Default for EquivalenceLibrary {
    fn default() -> Self {
        Self::standard()
    }
}
