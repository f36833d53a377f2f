//! Layout passes for mapping logical qubits to physical qubits.

use rustc_hash::FxHashMap;
use tracing::debug;

use qforge_ir::{CircuitDag, QubitId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{CouplingMap, Layout, PropertySet};

/// Physical register size a circuit needs, checked against the topology.
fn check_fits(dag: &CircuitDag, coupling_map: &CouplingMap) -> CompileResult<()> {
    let required = dag
        .qubits()
        .map(|q| q.index() + 1)
        .max()
        .unwrap_or(0)
        .max(dag.num_qubits());
    if required > coupling_map.num_qubits() as usize {
        return Err(CompileError::CircuitTooLarge {
            required,
            available: coupling_map.num_qubits(),
        });
    }
    Ok(())
}

/// Identity placement of every qubit in the DAG.
pub(crate) fn trivial_layout(dag: &CircuitDag, coupling_map: &CouplingMap) -> CompileResult<Layout> {
    check_fits(dag, coupling_map)?;
    let mut layout = Layout::new();
    for qubit in dag.qubits() {
        layout.add(qubit, qubit.0);
    }
    Ok(layout)
}

/// Trivial layout pass.
///
/// Maps logical qubit i to physical qubit i.
/// This is the simplest layout strategy and works when the
/// circuit fits within the device and no optimization is needed.
pub struct TrivialLayout;

impl Pass for TrivialLayout {
    fn name(&self) -> &'static str {
        "trivial_layout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<bool> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        let layout = trivial_layout(dag, coupling_map)?;
        debug!(qubits = layout.len(), "Trivial layout");
        properties.layout = Some(layout);
        Ok(false)
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.layout.is_none() && properties.coupling_map.is_some()
    }
}

/// Two-qubit interaction counts, with the order pairs first appear in.
#[derive(Debug, Default)]
struct Interactions {
    counts: FxHashMap<(QubitId, QubitId), usize>,
    first_seen: Vec<(QubitId, QubitId)>,
}

impl Interactions {
    fn collect(dag: &CircuitDag) -> Self {
        let mut this = Self::default();
        for (_, inst) in dag.topological_ops() {
            if inst.is_barrier() {
                continue;
            }
            let &[a, b] = inst.qubits.as_slice() else {
                continue;
            };
            let key = (a.min(b), a.max(b));
            let count = this.counts.entry(key).or_insert(0);
            if *count == 0 {
                this.first_seen.push(key);
            }
            *count += 1;
        }
        this
    }

    /// Most frequent pair; ties go to the pair seen first.
    fn busiest(&self) -> Option<(QubitId, QubitId)> {
        let mut best: Option<((QubitId, QubitId), usize)> = None;
        for &pair in &self.first_seen {
            let count = self.counts.get(&pair).copied().unwrap_or(0);
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((pair, count));
            }
        }
        best.map(|(pair, _)| pair)
    }

    /// Logical qubits in order of their first interaction.
    fn qubit_order(&self) -> Vec<QubitId> {
        let mut order = Vec::new();
        for &(a, b) in &self.first_seen {
            for q in [a, b] {
                if !order.contains(&q) {
                    order.push(q);
                }
            }
        }
        order
    }

    fn partners(&self, qubit: QubitId) -> impl Iterator<Item = (QubitId, usize)> + '_ {
        self.counts.iter().filter_map(move |(&(a, b), &count)| {
            if a == qubit {
                Some((b, count))
            } else if b == qubit {
                Some((a, count))
            } else {
                None
            }
        })
    }
}

/// Interaction-aware layout pass.
///
/// Greedy placement driven by the circuit's two-qubit interactions:
///
/// 1. The most frequently interacting pair goes on the coupling edge whose
///    endpoints have the highest combined degree.
/// 2. The other interacting qubits follow in order of first interaction,
///    each on the free physical qubit with the smallest interaction-weighted
///    distance to its already placed partners.
/// 3. Qubits without two-qubit operations fill the lowest free indices.
///
/// All ties go to the lowest physical index.
pub struct InteractionLayout;

impl InteractionLayout {
    fn seed_edge(coupling_map: &CouplingMap) -> Option<(u32, u32)> {
        coupling_map
            .edges()
            .iter()
            .copied()
            .max_by_key(|&(a, b)| {
                let degree = coupling_map.degree(a) + coupling_map.degree(b);
                (degree, std::cmp::Reverse((a, b)))
            })
            .map(|(a, b)| {
                if coupling_map.degree(b) > coupling_map.degree(a) {
                    (b, a)
                } else {
                    (a, b)
                }
            })
    }

    fn place(
        interactions: &Interactions,
        layout: &Layout,
        qubit: QubitId,
        coupling_map: &CouplingMap,
    ) -> Option<u32> {
        let placed: Vec<(u32, usize)> = interactions
            .partners(qubit)
            .filter_map(|(partner, count)| layout.get_physical(partner).map(|p| (p, count)))
            .collect();
        (0..coupling_map.num_qubits())
            .filter(|&p| layout.get_logical(p).is_none())
            .min_by_key(|&p| {
                let cost: u64 = placed
                    .iter()
                    .map(|&(other, count)| {
                        let d = coupling_map.distance(p, other).map_or(u64::from(u32::MAX), u64::from);
                        d.saturating_mul(count as u64)
                    })
                    .fold(0u64, u64::saturating_add);
                (cost, p)
            })
    }

    fn build(dag: &CircuitDag, coupling_map: &CouplingMap) -> CompileResult<Layout> {
        check_fits(dag, coupling_map)?;
        let interactions = Interactions::collect(dag);
        let (Some((a, b)), Some((pa, pb))) = (interactions.busiest(), Self::seed_edge(coupling_map))
        else {
            return trivial_layout(dag, coupling_map);
        };

        let mut layout = Layout::new();
        layout.add(a, pa);
        layout.add(b, pb);

        for qubit in interactions.qubit_order() {
            if layout.get_physical(qubit).is_some() {
                continue;
            }
            let physical = Self::place(&interactions, &layout, qubit, coupling_map).ok_or(
                CompileError::CircuitTooLarge {
                    required: dag.num_qubits(),
                    available: coupling_map.num_qubits(),
                },
            )?;
            layout.add(qubit, physical);
        }

        let free: Vec<u32> = (0..coupling_map.num_qubits())
            .filter(|&p| layout.get_logical(p).is_none())
            .collect();
        let mut free = free.into_iter();
        let idle: Vec<QubitId> = dag
            .qubits()
            .filter(|&q| layout.get_physical(q).is_none())
            .collect();
        for qubit in idle {
            let physical = free.next().ok_or(CompileError::CircuitTooLarge {
                required: dag.num_qubits(),
                available: coupling_map.num_qubits(),
            })?;
            layout.add(qubit, physical);
        }
        Ok(layout)
    }
}

impl Pass for InteractionLayout {
    fn name(&self) -> &'static str {
        "interaction_layout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<bool> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        let layout = Self::build(dag, coupling_map)?;
        debug!(?layout, "Interaction layout");
        properties.layout = Some(layout);
        Ok(false)
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.layout.is_none() && properties.coupling_map.is_some()
    }
}
