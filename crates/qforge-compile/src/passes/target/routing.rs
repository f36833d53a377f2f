//! Routing passes for inserting SWAP gates.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use qforge_ir::{CircuitDag, Instruction, NodeIndex, QubitId, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::library::{BasisPlan, GateCountCost};
use crate::pass::{Pass, PassKind};
use crate::property::{CouplingMap, Layout, PropertySet};

use super::layout::trivial_layout;

/// Number of upcoming operations scanned when breaking ties between hops.
pub const LOOKAHEAD: usize = 20;

/// SWAP-insertion routing pass.
///
/// Renames the circuit's wires to physical qubits through the current
/// layout (a trivial layout is created when none is set; unused physical
/// qubits become idle wires), then walks the operations in topological
/// order. Whenever a two-qubit operation lands on an uncoupled pair, its
/// first qubit is moved along a shortest path with SWAPs until the pair is
/// adjacent. Each SWAP is spliced in after the last routed operation on its
/// two wires, and the remainder of those wires is exchanged, so the DAG is
/// never rebuilt.
///
/// Among next hops that are equally close to the target, the one with the
/// fewest operations among the next [`LOOKAHEAD`] two-qubit operations
/// wins, then the lowest index.
///
/// When the basis has no `swap`, inserted SWAPs are expanded into it.
///
/// On return `layout` holds the final logical-to-physical mapping and
/// `initial_layout` the one routing started from.
pub struct SwapRouting;

struct Router<'a> {
    coupling: &'a CouplingMap,
    layout: Layout,
    /// Last routed node on each physical wire.
    frontier: Vec<NodeIndex>,
    inserted: Vec<NodeIndex>,
}

impl Router<'_> {
    fn check_operations(dag: &CircuitDag) -> CompileResult<()> {
        for (_, inst) in dag.op_nodes() {
            if !inst.is_barrier() && inst.qubits.len() > 2 {
                return Err(CompileError::MultiQubitGate {
                    operator: inst.name().to_string(),
                    num_qubits: inst.qubits.len(),
                });
            }
        }
        Ok(())
    }

    /// Give every physical qubit a wire and rename wires to physical ids.
    fn place(dag: &mut CircuitDag, layout: &mut Layout, coupling: &CouplingMap) -> CompileResult<bool> {
        let mut next_fresh = dag
            .qubits()
            .chain(layout.iter().map(|(l, _)| l))
            .map(|q| q.0 + 1)
            .max()
            .unwrap_or(0);
        let mut added = false;
        for physical in 0..coupling.num_qubits() {
            if layout.get_logical(physical).is_none() {
                let idle = QubitId(next_fresh);
                next_fresh += 1;
                layout.add(idle, physical);
                dag.add_qubit(idle);
                added = true;
            }
        }

        let mut mapping = FxHashMap::default();
        for qubit in dag.qubits() {
            let physical = layout
                .get_physical(qubit)
                .filter(|&p| p < coupling.num_qubits())
                .ok_or(CompileError::MissingLayout)?;
            mapping.insert(qubit, QubitId(physical));
        }
        // Layout entries for qubits the circuit lacks still need wires.
        for (logical, physical) in layout.iter() {
            if !mapping.contains_key(&logical) {
                dag.add_qubit(logical);
                mapping.insert(logical, QubitId(physical));
                added = true;
            }
        }
        let moved = mapping.iter().any(|(from, to)| from != to);
        dag.relabel_qubits(&mapping)?;
        Ok(added || moved)
    }

    /// Operations on `physical` among the next [`LOOKAHEAD`] two-qubit ops.
    fn pending(dag: &CircuitDag, upcoming: &[NodeIndex], physical: u32) -> usize {
        upcoming
            .iter()
            .filter_map(|&n| dag.instruction(n))
            .filter(|inst| inst.qubits.len() == 2 && !inst.is_barrier())
            .take(LOOKAHEAD)
            .filter(|inst| inst.qubits.iter().any(|q| q.0 == physical))
            .count()
    }

    fn next_hop(&self, dag: &CircuitDag, upcoming: &[NodeIndex], from: u32, to: u32) -> CompileResult<u32> {
        let unroutable = CompileError::Unroutable {
            qubit1: from,
            qubit2: to,
        };
        let Some(remaining) = self.coupling.distance(from, to) else {
            return Err(unroutable);
        };
        self.coupling
            .neighbors(from)
            .into_iter()
            .filter(|&n| self.coupling.distance(n, to) == Some(remaining - 1))
            .min_by_key(|&n| (Self::pending(dag, upcoming, n), n))
            .ok_or(unroutable)
    }

    fn swap(&mut self, dag: &mut CircuitDag, a: u32, b: u32) -> CompileResult<()> {
        let (qa, qb) = (QubitId(a), QubitId(b));
        let anchors = [self.frontier[a as usize], self.frontier[b as usize]];
        let node = dag.insert_after(
            Instruction::two_qubit_gate(StandardGate::Swap, qa, qb),
            &anchors,
        )?;
        dag.exchange_wire_suffixes(node, qa, qb)?;
        self.layout.swap(a, b);
        self.frontier[a as usize] = node;
        self.frontier[b as usize] = node;
        self.inserted.push(node);
        trace!(a, b, "Inserted SWAP");
        Ok(())
    }

    fn route(&mut self, dag: &mut CircuitDag) -> CompileResult<()> {
        let order: Vec<NodeIndex> = dag.topological_ops().map(|(n, _)| n).collect();
        for (position, &node) in order.iter().enumerate() {
            let upcoming = &order[position + 1..];
            loop {
                let Some(inst) = dag.instruction(node) else {
                    break;
                };
                let (a, b) = match inst.qubits.as_slice() {
                    &[a, b] if !inst.is_barrier() => (a.0, b.0),
                    _ => break,
                };
                if self.coupling.is_connected(a, b) {
                    break;
                }
                let hop = self.next_hop(dag, upcoming, a, b)?;
                self.swap(dag, a, hop)?;
            }
            if let Some(inst) = dag.instruction(node) {
                for q in &inst.qubits {
                    if let Some(slot) = self.frontier.get_mut(q.index()) {
                        *slot = node;
                    }
                }
            }
        }
        Ok(())
    }

    /// Rewrite inserted SWAPs into the basis.
    fn lower_swaps(&self, dag: &mut CircuitDag, props: &PropertySet, plan: &BasisPlan) -> CompileResult<()> {
        let Some(basis) = &props.basis_gates else {
            return Ok(());
        };
        for &node in &self.inserted {
            let Some(inst) = dag.instruction(node) else {
                continue;
            };
            let seq = props.library.expand(inst, plan, basis)?;
            dag.substitute_node(node, seq)?;
        }
        Ok(())
    }
}

impl Pass for SwapRouting {
    fn name(&self) -> &'static str {
        "swap_routing"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<bool> {
        if properties.initial_layout.is_some() {
            return Ok(false);
        }
        let coupling = properties
            .coupling_map
            .clone()
            .ok_or(CompileError::MissingCouplingMap)?;
        Router::check_operations(dag)?;

        // Plan SWAP lowering before touching the circuit.
        let plan = match &properties.basis_gates {
            Some(basis) if !basis.contains("swap") => {
                Some(properties.library.plan_basis(["swap"], basis, &GateCountCost)?)
            }
            _ => None,
        };

        let mut layout = match properties.layout.take() {
            Some(layout) => layout,
            None => trivial_layout(dag, &coupling)?,
        };
        let relabeled = Router::place(dag, &mut layout, &coupling)?;
        properties.initial_layout = Some(layout.clone());

        let mut frontier = Vec::with_capacity(coupling.num_qubits() as usize);
        for physical in 0..coupling.num_qubits() {
            frontier.push(
                dag.input_node(QubitId(physical))
                    .ok_or(CompileError::MissingLayout)?,
            );
        }
        let mut router = Router {
            coupling: &coupling,
            layout,
            frontier,
            inserted: Vec::new(),
        };
        router.route(dag)?;
        if let Some(plan) = &plan {
            router.lower_swaps(dag, properties, plan)?;
        }

        let swaps = router.inserted.len();
        debug!(swaps, ops = dag.num_ops(), "Routed");
        properties.layout = Some(router.layout);
        Ok(swaps > 0 || relabeled)
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.coupling_map.is_some() && properties.initial_layout.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::TrivialLayout;
    use crate::property::BasisGates;
    use qforge_ir::Circuit;

    fn assert_adjacent(dag: &CircuitDag, coupling: &CouplingMap) {
        for (_, inst) in dag.op_nodes() {
            if let [a, b] = inst.qubits.as_slice() {
                assert!(coupling.is_connected(a.0, b.0), "{} on {a}, {b}", inst.name());
            }
        }
    }

    #[test]
    fn test_routing_connected() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();

        let mut props = PropertySet::new().with_target(CouplingMap::linear(5), BasisGates::iqm());

        TrivialLayout.run(&mut dag, &mut props).unwrap();
        SwapRouting.run(&mut dag, &mut props).unwrap();

        // No SWAPs; the three unused physical qubits become idle wires.
        assert_eq!(dag.num_ops(), 2);
        assert_eq!(dag.num_qubits(), 5);
        assert_eq!(props.layout, props.initial_layout);
    }

    #[test]
    fn test_routing_needs_swap() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        let mut dag = circuit.into_dag();

        let coupling = CouplingMap::linear(3);
        let mut props = PropertySet::new();
        props.coupling_map = Some(coupling.clone());

        assert!(SwapRouting.run(&mut dag, &mut props).unwrap());

        assert_eq!(dag.count_ops().get("swap"), Some(&1));
        assert_adjacent(&dag, &coupling);
        let layout = props.layout.as_ref().unwrap();
        assert_eq!(layout.get_physical(QubitId(0)), Some(1));
        assert_eq!(layout.get_physical(QubitId(1)), Some(0));
        assert_eq!(props.initial_layout, Some(Layout::trivial(3)));
    }

    #[test]
    fn test_routing_later_ops_follow_swap() {
        // After the SWAP the qubit 0 state lives on wire 1.
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        circuit.h(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::linear(3));

        SwapRouting.run(&mut dag, &mut props).unwrap();
        let h = dag
            .op_nodes()
            .find(|(_, inst)| inst.name() == "h")
            .map(|(_, inst)| inst.qubits.clone())
            .unwrap();
        assert_eq!(h, vec![QubitId(1)]);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_routing_expands_swaps_into_basis() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cz(QubitId(0), QubitId(2)).unwrap();
        let mut dag = circuit.into_dag();
        let coupling = CouplingMap::linear(3);
        let mut props = PropertySet::new().with_target(coupling.clone(), BasisGates::iqm());

        SwapRouting.run(&mut dag, &mut props).unwrap();
        let basis = BasisGates::iqm();
        assert!(dag.count_ops().keys().all(|name| basis.contains(name)));
        assert_adjacent(&dag, &coupling);
    }

    #[test]
    fn test_routing_rejects_wide_gates() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::linear(3));

        let err = SwapRouting.run(&mut dag, &mut props).unwrap_err();
        assert!(matches!(err, CompileError::MultiQubitGate { num_qubits: 3, .. }));
        assert!(props.initial_layout.is_none());
    }

    #[test]
    fn test_routing_disconnected() {
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::from_edges(4, [(0, 1), (2, 3)]).unwrap());

        let err = SwapRouting.run(&mut dag, &mut props).unwrap_err();
        assert!(matches!(err, CompileError::Unroutable { qubit1: 0, qubit2: 3 }));
    }

    #[test]
    fn test_routing_tie_break_prefers_idle_hop() {
        // On a ring of four, 0 reaches 2 through 1 or 3. Qubit 1 is busy
        // in the lookahead window, so the SWAP goes through 3.
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        circuit.cx(QubitId(1), QubitId(2)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::ring(4));

        SwapRouting.run(&mut dag, &mut props).unwrap();
        let swap = dag
            .op_nodes()
            .find(|(_, inst)| inst.name() == "swap")
            .map(|(_, inst)| inst.qubits.clone())
            .unwrap();
        assert_eq!(swap, vec![QubitId(0), QubitId(3)]);
    }

    #[test]
    fn test_routing_runs_once() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::linear(3));

        SwapRouting.run(&mut dag, &mut props).unwrap();
        assert!(!SwapRouting.should_run(&dag, &props));
        assert!(!SwapRouting.run(&mut dag, &mut props).unwrap());
    }
}
