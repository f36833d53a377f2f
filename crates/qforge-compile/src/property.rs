//! Target properties and the [`PropertySet`] passes share.
//!
//! # Overview
//!
//! During compilation several passes need the same context:
//! - **Layout passes** decide which logical qubit sits on which physical qubit
//! - **Routing** walks the coupling map to insert SWAPs
//! - **Translation** plans decompositions into the basis gates
//! - **Every rewrite pass** consults the shared [`EquivalenceLibrary`]
//!
//! The `PropertySet` carries all of this through a pipeline run.
//!
//! # Examples
//!
//! ```
//! use qforge_compile::{BasisGates, CouplingMap, PropertySet};
//!
//! let props = PropertySet::new().with_target(CouplingMap::linear(5), BasisGates::iqm());
//!
//! assert!(props.coupling_map.is_some());
//! assert!(props.basis_gates.as_ref().unwrap().contains("prx"));
//! ```
//!
//! ## Custom properties for pass communication
//!
//! ```
//! use qforge_compile::PropertySet;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct SwapBudget(usize);
//!
//! let mut props = PropertySet::new();
//! props.insert(SwapBudget(4));
//! assert_eq!(props.get::<SwapBudget>(), Some(&SwapBudget(4)));
//! ```

use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::sync::Arc;

use petgraph::graph::{NodeIndex as GraphNode, UnGraph};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use qforge_ir::{QubitId, STANDARD_GATE_SHAPES, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::library::EquivalenceLibrary;

/// Operations every target accepts regardless of its basis.
pub const DIRECTIVES: &[&str] = &["measure", "reset", "barrier"];

/// A mapping from logical qubits to physical qubits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    logical_to_physical: FxHashMap<QubitId, u32>,
    physical_to_logical: FxHashMap<u32, QubitId>,
}

impl Layout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trivial layout (logical qubit i -> physical qubit i).
    pub fn trivial(num_qubits: u32) -> Self {
        let mut layout = Self::new();
        for i in 0..num_qubits {
            layout.add(QubitId(i), i);
        }
        layout
    }

    /// Add a mapping from logical to physical qubit.
    ///
    /// Any earlier mapping of either side is dropped so both directions
    /// stay consistent.
    pub fn add(&mut self, logical: QubitId, physical: u32) {
        if let Some(old_logical) = self.physical_to_logical.insert(physical, logical) {
            if old_logical != logical {
                self.logical_to_physical.remove(&old_logical);
            }
        }
        if let Some(old_physical) = self.logical_to_physical.insert(logical, physical) {
            if old_physical != physical {
                self.physical_to_logical.remove(&old_physical);
            }
        }
    }

    /// Get the physical qubit for a logical qubit.
    pub fn get_physical(&self, logical: QubitId) -> Option<u32> {
        self.logical_to_physical.get(&logical).copied()
    }

    /// Get the logical qubit for a physical qubit.
    pub fn get_logical(&self, physical: u32) -> Option<QubitId> {
        self.physical_to_logical.get(&physical).copied()
    }

    /// Swap the logical qubits sitting on two physical qubits.
    pub fn swap(&mut self, p1: u32, p2: u32) {
        let l1 = self.physical_to_logical.remove(&p1);
        let l2 = self.physical_to_logical.remove(&p2);
        if let Some(l1) = l1 {
            self.logical_to_physical.insert(l1, p2);
            self.physical_to_logical.insert(p2, l1);
        }
        if let Some(l2) = l2 {
            self.logical_to_physical.insert(l2, p1);
            self.physical_to_logical.insert(p1, l2);
        }
    }

    /// Get the number of mapped qubits.
    pub fn len(&self) -> usize {
        self.logical_to_physical.len()
    }

    /// Check if the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.logical_to_physical.is_empty()
    }

    /// Iterate over (logical, physical) pairs in logical order.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u32)> + '_ {
        let mut pairs: Vec<_> = self.logical_to_physical.iter().map(|(&l, &p)| (l, p)).collect();
        pairs.sort_unstable();
        pairs.into_iter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CouplingMapSpec {
    num_qubits: u32,
    edges: Vec<(u32, u32)>,
}

/// Target device coupling map.
///
/// An undirected graph over physical qubits `0..num_qubits`; an edge means a
/// two-qubit gate may act on that pair directly. All-pairs BFS distances
/// and next hops are computed on construction, so `distance` is O(1) and
/// `shortest_path` is O(length). Deserialization goes through
/// [`CouplingMap::from_edges`] and is validated the same way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CouplingMapSpec", into = "CouplingMapSpec")]
pub struct CouplingMap {
    graph: UnGraph<u32, (), u32>,
    edges: Vec<(u32, u32)>,
    /// `dist[a][b]`, `u32::MAX` when unreachable.
    dist: Vec<Vec<u32>>,
    /// `next_hop[a][b]`: first step on a shortest path from `a` to `b`.
    next_hop: Vec<Vec<u32>>,
}

impl TryFrom<CouplingMapSpec> for CouplingMap {
    type Error = CompileError;

    fn try_from(spec: CouplingMapSpec) -> CompileResult<Self> {
        Self::from_edges(spec.num_qubits, spec.edges)
    }
}

impl From<CouplingMap> for CouplingMapSpec {
    fn from(map: CouplingMap) -> Self {
        Self {
            num_qubits: map.num_qubits(),
            edges: map.edges,
        }
    }
}

impl CouplingMap {
    /// Build a coupling map from an edge list.
    ///
    /// Edges are undirected; duplicates (in either direction) collapse.
    /// Indices outside `0..num_qubits` and self loops are rejected.
    pub fn from_edges(
        num_qubits: u32,
        edges: impl IntoIterator<Item = (u32, u32)>,
    ) -> CompileResult<Self> {
        let mut graph = UnGraph::with_capacity(num_qubits as usize, 0);
        let nodes: Vec<GraphNode<u32>> = (0..num_qubits).map(|q| graph.add_node(q)).collect();
        let mut kept = Vec::new();
        for (a, b) in edges {
            if a >= num_qubits || b >= num_qubits {
                return Err(CompileError::InvalidTopology(format!(
                    "edge ({a}, {b}) outside 0..{num_qubits}"
                )));
            }
            if a == b {
                return Err(CompileError::InvalidTopology(format!(
                    "self loop on qubit {a}"
                )));
            }
            let (lo, hi) = (a.min(b), a.max(b));
            if graph.find_edge(nodes[lo as usize], nodes[hi as usize]).is_none() {
                graph.add_edge(nodes[lo as usize], nodes[hi as usize], ());
                kept.push((lo, hi));
            }
        }
        let mut map = Self {
            graph,
            edges: kept,
            dist: vec![],
            next_hop: vec![],
        };
        map.precompute_distances();
        Ok(map)
    }

    /// BFS from every qubit, visiting neighbours in ascending index order.
    fn precompute_distances(&mut self) {
        let n = self.num_qubits() as usize;
        self.dist = vec![vec![u32::MAX; n]; n];
        self.next_hop = vec![vec![u32::MAX; n]; n];
        let adjacency: Vec<Vec<u32>> = (0..n as u32).map(|q| self.sorted_neighbors(q)).collect();

        for src in 0..n {
            self.dist[src][src] = 0;
            self.next_hop[src][src] = src as u32;
            let mut queue = VecDeque::from([src as u32]);
            while let Some(current) = queue.pop_front() {
                let cur = current as usize;
                for &neighbor in &adjacency[cur] {
                    let nb = neighbor as usize;
                    if self.dist[src][nb] == u32::MAX {
                        self.dist[src][nb] = self.dist[src][cur] + 1;
                        self.next_hop[src][nb] = if cur == src {
                            neighbor
                        } else {
                            self.next_hop[src][cur]
                        };
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    fn sorted_neighbors(&self, qubit: u32) -> Vec<u32> {
        let mut out: Vec<u32> = self
            .graph
            .neighbors(GraphNode::new(qubit as usize))
            .map(|n| self.graph[n])
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Check if two qubits are directly connected.
    #[inline]
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        q1 != q2 && self.distance(q1, q2) == Some(1)
    }

    /// Get the number of physical qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        u32::try_from(self.graph.node_count()).unwrap_or(u32::MAX)
    }

    /// Get the coupling edges, each as `(low, high)`.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Neighbours of a qubit in ascending order.
    pub fn neighbors(&self, qubit: u32) -> Vec<u32> {
        if qubit >= self.num_qubits() {
            return vec![];
        }
        self.sorted_neighbors(qubit)
    }

    /// Number of neighbours of a qubit.
    pub fn degree(&self, qubit: u32) -> usize {
        self.neighbors(qubit).len()
    }

    /// Shortest-path distance, `None` if unreachable or out of range.
    pub fn distance(&self, from: u32, to: u32) -> Option<u32> {
        let d = *self.dist.get(from as usize)?.get(to as usize)?;
        (d != u32::MAX).then_some(d)
    }

    /// One shortest path from `from` to `to`, both ends included.
    pub fn shortest_path(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        self.distance(from, to)?;
        let mut path = vec![from];
        let mut current = from;
        while current != to {
            current = self.next_hop[current as usize][to as usize];
            path.push(current);
        }
        Some(path)
    }

    /// Whether every qubit can reach every other.
    pub fn is_connected_graph(&self) -> bool {
        petgraph::algo::connected_components(&self.graph) <= 1
    }

    fn build(n: u32, edges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        // Generated edges are always in range.
        Self::from_edges(n, edges).unwrap_or_else(|_| Self::empty(n))
    }

    fn empty(n: u32) -> Self {
        let mut map = Self {
            graph: UnGraph::default(),
            edges: vec![],
            dist: vec![],
            next_hop: vec![],
        };
        for q in 0..n {
            map.graph.add_node(q);
        }
        map.precompute_distances();
        map
    }

    /// Create a linear coupling map (0-1-2-3-...).
    pub fn linear(n: u32) -> Self {
        Self::build(n, (1..n).map(|i| (i - 1, i)))
    }

    /// Create a ring (linear plus an edge closing the loop).
    pub fn ring(n: u32) -> Self {
        let closing = (n > 2).then(|| (n - 1, 0));
        Self::build(n, (1..n).map(|i| (i - 1, i)).chain(closing))
    }

    /// Create a fully connected coupling map.
    pub fn full(n: u32) -> Self {
        Self::build(n, (0..n).flat_map(|i| ((i + 1)..n).map(move |j| (i, j))))
    }

    /// Create a star topology (qubit 0 connected to all others).
    pub fn star(n: u32) -> Self {
        Self::build(n, (1..n).map(|i| (0, i)))
    }

    /// Create a `rows x cols` grid, row-major.
    pub fn grid(rows: u32, cols: u32) -> Self {
        let idx = move |r: u32, c: u32| r * cols + c;
        let horizontal = (0..rows).flat_map(move |r| (1..cols).map(move |c| (idx(r, c - 1), idx(r, c))));
        let vertical = (1..rows).flat_map(move |r| (0..cols).map(move |c| (idx(r - 1, c), idx(r, c))));
        Self::build(rows * cols, horizontal.chain(vertical))
    }
}

/// Native operators of the target device.
///
/// Standard names carry their arity from the gate vocabulary; any other
/// name must be declared with [`BasisGates::with_custom`] so its shape is
/// known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisGates {
    gates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    custom: Vec<(String, u32)>,
}

impl BasisGates {
    /// Create a basis from operator names.
    pub fn new(gates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            gates: gates.into_iter().map(Into::into).collect(),
            custom: vec![],
        }
    }

    /// Declare a custom native operator of the given arity.
    #[must_use]
    pub fn with_custom(mut self, name: impl Into<String>, num_qubits: u32) -> Self {
        let name = name.into();
        if !self.gates.contains(&name) {
            self.gates.push(name.clone());
        }
        self.custom.push((name, num_qubits));
        self
    }

    /// Reject empty bases, unknown undeclared names and shape conflicts.
    pub fn validate(&self) -> CompileResult<()> {
        if self.gates.iter().all(|g| DIRECTIVES.contains(&g.as_str())) {
            return Err(CompileError::InvalidBasis("basis has no gates".into()));
        }
        for (name, arity) in &self.custom {
            if *arity == 0 {
                return Err(CompileError::InvalidBasis(format!(
                    "'{name}' is declared with zero qubits"
                )));
            }
            if let Some(known) = StandardGate::arity_of(name) {
                if known != *arity {
                    return Err(CompileError::InvalidBasis(format!(
                        "'{name}' acts on {known} qubits, declared as {arity}"
                    )));
                }
            }
        }
        for gate in &self.gates {
            let known = DIRECTIVES.contains(&gate.as_str())
                || STANDARD_GATE_SHAPES.iter().any(|(n, _, _)| n == gate)
                || self.custom.iter().any(|(n, _)| n == gate);
            if !known {
                return Err(CompileError::InvalidBasis(format!(
                    "unknown operator '{gate}' (declare custom gates with their arity)"
                )));
            }
        }
        Ok(())
    }

    /// Check if a gate is in the basis. Directives are always accepted.
    pub fn contains(&self, gate: &str) -> bool {
        DIRECTIVES.contains(&gate) || self.gates.iter().any(|g| g == gate)
    }

    /// Get the basis gates.
    pub fn gates(&self) -> &[String] {
        &self.gates
    }

    /// IQM: PRX + CZ.
    pub fn iqm() -> Self {
        Self::new(["prx", "cz", "measure", "barrier"])
    }

    /// IBM Eagle-class: RZ + SX + X + CX.
    pub fn ibm() -> Self {
        Self::new(["rz", "sx", "x", "cx", "measure", "reset", "barrier", "id"])
    }

    /// IBM Heron: RZ + SX + X + CZ.
    pub fn heron() -> Self {
        Self::new(["rz", "sx", "x", "cz", "measure", "reset", "barrier", "id"])
    }

    /// Trapped ions: RX + RY + RZ + XX.
    pub fn trapped_ion() -> Self {
        Self::new(["rx", "ry", "rz", "rxx", "measure", "barrier"])
    }

    /// Neutral atoms: RZ + RX + RY + CZ.
    pub fn neutral_atom() -> Self {
        Self::new(["rz", "rx", "ry", "cz", "measure", "barrier"])
    }

    /// Every standard gate.
    pub fn universal() -> Self {
        Self::new(STANDARD_GATE_SHAPES.iter().map(|(n, _, _)| *n))
    }
}

/// Caller-supplied description of the device to compile for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Native operators.
    pub basis: BasisGates,
    /// Connectivity; `None` means all-to-all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupling: Option<CouplingMap>,
}

impl Target {
    /// A target with all-to-all connectivity.
    pub fn new(basis: BasisGates) -> Self {
        Self {
            basis,
            coupling: None,
        }
    }

    /// Restrict connectivity to a coupling map.
    #[must_use]
    pub fn with_coupling(mut self, coupling: CouplingMap) -> Self {
        self.coupling = Some(coupling);
        self
    }

    /// Validate the target before anything is compiled against it.
    pub fn validate(&self) -> CompileResult<()> {
        self.basis.validate()?;
        if let Some(coupling) = &self.coupling {
            if coupling.num_qubits() == 0 {
                return Err(CompileError::InvalidTopology("no qubits".into()));
            }
        }
        Ok(())
    }

    /// Property set preloaded with this target.
    pub fn properties(&self) -> PropertySet {
        PropertySet {
            coupling_map: self.coupling.clone(),
            basis_gates: Some(self.basis.clone()),
            ..PropertySet::new()
        }
    }
}

/// Properties shared between compilation passes.
///
/// # Standard Properties
///
/// | Field | Type | Description |
/// |-------|------|-------------|
/// | `layout` | [`Layout`] | Logical-to-physical mapping (final once routed) |
/// | `initial_layout` | [`Layout`] | Mapping routing started from |
/// | `coupling_map` | [`CouplingMap`] | Device connectivity graph |
/// | `basis_gates` | [`BasisGates`] | Native gate set for the target |
/// | `library` | [`EquivalenceLibrary`] | Shared rewrite rules |
///
/// Passes can store arbitrary data with [`insert`](Self::insert) and
/// [`get`](Self::get); each type holds at most one value.
#[derive(Debug)]
pub struct PropertySet {
    /// Qubit layout mapping (logical → physical).
    ///
    /// Written by layout passes; after routing it is the final layout.
    pub layout: Option<Layout>,

    /// Layout at routing entry. Set only by routing, and its presence
    /// means the DAG's wires are physical qubits.
    pub initial_layout: Option<Layout>,

    /// Target coupling map defining allowed two-qubit interactions.
    pub coupling_map: Option<CouplingMap>,

    /// Target basis gates for gate decomposition.
    pub basis_gates: Option<BasisGates>,

    /// Rewrite rules, immutable and shared.
    pub library: Arc<EquivalenceLibrary>,

    custom: FxHashMap<TypeId, Box<dyn Any + Send>>,
}

impl Default for PropertySet {
    fn default() -> Self {
        Self {
            layout: None,
            initial_layout: None,
            coupling_map: None,
            basis_gates: None,
            library: EquivalenceLibrary::shared(),
            custom: FxHashMap::default(),
        }
    }
}

impl PropertySet {
    /// Create a new empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a property set with target configuration.
    #[must_use]
    pub fn with_target(mut self, coupling_map: CouplingMap, basis_gates: BasisGates) -> Self {
        self.coupling_map = Some(coupling_map);
        self.basis_gates = Some(basis_gates);
        self
    }

    /// Set only the basis.
    #[must_use]
    pub fn with_basis(mut self, basis_gates: BasisGates) -> Self {
        self.basis_gates = Some(basis_gates);
        self
    }

    /// Set the layout.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Use a different rule library.
    #[must_use]
    pub fn with_library(mut self, library: Arc<EquivalenceLibrary>) -> Self {
        self.library = library;
        self
    }

    /// Insert a custom property.
    pub fn insert<T: Any + Send>(&mut self, value: T) {
        self.custom.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a custom property.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.custom
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Get a mutable custom property.
    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.custom
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Remove a custom property.
    pub fn remove<T: Any>(&mut self) -> Option<T> {
        self.custom
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_swap() {
        let mut layout = Layout::trivial(3);
        layout.swap(0, 2);
        assert_eq!(layout.get_physical(QubitId(0)), Some(2));
        assert_eq!(layout.get_physical(QubitId(2)), Some(0));
        assert_eq!(layout.get_logical(0), Some(QubitId(2)));

        let mut partial = Layout::new();
        partial.add(QubitId(0), 1);
        partial.swap(1, 4);
        assert_eq!(partial.get_physical(QubitId(0)), Some(4));
        assert_eq!(partial.get_logical(1), None);
    }

    #[test]
    fn test_layout_add_replaces_both_sides() {
        let mut layout = Layout::trivial(2);
        layout.add(QubitId(0), 1);
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.get_logical(1), Some(QubitId(0)));
        assert_eq!(layout.get_logical(0), None);
    }

    #[test]
    fn test_coupling_map_linear() {
        let map = CouplingMap::linear(5);
        assert!(map.is_connected(0, 1));
        assert!(!map.is_connected(0, 2));
        assert_eq!(map.distance(0, 4), Some(4));
        assert_eq!(map.shortest_path(0, 3), Some(vec![0, 1, 2, 3]));
        assert_eq!(map.neighbors(2), vec![1, 3]);
    }

    #[test]
    fn test_coupling_map_star_and_grid() {
        let star = CouplingMap::star(5);
        assert_eq!(star.distance(1, 2), Some(2));
        assert_eq!(star.degree(0), 4);

        let grid = CouplingMap::grid(2, 3);
        assert_eq!(grid.edges().len(), 7);
        assert_eq!(grid.distance(0, 5), Some(3));
        assert!(grid.is_connected_graph());
    }

    #[test]
    fn test_from_edges_validation() {
        assert!(matches!(
            CouplingMap::from_edges(3, [(0, 3)]),
            Err(CompileError::InvalidTopology(_))
        ));
        assert!(matches!(
            CouplingMap::from_edges(3, [(1, 1)]),
            Err(CompileError::InvalidTopology(_))
        ));
        let map = CouplingMap::from_edges(4, [(0, 1), (1, 0), (2, 3)]).unwrap();
        assert_eq!(map.edges(), &[(0, 1), (2, 3)]);
        assert_eq!(map.distance(0, 3), None);
        assert!(!map.is_connected_graph());
    }

    #[test]
    fn test_coupling_map_serde_rebuilds_distances() {
        let json = serde_json::to_string(&CouplingMap::ring(4)).unwrap();
        let back: CouplingMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.distance(0, 3), Some(1));
        assert_eq!(back.distance(0, 2), Some(2));

        let bad = r#"{"num_qubits": 2, "edges": [[0, 5]]}"#;
        assert!(serde_json::from_str::<CouplingMap>(bad).is_err());
    }

    #[test]
    fn test_basis_gates() {
        let iqm = BasisGates::iqm();
        assert!(iqm.contains("prx"));
        assert!(iqm.contains("measure"));
        assert!(!iqm.contains("cx"));
        iqm.validate().unwrap();
        BasisGates::universal().validate().unwrap();
    }

    #[test]
    fn test_basis_validation() {
        assert!(BasisGates::new(["measure"]).validate().is_err());
        assert!(BasisGates::new(["cx", "oracle"]).validate().is_err());
        BasisGates::new(["cx", "oracle"])
            .with_custom("oracle", 2)
            .validate()
            .unwrap();
        assert!(BasisGates::new(["cx"]).with_custom("cx", 3).validate().is_err());
    }

    #[test]
    #[allow(clippy::items_after_statements)]
    fn test_property_set_custom() {
        let mut props = PropertySet::new();

        #[derive(Debug, PartialEq)]
        struct CustomData(i32);

        props.insert(CustomData(42));
        assert_eq!(props.get::<CustomData>(), Some(&CustomData(42)));
        assert_eq!(props.remove::<CustomData>(), Some(CustomData(42)));
        assert_eq!(props.get::<CustomData>(), None);
    }

    #[test]
    fn test_property_set_holds_dag() {
        fn assert_send<T: Send>() {}
        assert_send::<qforge_ir::CircuitDag>();

        let dag = qforge_ir::Circuit::ghz(2).unwrap().into_dag();
        let mut props = PropertySet::new();
        props.insert(dag.clone());
        assert_eq!(props.get::<qforge_ir::CircuitDag>().map(|d| d.depth()), Some(dag.depth()));
    }

    #[test]
    fn test_target_properties() {
        let target = Target::new(BasisGates::ibm()).with_coupling(CouplingMap::linear(3));
        target.validate().unwrap();
        let props = target.properties();
        assert!(props.coupling_map.is_some());
        assert!(props.layout.is_none());
        assert!(!props.library.rules().is_empty());
    }
}
