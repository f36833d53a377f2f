//! Arena-backed circuit DAG.
//!
//! Nodes live in a slot arena and are addressed by stable [`NodeIndex`]
//! values. Every node stores one [`WireLink`] per wire it touches, so each
//! wire is a doubly linked list running from its `In` sentinel to its `Out`
//! sentinel. Splicing a node in or out is O(number of its wires) and never
//! moves other nodes; removed nodes leave a tombstone and their index is
//! never reused.
//!
//! ASAP layers are cached per node. A structural edit only invalidates the
//! forward cone of the edited region, so depth queries between rewrites
//! recompute just the part of the circuit that moved.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::fmt;

use petgraph::graph::DiGraph;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::Gate;
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{ClbitId, QubitId};

/// Stable index of a node in the circuit arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// Position in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_slot(slot: usize) -> Self {
        NodeIndex(slot as u32)
    }
}

/// Identifier for a wire in the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WireId {
    /// A quantum wire.
    Qubit(QubitId),
    /// A classical wire.
    Clbit(ClbitId),
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireId::Qubit(q) => write!(f, "{q}"),
            WireId::Clbit(c) => write!(f, "{c}"),
        }
    }
}

impl From<QubitId> for WireId {
    fn from(q: QubitId) -> Self {
        WireId::Qubit(q)
    }
}

impl From<ClbitId> for WireId {
    fn from(c: ClbitId) -> Self {
        WireId::Clbit(c)
    }
}

/// A node in the circuit DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DagNode {
    /// Input node for a wire.
    In(WireId),
    /// Output node for a wire.
    Out(WireId),
    /// Operation node containing an instruction.
    Op(Instruction),
}

impl DagNode {
    /// Check if this is an operation node.
    #[inline]
    pub fn is_op(&self) -> bool {
        matches!(self, DagNode::Op(_))
    }

    /// Get the instruction if this is an operation node.
    #[inline]
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }
}

/// A node's position on one wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLink {
    /// The wire.
    pub wire: WireId,
    /// Previous node on the wire; `None` only for an `In` sentinel.
    pub prev: Option<NodeIndex>,
    /// Next node on the wire; `None` only for an `Out` sentinel.
    pub next: Option<NodeIndex>,
}

#[derive(Debug, Clone)]
struct Slot {
    node: DagNode,
    links: Vec<WireLink>,
    seq: u64,
}

impl Slot {
    fn link(&self, wire: WireId) -> Option<&WireLink> {
        self.links.iter().find(|l| l.wire == wire)
    }

    fn link_mut(&mut self, wire: WireId) -> Option<&mut WireLink> {
        self.links.iter_mut().find(|l| l.wire == wire)
    }
}

/// DAG-based circuit representation.
#[derive(Debug, Clone, Default)]
pub struct CircuitDag {
    slots: Vec<Option<Slot>>,
    inputs: FxHashMap<WireId, NodeIndex>,
    outputs: FxHashMap<WireId, NodeIndex>,
    qubits: Vec<QubitId>,
    clbits: Vec<ClbitId>,
    /// Live operation count per wire, maintained on every edit.
    wire_counts: FxHashMap<WireId, usize>,
    num_ops: usize,
    next_seq: u64,
    /// Cached ASAP layer per slot; `None` means stale. A stale node only
    /// ever has stale successors.
    layers: RefCell<Vec<Option<usize>>>,
}

impl CircuitDag {
    /// Create a new empty circuit DAG.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a DAG with qubits `0..num_qubits` and clbits `0..num_clbits`.
    pub fn with_size(num_qubits: u32, num_clbits: u32) -> Self {
        let mut dag = Self::new();
        for q in 0..num_qubits {
            dag.add_qubit(QubitId(q));
        }
        for c in 0..num_clbits {
            dag.add_clbit(ClbitId(c));
        }
        dag
    }

    /// Add a qubit to the circuit. Adding an existing qubit is a no-op.
    pub fn add_qubit(&mut self, qubit: QubitId) {
        if self.add_wire(WireId::Qubit(qubit)) {
            self.qubits.push(qubit);
        }
    }

    /// Add a classical bit to the circuit. Adding an existing bit is a no-op.
    pub fn add_clbit(&mut self, clbit: ClbitId) {
        if self.add_wire(WireId::Clbit(clbit)) {
            self.clbits.push(clbit);
        }
    }

    fn add_wire(&mut self, wire: WireId) -> bool {
        if self.inputs.contains_key(&wire) {
            return false;
        }
        self.link_sentinels(wire).is_ok()
    }

    fn link_sentinels(&mut self, wire: WireId) -> IrResult<()> {
        let in_node = self.alloc(DagNode::In(wire), vec![wire]);
        let out_node = self.alloc(DagNode::Out(wire), vec![wire]);
        self.link_mut(in_node, wire)?.next = Some(out_node);
        self.link_mut(out_node, wire)?.prev = Some(in_node);
        self.layers.get_mut()[in_node.index()] = Some(0);
        self.inputs.insert(wire, in_node);
        self.outputs.insert(wire, out_node);
        self.wire_counts.insert(wire, 0);
        Ok(())
    }

    fn alloc(&mut self, node: DagNode, wires: Vec<WireId>) -> NodeIndex {
        let idx = NodeIndex::from_slot(self.slots.len());
        let links = wires
            .into_iter()
            .map(|wire| WireLink {
                wire,
                prev: None,
                next: None,
            })
            .collect();
        self.slots.push(Some(Slot {
            node,
            links,
            seq: self.next_seq,
        }));
        self.next_seq += 1;
        self.layers.get_mut().push(None);
        idx
    }

    fn slot(&self, node: NodeIndex) -> IrResult<&Slot> {
        self.slots
            .get(node.index())
            .and_then(Option::as_ref)
            .ok_or(IrError::InvalidNode(node))
    }

    fn op_slot(&self, node: NodeIndex) -> IrResult<&Slot> {
        self.slot(node)
            .ok()
            .filter(|s| s.node.is_op())
            .ok_or(IrError::InvalidNode(node))
    }

    fn link_mut(&mut self, node: NodeIndex, wire: WireId) -> IrResult<&mut WireLink> {
        self.slots
            .get_mut(node.index())
            .and_then(Option::as_mut)
            .ok_or(IrError::InvalidNode(node))?
            .link_mut(wire)
            .ok_or(IrError::AnchorNotOnWire { node, wire })
    }

    fn is_op(&self, node: NodeIndex) -> bool {
        self.slot(node).is_ok_and(|s| s.node.is_op())
    }

    /// Check an instruction against this circuit's registers.
    fn check_operands(&self, instruction: &Instruction) -> IrResult<()> {
        instruction.validate()?;
        let gate_name = || match &instruction.kind {
            InstructionKind::Gate(gate) => Some(gate.name().to_string()),
            _ => None,
        };
        for wire in instruction.wires() {
            if self.inputs.contains_key(&wire) {
                continue;
            }
            return Err(match wire {
                WireId::Qubit(qubit) => IrError::QubitNotFound {
                    qubit,
                    gate_name: gate_name(),
                },
                WireId::Clbit(clbit) => IrError::ClbitNotFound {
                    clbit,
                    gate_name: gate_name(),
                },
            });
        }
        Ok(())
    }

    /// Link `node` between `prev` and `next` on `wire`.
    fn splice(
        &mut self,
        node: NodeIndex,
        wire: WireId,
        prev: NodeIndex,
        next: NodeIndex,
    ) -> IrResult<()> {
        let link = self.link_mut(node, wire)?;
        link.prev = Some(prev);
        link.next = Some(next);
        self.link_mut(prev, wire)?.next = Some(node);
        self.link_mut(next, wire)?.prev = Some(node);
        Ok(())
    }

    fn new_op(&mut self, instruction: Instruction) -> (NodeIndex, Vec<WireId>) {
        let wires = instruction.wires();
        for wire in &wires {
            *self.wire_counts.entry(*wire).or_insert(0) += 1;
        }
        self.num_ops += 1;
        let idx = self.alloc(DagNode::Op(instruction), wires.clone());
        (idx, wires)
    }

    /// Mark `start` and everything downstream of it as stale.
    fn invalidate_from(&self, start: NodeIndex) {
        let mut layers = self.layers.borrow_mut();
        let mut stack = vec![start];
        while let Some(n) = stack.pop() {
            let Some(Some(slot)) = self.slots.get(n.index()) else {
                continue;
            };
            if !slot.node.is_op() || layers[n.index()].take().is_none() {
                continue;
            }
            stack.extend(slot.links.iter().filter_map(|l| l.next));
        }
    }

    fn invalidate_successors(&self, node: NodeIndex) {
        if let Ok(slot) = self.slot(node) {
            for next in slot.links.iter().filter_map(|l| l.next) {
                self.invalidate_from(next);
            }
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append an instruction at the end of every wire it touches.
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<NodeIndex> {
        self.check_operands(&instruction)?;
        let (idx, wires) = self.new_op(instruction);
        for wire in wires {
            let out = self.outputs[&wire];
            let prev = self
                .slot(out)?
                .links
                .first()
                .and_then(|l| l.prev)
                .ok_or_else(|| IrError::InvalidDag(format!("Output of {wire} is detached")))?;
            self.splice(idx, wire, prev, out)?;
        }
        Ok(idx)
    }

    /// Insert an instruction directly after the given anchors.
    ///
    /// `anchors[i]` is the node the instruction follows on `wires()[i]`; it
    /// may be an `In` sentinel but not an `Out` sentinel. The anchors must
    /// be mutually consistent: no anchor may be a descendant of the node
    /// following another anchor, or the graph would gain a cycle.
    pub fn insert_after(
        &mut self,
        instruction: Instruction,
        anchors: &[NodeIndex],
    ) -> IrResult<NodeIndex> {
        self.check_operands(&instruction)?;
        let wires = instruction.wires();
        if anchors.len() != wires.len() {
            return Err(IrError::InvalidDag(format!(
                "insert_after: {} anchors for {} wires",
                anchors.len(),
                wires.len()
            )));
        }
        let mut nexts = Vec::with_capacity(wires.len());
        for (&wire, &anchor) in wires.iter().zip(anchors) {
            let next = self
                .slot(anchor)?
                .link(wire)
                .and_then(|l| l.next)
                .ok_or(IrError::AnchorNotOnWire { node: anchor, wire })?;
            nexts.push(next);
        }

        let (idx, wires) = self.new_op(instruction);
        for ((wire, &anchor), next) in wires.into_iter().zip(anchors).zip(nexts) {
            self.splice(idx, wire, anchor, next)?;
        }
        self.invalidate_successors(idx);
        Ok(idx)
    }

    /// Insert an instruction immediately before `anchor` on each of its wires.
    ///
    /// Every wire of the instruction must also be a wire of `anchor`.
    pub fn insert_before(
        &mut self,
        anchor: NodeIndex,
        instruction: Instruction,
    ) -> IrResult<NodeIndex> {
        self.check_operands(&instruction)?;
        let anchor_slot = self.slot(anchor)?;
        if matches!(anchor_slot.node, DagNode::In(_)) {
            return Err(IrError::InvalidNode(anchor));
        }
        let mut prevs = Vec::new();
        for wire in instruction.wires() {
            let prev = anchor_slot
                .link(wire)
                .and_then(|l| l.prev)
                .ok_or(IrError::AnchorNotOnWire { node: anchor, wire })?;
            prevs.push(prev);
        }

        let (idx, wires) = self.new_op(instruction);
        for (wire, prev) in wires.into_iter().zip(prevs) {
            self.splice(idx, wire, prev, anchor)?;
        }
        self.invalidate_from(anchor);
        Ok(idx)
    }

    /// Remove an operation node, joining its neighbours on every wire.
    pub fn remove_op(&mut self, node: NodeIndex) -> IrResult<Instruction> {
        let links = self.op_slot(node)?.links.clone();
        let mut nexts = Vec::with_capacity(links.len());
        for link in &links {
            let (Some(prev), Some(next)) = (link.prev, link.next) else {
                return Err(IrError::InvalidDag(format!(
                    "Node {node:?} is detached on {}",
                    link.wire
                )));
            };
            self.link_mut(prev, link.wire)?.next = Some(next);
            self.link_mut(next, link.wire)?.prev = Some(prev);
            if let Some(count) = self.wire_counts.get_mut(&link.wire) {
                *count -= 1;
            }
            nexts.push(next);
        }
        let slot = self.slots[node.index()].take();
        self.layers.get_mut()[node.index()] = None;
        self.num_ops -= 1;
        for next in nexts {
            self.invalidate_from(next);
        }
        match slot.map(|s| s.node) {
            Some(DagNode::Op(inst)) => Ok(inst),
            _ => Err(IrError::InvalidNode(node)),
        }
    }

    /// Replace an operation with an ordered sequence of instructions.
    ///
    /// The replacement may only touch wires of the replaced node; it is
    /// spliced in exactly where the node was. An empty replacement removes
    /// the node. Nothing is modified if any replacement is invalid.
    pub fn substitute_node(
        &mut self,
        node: NodeIndex,
        replacement: impl IntoIterator<Item = Instruction>,
    ) -> IrResult<Vec<NodeIndex>> {
        let replacement: Vec<Instruction> = replacement.into_iter().collect();
        let own: FxHashSet<WireId> = self.op_slot(node)?.links.iter().map(|l| l.wire).collect();
        for inst in &replacement {
            self.check_operands(inst)?;
            if let Some(wire) = inst.wires().into_iter().find(|w| !own.contains(w)) {
                return Err(IrError::ForeignWire { node, wire });
            }
        }

        let mut new_nodes = Vec::with_capacity(replacement.len());
        for inst in replacement {
            new_nodes.push(self.insert_before(node, inst)?);
        }
        self.remove_op(node)?;
        Ok(new_nodes)
    }

    /// Swap the gate of an operation for another gate of the same shape.
    pub fn replace_gate(&mut self, node: NodeIndex, gate: Gate) -> IrResult<Gate> {
        let slot = self
            .slots
            .get_mut(node.index())
            .and_then(Option::as_mut)
            .ok_or(IrError::InvalidNode(node))?;
        let DagNode::Op(inst) = &mut slot.node else {
            return Err(IrError::InvalidNode(node));
        };
        let InstructionKind::Gate(old) = &inst.kind else {
            return Err(IrError::InvalidNode(node));
        };
        let candidate = Instruction {
            kind: InstructionKind::Gate(gate),
            qubits: inst.qubits.clone(),
            clbits: inst.clbits.clone(),
        };
        candidate.validate()?;
        if candidate.wires() != inst.wires() {
            return Err(IrError::InvalidDag(format!(
                "replace_gate: '{}' changes the wires of '{}'",
                candidate.name(),
                old.name()
            )));
        }
        let InstructionKind::Gate(new) = candidate.kind else {
            return Err(IrError::InvalidNode(node));
        };
        match std::mem::replace(&mut inst.kind, InstructionKind::Gate(new)) {
            InstructionKind::Gate(previous) => Ok(previous),
            _ => Err(IrError::InvalidNode(node)),
        }
    }

    /// Exchange everything after `after` on qubit wires `a` and `b`.
    ///
    /// Operations that followed `after` on `a` now follow it on `b` (their
    /// operands are rewritten accordingly) and vice versa. With `after` a
    /// SWAP on `(a, b)`, this turns "swap, then the rest" into "swap, then
    /// the rest with the two qubits' roles exchanged", which is how routing
    /// commits an exchange without rebuilding anything.
    pub fn exchange_wire_suffixes(
        &mut self,
        after: NodeIndex,
        a: QubitId,
        b: QubitId,
    ) -> IrResult<()> {
        let (wa, wb) = (WireId::Qubit(a), WireId::Qubit(b));
        let suffix_a = self.suffix(after, wa)?;
        let suffix_b = self.suffix(after, wb)?;
        let out_a = self.outputs[&wa];
        let out_b = self.outputs[&wb];

        let flip_wire = |w: WireId| match w {
            w if w == wa => wb,
            w if w == wb => wa,
            w => w,
        };
        let flip_qubit = |q: QubitId| match q {
            q if q == a => b,
            q if q == b => a,
            q => q,
        };
        let touched: FxHashSet<NodeIndex> = suffix_a.iter().chain(&suffix_b).copied().collect();
        for n in touched {
            let Some(slot) = self.slots[n.index()].as_mut() else {
                return Err(IrError::InvalidNode(n));
            };
            for link in &mut slot.links {
                link.wire = flip_wire(link.wire);
            }
            if let DagNode::Op(inst) = &mut slot.node {
                for q in &mut inst.qubits {
                    *q = flip_qubit(*q);
                }
            }
        }

        self.reattach(after, wb, &suffix_a, out_b)?;
        self.reattach(after, wa, &suffix_b, out_a)?;

        let (na, nb) = (suffix_a.len(), suffix_b.len());
        if let Some(count) = self.wire_counts.get_mut(&wa) {
            *count = *count + nb - na;
        }
        if let Some(count) = self.wire_counts.get_mut(&wb) {
            *count = *count + na - nb;
        }
        Ok(())
    }

    /// Hang `chain` (already relabeled to `wire`) between `head` and `out`.
    fn reattach(
        &mut self,
        head: NodeIndex,
        wire: WireId,
        chain: &[NodeIndex],
        out: NodeIndex,
    ) -> IrResult<()> {
        match (chain.first(), chain.last()) {
            (Some(&first), Some(&last)) => {
                self.link_mut(head, wire)?.next = Some(first);
                self.link_mut(first, wire)?.prev = Some(head);
                self.link_mut(last, wire)?.next = Some(out);
                self.link_mut(out, wire)?.prev = Some(last);
            }
            _ => {
                self.link_mut(head, wire)?.next = Some(out);
                self.link_mut(out, wire)?.prev = Some(head);
            }
        }
        Ok(())
    }

    /// Operation nodes strictly after `node` on `wire`, in order.
    fn suffix(&self, node: NodeIndex, wire: WireId) -> IrResult<Vec<NodeIndex>> {
        let mut out = Vec::new();
        let mut current = self
            .slot(node)?
            .link(wire)
            .ok_or(IrError::AnchorNotOnWire { node, wire })?
            .next;
        while let Some(n) = current {
            let slot = self.slot(n)?;
            if !slot.node.is_op() {
                break;
            }
            out.push(n);
            current = slot.link(wire).and_then(|l| l.next);
        }
        Ok(out)
    }

    /// Rename every qubit wire through an injective mapping.
    ///
    /// The mapping must cover exactly the circuit's qubits and send no two
    /// of them to the same id. Target ids need not be existing qubits, so
    /// logical wires can be renamed onto physical indices in one step.
    pub fn relabel_qubits(&mut self, mapping: &FxHashMap<QubitId, QubitId>) -> IrResult<()> {
        let own: FxHashSet<QubitId> = self.qubits.iter().copied().collect();
        let keys: FxHashSet<QubitId> = mapping.keys().copied().collect();
        if keys != own {
            return Err(IrError::InvalidRelabel(format!(
                "mapping covers {} qubits but the circuit has {}",
                keys.len(),
                own.len()
            )));
        }
        let images: FxHashSet<QubitId> = mapping.values().copied().collect();
        if images.len() != mapping.len() {
            return Err(IrError::InvalidRelabel(
                "two qubits are mapped to the same id".into(),
            ));
        }
        let map_wire = |w: WireId| match w {
            WireId::Qubit(q) => WireId::Qubit(mapping[&q]),
            other => other,
        };

        for slot in self.slots.iter_mut().flatten() {
            for link in &mut slot.links {
                link.wire = map_wire(link.wire);
            }
            match &mut slot.node {
                DagNode::In(w) | DagNode::Out(w) => *w = map_wire(*w),
                DagNode::Op(inst) => {
                    for q in &mut inst.qubits {
                        *q = mapping[&*q];
                    }
                }
            }
        }
        self.inputs = self.inputs.drain().map(|(w, n)| (map_wire(w), n)).collect();
        self.outputs = self.outputs.drain().map(|(w, n)| (map_wire(w), n)).collect();
        self.wire_counts = self
            .wire_counts
            .drain()
            .map(|(w, c)| (map_wire(w), c))
            .collect();
        for q in &mut self.qubits {
            *q = mapping[&*q];
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Get the number of classical bits.
    #[inline]
    pub fn num_clbits(&self) -> usize {
        self.clbits.len()
    }

    /// Get the number of live operations.
    #[inline]
    pub fn num_ops(&self) -> usize {
        self.num_ops
    }

    /// Iterate over qubits in registration order.
    pub fn qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        self.qubits.iter().copied()
    }

    /// Iterate over classical bits in registration order.
    pub fn clbits(&self) -> impl Iterator<Item = ClbitId> + '_ {
        self.clbits.iter().copied()
    }

    /// Check whether a qubit wire exists.
    pub fn has_qubit(&self, qubit: QubitId) -> bool {
        self.inputs.contains_key(&WireId::Qubit(qubit))
    }

    /// Get a node by index; `None` for tombstones.
    pub fn node(&self, node: NodeIndex) -> Option<&DagNode> {
        self.slot(node).ok().map(|s| &s.node)
    }

    /// Get an instruction by node index.
    #[inline]
    pub fn instruction(&self, node: NodeIndex) -> Option<&Instruction> {
        self.node(node).and_then(DagNode::instruction)
    }

    /// The per-wire links of a node.
    pub fn links(&self, node: NodeIndex) -> Option<&[WireLink]> {
        self.slot(node).ok().map(|s| s.links.as_slice())
    }

    /// Input sentinel of a wire.
    pub fn input_node(&self, wire: impl Into<WireId>) -> Option<NodeIndex> {
        self.inputs.get(&wire.into()).copied()
    }

    /// Output sentinel of a wire.
    pub fn output_node(&self, wire: impl Into<WireId>) -> Option<NodeIndex> {
        self.outputs.get(&wire.into()).copied()
    }

    /// The operation directly before `node` on `wire`, if any.
    pub fn prev_on_wire(&self, node: NodeIndex, wire: impl Into<WireId>) -> Option<NodeIndex> {
        let wire = wire.into();
        self.slot(node)
            .ok()?
            .link(wire)?
            .prev
            .filter(|&p| self.is_op(p))
    }

    /// The operation directly after `node` on `wire`, if any.
    pub fn next_on_wire(&self, node: NodeIndex, wire: impl Into<WireId>) -> Option<NodeIndex> {
        let wire = wire.into();
        self.slot(node)
            .ok()?
            .link(wire)?
            .next
            .filter(|&n| self.is_op(n))
    }

    /// Immediate operation predecessors of `node`, restricted to `qubits`.
    pub fn predecessors_on(&self, node: NodeIndex, qubits: &[QubitId]) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        for &q in qubits {
            if let Some(p) = self.prev_on_wire(node, q) {
                if !out.contains(&p) {
                    out.push(p);
                }
            }
        }
        out
    }

    /// Immediate operation successors of `node`, restricted to `qubits`.
    pub fn successors_on(&self, node: NodeIndex, qubits: &[QubitId]) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        for &q in qubits {
            if let Some(n) = self.next_on_wire(node, q) {
                if !out.contains(&n) {
                    out.push(n);
                }
            }
        }
        out
    }

    /// Operations along one qubit wire, in order.
    pub fn wire_ops(&self, qubit: QubitId) -> Vec<NodeIndex> {
        self.inputs
            .get(&WireId::Qubit(qubit))
            .and_then(|&input| self.suffix(input, WireId::Qubit(qubit)).ok())
            .unwrap_or_default()
    }

    /// Number of operations on a qubit wire.
    pub fn ops_on_wire(&self, qubit: QubitId) -> usize {
        self.wire_counts
            .get(&WireId::Qubit(qubit))
            .copied()
            .unwrap_or(0)
    }

    /// Live operation nodes in arena order.
    pub fn op_nodes(&self) -> impl Iterator<Item = (NodeIndex, &Instruction)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref()
                .and_then(|s| s.node.instruction())
                .map(|inst| (NodeIndex::from_slot(i), inst))
        })
    }

    /// Operation nodes in deterministic topological order.
    ///
    /// Ready nodes are released in creation order, so identical inputs
    /// always yield identical traversals.
    pub fn topological_order(&self) -> Vec<NodeIndex> {
        let mut indegree: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        let mut ready = BinaryHeap::new();
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot.as_ref().filter(|s| s.node.is_op()) else {
                continue;
            };
            let idx = NodeIndex::from_slot(i);
            let degree = slot
                .links
                .iter()
                .filter(|l| l.prev.is_some_and(|p| self.is_op(p)))
                .count();
            if degree == 0 {
                ready.push(Reverse((slot.seq, idx)));
            } else {
                indegree.insert(idx, degree);
            }
        }

        let mut order = Vec::with_capacity(self.num_ops);
        while let Some(Reverse((_, idx))) = ready.pop() {
            order.push(idx);
            let Ok(slot) = self.slot(idx) else { continue };
            for next in slot.links.iter().filter_map(|l| l.next) {
                if let Some(d) = indegree.get_mut(&next) {
                    *d -= 1;
                    if *d == 0 {
                        indegree.remove(&next);
                        if let Ok(s) = self.slot(next) {
                            ready.push(Reverse((s.seq, next)));
                        }
                    }
                }
            }
        }
        order
    }

    /// Iterate over operations in topological order.
    pub fn topological_ops(&self) -> impl Iterator<Item = (NodeIndex, &Instruction)> {
        self.topological_order()
            .into_iter()
            .filter_map(|idx| self.instruction(idx).map(|inst| (idx, inst)))
    }

    /// ASAP layer of an operation (1 for operations fed only by inputs).
    pub fn layer(&self, node: NodeIndex) -> Option<usize> {
        self.is_op(node).then(|| self.layer_of(node))
    }

    fn layer_of(&self, node: NodeIndex) -> usize {
        let mut layers = self.layers.borrow_mut();
        let mut stack = vec![node];
        while let Some(&n) = stack.last() {
            if layers[n.index()].is_some() {
                stack.pop();
                continue;
            }
            let Some(slot) = self.slots[n.index()].as_ref() else {
                stack.pop();
                continue;
            };
            let mut ready = true;
            let mut deepest = 0;
            for prev in slot.links.iter().filter_map(|l| l.prev) {
                match layers[prev.index()] {
                    Some(layer) => deepest = deepest.max(layer),
                    None => {
                        ready = false;
                        stack.push(prev);
                    }
                }
            }
            if ready {
                layers[n.index()] = Some(deepest + 1);
                stack.pop();
            }
        }
        layers[node.index()].unwrap_or(0)
    }

    /// Calculate the circuit depth.
    pub fn depth(&self) -> usize {
        self.outputs
            .values()
            .filter_map(|&out| self.slot(out).ok()?.links.first()?.prev)
            .filter(|&p| self.is_op(p))
            .map(|p| self.layer_of(p))
            .max()
            .unwrap_or(0)
    }

    /// Operation counts by name.
    pub fn count_ops(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for (_, inst) in self.op_nodes() {
            *counts.entry(inst.name().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Verify the structural integrity of the DAG.
    ///
    /// Checks that every wire runs from its `In` to its `Out` sentinel with
    /// consistent back links, that every operation is reached exactly once
    /// per wire it declares, and that the graph is acyclic.
    pub fn verify_integrity(&self) -> IrResult<()> {
        let mut visits: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        for (&wire, &input) in &self.inputs {
            let output = *self
                .outputs
                .get(&wire)
                .ok_or_else(|| IrError::InvalidDag(format!("Wire {wire} has no Out node")))?;
            let mut current = input;
            let mut steps = 0;
            while current != output {
                let next = self
                    .slot(current)?
                    .link(wire)
                    .and_then(|l| l.next)
                    .ok_or_else(|| {
                        IrError::InvalidDag(format!("Wire {wire} is broken after {current:?}"))
                    })?;
                let back = self.slot(next)?.link(wire).and_then(|l| l.prev);
                if back != Some(current) {
                    return Err(IrError::InvalidDag(format!(
                        "Wire {wire}: {next:?} does not link back to {current:?}"
                    )));
                }
                if self.is_op(next) {
                    *visits.entry(next).or_insert(0) += 1;
                }
                current = next;
                steps += 1;
                if steps > self.slots.len() {
                    return Err(IrError::InvalidDag(format!(
                        "Wire {wire} does not terminate"
                    )));
                }
            }
        }

        let mut live = 0;
        for (idx, inst) in self.op_nodes() {
            live += 1;
            let links = self.slot(idx)?.links.as_slice();
            let declared = inst.wires();
            if declared.len() != links.len() || declared.iter().zip(links).any(|(w, l)| *w != l.wire)
            {
                return Err(IrError::InvalidDag(format!(
                    "Node {idx:?} links disagree with its operands"
                )));
            }
            if visits.get(&idx).copied().unwrap_or(0) != links.len() {
                return Err(IrError::InvalidDag(format!(
                    "Node {idx:?} is not threaded on all of its wires"
                )));
            }
        }
        if live != self.num_ops {
            return Err(IrError::InvalidDag(format!(
                "Operation count {} disagrees with {live} live nodes",
                self.num_ops
            )));
        }

        if petgraph::algo::is_cyclic_directed(&self.wire_graph()) {
            return Err(IrError::InvalidDag("Graph contains a cycle".into()));
        }
        Ok(())
    }

    /// The wire structure as a petgraph graph (one edge per link).
    pub fn wire_graph(&self) -> DiGraph<NodeIndex, WireId, u32> {
        let mut graph = DiGraph::default();
        let mut ids = FxHashMap::default();
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.is_some() {
                let idx = NodeIndex::from_slot(i);
                ids.insert(idx, graph.add_node(idx));
            }
        }
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            let to = ids[&NodeIndex::from_slot(i)];
            for link in &slot.links {
                if let Some(from) = link.prev.and_then(|p| ids.get(&p)) {
                    graph.add_edge(*from, to, link.wire);
                }
            }
        }
        graph
    }
}
