/*
 * CFG (Control Flow Graph) Model
 *
 * Nodes are interned per program element; a graph is a set of node handles
 * plus an enter node, exit nodes, and the jump statements still waiting for
 * their loop or switch. Edges are value records identified by
 * (from.id, to.id, edge type); the control label is carried but not part of
 * edge identity.
 */

use std::cmp::Ordering;
use std::collections::{BTreeSet, VecDeque};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::shared::models::ElementId;

use super::super::infrastructure::node_factory::CFGNodeFactory;

/// CFG node variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CFGNodeKind {
    Statement,
    Expression,
    Control,
    Break,
    Continue,
    SwitchCase,
    /// Fake placeholder spliced out after building
    Pseudo,
}

/// CFG edge variants
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum CFGEdgeKind {
    Normal,
    /// True/false branch out of a control node
    Control(bool),
    /// Out of a break or continue statement
    Jump,
}

impl CFGEdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CFGEdgeKind::Control(_) => "control",
            CFGEdgeKind::Jump => "jump",
            CFGEdgeKind::Normal => "normal",
        }
    }

    pub fn control_label(&self) -> Option<bool> {
        match self {
            CFGEdgeKind::Control(label) => Some(*label),
            _ => None,
        }
    }
}

/// A CFG edge; identity and order are the (from, to, type) tuple
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CFGEdge {
    pub from: ElementId,
    pub to: ElementId,
    pub kind: CFGEdgeKind,
}

impl PartialEq for CFGEdge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CFGEdge {}

impl PartialOrd for CFGEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CFGEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.from, self.to, self.kind.as_str()).cmp(&(other.from, other.to, other.kind.as_str()))
    }
}

impl Hash for CFGEdge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.from.hash(state);
        self.to.hash(state);
        self.kind.as_str().hash(state);
    }
}

/// The control flow graph of a block (usually a method)
#[derive(Debug)]
pub struct ControlFlowGraph {
    /// The element this CFG was built for; None builds a pseudo graph
    pub core: Option<ElementId>,
    pub(crate) nodes: BTreeSet<ElementId>,
    pub(crate) enter: Option<ElementId>,
    pub(crate) exits: BTreeSet<ElementId>,
    /// Break statements waiting for an enclosing loop or switch
    pub(crate) pending_breaks: VecDeque<ElementId>,
    /// Continue statements waiting for an enclosing loop
    pub(crate) pending_continues: VecDeque<ElementId>,
    pub(crate) built: bool,
}

impl ControlFlowGraph {
    pub fn new(core: Option<ElementId>) -> Self {
        Self {
            core,
            nodes: BTreeSet::new(),
            enter: None,
            exits: BTreeSet::new(),
            pending_breaks: VecDeque::new(),
            pending_continues: VecDeque::new(),
            built: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn enter_node(&self) -> Option<ElementId> {
        self.enter
    }

    pub fn exit_nodes(&self) -> BTreeSet<ElementId> {
        self.exits.clone()
    }

    pub fn all_nodes(&self) -> BTreeSet<ElementId> {
        self.nodes.clone()
    }

    pub fn contains(&self, node: ElementId) -> bool {
        self.nodes.contains(&node)
    }

    /// Nodes reachable from the enter node
    pub fn reachable_nodes(&self, factory: &CFGNodeFactory) -> BTreeSet<ElementId> {
        self.reachable_from(factory, self.enter)
    }

    /// Nodes reachable from a start node
    pub fn reachable_from(
        &self,
        factory: &CFGNodeFactory,
        start: Option<ElementId>,
    ) -> BTreeSet<ElementId> {
        let mut reachable = BTreeSet::new();
        let mut worklist: Vec<ElementId> = start.into_iter().collect();
        while let Some(node) = worklist.pop() {
            if !reachable.insert(node) {
                continue;
            }
            for next in factory.forward_nodes(node) {
                if !reachable.contains(&next) {
                    worklist.push(next);
                }
            }
        }
        reachable
    }

    /// Splice all SwitchCase nodes out, rewiring backward x forward neighbor
    /// pairs with edges of the incoming kind
    pub fn remove_switch_cases(&mut self, factory: &CFGNodeFactory) {
        let snapshot: Vec<ElementId> = self.nodes.iter().copied().collect();
        for node in snapshot {
            if factory.node_kind(node) != CFGNodeKind::SwitchCase {
                continue;
            }
            for edge in factory.backward_edges(node) {
                for to in factory.forward_nodes(node) {
                    match edge.kind {
                        CFGEdgeKind::Control(label) => {
                            factory.connect_control(edge.from, to, label)
                        }
                        _ => factory.connect(edge.from, to),
                    }
                }
            }
            factory.remove_node_links(node);
            self.nodes.remove(&node);
        }
    }

    /// Splice all Break / Continue nodes out, rewiring neighbor pairs with
    /// jump edges
    pub fn remove_jump_statements(&mut self, factory: &CFGNodeFactory) {
        let snapshot: Vec<ElementId> = self.nodes.iter().copied().collect();
        for node in snapshot {
            if !matches!(
                factory.node_kind(node),
                CFGNodeKind::Break | CFGNodeKind::Continue
            ) {
                continue;
            }
            for from in factory.backward_nodes(node) {
                for to in factory.forward_nodes(node) {
                    factory.connect_jump(from, to);
                }
            }
            factory.remove_node_links(node);
            self.nodes.remove(&node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: u32, to: u32, kind: CFGEdgeKind) -> CFGEdge {
        CFGEdge {
            from: ElementId(from),
            to: ElementId(to),
            kind,
        }
    }

    #[test]
    fn test_edge_identity_is_endpoint_and_type() {
        assert_eq!(
            edge(1, 2, CFGEdgeKind::Normal),
            edge(1, 2, CFGEdgeKind::Normal)
        );
        assert_ne!(
            edge(1, 2, CFGEdgeKind::Normal),
            edge(1, 3, CFGEdgeKind::Normal)
        );
        assert_ne!(edge(1, 2, CFGEdgeKind::Normal), edge(1, 2, CFGEdgeKind::Jump));
        // The control label is not part of edge identity
        assert_eq!(
            edge(1, 2, CFGEdgeKind::Control(true)),
            edge(1, 2, CFGEdgeKind::Control(false))
        );
    }

    #[test]
    fn test_edge_order_is_from_then_to_then_type() {
        let mut set = BTreeSet::new();
        set.insert(edge(2, 1, CFGEdgeKind::Normal));
        set.insert(edge(1, 5, CFGEdgeKind::Normal));
        set.insert(edge(1, 2, CFGEdgeKind::Normal));
        let ordered: Vec<_> = set.iter().map(|e| (e.from.0, e.to.0)).collect();
        assert_eq!(ordered, vec![(1, 2), (1, 5), (2, 1)]);
    }
}
