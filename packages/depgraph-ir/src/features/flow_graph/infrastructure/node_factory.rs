/*
 * CFG Node Factory
 *
 * Interning factory keyed by program element id: make* returns the existing
 * node when one exists, so one element maps to one node for the lifetime of
 * the factory. Insertion is serialized behind a lock. The factory also owns
 * the adjacency: edges live in the from-node's forward set and are mirrored
 * in the to-node's backward set.
 *
 * A pseudo node carries a fresh element id drawn from the same process-wide
 * counter, so node ordering stays total.
 */

use std::collections::BTreeSet;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::features::flow_graph::domain::cfg::{CFGEdge, CFGEdgeKind, CFGNodeKind};
use crate::features::program_element::domain::element::{
    ElementKind, ElementStore, StatementCategory,
};
use crate::shared::models::ElementId;

#[derive(Debug)]
struct NodeData {
    kind: CFGNodeKind,
    /// Backing program element; None for pseudo nodes
    pe: Option<ElementId>,
    forward: BTreeSet<CFGEdge>,
    backward: BTreeSet<CFGEdge>,
}

#[derive(Debug, Default)]
struct FactoryState {
    nodes: FxHashMap<ElementId, NodeData>,
}

impl FactoryState {
    fn node(&self, id: ElementId) -> &NodeData {
        self.nodes
            .get(&id)
            .unwrap_or_else(|| panic!("unknown CFG node {id}"))
    }

    fn node_mut(&mut self, id: ElementId) -> &mut NodeData {
        self.nodes
            .get_mut(&id)
            .unwrap_or_else(|| panic!("unknown CFG node {id}"))
    }

    fn add_edge(&mut self, edge: CFGEdge) {
        assert!(
            self.nodes.contains_key(&edge.from) && self.nodes.contains_key(&edge.to),
            "CFG edge endpoints must be registered nodes"
        );
        self.node_mut(edge.from).forward.insert(edge);
        self.node_mut(edge.to).backward.insert(edge);
    }
}

/// The factory to generate CFG nodes
#[derive(Debug, Default)]
pub struct CFGNodeFactory {
    state: Mutex<FactoryState>,
}

impl CFGNodeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make (or return) the node for a "non-control" element: Break,
    /// Continue, Case and plain statements / expressions. A missing element
    /// produces a fresh pseudo node.
    pub fn make_normal_node(&self, store: &ElementStore, pe: Option<ElementId>) -> ElementId {
        let mut state = self.state.lock();
        let Some(pe) = pe else {
            return Self::insert_pseudo(&mut state);
        };
        if state.nodes.contains_key(&pe) {
            return pe;
        }
        let kind = match &store.element(pe).kind {
            ElementKind::Statement(data) => match data.category {
                StatementCategory::Break => CFGNodeKind::Break,
                StatementCategory::Continue => CFGNodeKind::Continue,
                StatementCategory::Case => CFGNodeKind::SwitchCase,
                _ => CFGNodeKind::Statement,
            },
            ElementKind::Expression(_) => CFGNodeKind::Expression,
            _ => panic!("normal CFG node over a non statement/expression element"),
        };
        state.nodes.insert(
            pe,
            NodeData {
                kind,
                pe: Some(pe),
                forward: BTreeSet::new(),
                backward: BTreeSet::new(),
            },
        );
        pe
    }

    /// Make (or return) the control node for a condition element. A missing
    /// condition produces a fresh pseudo node.
    pub fn make_control_node(&self, store: &ElementStore, pe: Option<ElementId>) -> ElementId {
        let mut state = self.state.lock();
        let Some(pe) = pe else {
            return Self::insert_pseudo(&mut state);
        };
        if state.nodes.contains_key(&pe) {
            return pe;
        }
        match &store.element(pe).kind {
            ElementKind::Expression(_) | ElementKind::VariableDeclaration(_) => {}
            _ => panic!("control CFG node over a non condition element"),
        }
        state.nodes.insert(
            pe,
            NodeData {
                kind: CFGNodeKind::Control,
                pe: Some(pe),
                forward: BTreeSet::new(),
                backward: BTreeSet::new(),
            },
        );
        pe
    }

    fn insert_pseudo(state: &mut FactoryState) -> ElementId {
        let id = ElementId::next();
        state.nodes.insert(
            id,
            NodeData {
                kind: CFGNodeKind::Pseudo,
                pe: None,
                forward: BTreeSet::new(),
                backward: BTreeSet::new(),
            },
        );
        id
    }

    /// Whether an element has an interned node
    pub fn has_node(&self, pe: ElementId) -> bool {
        self.state.lock().nodes.contains_key(&pe)
    }

    pub fn node_kind(&self, node: ElementId) -> CFGNodeKind {
        self.state.lock().node(node).kind
    }

    /// Backing element of a node; None for pseudo nodes
    pub fn pe_of(&self, node: ElementId) -> Option<ElementId> {
        self.state.lock().node(node).pe
    }

    /// Render a node as `<text> <startLine>` or `<text> <start...end>`
    pub fn node_text(&self, store: &ElementStore, node: ElementId) -> String {
        match self.pe_of(node) {
            Some(pe) => {
                let element = store.element(pe);
                format!("{} <{}>", element.text, element.span.render())
            }
            None => "<pseudo>".to_string(),
        }
    }

    // ------------------------- edges -------------------------

    /// General edge constructor: control nodes emit a false-labeled control
    /// edge, jump statements a jump edge, everything else a normal edge
    pub fn connect(&self, from: ElementId, to: ElementId) {
        let mut state = self.state.lock();
        let kind = match state.node(from).kind {
            CFGNodeKind::Control => CFGEdgeKind::Control(false),
            CFGNodeKind::Break | CFGNodeKind::Continue => CFGEdgeKind::Jump,
            _ => CFGEdgeKind::Normal,
        };
        state.add_edge(CFGEdge { from, to, kind });
    }

    /// Control edge with an explicit label; only meaningful out of a control
    /// node, a pseudo source degrades to a normal edge
    pub fn connect_control(&self, from: ElementId, to: ElementId, label: bool) {
        let mut state = self.state.lock();
        let kind = match state.node(from).kind {
            CFGNodeKind::Control => CFGEdgeKind::Control(label),
            _ => CFGEdgeKind::Normal,
        };
        state.add_edge(CFGEdge { from, to, kind });
    }

    pub fn connect_jump(&self, from: ElementId, to: ElementId) {
        let mut state = self.state.lock();
        state.add_edge(CFGEdge {
            from,
            to,
            kind: CFGEdgeKind::Jump,
        });
    }

    pub fn forward_edges(&self, node: ElementId) -> Vec<CFGEdge> {
        self.state.lock().node(node).forward.iter().copied().collect()
    }

    pub fn backward_edges(&self, node: ElementId) -> Vec<CFGEdge> {
        self.state.lock().node(node).backward.iter().copied().collect()
    }

    /// Successor nodes, ascending by element id
    pub fn forward_nodes(&self, node: ElementId) -> Vec<ElementId> {
        let state = self.state.lock();
        let set: BTreeSet<ElementId> = state.node(node).forward.iter().map(|e| e.to).collect();
        set.into_iter().collect()
    }

    /// Predecessor nodes, ascending by element id
    pub fn backward_nodes(&self, node: ElementId) -> Vec<ElementId> {
        let state = self.state.lock();
        let set: BTreeSet<ElementId> = state.node(node).backward.iter().map(|e| e.from).collect();
        set.into_iter().collect()
    }

    /// Remove the first forward edge of `node` leading to `target`
    pub fn remove_forward_node(&self, node: ElementId, target: ElementId) -> bool {
        let mut state = self.state.lock();
        let found = state
            .node(node)
            .forward
            .iter()
            .find(|e| e.to == target)
            .copied();
        match found {
            Some(edge) => state.node_mut(node).forward.remove(&edge),
            None => false,
        }
    }

    /// Remove the first backward edge of `node` coming from `target`
    pub fn remove_backward_node(&self, node: ElementId, target: ElementId) -> bool {
        let mut state = self.state.lock();
        let found = state
            .node(node)
            .backward
            .iter()
            .find(|e| e.from == target)
            .copied();
        match found {
            Some(edge) => state.node_mut(node).backward.remove(&edge),
            None => false,
        }
    }

    /// Detach a node from all neighbors (both directions) and clear its sets
    pub fn remove_node_links(&self, node: ElementId) {
        let mut state = self.state.lock();
        let backward: Vec<CFGEdge> = state.node(node).backward.iter().copied().collect();
        let forward: Vec<CFGEdge> = state.node(node).forward.iter().copied().collect();
        for edge in backward {
            state.node_mut(edge.from).forward.remove(&edge);
        }
        for edge in forward {
            state.node_mut(edge.to).backward.remove(&edge);
        }
        let data = state.node_mut(node);
        data.forward.clear();
        data.backward.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::program_element::domain::element::{
        ExpressionCategory, ExpressionData, ProgramElement, StatementData,
    };
    use crate::shared::models::LineSpan;

    fn statement(store: &mut ElementStore, category: StatementCategory) -> ElementId {
        store.insert(ProgramElement::new(
            ElementKind::Statement(StatementData::new(category, None)),
            LineSpan::new(1, 1),
        ))
    }

    fn expression(store: &mut ElementStore) -> ElementId {
        store.insert(ProgramElement::new(
            ElementKind::Expression(ExpressionData::new(ExpressionCategory::SimpleName)),
            LineSpan::new(1, 1),
        ))
    }

    #[test]
    fn test_interning_returns_the_same_node() {
        let mut store = ElementStore::new();
        let factory = CFGNodeFactory::new();
        let stmt = statement(&mut store, StatementCategory::Expression);
        let a = factory.make_normal_node(&store, Some(stmt));
        let b = factory.make_normal_node(&store, Some(stmt));
        assert_eq!(a, b);
    }

    #[test]
    fn test_node_kind_dispatch() {
        let mut store = ElementStore::new();
        let factory = CFGNodeFactory::new();
        let brk = statement(&mut store, StatementCategory::Break);
        let cont = statement(&mut store, StatementCategory::Continue);
        let case = statement(&mut store, StatementCategory::Case);
        let expr = expression(&mut store);
        assert_eq!(
            factory.node_kind(factory.make_normal_node(&store, Some(brk))),
            CFGNodeKind::Break
        );
        assert_eq!(
            factory.node_kind(factory.make_normal_node(&store, Some(cont))),
            CFGNodeKind::Continue
        );
        assert_eq!(
            factory.node_kind(factory.make_normal_node(&store, Some(case))),
            CFGNodeKind::SwitchCase
        );
        assert_eq!(
            factory.node_kind(factory.make_normal_node(&store, Some(expr))),
            CFGNodeKind::Expression
        );
        assert_eq!(
            factory.node_kind(factory.make_control_node(&store, Some(expr))),
            CFGNodeKind::Expression,
            "an interned node keeps its first kind"
        );
        assert_eq!(
            factory.node_kind(factory.make_normal_node(&store, None)),
            CFGNodeKind::Pseudo
        );
    }

    #[test]
    fn test_edges_are_mirrored() {
        let mut store = ElementStore::new();
        let factory = CFGNodeFactory::new();
        let first = statement(&mut store, StatementCategory::Expression);
        let second = statement(&mut store, StatementCategory::Return);
        let a = factory.make_normal_node(&store, Some(first));
        let b = factory.make_normal_node(&store, Some(second));
        factory.connect(a, b);

        let forward = factory.forward_edges(a);
        let backward = factory.backward_edges(b);
        assert_eq!(forward.len(), 1);
        assert_eq!(forward, backward);
        assert_eq!(forward[0].kind.as_str(), "normal");
    }

    #[test]
    fn test_jump_and_control_edge_kinds() {
        let mut store = ElementStore::new();
        let factory = CFGNodeFactory::new();
        let break_stmt = statement(&mut store, StatementCategory::Break);
        let condition = expression(&mut store);
        let next_stmt = statement(&mut store, StatementCategory::Expression);
        let brk = factory.make_normal_node(&store, Some(break_stmt));
        let cond = factory.make_control_node(&store, Some(condition));
        let next = factory.make_normal_node(&store, Some(next_stmt));

        factory.connect(brk, next);
        assert_eq!(factory.forward_edges(brk)[0].kind.as_str(), "jump");

        factory.connect(cond, next);
        assert_eq!(
            factory.forward_edges(cond)[0].kind.control_label(),
            Some(false)
        );
        factory.connect_control(cond, brk, true);
        let labels: Vec<_> = factory
            .forward_edges(cond)
            .iter()
            .map(|e| e.kind.control_label())
            .collect();
        assert!(labels.contains(&Some(true)));
    }
}
