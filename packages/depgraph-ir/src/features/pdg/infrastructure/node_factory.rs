/*
 * PDG Node Factory
 *
 * Interning factory keyed by program element id, serialized behind a lock.
 * The method-enter node is synthetic: it wraps a fresh MethodEnter element
 * id spanning the method's lines and is interned under the method's id, so
 * repeated lookups return the same node. Edges live in the from-node's
 * forward set and are mirrored in the to-node's backward set.
 */

use std::collections::BTreeSet;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::features::flow_graph::domain::cfg::CFGNodeKind;
use crate::features::flow_graph::infrastructure::node_factory::CFGNodeFactory;
use crate::features::pdg::domain::model::{PDGEdge, PDGNodeKind};
use crate::features::program_element::domain::element::{ElementKind, ElementStore};
use crate::shared::models::{ElementId, LineSpan};

#[derive(Debug)]
struct NodeData {
    /// The node's own element id (fresh for the synthetic enter node)
    element: ElementId,
    /// Backing program element (the method, for the enter node)
    pe: ElementId,
    kind: PDGNodeKind,
    span: LineSpan,
    forward: BTreeSet<PDGEdge>,
    backward: BTreeSet<PDGEdge>,
}

#[derive(Debug, Default)]
struct FactoryState {
    /// Maps both the backing element id and the node's own element id
    by_element: FxHashMap<ElementId, usize>,
    nodes: Vec<NodeData>,
}

impl FactoryState {
    fn index_of(&self, element: ElementId) -> usize {
        *self
            .by_element
            .get(&element)
            .unwrap_or_else(|| panic!("unknown PDG node {element}"))
    }
}

/// The factory to generate PDG nodes
#[derive(Debug, Default)]
pub struct PDGNodeFactory {
    state: Mutex<FactoryState>,
}

impl PDGNodeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the PDG node matching a CFG node
    pub fn make_node_from_cfg(
        &self,
        store: &ElementStore,
        cfg_factory: &CFGNodeFactory,
        cfg_node: ElementId,
    ) -> ElementId {
        let pe = cfg_factory
            .pe_of(cfg_node)
            .expect("PDG node over a pseudo CFG node");
        match cfg_factory.node_kind(cfg_node) {
            CFGNodeKind::Control => self.make_control_node(store, pe),
            CFGNodeKind::Pseudo => panic!("PDG node over a pseudo CFG node"),
            _ => self.make_normal_node(store, pe),
        }
    }

    /// Control node over a condition element, or the synthetic enter node
    /// over a method
    pub fn make_control_node(&self, store: &ElementStore, pe: ElementId) -> ElementId {
        let mut state = self.state.lock();
        if let Some(&index) = state.by_element.get(&pe) {
            return state.nodes[index].element;
        }
        let element = store.element(pe);
        let (node_element, kind) = match &element.kind {
            ElementKind::Expression(_) | ElementKind::VariableDeclaration(_) => {
                (pe, PDGNodeKind::Control)
            }
            // The fake enter node wraps a fresh element spanning the method
            ElementKind::Method(_) => (ElementId::next(), PDGNodeKind::MethodEnter),
            _ => panic!("control PDG node over an unexpected element"),
        };
        let index = state.nodes.len();
        state.nodes.push(NodeData {
            element: node_element,
            pe,
            kind,
            span: element.span,
            forward: BTreeSet::new(),
            backward: BTreeSet::new(),
        });
        state.by_element.insert(pe, index);
        state.by_element.insert(node_element, index);
        node_element
    }

    /// Normal node over a statement, expression or parameter declaration
    pub fn make_normal_node(&self, store: &ElementStore, pe: ElementId) -> ElementId {
        let mut state = self.state.lock();
        if let Some(&index) = state.by_element.get(&pe) {
            return state.nodes[index].element;
        }
        let element = store.element(pe);
        let kind = match &element.kind {
            ElementKind::Expression(_) => PDGNodeKind::Expression,
            ElementKind::Statement(_) => PDGNodeKind::Statement,
            ElementKind::VariableDeclaration(_) => PDGNodeKind::Parameter,
            _ => panic!("normal PDG node over an unexpected element"),
        };
        let index = state.nodes.len();
        state.nodes.push(NodeData {
            element: pe,
            pe,
            kind,
            span: element.span,
            forward: BTreeSet::new(),
            backward: BTreeSet::new(),
        });
        state.by_element.insert(pe, index);
        pe
    }

    pub fn has_node(&self, element: ElementId) -> bool {
        self.state.lock().by_element.contains_key(&element)
    }

    pub fn node_kind(&self, element: ElementId) -> PDGNodeKind {
        let state = self.state.lock();
        let index = state.index_of(element);
        state.nodes[index].kind
    }

    /// Backing program element of a node
    pub fn pe_of(&self, element: ElementId) -> ElementId {
        let state = self.state.lock();
        let index = state.index_of(element);
        state.nodes[index].pe
    }

    pub fn span_of(&self, element: ElementId) -> LineSpan {
        let state = self.state.lock();
        let index = state.index_of(element);
        state.nodes[index].span
    }

    /// Render a node as `<text> <startLine>` or `<text> <start...end>`;
    /// the fake enter node renders as `Enter`
    pub fn node_text(&self, store: &ElementStore, element: ElementId) -> String {
        let (kind, pe, span) = {
            let state = self.state.lock();
            let index = state.index_of(element);
            let node = &state.nodes[index];
            (node.kind, node.pe, node.span)
        };
        let text = match kind {
            PDGNodeKind::MethodEnter => "Enter".to_string(),
            _ => store.element(pe).text.clone(),
        };
        format!("{} <{}>", text, span.render())
    }

    /// Insert an edge into its endpoints' forward / backward sets
    pub fn add_edge(&self, edge: PDGEdge) {
        let mut state = self.state.lock();
        let from = state.index_of(edge.from);
        let to = state.index_of(edge.to);
        state.nodes[from].forward.insert(edge.clone());
        state.nodes[to].backward.insert(edge);
    }

    pub fn forward_edges(&self, element: ElementId) -> Vec<PDGEdge> {
        let state = self.state.lock();
        let index = state.index_of(element);
        state.nodes[index].forward.iter().cloned().collect()
    }

    pub fn backward_edges(&self, element: ElementId) -> Vec<PDGEdge> {
        let state = self.state.lock();
        let index = state.index_of(element);
        state.nodes[index].backward.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pdg::domain::model::PDGEdgeKind;
    use crate::features::program_element::domain::element::{
        ExpressionCategory, ExpressionData, MethodData, ProgramElement, StatementCategory,
        StatementData, VariableCategory, VariableDeclarationData,
    };

    fn store_with_method() -> (ElementStore, ElementId) {
        let mut store = ElementStore::new();
        let method = store.insert(ProgramElement::new(
            ElementKind::Method(MethodData::new(Some("f".into()), false)),
            LineSpan::new(1, 5),
        ));
        (store, method)
    }

    #[test]
    fn test_method_enter_is_synthetic_and_interned() {
        let (store, method) = store_with_method();
        let factory = PDGNodeFactory::new();
        let enter = factory.make_control_node(&store, method);
        assert_ne!(enter, method, "the enter node wraps a fresh element");
        assert_eq!(factory.node_kind(enter), PDGNodeKind::MethodEnter);
        assert_eq!(factory.pe_of(enter), method);
        assert_eq!(factory.span_of(enter), LineSpan::new(1, 5));
        assert_eq!(factory.node_text(&store, enter), "Enter <1...5>");
        // interned under the method: a second request returns the same node
        assert_eq!(factory.make_control_node(&store, method), enter);
    }

    #[test]
    fn test_normal_node_dispatch() {
        let (mut store, _) = store_with_method();
        let factory = PDGNodeFactory::new();
        let stmt = store.insert(ProgramElement::new(
            ElementKind::Statement(StatementData::new(StatementCategory::Expression, None)),
            LineSpan::new(2, 2),
        ));
        let expr = store.insert(ProgramElement::new(
            ElementKind::Expression(ExpressionData::new(ExpressionCategory::SimpleName)),
            LineSpan::new(2, 2),
        ));
        let param = store.insert(ProgramElement::new(
            ElementKind::VariableDeclaration(VariableDeclarationData {
                category: VariableCategory::Parameter,
                type_name: "int".into(),
                name: "a".into(),
            }),
            LineSpan::new(1, 1),
        ));
        assert_eq!(
            factory.node_kind(factory.make_normal_node(&store, stmt)),
            PDGNodeKind::Statement
        );
        assert_eq!(
            factory.node_kind(factory.make_normal_node(&store, expr)),
            PDGNodeKind::Expression
        );
        assert_eq!(
            factory.node_kind(factory.make_normal_node(&store, param)),
            PDGNodeKind::Parameter
        );
    }

    #[test]
    fn test_edges_are_mirrored() {
        let (mut store, method) = store_with_method();
        let factory = PDGNodeFactory::new();
        let enter = factory.make_control_node(&store, method);
        let stmt = store.insert(ProgramElement::new(
            ElementKind::Statement(StatementData::new(StatementCategory::Return, None)),
            LineSpan::new(2, 2),
        ));
        let node = factory.make_normal_node(&store, stmt);

        factory.add_edge(PDGEdge {
            from: enter,
            to: node,
            kind: PDGEdgeKind::Execution,
        });
        assert_eq!(factory.forward_edges(enter), factory.backward_edges(node));
    }
}
