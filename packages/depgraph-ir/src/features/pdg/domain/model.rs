/*
 * PDG Model
 *
 * Node kinds, edge kinds, and the builder configuration. PDG edges are value
 * records like CFG edges; identity and order are the (from, to, type) tuple
 * with types ordered control < data < execution. The edge label (control
 * branch, data variable) rides along but is not part of edge identity, so a
 * node pair carries at most one edge of each type.
 */

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::shared::models::ElementId;

/// PDG node variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PDGNodeKind {
    /// The fake enter node of a method
    MethodEnter,
    Parameter,
    Control,
    Expression,
    Statement,
}

/// PDG edge variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PDGEdgeKind {
    Control { true_dependence: bool },
    Data { variable: String },
    Execution,
}

impl PDGEdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PDGEdgeKind::Control { .. } => "control",
            PDGEdgeKind::Data { .. } => "data",
            PDGEdgeKind::Execution => "execution",
        }
    }
}

/// A PDG edge; identity and order are the (from, to, type) tuple
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PDGEdge {
    pub from: ElementId,
    pub to: ElementId,
    pub kind: PDGEdgeKind,
}

impl PDGEdge {
    pub fn is_data(&self) -> bool {
        matches!(self.kind, PDGEdgeKind::Data { .. })
    }

    pub fn is_control(&self) -> bool {
        matches!(self.kind, PDGEdgeKind::Control { .. })
    }

    pub fn is_execution(&self) -> bool {
        matches!(self.kind, PDGEdgeKind::Execution)
    }

    /// Variable name of a data edge
    pub fn variable(&self) -> Option<&str> {
        match &self.kind {
            PDGEdgeKind::Data { variable } => Some(variable),
            _ => None,
        }
    }

    /// Branch label of a control edge
    pub fn true_dependence(&self) -> Option<bool> {
        match &self.kind {
            PDGEdgeKind::Control { true_dependence } => Some(*true_dependence),
            _ => None,
        }
    }
}

impl PartialEq for PDGEdge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PDGEdge {}

impl PartialOrd for PDGEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PDGEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.from, self.to, self.kind.as_str()).cmp(&(other.from, other.to, other.kind.as_str()))
    }
}

impl Hash for PDGEdge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.from.hash(state);
        self.to.hash(state);
        self.kind.as_str().hash(state);
    }
}

/// PDG builder configuration
#[derive(Debug, Clone, Copy)]
pub struct PdgOptions {
    pub build_control_dependence: bool,
    pub build_data_dependence: bool,
    pub build_execution_dependence: bool,
    /// Control edge from the enter node to every node
    pub control_from_enter_to_all: bool,
    /// Control edges from the enter node to the parameter nodes
    pub control_from_enter_to_parameters: bool,
    /// A MayDef kills reaching definitions like a Def would
    pub treat_may_def_as_def: bool,
    /// A MayUse receives data edges like a Use would
    pub treat_may_use_as_use: bool,
}

impl Default for PdgOptions {
    fn default() -> Self {
        Self {
            build_control_dependence: true,
            build_data_dependence: true,
            build_execution_dependence: true,
            control_from_enter_to_all: false,
            control_from_enter_to_parameters: false,
            treat_may_def_as_def: false,
            treat_may_use_as_use: true,
        }
    }
}

impl PdgOptions {
    /// Data dependence only: the DDG configuration
    pub fn ddg() -> Self {
        Self {
            build_control_dependence: false,
            build_execution_dependence: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: u32, to: u32, kind: PDGEdgeKind) -> PDGEdge {
        PDGEdge {
            from: ElementId(from),
            to: ElementId(to),
            kind,
        }
    }

    #[test]
    fn test_edge_identity_ignores_labels() {
        assert_eq!(
            edge(1, 2, PDGEdgeKind::Data { variable: "x".into() }),
            edge(1, 2, PDGEdgeKind::Data { variable: "y".into() })
        );
        assert_eq!(
            edge(1, 2, PDGEdgeKind::Control { true_dependence: true }),
            edge(1, 2, PDGEdgeKind::Control { true_dependence: false })
        );
        assert_ne!(
            edge(1, 2, PDGEdgeKind::Data { variable: "x".into() }),
            edge(1, 2, PDGEdgeKind::Execution)
        );
    }

    #[test]
    fn test_edge_type_order() {
        let mut set = std::collections::BTreeSet::new();
        set.insert(edge(1, 2, PDGEdgeKind::Execution));
        set.insert(edge(1, 2, PDGEdgeKind::Data { variable: "x".into() }));
        set.insert(edge(1, 2, PDGEdgeKind::Control { true_dependence: true }));
        let tags: Vec<&str> = set.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(tags, vec!["control", "data", "execution"]);
    }

    #[test]
    fn test_ddg_options() {
        let options = PdgOptions::ddg();
        assert!(!options.build_control_dependence);
        assert!(options.build_data_dependence);
        assert!(!options.build_execution_dependence);
        assert!(options.treat_may_use_as_use);
        assert!(!options.treat_may_def_as_def);
    }
}
