//! Control flow graphs
//!
//! Per-method CFG with typed nodes and typed edges, built structurally from
//! the statement tree: loops, switch, try/catch/finally, labeled jumps, and
//! pseudo-node elimination.

pub mod domain;
pub mod infrastructure;

pub use domain::cfg::{CFGEdge, CFGEdgeKind, CFGNodeKind, ControlFlowGraph};
pub use infrastructure::node_factory::CFGNodeFactory;
