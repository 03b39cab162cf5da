//! Program dependence graphs
//!
//! Data, control and execution dependence overlays on a node set derived
//! from the method's CFG.

pub mod domain;
pub mod infrastructure;

pub use domain::model::{PDGEdge, PDGEdgeKind, PDGNodeKind, PdgOptions};
pub use infrastructure::node_factory::PDGNodeFactory;
pub use infrastructure::pdg::ProgramDependenceGraph;
