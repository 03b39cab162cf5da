//! Feature modules
//!
//! Vertical slices of the engine, in pipeline order:
//! program_element -> lowering -> flow_graph -> pdg

pub mod flow_graph;
pub mod lowering;
pub mod pdg;
pub mod program_element;
