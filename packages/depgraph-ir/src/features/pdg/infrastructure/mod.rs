//! Program dependence graph infrastructure

pub mod node_factory;
pub mod pdg;
