//! Control flow graph infrastructure

pub mod cfg_builder;
pub mod node_factory;
