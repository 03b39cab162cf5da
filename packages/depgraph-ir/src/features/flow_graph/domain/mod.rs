//! Control flow graph domain model

pub mod cfg;
