//! AST -> program element lowering
//!
//! A single walk over the tree-sitter CST produces the PE forest. The walk
//! also descends into categories the model does not cover; the work stack's
//! safe-pop contract keeps those from poisoning the result.

pub mod infrastructure;

pub use infrastructure::java_lowering::lower_compilation_unit;
pub use infrastructure::work_stack::{ExpectedKind, WorkStack};
