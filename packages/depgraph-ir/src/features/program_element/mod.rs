//! Program element model
//!
//! The semantic tree the graphs are built over: statements, expressions,
//! methods, classes, variable declarations, plus the variable/scope model and
//! the def/use analyzer.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::source_model::SourceModel;
pub use domain::element::{
    ElementKind, ElementStore, ExpressionCategory, ProgramElement, StatementCategory,
    VariableCategory,
};
pub use domain::scope::{ScopeId, ScopeManager};
pub use domain::var::{DefCertainty, UseCertainty, VarDef, VarUse};
pub use infrastructure::def_use::{DefUseConfig, DefUseState, MethodDefHeuristics};
