/*
 * depgraph-ir - Intraprocedural Dependence Graph Engine
 *
 * Feature-First Architecture:
 * - shared/      : Common models (LineSpan, ElementId)
 * - features/    : Vertical slices (program_element -> lowering -> flow_graph -> pdg)
 * - api/         : Serializable DDG output model
 * - pipeline/    : Driver orchestration (lowering -> CFG -> PDG per method)
 *
 * Per compilation unit the engine produces, method by method:
 * - a Control Flow Graph (execution successor relation),
 * - a Data Dependency Graph (definition-reaches-use relation),
 * - a Program Dependence Graph (data + control + execution overlays).
 */

#![allow(clippy::upper_case_acronyms)] // CFG, PDG, DDG naming
#![allow(clippy::new_without_default)] // explicit constructors preferred
#![allow(clippy::collapsible_if)] // branch structure mirrors the analysis rules

/// Shared models and utilities
pub mod shared;

/// Feature modules (program element model, lowering, CFG, PDG)
pub mod features;

/// Serializable output model
pub mod api;

/// Pipeline orchestration
pub mod pipeline;

/// Error types
pub mod errors;

pub use errors::{DepgraphError, Result};
pub use pipeline::driver::{AnalysisDriver, CfgResult, MethodCfg, MethodPdg, PdgResult};
