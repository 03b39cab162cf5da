//! Serializable output models

pub mod def_use_json;

pub use def_use_json::{DefUseJson, ScopeJson, VariableJson};
