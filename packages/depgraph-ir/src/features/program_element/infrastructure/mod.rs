//! Program element analyses

pub mod def_use;
