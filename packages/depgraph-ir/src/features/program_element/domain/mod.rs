//! Program element domain model

pub mod element;
pub mod scope;
pub mod var;
