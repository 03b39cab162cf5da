//! Program element application layer

pub mod source_model;
