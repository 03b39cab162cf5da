//! Program dependence graph domain model

pub mod model;
