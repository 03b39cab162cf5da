//! Error types for depgraph-ir
//!
//! Provides unified error handling across the crate.

use thiserror::Error;

/// Main error type for depgraph-ir operations
#[derive(Debug, Error)]
pub enum DepgraphError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Analysis error
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DepgraphError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        DepgraphError::Parse(msg.into())
    }

    /// Create an analysis error
    pub fn analysis(msg: impl Into<String>) -> Self {
        DepgraphError::Analysis(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        DepgraphError::Config(msg.into())
    }
}

/// Result type alias for depgraph operations
pub type Result<T> = std::result::Result<T, DepgraphError>;
