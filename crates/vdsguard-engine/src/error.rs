//! Engine error types
//!
//! Per-dataset failures (`DatasetNotFound`, `Statement`) are caught at the
//! dataset-group boundary by the engine loop and never abort sibling groups;
//! everything else propagates to the caller.

use thiserror::Error;
use vdsguard_client::ClientError;

/// Error that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No catalog entry matched the constructed target path.
    #[error("dataset not found: no catalog entry matches {path}")]
    DatasetNotFound { path: String },

    /// The remote service rejected or failed a statement.
    #[error("statement failed: {sql}")]
    Statement {
        sql: String,
        #[source]
        source: ClientError,
    },

    /// The rule source could not be read or decoded.
    #[error("rule source error: {message}")]
    RuleSource {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transport failure outside of a specific statement (snapshot reads).
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl EngineError {
    /// Create a rule source error.
    pub fn rule_source(message: impl Into<String>) -> Self {
        EngineError::RuleSource {
            message: message.into(),
            source: None,
        }
    }

    /// Create a rule source error with source.
    pub fn rule_source_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        EngineError::RuleSource {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
