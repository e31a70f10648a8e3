//! Client error types
//!
//! Error definitions with transient/permanent classification.

use thiserror::Error;

/// Error that can occur while talking to the remote data service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Failed to establish a connection to the service.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The service rejected the provided credentials.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// Client configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The service rejected a submitted statement outright.
    #[error("statement rejected: {message}")]
    StatementRejected { message: String },

    /// A submitted job ran but did not complete successfully.
    #[error("job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    /// A submitted job did not reach a terminal state within the poll budget.
    #[error("job {job_id} did not complete within {budget_secs} seconds")]
    JobTimeout { job_id: String, budget_secs: u64 },

    /// The service returned a payload the client could not decode.
    #[error("invalid response from server: {message}")]
    InvalidResponse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ClientError {
    /// Check if this error is transient and a fresh run may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectionFailed { .. } | ClientError::JobTimeout { .. }
        )
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ClientError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ClientError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        ClientError::InvalidResponse {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid response error with source.
    pub fn invalid_response_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ClientError::InvalidResponse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a statement rejected error.
    pub fn statement_rejected(message: impl Into<String>) -> Self {
        ClientError::StatementRejected {
            message: message.into(),
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ClientError::connection_failed("down").is_transient());
        assert!(
            ClientError::JobTimeout {
                job_id: "abc".to_string(),
                budget_secs: 60,
            }
            .is_transient()
        );
        assert!(!ClientError::AuthenticationFailed.is_transient());
        assert!(!ClientError::statement_rejected("syntax").is_transient());
    }

    #[test]
    fn error_display() {
        let err = ClientError::JobFailed {
            job_id: "1a2b".to_string(),
            message: "out of memory".to_string(),
        };
        assert_eq!(err.to_string(), "job 1a2b failed: out of memory");

        assert_eq!(
            ClientError::AuthenticationFailed.to_string(),
            "authentication failed: invalid credentials"
        );
    }

    #[test]
    fn error_with_source() {
        let source_err = std::io::Error::other("underlying");
        let err = ClientError::connection_failed_with_source("failed", source_err);

        if let ClientError::ConnectionFailed { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("Expected ConnectionFailed variant");
        }
    }
}
