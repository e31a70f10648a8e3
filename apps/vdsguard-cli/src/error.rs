//! CLI error types and exit codes

use thiserror::Error;
use vdsguard_client::ClientError;
use vdsguard_engine::EngineError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error (including failed dataset groups)
/// - 2: Configuration error
/// - 3: Connection error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing mandatory configuration keys: {keys}")]
    MissingKeys { keys: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Connection failed: {0}")]
    Connection(#[source] ClientError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{failed} dataset group(s) failed to reconcile; see the log above")]
    ReconciliationFailed { failed: usize },
}

impl CliError {
    /// Exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::MissingKeys { .. } | CliError::Validation(_) => 2,
            CliError::Connection(_) => 3,
            _ => 1,
        }
    }

    /// Print the error and its cause chain to stderr.
    pub fn print(&self) {
        eprintln!("error: {self}");
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = std::error::Error::source(cause);
        }
    }
}
