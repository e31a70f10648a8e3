//! Statement applier
//!
//! The single choke point for every interaction with the remote service.
//! The applier never interprets statement semantics; it forwards the text
//! to the transport and classifies transport/service failures into
//! [`EngineError::Statement`].

use std::sync::Arc;

use tracing::debug;
use vdsguard_client::{SqlTransport, TabularResult};

use crate::error::{EngineError, EngineResult};

/// Executes statements against the remote service through the transport seam.
#[derive(Clone)]
pub struct Applier {
    transport: Arc<dyn SqlTransport>,
}

impl Applier {
    /// Create an applier over a connected transport.
    pub fn new(transport: Arc<dyn SqlTransport>) -> Self {
        Self { transport }
    }

    /// Run a mutating statement (DDL/DML); only success matters.
    pub async fn execute(&self, sql: &str) -> EngineResult<()> {
        debug!(sql, "executing statement");
        self.transport
            .run_statement(sql, false)
            .await
            .map(|_| ())
            .map_err(|source| EngineError::Statement {
                sql: sql.to_string(),
                source,
            })
    }

    /// Run a reading statement and decode its row set.
    pub async fn fetch(&self, sql: &str) -> EngineResult<TabularResult> {
        debug!(sql, "fetching rows");
        self.transport
            .run_statement(sql, true)
            .await
            .map_err(|source| EngineError::Statement {
                sql: sql.to_string(),
                source,
            })
    }
}

impl std::fmt::Debug for Applier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Applier").finish_non_exhaustive()
    }
}
