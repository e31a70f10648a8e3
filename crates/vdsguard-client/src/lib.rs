//! # vdsguard client
//!
//! Transport layer for vdsguard: a thin, typed client for the remote
//! tabular-data service's REST SQL surface.
//!
//! The reconciliation engine depends only on the [`SqlTransport`] trait;
//! [`DremioClient`] is the production implementation. Statements are
//! submitted as jobs, polled to a terminal state, and decoded into
//! [`TabularResult`] row sets when the caller expects rows.
//!
//! ## Crate Organization
//!
//! - [`config`] - Connection settings with validation and redaction
//! - [`error`] - Error types with transient classification
//! - [`client`] - The [`SqlTransport`] seam and the Dremio REST client
//! - [`result`] - Decoded tabular row sets

pub mod client;
pub mod config;
pub mod error;
pub mod result;

pub use client::{DremioClient, SqlTransport};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use result::{cell_str, Row, TabularResult};

// Re-export async_trait for transport implementors
pub use async_trait::async_trait;
