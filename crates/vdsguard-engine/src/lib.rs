//! # vdsguard engine
//!
//! The reconciliation core: compares a declarative access-rule table
//! against snapshots of the remote service's authorization state and
//! issues only the statements needed to converge it.
//!
//! Two strategies, selected once per run:
//!
//! - **Coarse-grained** ([`grants::PrivilegeReconciler`]): per-dataset
//!   privilege grants and revocations.
//! - **Fine-grained** ([`policy::PolicyCompiler`]): per-user row predicates
//!   compiled into a server-side boolean policy function attached to the
//!   dataset's parent view.
//!
//! Both are convergent: a second run over unchanged rules issues no
//! create/grant DDL (revocations are deliberately always re-issued).
//! All remote interaction funnels through [`apply::Applier`] over the
//! client crate's `SqlTransport` seam.
//!
//! ## Crate Organization
//!
//! - [`catalog`] - Canonical paths and the fuzzy resolution utility
//! - [`context`] - Run-scoped snapshots of catalog/privilege/policy state
//! - [`rules`] - Rule rows, grouping, and the query/CSV loader
//! - [`grants`] - Coarse-grained privilege reconciliation
//! - [`policy`] - Fine-grained policy compilation and installation
//! - [`apply`] - The single statement choke point
//! - [`run`] - Sequential orchestration with per-dataset error boundaries
//! - [`error`] - Engine error types

pub mod apply;
pub mod catalog;
pub mod context;
pub mod error;
pub mod grants;
pub mod policy;
pub mod rules;
pub mod run;

pub use apply::Applier;
pub use catalog::{CanonicalPath, ObjectCatalog};
pub use context::{AccessMode, PolicyRecord, PrivilegeRecord, RunContext};
pub use error::{EngineError, EngineResult};
pub use grants::{GrantOptions, PrivilegeReconciler};
pub use policy::{PolicyCompiler, PolicyFunction};
pub use rules::{ColumnMap, Privilege, RuleLoader, RuleRow, RuleSet};
pub use run::{EngineOptions, Outcome, ReconcileEngine, RunSummary};
