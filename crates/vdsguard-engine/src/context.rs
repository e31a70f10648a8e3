//! Run context
//!
//! Run-scoped, immutable snapshots of the remote authorization state:
//! the object catalog, existing privilege grants, and existing policy
//! functions. Everything is fetched once by [`RunContext::initialize`]
//! before any dataset group is processed and never refreshed mid-run.
//!
//! Consequence (accepted trade-off): an action taken earlier in the run is
//! invisible to later idempotence checks in the same run, so a duplicate
//! rule can re-issue a statement. The service treats re-grants and
//! create-or-replace as no-ops, which is what makes this safe.

use tracing::{debug, info};
use uuid::Uuid;
use vdsguard_client::cell_str;

use crate::apply::Applier;
use crate::catalog::{contains_normalized, ObjectCatalog};
use crate::error::EngineResult;

const VIEWS_QUERY: &str = "SELECT path FROM sys.views";

const USER_PRIVILEGES_QUERY: &str = "SELECT grantee_id AS grantee, privilege, object_id AS object \
     FROM sys.privileges WHERE grantee_type = 'user'";

const ALL_PRIVILEGES_QUERY: &str =
    "SELECT grantee_id AS grantee, privilege, object_id AS object FROM sys.privileges";

const POLICIES_QUERY: &str = "SELECT name, \"sql\" AS policy FROM sys.user_defined_functions";

/// Which reconciliation strategy this run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Grant/revoke whole-object privileges.
    Coarse,
    /// Compile per-user row predicates into policy functions.
    FineGrained,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::Coarse => f.write_str("coarse"),
            AccessMode::FineGrained => f.write_str("fine-grained"),
        }
    }
}

/// An existing (grantee, privilege, object) triple on the service.
#[derive(Debug, Clone)]
pub struct PrivilegeRecord {
    pub grantee: String,
    pub privilege: String,
    pub object: String,
}

/// An existing policy function definition on the service.
#[derive(Debug, Clone)]
pub struct PolicyRecord {
    pub name: String,
    pub body: String,
}

/// Immutable snapshot state for one reconciliation run.
#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    catalog: ObjectCatalog,
    privileges: Vec<PrivilegeRecord>,
    policies: Vec<PolicyRecord>,
}

impl RunContext {
    /// Assemble a context from pre-fetched snapshots.
    pub fn from_parts(
        catalog: ObjectCatalog,
        privileges: Vec<PrivilegeRecord>,
        policies: Vec<PolicyRecord>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            catalog,
            privileges,
            policies,
        }
    }

    /// Fetch all snapshots the given mode needs.
    ///
    /// Coarse mode snapshots privileges; fine-grained mode snapshots policy
    /// functions. The catalog is always fetched.
    pub async fn initialize(
        applier: &Applier,
        mode: AccessMode,
        include_group_grantees: bool,
    ) -> EngineResult<Self> {
        let views = applier.fetch(VIEWS_QUERY).await?;
        let catalog = ObjectCatalog::from_raw_paths(views.column_values("path"));
        debug!(paths = catalog.len(), "catalog snapshot loaded");

        let privileges = match mode {
            AccessMode::Coarse => {
                let query = if include_group_grantees {
                    ALL_PRIVILEGES_QUERY
                } else {
                    USER_PRIVILEGES_QUERY
                };
                let result = applier.fetch(query).await?;
                result
                    .rows()
                    .iter()
                    .filter_map(|row| {
                        Some(PrivilegeRecord {
                            grantee: cell_str(row, "grantee")?,
                            privilege: cell_str(row, "privilege")?,
                            object: cell_str(row, "object")?,
                        })
                    })
                    .collect()
            }
            AccessMode::FineGrained => Vec::new(),
        };

        let policies = match mode {
            AccessMode::FineGrained => {
                let result = applier.fetch(POLICIES_QUERY).await?;
                result
                    .rows()
                    .iter()
                    .filter_map(|row| {
                        Some(PolicyRecord {
                            name: cell_str(row, "name")?,
                            body: cell_str(row, "policy")?,
                        })
                    })
                    .collect()
            }
            AccessMode::Coarse => Vec::new(),
        };

        let context = Self::from_parts(catalog, privileges, policies);
        info!(
            run_id = %context.run_id,
            %mode,
            paths = context.catalog.len(),
            privileges = context.privileges.len(),
            policies = context.policies.len(),
            "run context initialized"
        );
        Ok(context)
    }

    /// Correlation id for this run's log lines.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The object catalog snapshot.
    pub fn catalog(&self) -> &ObjectCatalog {
        &self.catalog
    }

    /// Whether a matching non-revoke grant already exists.
    ///
    /// All three fields match by normalized containment, tolerant of the
    /// casing and quoting differences between the rule table and the
    /// service's own reporting.
    pub fn has_privilege(&self, grantee: &str, privilege: &str, object: &str) -> bool {
        self.privileges.iter().any(|record| {
            contains_normalized(&record.grantee, grantee)
                && contains_normalized(&record.privilege, privilege)
                && contains_normalized(&record.object, object)
        })
    }

    /// Whether an existing policy function with this name already carries
    /// the given predicate body.
    pub fn policy_matches(&self, function_name: &str, body: &str) -> bool {
        self.policies.iter().any(|record| {
            contains_normalized(&record.name, function_name)
                && contains_normalized(&record.body, body)
        })
    }
}
