//! Privilege reconciler (coarse-grained mode)
//!
//! Computes the privilege delta per (user, dataset) pair and issues the
//! minimal grant/revoke statements. Granting is additive and skipped when a
//! matching grant already exists; revocation is total (`REVOKE ALL`) and is
//! never treated as already satisfied.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::apply::Applier;
use crate::catalog::CanonicalPath;
use crate::context::RunContext;
use crate::error::{EngineError, EngineResult};
use crate::rules::{Privilege, RuleRow, RuleSet};
use crate::run::Outcome;

/// Options for coarse-grained reconciliation.
#[derive(Debug, Clone)]
pub struct GrantOptions {
    /// After a successful grant, apply the same privilege to the dataset's
    /// policy-bearing parent whenever that parent path resolves.
    pub propagate_parent_grants: bool,
}

impl Default for GrantOptions {
    fn default() -> Self {
        Self {
            propagate_parent_grants: true,
        }
    }
}

/// Reconciles one dataset group's privilege rows against the snapshot state.
pub struct PrivilegeReconciler<'a> {
    applier: &'a Applier,
    context: &'a RunContext,
    options: GrantOptions,
}

impl<'a> PrivilegeReconciler<'a> {
    /// Create a reconciler over the run's applier and context.
    pub fn new(applier: &'a Applier, context: &'a RunContext, options: GrantOptions) -> Self {
        Self {
            applier,
            context,
            options,
        }
    }

    /// Reconcile one dataset group.
    ///
    /// All target paths are resolved before any statement is issued, so an
    /// unresolvable row aborts the group without partial grants.
    pub async fn reconcile(&self, rule_set: &RuleSet) -> EngineResult<Outcome> {
        let rows = dedup_rows(&rule_set.rows);
        if rows.is_empty() {
            return Ok(Outcome::NoRules);
        }

        let mut resolved: Vec<(&RuleRow, &CanonicalPath)> = Vec::with_capacity(rows.len());
        for row in rows {
            let guess = base_guess(row);
            let Some(canonical) = self.context.catalog().resolve(&guess) else {
                return Err(EngineError::DatasetNotFound { path: guess });
            };
            resolved.push((row, canonical));
        }

        let mut applied = 0usize;
        for (row, canonical) in resolved {
            if !row.privilege.is_revoke()
                && self
                    .context
                    .has_privilege(&row.user, row.privilege.keyword(), canonical.as_str())
            {
                debug!(
                    user = %row.user,
                    privilege = row.privilege.keyword(),
                    object = %canonical,
                    "privilege already granted, skipping"
                );
                continue;
            }

            let statement = grant_statement(&row.privilege, canonical, &row.user);
            self.applier.execute(&statement).await?;
            info!(
                user = %row.user,
                privilege = row.privilege.keyword(),
                object = %canonical,
                "privilege updated"
            );
            applied += 1;

            if self.options.propagate_parent_grants {
                applied += self.propagate_to_parent(row).await?;
            }
        }

        Ok(if applied == 0 {
            Outcome::NoChange
        } else {
            Outcome::Applied {
                statements: applied,
            }
        })
    }

    /// Apply the row's privilege to the policy-bearing parent, if it exists.
    ///
    /// A parent without a row policy still benefits from read access, so
    /// propagation only requires the parent path to resolve.
    async fn propagate_to_parent(&self, row: &RuleRow) -> EngineResult<usize> {
        if row.policy_path.is_empty() {
            return Ok(0);
        }
        let guess = format!("\"{}\".\"{}\"", row.policy_path, row.dataset_name);
        let Some(parent) = self.context.catalog().resolve(&guess) else {
            debug!(guess, "no policy-bearing parent to propagate to");
            return Ok(0);
        };

        if !row.privilege.is_revoke()
            && self
                .context
                .has_privilege(&row.user, row.privilege.keyword(), parent.as_str())
        {
            return Ok(0);
        }

        let statement = grant_statement(&row.privilege, parent, &row.user);
        self.applier.execute(&statement).await?;
        info!(
            user = %row.user,
            privilege = row.privilege.keyword(),
            object = %parent,
            "privilege propagated to parent"
        );
        Ok(1)
    }
}

/// Keep the first occurrence of each (user, dataset, privilege) fact.
fn dedup_rows(rows: &[RuleRow]) -> Vec<&RuleRow> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|r| {
            seen.insert((
                r.user.clone(),
                r.dataset_name.clone(),
                r.privilege.clone(),
            ))
        })
        .collect()
}

/// Build the path guess for a row's base object, uppercasing the dataset
/// name the way the rule tables store it.
fn base_guess(row: &RuleRow) -> String {
    let dataset = row.dataset_name.to_uppercase();
    match row.base_path.as_deref() {
        Some(path) => format!("\"{path}\".\"{dataset}\""),
        None => format!("\"{dataset}\""),
    }
}

/// Render the grant or revoke statement for one reconciled fact.
fn grant_statement(privilege: &Privilege, path: &CanonicalPath, user: &str) -> String {
    if privilege.is_revoke() {
        format!("REVOKE ALL ON VDS {path} FROM USER \"{user}\"")
    } else {
        format!(
            "GRANT {} ON VDS {path} TO USER \"{user}\"",
            privilege.keyword()
        )
    }
}
