//! Engine orchestration
//!
//! Processes each dataset group to completion before the next begins.
//! Per-dataset failures are caught at the group boundary, logged, and
//! counted; they never abort sibling groups. There is no retry logic:
//! re-running the whole tool is the recovery path, which the idempotence
//! guarantees of both reconciliation modes make safe.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::apply::Applier;
use crate::context::{AccessMode, RunContext};
use crate::grants::{GrantOptions, PrivilegeReconciler};
use crate::policy::PolicyCompiler;
use crate::rules::RuleSet;

/// Result of reconciling one dataset group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Statements were issued to converge the dataset.
    Applied { statements: usize },
    /// The dataset already satisfied the desired state.
    NoChange,
    /// The group carried no reconcilable rows.
    NoRules,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Applied { statements } => write!(f, "applied ({statements} statements)"),
            Outcome::NoChange => f.write_str("no change"),
            Outcome::NoRules => f.write_str("no rules"),
        }
    }
}

/// Options for one engine run.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Which reconciliation strategy to use, fixed for the run.
    pub mode: AccessMode,
    /// Coarse-mode options.
    pub grants: GrantOptions,
    /// Principal granted EXECUTE on installed policy functions.
    pub operating_user: String,
}

/// Counters and timing for one reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Correlation id, shared with the run's log lines.
    pub run_id: Uuid,
    /// Dataset groups processed.
    pub datasets_total: usize,
    /// Groups that needed statements.
    pub applied: usize,
    /// Groups already satisfied.
    pub unchanged: usize,
    /// Groups with nothing to reconcile.
    pub skipped: usize,
    /// Groups abandoned on error.
    pub failed: usize,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    fn started(run_id: Uuid) -> Self {
        Self {
            run_id,
            datasets_total: 0,
            applied: 0,
            unchanged: 0,
            skipped: 0,
            failed: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Whether every dataset group reconciled without error.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Drives one reconciliation run over grouped rule sets.
pub struct ReconcileEngine {
    applier: Applier,
    context: RunContext,
    options: EngineOptions,
}

impl ReconcileEngine {
    /// Create an engine over an initialized run context.
    pub fn new(applier: Applier, context: RunContext, options: EngineOptions) -> Self {
        Self {
            applier,
            context,
            options,
        }
    }

    /// The run context, for callers that report on it.
    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Reconcile every dataset group sequentially.
    pub async fn run(&self, rule_sets: &[RuleSet]) -> RunSummary {
        let mut summary = RunSummary::started(self.context.run_id());
        info!(
            run_id = %summary.run_id,
            mode = %self.options.mode,
            datasets = rule_sets.len(),
            "reconciliation run started"
        );

        for rule_set in rule_sets {
            summary.datasets_total += 1;
            let outcome = match self.options.mode {
                AccessMode::FineGrained => {
                    PolicyCompiler::new(&self.applier, &self.context, &self.options.operating_user)
                        .compile(rule_set)
                        .await
                }
                AccessMode::Coarse => {
                    PrivilegeReconciler::new(
                        &self.applier,
                        &self.context,
                        self.options.grants.clone(),
                    )
                    .reconcile(rule_set)
                    .await
                }
            };

            match outcome {
                Ok(Outcome::Applied { statements }) => {
                    info!(dataset = %rule_set.dataset_name, statements, "dataset reconciled");
                    summary.applied += 1;
                }
                Ok(Outcome::NoChange) => {
                    info!(dataset = %rule_set.dataset_name, "dataset already satisfied");
                    summary.unchanged += 1;
                }
                Ok(Outcome::NoRules) => {
                    info!(dataset = %rule_set.dataset_name, "dataset skipped, no rules");
                    summary.skipped += 1;
                }
                Err(err) => {
                    // Group boundary: log and move on to the next dataset.
                    error!(dataset = %rule_set.dataset_name, error = %err, "dataset group failed");
                    summary.failed += 1;
                }
            }
        }

        summary.finished_at = Some(Utc::now());
        info!(
            run_id = %summary.run_id,
            applied = summary.applied,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            failed = summary.failed,
            "reconciliation run finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_display() {
        assert_eq!(
            Outcome::Applied { statements: 3 }.to_string(),
            "applied (3 statements)"
        );
        assert_eq!(Outcome::NoChange.to_string(), "no change");
        assert_eq!(Outcome::NoRules.to_string(), "no rules");
    }

    #[test]
    fn summary_clean_only_without_failures() {
        let mut summary = RunSummary::started(Uuid::new_v4());
        assert!(summary.is_clean());
        summary.failed = 1;
        assert!(!summary.is_clean());
    }
}
