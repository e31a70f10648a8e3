//! Policy compiler (fine-grained mode)
//!
//! Compiles one dataset group's rule rows into a server-side boolean
//! row-access function: a CASE predicate keyed by the acting user and the
//! filter column's value. The predicate is built as a structured branch
//! list and rendered to text by a single function, so the rendered body is
//! reproduced character-for-character across runs; the containment-based
//! idempotence comparison relies on that.

use tracing::{debug, info};

use crate::apply::Applier;
use crate::catalog::CanonicalPath;
use crate::context::RunContext;
use crate::error::{EngineError, EngineResult};
use crate::rules::RuleSet;
use crate::run::Outcome;

/// Fixed suffix appended to the dataset path to form the function name.
/// Same logical policy, same name: re-creation replaces instead of piling up.
const FUNCTION_SUFFIX: &str = "_rbac";

/// One predicate branch: permit `user` when the filter column equals the
/// criteria value, or unconditionally when no criteria is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyBranch {
    pub user: String,
    pub criteria: Option<String>,
}

/// A fully-specified row-access policy function for one dataset.
#[derive(Debug, Clone)]
pub struct PolicyFunction {
    name: String,
    filter_column: String,
    branches: Vec<PolicyBranch>,
}

impl PolicyFunction {
    /// Build the policy function for a dataset group, or `None` when the
    /// group contains no rows to compile.
    pub fn from_rule_set(view: &CanonicalPath, rule_set: &RuleSet) -> Option<Self> {
        let branches = build_branches(rule_set);
        if branches.is_empty() {
            return None;
        }
        Some(Self {
            name: format!("{}{}", view.unquoted(), FUNCTION_SUFFIX),
            filter_column: rule_set.filter_column().unwrap_or_default().to_string(),
            branches,
        })
    }

    /// The deterministic function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The predicate branches, in render order.
    pub fn branches(&self) -> &[PolicyBranch] {
        &self.branches
    }

    /// Render the predicate body.
    ///
    /// This is the one source of the compared text; every run renders the
    /// same rule set to the same bytes.
    pub fn render_body(&self) -> String {
        let mut parts = vec!["SELECT CASE".to_string()];
        for branch in &self.branches {
            match &branch.criteria {
                Some(value) => parts.push(format!(
                    "WHEN query_user()='{}' AND {}='{}' THEN true",
                    branch.user, self.filter_column, value
                )),
                None => parts.push(format!("WHEN query_user()='{}' THEN true", branch.user)),
            }
        }
        parts.push("ELSE false END;".to_string());
        parts.join(" ")
    }

    /// Render the create-or-replace DDL for the function.
    pub fn render_create(&self) -> String {
        format!(
            "CREATE OR REPLACE FUNCTION {}({} VARCHAR) RETURNS BOOLEAN RETURN {}",
            self.name,
            self.filter_column,
            self.render_body()
        )
    }

    /// Render the execute grant for the operating principal.
    pub fn render_grant_execute(&self, operating_user: &str) -> String {
        format!(
            "GRANT EXECUTE ON FUNCTION {} TO USER \"{}\"",
            self.name, operating_user
        )
    }

    /// Render the statement attaching the policy to the dataset.
    pub fn render_attach(&self, view: &CanonicalPath) -> String {
        format!(
            "ALTER VIEW {} ADD ROW ACCESS POLICY {}({})",
            view, self.name, self.filter_column
        )
    }
}

/// Build the ordered branch list for a rule set.
///
/// Users appear in first-seen order; each user contributes one branch per
/// distinct non-empty criteria value (first-seen order), or a single
/// unconditional branch when no row attaches a criteria value.
fn build_branches(rule_set: &RuleSet) -> Vec<PolicyBranch> {
    let mut users: Vec<(String, Vec<String>)> = Vec::new();
    for row in &rule_set.rows {
        let index = match users.iter().position(|(user, _)| *user == row.user) {
            Some(index) => index,
            None => {
                users.push((row.user.clone(), Vec::new()));
                users.len() - 1
            }
        };
        if let Some(value) = &row.criteria_value {
            if !users[index].1.contains(value) {
                users[index].1.push(value.clone());
            }
        }
    }

    let mut branches = Vec::new();
    for (user, criteria) in users {
        if criteria.is_empty() {
            branches.push(PolicyBranch {
                user,
                criteria: None,
            });
        } else {
            for value in criteria {
                branches.push(PolicyBranch {
                    user: user.clone(),
                    criteria: Some(value),
                });
            }
        }
    }
    branches
}

/// Compiles and installs row-access policies for dataset groups.
pub struct PolicyCompiler<'a> {
    applier: &'a Applier,
    context: &'a RunContext,
    operating_user: &'a str,
}

impl<'a> PolicyCompiler<'a> {
    /// Create a compiler over the run's applier and context.
    ///
    /// `operating_user` is the principal granted EXECUTE on installed
    /// functions, normally the connection user.
    pub fn new(applier: &'a Applier, context: &'a RunContext, operating_user: &'a str) -> Self {
        Self {
            applier,
            context,
            operating_user,
        }
    }

    /// Compile one dataset group and install its policy.
    ///
    /// The three steps (create function, grant execute, attach policy) run
    /// in order and are not transactional: a failure partway leaves a
    /// created-but-unattached function behind, surfaced as the error. The
    /// create step is skipped when the snapshot already carries an
    /// identical body, but attach and grant always run; both are no-ops on
    /// the service when already in place.
    pub async fn compile(&self, rule_set: &RuleSet) -> EngineResult<Outcome> {
        let guess = match rule_set.policy_path() {
            Some(path) if !path.is_empty() => {
                format!("{}.{}", path, rule_set.dataset_name)
            }
            _ => rule_set.dataset_name.clone(),
        };
        let Some(view) = self.context.catalog().resolve(&guess) else {
            return Err(EngineError::DatasetNotFound { path: guess });
        };

        let Some(function) = PolicyFunction::from_rule_set(view, rule_set) else {
            debug!(dataset = %rule_set.dataset_name, "no rules to compile");
            return Ok(Outcome::NoRules);
        };

        let body = function.render_body();
        let up_to_date = self.context.policy_matches(function.name(), &body);
        if up_to_date {
            info!(function = function.name(), "policy unchanged, skipping create");
        } else {
            self.applier.execute(&function.render_create()).await?;
            info!(
                function = function.name(),
                branches = function.branches().len(),
                "policy function installed"
            );
        }

        self.applier
            .execute(&function.render_grant_execute(self.operating_user))
            .await?;
        self.applier.execute(&function.render_attach(view)).await?;

        Ok(if up_to_date {
            Outcome::NoChange
        } else {
            Outcome::Applied { statements: 3 }
        })
    }
}
