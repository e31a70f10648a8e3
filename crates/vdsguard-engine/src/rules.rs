//! Rule loading
//!
//! Ingests the desired-state rule table and groups rows by target dataset.
//! The source is either the remote rule table (queried through the applier)
//! or a CSV file; which one is a static configuration choice. Column names
//! in the source are indirected through [`ColumnMap`], so the rule table's
//! own header names never leak into the engine.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};
use vdsguard_client::cell_str;

use crate::apply::Applier;
use crate::error::{EngineError, EngineResult};

/// A privilege named by a rule row.
///
/// Anything that is not `revoke` is granted additively under its own name;
/// `revoke` always revokes ALL privileges (revocation is deliberately
/// coarser than granting).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Privilege {
    Select,
    Revoke,
    /// Any other grantable privilege, stored as its uppercased keyword.
    Other(String),
}

impl Privilege {
    /// Parse a rule-table cell.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "select" => Privilege::Select,
            "revoke" => Privilege::Revoke,
            _ => Privilege::Other(trimmed.to_uppercase()),
        }
    }

    /// The SQL keyword for this privilege.
    pub fn keyword(&self) -> &str {
        match self {
            Privilege::Select => "SELECT",
            Privilege::Revoke => "REVOKE",
            Privilege::Other(name) => name,
        }
    }

    /// Whether this row asks for revocation instead of a grant.
    pub fn is_revoke(&self) -> bool {
        matches!(self, Privilege::Revoke)
    }
}

/// One desired-access-control fact from the rule table.
#[derive(Debug, Clone)]
pub struct RuleRow {
    /// Principal the rule applies to.
    pub user: String,
    /// Dataset name; also the grouping key.
    pub dataset_name: String,
    /// The object's own container path. Absent for top-level objects.
    pub base_path: Option<String>,
    /// Path of the parent view that carries the row policy.
    pub policy_path: String,
    /// Privilege to grant, or `revoke`.
    pub privilege: Privilege,
    /// Column the row predicate tests.
    pub filter_column: String,
    /// Value compared against the filter column. Absent means the user is
    /// permitted unconditionally.
    pub criteria_value: Option<String>,
}

/// The ordered rule rows for one target dataset.
///
/// Invariant: all rows share the same `filter_column`.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub dataset_name: String,
    pub rows: Vec<RuleRow>,
}

impl RuleSet {
    /// The shared filter column, from the first row.
    pub fn filter_column(&self) -> Option<&str> {
        self.rows.first().map(|r| r.filter_column.as_str())
    }

    /// The shared policy-bearing parent path, from the first row.
    pub fn policy_path(&self) -> Option<&str> {
        self.rows.first().map(|r| r.policy_path.as_str())
    }
}

/// Group rows by dataset name, preserving row order within each group.
///
/// Callers must not rely on the order of the groups themselves.
pub fn group_rows(rows: Vec<RuleRow>) -> Vec<RuleSet> {
    let mut sets: Vec<RuleSet> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        match index.get(&row.dataset_name) {
            Some(&i) => sets[i].rows.push(row),
            None => {
                index.insert(row.dataset_name.clone(), sets.len());
                sets.push(RuleSet {
                    dataset_name: row.dataset_name.clone(),
                    rows: vec![row],
                });
            }
        }
    }
    sets
}

/// Configured column identifiers for the rule source.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub dataset: String,
    pub user: String,
    pub path: String,
    pub policy_path: String,
    pub privilege: String,
    pub filter: String,
    pub criteria: String,
}

/// Loads and groups rule rows from the configured source.
#[derive(Debug, Clone)]
pub struct RuleLoader {
    columns: ColumnMap,
}

impl RuleLoader {
    /// Create a loader with the configured column identifiers.
    pub fn new(columns: ColumnMap) -> Self {
        Self { columns }
    }

    /// Load rules from the remote rule table.
    pub async fn load_from_query(
        &self,
        applier: &Applier,
        rules_vds: &str,
    ) -> EngineResult<Vec<RuleSet>> {
        let result = applier.fetch(&format!("SELECT * FROM {rules_vds}")).await?;
        let mut rows = Vec::new();
        for record in result.rows() {
            if let Some(row) = self.build_row(|column| cell_str(record, column)) {
                rows.push(row);
            }
        }
        debug!(rows = rows.len(), source = rules_vds, "rules loaded from query");
        Ok(group_rows(rows))
    }

    /// Load rules from a CSV file with a header row.
    pub fn load_from_csv(&self, path: &Path) -> EngineResult<Vec<RuleSet>> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            EngineError::rule_source_with_source(
                format!("failed to open {}", path.display()),
                e,
            )
        })?;

        let headers = reader
            .headers()
            .map_err(|e| EngineError::rule_source_with_source("failed to read CSV header", e))?
            .clone();
        let positions: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim(), i))
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| {
                EngineError::rule_source_with_source("failed to read CSV record", e)
            })?;
            let lookup = |column: &str| {
                positions
                    .get(column)
                    .and_then(|&i| record.get(i))
                    .map(|s| s.to_string())
            };
            if let Some(row) = self.build_row(lookup) {
                rows.push(row);
            }
        }
        debug!(rows = rows.len(), path = %path.display(), "rules loaded from CSV");
        Ok(group_rows(rows))
    }

    /// Build one rule row from a cell lookup; rows without a user or a
    /// dataset name carry no reconcilable fact and are skipped.
    fn build_row(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<RuleRow> {
        let cell = |name: &str| lookup(name).map(|s| s.trim().to_string());
        let non_empty = |value: Option<String>| value.filter(|s| !s.is_empty());

        let user = non_empty(cell(&self.columns.user));
        let dataset_name = non_empty(cell(&self.columns.dataset));
        let (Some(user), Some(dataset_name)) = (user, dataset_name) else {
            warn!("skipping rule row without user or dataset");
            return None;
        };

        Some(RuleRow {
            user,
            dataset_name,
            base_path: non_empty(cell(&self.columns.path)),
            policy_path: cell(&self.columns.policy_path).unwrap_or_default(),
            privilege: Privilege::parse(&cell(&self.columns.privilege).unwrap_or_default()),
            filter_column: cell(&self.columns.filter).unwrap_or_default(),
            criteria_value: non_empty(cell(&self.columns.criteria)),
        })
    }
}
