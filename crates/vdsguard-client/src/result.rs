//! Decoded tabular results
//!
//! Row sets come back from the service as JSON objects keyed by column name.
//! The engine addresses cells by column name and works with string values
//! throughout, so the accessors here coerce scalars to strings.

use serde_json::Value;

/// One result row: column name to cell value.
pub type Row = serde_json::Map<String, Value>;

/// A decoded row set from a read statement.
#[derive(Debug, Clone, Default)]
pub struct TabularResult {
    rows: Vec<Row>,
}

impl TabularResult {
    /// An empty result, used for DDL/DML statements where only success matters.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a result from decoded rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Append rows from a later result page.
    pub fn extend(&mut self, other: TabularResult) {
        self.rows.extend(other.rows);
    }

    /// All non-null values of one column, coerced to strings.
    pub fn column_values(&self, column: &str) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| cell_str(row, column))
            .collect()
    }
}

/// Read one cell as a string, coercing scalars and treating null as absent.
pub fn cell_str(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().expect("object row").clone()
    }

    #[test]
    fn cell_coercion() {
        let r = row(json!({"name": "orders", "count": 3, "flag": true, "gone": null}));
        assert_eq!(cell_str(&r, "name").as_deref(), Some("orders"));
        assert_eq!(cell_str(&r, "count").as_deref(), Some("3"));
        assert_eq!(cell_str(&r, "flag").as_deref(), Some("true"));
        assert_eq!(cell_str(&r, "gone"), None);
        assert_eq!(cell_str(&r, "missing"), None);
    }

    #[test]
    fn column_values_skips_nulls() {
        let result = TabularResult::from_rows(vec![
            row(json!({"path": "[a, b]"})),
            row(json!({"path": null})),
            row(json!({"path": "[c, d]"})),
        ]);
        assert_eq!(result.column_values("path"), vec!["[a, b]", "[c, d]"]);
    }

    #[test]
    fn extend_appends_pages() {
        let mut first = TabularResult::from_rows(vec![row(json!({"n": 1}))]);
        first.extend(TabularResult::from_rows(vec![row(json!({"n": 2}))]));
        assert_eq!(first.len(), 2);
    }
}
