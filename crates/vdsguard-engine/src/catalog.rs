//! Object catalog
//!
//! A run-scoped inventory of the addressable dataset paths the service
//! reported. Callers construct a path guess from rule-table cells (casing
//! and quoting unknown); resolution normalizes both sides and returns the
//! service's canonical form for use in subsequent DDL.

use tracing::debug;

/// Normalize a path for matching: drop quoting, fold case.
///
/// This is the single normalization used for every fuzzy comparison in the
/// engine (path resolution, privilege-record matching, policy-body
/// matching). Keeping one implementation keeps the tolerance rules
/// identical across call sites.
pub(crate) fn normalize(s: &str) -> String {
    s.replace('"', "").to_lowercase()
}

/// Case-insensitive, quote-insensitive containment match.
pub(crate) fn contains_normalized(haystack: &str, needle: &str) -> bool {
    normalize(haystack).contains(&normalize(needle))
}

/// The authoritative, service-reported form of an object path,
/// e.g. `"space"."folder"."orders"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// Wrap an already-canonical quoted dotted path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The quoted dotted form, as used in DDL.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path with quoting stripped, e.g. `space.folder.orders`.
    pub fn unquoted(&self) -> String {
        self.0.replace('"', "")
    }
}

impl std::fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse one raw `sys.views` path cell into a canonical path.
///
/// The service reports paths as a bracketed list (`[space, folder, orders]`);
/// a plain dotted path is accepted too. Empty cells yield `None`.
pub fn parse_path_cell(raw: &str) -> Option<CanonicalPath> {
    let trimmed = raw.trim();
    let segments: Vec<&str> = match trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
    {
        Some(list) => list.split(',').collect(),
        None => trimmed.split('.').collect(),
    };

    let cleaned: Vec<String> = segments
        .iter()
        .map(|s| s.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let quoted: Vec<String> = cleaned.iter().map(|s| format!("\"{s}\"")).collect();
    Some(CanonicalPath(quoted.join(".")))
}

/// Snapshot of the addressable object paths known at run start.
#[derive(Debug, Clone, Default)]
pub struct ObjectCatalog {
    paths: Vec<CanonicalPath>,
}

impl ObjectCatalog {
    /// Build a catalog from canonical paths.
    pub fn new(paths: Vec<CanonicalPath>) -> Self {
        Self { paths }
    }

    /// Build a catalog from raw path cells as reported by the service.
    pub fn from_raw_paths<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = raw
            .into_iter()
            .filter_map(|cell| parse_path_cell(cell.as_ref()))
            .collect();
        Self { paths }
    }

    /// Number of known paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Resolve a caller-constructed path guess to its canonical form.
    ///
    /// Matching is normalized containment: the guess matches any stored path
    /// whose normalized form contains the normalized guess. When several
    /// stored paths match, the first one wins and no disambiguation is
    /// attempted; rule tables are expected to name their targets uniquely
    /// enough.
    pub fn resolve(&self, guess: &str) -> Option<&CanonicalPath> {
        let found = self
            .paths
            .iter()
            .find(|p| contains_normalized(p.as_str(), guess));
        if found.is_none() {
            debug!(guess, "no catalog entry matched");
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bracketed_cell() {
        let path = parse_path_cell("[space, folder, orders]").unwrap();
        assert_eq!(path.as_str(), "\"space\".\"folder\".\"orders\"");
        assert_eq!(path.unquoted(), "space.folder.orders");
    }

    #[test]
    fn parse_dotted_cell() {
        let path = parse_path_cell("space.orders").unwrap();
        assert_eq!(path.as_str(), "\"space\".\"orders\"");
    }

    #[test]
    fn parse_empty_cell() {
        assert!(parse_path_cell("").is_none());
        assert!(parse_path_cell("[]").is_none());
        assert!(parse_path_cell("[ , ]").is_none());
    }

    #[test]
    fn resolve_is_case_insensitive_and_returns_canonical_form() {
        let catalog = ObjectCatalog::from_raw_paths(["[space, foo]", "[space, bar]"]);

        let resolved = catalog.resolve("\"SPACE\".\"BAR\"").unwrap();
        assert_eq!(resolved.as_str(), "\"space\".\"bar\"");

        // Unquoted guesses match quoted canonical entries.
        let resolved = catalog.resolve("FOO").unwrap();
        assert_eq!(resolved.as_str(), "\"space\".\"foo\"");
    }

    #[test]
    fn resolve_returns_none_for_unknown_path() {
        let catalog = ObjectCatalog::from_raw_paths(["[space, foo]"]);
        assert!(catalog.resolve("\"space\".\"missing\"").is_none());
    }

    #[test]
    fn resolve_first_match_wins() {
        let catalog = ObjectCatalog::new(vec![
            CanonicalPath::new("\"a\".\"orders_eu\""),
            CanonicalPath::new("\"a\".\"orders\""),
        ]);
        // "orders" is a substring of both stored paths; the first stored
        // entry wins.
        let resolved = catalog.resolve("orders").unwrap();
        assert_eq!(resolved.as_str(), "\"a\".\"orders_eu\"");
    }

    #[test]
    fn normalization_strips_quotes_and_case() {
        assert_eq!(normalize("\"A\".\"b\""), "a.b");
        assert!(contains_normalized("\"space\".\"orders\"", "SPACE.ORD"));
    }
}
