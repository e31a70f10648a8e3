//! Configuration loading
//!
//! Settings come from a TOML file. All mandatory keys are checked in one
//! pass so a misconfigured run reports every missing key at once and
//! aborts before any connection is attempted.

use std::path::Path;

use vdsguard_client::ClientConfig;
use vdsguard_engine::{AccessMode, ColumnMap, GrantOptions};

use crate::error::{CliError, CliResult};

/// Keys that must be present in the configuration file.
pub const REQUIRED_KEYS: &[&str] = &[
    "host",
    "username",
    "password",
    "dataset_identifier",
    "user_identifier",
    "path_identifier",
    "policy_path_identifier",
    "privilege_identifier",
    "filter_identifier",
    "criteria_identifier",
];

/// Parsed tool configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub username: String,
    pub password: String,
    pub port: Option<u16>,
    pub tls: bool,

    pub dataset_identifier: String,
    pub user_identifier: String,
    pub path_identifier: String,
    pub policy_path_identifier: String,
    pub privilege_identifier: String,
    pub filter_identifier: String,
    pub criteria_identifier: String,

    /// Remote rule table to query; when absent a CSV source is required.
    pub rules_vds: Option<String>,
    /// Compile row policies instead of reconciling privileges.
    pub fine_grained: bool,
    /// Propagate successful grants to the policy-bearing parent.
    pub propagate_parent_grants: bool,
    /// Include group grantees in the privilege snapshot.
    pub include_group_grantees: bool,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> CliResult<Self> {
        let table: toml::Table = text
            .parse()
            .map_err(|e| CliError::Config(format!("failed to parse configuration: {e}")))?;

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !table.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(CliError::MissingKeys {
                keys: missing.join(", "),
            });
        }

        let get_str = |key: &str| -> CliResult<String> {
            table
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| CliError::Config(format!("key '{key}' must be a string")))
        };
        let get_bool = |key: &str, default: bool| -> CliResult<bool> {
            match table.get(key) {
                None => Ok(default),
                Some(value) => value
                    .as_bool()
                    .ok_or_else(|| CliError::Config(format!("key '{key}' must be a boolean"))),
            }
        };

        let port = match table.get("port") {
            None => None,
            Some(value) => {
                let n = value
                    .as_integer()
                    .and_then(|n| u16::try_from(n).ok())
                    .ok_or_else(|| CliError::Config("key 'port' must be a port number".into()))?;
                Some(n)
            }
        };

        let rules_vds = match table.get("rules_vds") {
            None => None,
            Some(value) => {
                let target = value
                    .as_str()
                    .ok_or_else(|| CliError::Config("key 'rules_vds' must be a string".into()))?;
                // An empty target means "not configured", same as absent.
                (!target.is_empty()).then(|| target.to_string())
            }
        };

        Ok(Self {
            host: get_str("host")?,
            username: get_str("username")?,
            password: get_str("password")?,
            port,
            tls: get_bool("tls", false)?,
            dataset_identifier: get_str("dataset_identifier")?,
            user_identifier: get_str("user_identifier")?,
            path_identifier: get_str("path_identifier")?,
            policy_path_identifier: get_str("policy_path_identifier")?,
            privilege_identifier: get_str("privilege_identifier")?,
            filter_identifier: get_str("filter_identifier")?,
            criteria_identifier: get_str("criteria_identifier")?,
            rules_vds,
            fine_grained: get_bool("fine_grained", false)?,
            propagate_parent_grants: get_bool("propagate_parent_grants", true)?,
            include_group_grantees: get_bool("include_group_grantees", false)?,
        })
    }

    /// Client connection settings.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.host, &self.username, &self.password)
            .with_tls(self.tls);
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        config
    }

    /// The rule table's column identifiers.
    pub fn column_map(&self) -> ColumnMap {
        ColumnMap {
            dataset: self.dataset_identifier.clone(),
            user: self.user_identifier.clone(),
            path: self.path_identifier.clone(),
            policy_path: self.policy_path_identifier.clone(),
            privilege: self.privilege_identifier.clone(),
            filter: self.filter_identifier.clone(),
            criteria: self.criteria_identifier.clone(),
        }
    }

    /// Reconciliation mode for this run.
    pub fn access_mode(&self) -> AccessMode {
        if self.fine_grained {
            AccessMode::FineGrained
        } else {
            AccessMode::Coarse
        }
    }

    /// Coarse-mode options.
    pub fn grant_options(&self) -> GrantOptions {
        GrantOptions {
            propagate_parent_grants: self.propagate_parent_grants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
host = "dremio.example.com"
username = "admin"
password = "secret"
dataset_identifier = "DT"
user_identifier = "SVC"
path_identifier = "PATH"
policy_path_identifier = "PARENT"
privilege_identifier = "ACCESS"
filter_identifier = "FILTER"
criteria_identifier = "GROUPING"
"#;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let settings = Settings::from_toml_str(MINIMAL).unwrap();
        assert_eq!(settings.host, "dremio.example.com");
        assert_eq!(settings.rules_vds, None);
        assert!(!settings.fine_grained);
        assert!(settings.propagate_parent_grants);
        assert!(!settings.include_group_grantees);
        assert_eq!(settings.access_mode(), AccessMode::Coarse);
    }

    #[test]
    fn all_missing_keys_reported_at_once() {
        let err = Settings::from_toml_str("host = \"h\"\nusername = \"u\"\n").unwrap_err();
        match err {
            CliError::MissingKeys { keys } => {
                assert!(keys.contains("password"));
                assert!(keys.contains("dataset_identifier"));
                assert!(keys.contains("criteria_identifier"));
                assert!(!keys.contains("host"));
            }
            other => panic!("expected MissingKeys, got {other:?}"),
        }
    }

    #[test]
    fn optional_switches() {
        let text = format!(
            "{MINIMAL}rules_vds = \"governance.rules\"\nfine_grained = true\n\
             propagate_parent_grants = false\nport = 9047\n"
        );
        let settings = Settings::from_toml_str(&text).unwrap();
        assert_eq!(settings.rules_vds.as_deref(), Some("governance.rules"));
        assert_eq!(settings.access_mode(), AccessMode::FineGrained);
        assert!(!settings.grant_options().propagate_parent_grants);
        assert_eq!(settings.port, Some(9047));
    }

    #[test]
    fn wrong_type_is_config_error() {
        let text = format!("{MINIMAL}fine_grained = \"yes\"\n");
        let err = Settings::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn column_map_uses_configured_identifiers() {
        let settings = Settings::from_toml_str(MINIMAL).unwrap();
        let columns = settings.column_map();
        assert_eq!(columns.dataset, "DT");
        assert_eq!(columns.criteria, "GROUPING");
    }
}
