//! Connection configuration: which ids exist and the (type, URI) behind each.
//!
//! URIs carry credentials. They are readable only inside the crate and never appear in
//! `Debug` output, logs, or [`ConnectionInfo`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DbAccessError;
use crate::types::DatabaseType;

pub const ENV_POSTGRES_URI: &str = "MCP_DB_POSTGRES_URI";
pub const ENV_MYSQL_URI: &str = "MCP_DB_MYSQL_URI";
pub const ENV_SQLSERVER_URI: &str = "MCP_DB_SQLSERVER_URI";
pub const ENV_SQLITE_URI: &str = "MCP_DB_SQLITE_URI";

/// Directory under the home directory holding the optional config file.
pub const DEFAULT_CONFIG_DIR: &str = ".localdb-mcp";
pub const CONFIG_FILE_NAME: &str = "config.yaml";
/// Read when `config.yaml` is absent.
pub const JSON_CONFIG_FILE_NAME: &str = "config.json";

/// Env variable and the fixed connection id it defines.
const ENV_CONNECTIONS: [(&str, &str); 4] = [
    (ENV_POSTGRES_URI, "postgres"),
    (ENV_MYSQL_URI, "mysql"),
    (ENV_SQLSERVER_URI, "sqlserver"),
    (ENV_SQLITE_URI, "sqlite"),
];

/// Connection id and type tag. Safe to log and to hand to callers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ConnectionInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub db_type: String,
}

#[derive(Clone)]
struct ConnectionEntry {
    type_tag: String,
    uri: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FileEntry {
    Uri(String),
    Typed {
        #[serde(rename = "type")]
        type_tag: Option<String>,
        uri: String,
    },
}

#[derive(Deserialize)]
struct FileFormat {
    #[serde(default)]
    connections: BTreeMap<String, FileEntry>,
}

/// Type tag implied by a connection id when the entry does not name one.
fn id_to_type(id: &str) -> &'static str {
    match id {
        "mysql" => "mysql",
        "sqlserver" => "sqlserver",
        "sqlite" => "sqlite",
        _ => "postgres",
    }
}

/// Configured connections keyed by id.
#[derive(Clone, Default)]
pub struct ConnectionsConfig {
    connections: BTreeMap<String, ConnectionEntry>,
}

impl ConnectionsConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a connection. The type tag is validated when the driver is created.
    #[must_use]
    pub fn with_connection(
        mut self,
        id: impl Into<String>,
        type_tag: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        self.insert(id.into(), type_tag.into(), uri.into());
        self
    }

    fn insert(&mut self, id: String, type_tag: String, uri: String) {
        if uri.trim().is_empty() {
            return;
        }
        self.connections
            .insert(id, ConnectionEntry { type_tag, uri });
    }

    /// Parse the YAML config format:
    ///
    /// ```yaml
    /// connections:
    ///   postgres: postgres://app@localhost/app
    ///   legacy:
    ///     type: sqlserver
    ///     uri: sqlserver://sa@localhost
    /// ```
    ///
    /// JSON is valid YAML, so the same text may be written as JSON.
    ///
    /// # Errors
    /// Returns `DbAccessError::ConfigError` if the text is not valid config. The error
    /// reports a position and never quotes the input.
    pub fn from_yaml_str(text: &str) -> Result<Self, DbAccessError> {
        let parsed: FileFormat = serde_yaml::from_str(text).map_err(|e| {
            DbAccessError::ConfigError(match e.location() {
                Some(loc) => format!("invalid config at line {} column {}", loc.line(), loc.column()),
                None => "invalid config".to_string(),
            })
        })?;
        Ok(Self::from_file_format(parsed))
    }

    /// Parse the same format written as JSON.
    ///
    /// # Errors
    /// Returns `DbAccessError::ConfigError` if the text is not valid config JSON. The error
    /// never quotes the input.
    pub fn from_json_str(text: &str) -> Result<Self, DbAccessError> {
        let parsed: FileFormat = serde_json::from_str(text).map_err(|e| {
            DbAccessError::ConfigError(format!(
                "invalid config at line {} column {}",
                e.line(),
                e.column()
            ))
        })?;
        Ok(Self::from_file_format(parsed))
    }

    fn from_file_format(parsed: FileFormat) -> Self {
        let mut config = Self::new();
        for (id, entry) in parsed.connections {
            let (type_tag, uri) = match entry {
                FileEntry::Uri(uri) => (id_to_type(&id).to_string(), uri),
                FileEntry::Typed { type_tag, uri } => (
                    type_tag.unwrap_or_else(|| id_to_type(&id).to_string()),
                    uri,
                ),
            };
            config.insert(id, type_tag, uri);
        }
        config
    }

    /// Read a config file: JSON for a `.json` extension, YAML otherwise.
    ///
    /// # Errors
    /// `DbAccessError::Io` if unreadable, `DbAccessError::ConfigError` if malformed.
    pub fn from_file(path: &Path) -> Result<Self, DbAccessError> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        };
        parsed.map_err(|e| match e {
            DbAccessError::ConfigError(msg) => {
                DbAccessError::ConfigError(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Apply `MCP_DB_*_URI` overrides using `lookup` to read variables.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, id) in ENV_CONNECTIONS {
            if let Some(uri) = lookup(var).filter(|v| !v.is_empty()) {
                self.insert(id.to_string(), id.to_string(), uri);
            }
        }
    }

    /// Apply `MCP_DB_*_URI` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|var| std::env::var(var).ok());
    }

    fn config_dir() -> Option<PathBuf> {
        let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))?;
        Some(PathBuf::from(home).join(DEFAULT_CONFIG_DIR))
    }

    /// Default config file location, `~/.localdb-mcp/config.yaml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
    }

    /// Build the effective configuration.
    ///
    /// Sources, later ones winning per id: the config file (`path`, or else
    /// `~/.localdb-mcp/config.yaml`, or else `~/.localdb-mcp/config.json`), then `MCP_DB_*`
    /// variables from `.env` in the working directory, then the same variables from the
    /// process environment. `.env` is read without touching the process environment.
    ///
    /// # Errors
    /// Propagates failures reading an explicit or existing config file.
    pub fn load(path: Option<&Path>) -> Result<Self, DbAccessError> {
        let mut config = Self::new();
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::config_dir().and_then(|dir| {
                [CONFIG_FILE_NAME, JSON_CONFIG_FILE_NAME]
                    .into_iter()
                    .map(|name| dir.join(name))
                    .find(|p| p.is_file())
            }),
        };
        if let Some(file) = file {
            config = Self::from_file(&file)?;
            tracing::debug!(path = %file.display(), "loaded connection config file");
        }

        let dotenv = read_dotenv(Path::new(".env"));
        config.apply_env_with(|var| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .or_else(|| dotenv.get(var).cloned())
        });

        tracing::debug!(connections = config.connections.len(), "connection config ready");
        Ok(config)
    }

    /// Configured ids, sorted.
    #[must_use]
    pub fn connection_ids(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }

    /// Id and type of every connection, sorted by id.
    #[must_use]
    pub fn connection_infos(&self) -> Vec<ConnectionInfo> {
        self.connections
            .iter()
            .map(|(id, entry)| ConnectionInfo {
                id: id.clone(),
                db_type: entry.type_tag.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn has_connection(&self, id: &str) -> bool {
        self.connections.contains_key(id)
    }

    /// Raw type tag for `id`, as configured.
    #[must_use]
    pub fn type_tag(&self, id: &str) -> Option<&str> {
        self.connections.get(id).map(|e| e.type_tag.as_str())
    }

    /// Parsed backend type for `id`; `None` when absent or not a known tag.
    #[must_use]
    pub fn database_type(&self, id: &str) -> Option<DatabaseType> {
        self.type_tag(id).and_then(|tag| tag.parse().ok())
    }

    /// Connection URI for `id`. Never log the result.
    pub(crate) fn uri(&self, id: &str) -> Option<&str> {
        self.connections.get(id).map(|e| e.uri.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl fmt::Debug for ConnectionsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.connections
                    .iter()
                    .map(|(id, entry)| (id, entry.type_tag.as_str())),
            )
            .finish()
    }
}

/// Variables from a dotenv file, without exporting them. A missing file yields nothing and
/// malformed lines are skipped.
#[must_use]
pub fn read_dotenv(path: &Path) -> BTreeMap<String, String> {
    let Ok(iter) = dotenvy::from_path_iter(path) else {
        return BTreeMap::new();
    };
    iter.filter_map(Result::ok).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_entries_accept_bare_and_typed_forms() {
        let config = ConnectionsConfig::from_yaml_str(
            "connections:\n  sqlite: /tmp/app.db\n  reporting: postgres://u:p@localhost/reports\n  legacy:\n    type: sqlserver\n    uri: sqlserver://sa:pw@localhost\n  blank: \"\"\n",
        )
        .unwrap();

        assert_eq!(config.type_tag("sqlite"), Some("sqlite"));
        assert_eq!(config.type_tag("reporting"), Some("postgres"));
        assert_eq!(config.database_type("legacy"), Some(DatabaseType::Mssql));
        assert!(!config.has_connection("blank"));
        assert_eq!(config.connection_ids(), vec!["legacy", "reporting", "sqlite"]);
    }

    #[test]
    fn env_overrides_file_entries() {
        let mut config =
            ConnectionsConfig::new().with_connection("postgres", "postgres", "postgres://old");
        config.apply_env_with(|var| match var {
            ENV_POSTGRES_URI => Some("postgres://new".into()),
            ENV_MYSQL_URI => Some("root:pw@tcp(localhost:3306)/app".into()),
            ENV_SQLITE_URI => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.uri("postgres"), Some("postgres://new"));
        assert_eq!(config.type_tag("mysql"), Some("mysql"));
        assert!(!config.has_connection("sqlite"));
    }

    #[test]
    fn debug_and_infos_hide_uris() {
        let config = ConnectionsConfig::new()
            .with_connection("pg", "postgres", "postgres://admin:hunter2@db/app");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("pg"));

        let infos = serde_json::to_string(&config.connection_infos()).unwrap();
        assert_eq!(infos, r#"[{"id":"pg","type":"postgres"}]"#);
    }

    #[test]
    fn json_config_is_still_accepted() {
        let config = ConnectionsConfig::from_json_str(
            r#"{"connections": {"legacy": {"type": "sqlserver", "uri": "sqlserver://sa@db"}}}"#,
        )
        .unwrap();
        assert_eq!(config.type_tag("legacy"), Some("sqlserver"));

        // JSON is also valid YAML.
        let config = ConnectionsConfig::from_yaml_str(r#"{"connections": {"sqlite": "/tmp/a.db"}}"#)
            .unwrap();
        assert_eq!(config.type_tag("sqlite"), Some("sqlite"));
    }

    #[test]
    fn files_are_parsed_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&yaml, "connections:\n  postgres: postgres://app@localhost/app\n").unwrap();
        let json = dir.path().join(JSON_CONFIG_FILE_NAME);
        std::fs::write(&json, r#"{"connections": {"sqlite": ":memory:"}}"#).unwrap();

        assert!(ConnectionsConfig::from_file(&yaml).unwrap().has_connection("postgres"));
        assert!(ConnectionsConfig::from_file(&json).unwrap().has_connection("sqlite"));
    }

    #[test]
    fn malformed_config_does_not_echo_contents() {
        let err = ConnectionsConfig::from_yaml_str("connections:\n  x: [postgres://u:secret@h\n")
            .unwrap_err();
        assert!(!err.to_string().contains("secret"));

        let err = ConnectionsConfig::from_json_str(r#"{"connections": {"x": "postgres://u:secret@h""#)
            .unwrap_err();
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn dotenv_values_are_read_without_exporting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# comment\nMCP_DB_SQLITE_URI=\"/tmp/a.db\"\n\nMCP_DB_MYSQL_URI='x'\n",
        )
        .unwrap();

        let vars = read_dotenv(&path);
        assert_eq!(vars.get(ENV_SQLITE_URI).map(String::as_str), Some("/tmp/a.db"));
        assert_eq!(vars.get(ENV_MYSQL_URI).map(String::as_str), Some("x"));
        assert_eq!(vars.len(), 2);
        assert!(read_dotenv(&dir.path().join("missing.env")).is_empty());
    }
}
