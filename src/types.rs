use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::DbAccessError;

/// Values that can be stored in a database row or used as query parameters.
///
/// The same enum is shared by every backend, so callers never branch on driver types:
/// ```rust
/// use localdb_access::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
///
/// Serialized untagged, so a row renders as plain JSON scalars (blobs become byte arrays).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Text/string value
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
    /// NULL value
    Null,
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Column name to value mapping used for inserted rows, update keys, and update sets.
///
/// Ordered by column name, so generated statements are deterministic.
pub type ColumnMap = BTreeMap<String, RowValues>;

/// One column of a described table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Type name as reported by the backend's catalog.
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub is_pk: bool,
}

/// The backends this layer can talk to.
///
/// Every tag parses regardless of which cargo features are enabled; the manager rejects
/// backends that were compiled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL` database
    #[value(alias = "postgresql")]
    Postgres,
    /// `MySQL` database
    Mysql,
    /// SQL Server database
    #[value(name = "sqlserver", alias = "mssql")]
    #[serde(rename = "sqlserver", alias = "mssql")]
    Mssql,
    /// `SQLite` database
    Sqlite,
}

impl DatabaseType {
    /// Configuration tag for this backend.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseType::Postgres => "postgres",
            DatabaseType::Mysql => "mysql",
            DatabaseType::Mssql => "sqlserver",
            DatabaseType::Sqlite => "sqlite",
        }
    }

    /// Whether support for this backend was compiled in.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        match self {
            DatabaseType::Postgres => cfg!(feature = "postgres"),
            DatabaseType::Mysql => cfg!(feature = "mysql"),
            DatabaseType::Mssql => cfg!(feature = "mssql"),
            DatabaseType::Sqlite => cfg!(feature = "sqlite"),
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseType {
    type Err = DbAccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <DatabaseType as ValueEnum>::from_str(s.trim(), true).map_err(|_| {
            DbAccessError::ConfigError(format!("unknown database type {s:?}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_type_accepts_tags_and_aliases() {
        assert_eq!("postgres".parse::<DatabaseType>().unwrap(), DatabaseType::Postgres);
        assert_eq!("PostgreSQL".parse::<DatabaseType>().unwrap(), DatabaseType::Postgres);
        assert_eq!("sqlserver".parse::<DatabaseType>().unwrap(), DatabaseType::Mssql);
        assert_eq!("mssql".parse::<DatabaseType>().unwrap(), DatabaseType::Mssql);
        assert_eq!(" sqlite ".parse::<DatabaseType>().unwrap(), DatabaseType::Sqlite);
        assert!("oracle".parse::<DatabaseType>().is_err());
    }

    #[test]
    fn row_values_serialize_as_plain_json() {
        let values: Vec<RowValues> = vec![
            7_i64.into(),
            1.5_f64.into(),
            "x".into(),
            String::from("y").into(),
            false.into(),
            RowValues::Null,
        ];
        assert!(values[5].is_null());
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[7,1.5,"x","y",false,null]"#);
    }

    #[test]
    fn column_info_uses_type_field_name() {
        let col = ColumnInfo {
            name: "id".into(),
            data_type: "integer".into(),
            nullable: false,
            is_pk: true,
        };
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["type"], "integer");
        assert_eq!(json["is_pk"], true);
    }
}
