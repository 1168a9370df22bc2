//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{ConnectionInfo, ConnectionsConfig};
pub use crate::driver::{Driver, Exporter};
pub use crate::error::DbAccessError;
pub use crate::guard::{validate_pk_columns, validate_read_only_sql};
pub use crate::manager::{DriverFactory, Manager};
pub use crate::results::{Row, RowSet};
pub use crate::translation::{PlaceholderStyle, translate_placeholders};
pub use crate::types::{ColumnInfo, ColumnMap, DatabaseType, RowValues};

#[cfg(feature = "mssql")]
pub use crate::mssql::MssqlDriver;
#[cfg(feature = "mysql")]
pub use crate::mysql::MysqlDriver;
#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresDriver;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteDriver;
