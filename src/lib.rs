//! Credential-safe async access to local PostgreSQL, MySQL, SQL Server and SQLite databases.
//!
//! Every backend implements [`Driver`]: catalog lookups, read-only queries gated by
//! [`validate_read_only_sql`], single-row inserts, and updates keyed strictly by primary key.
//! [`Manager`] creates drivers lazily from a [`ConnectionsConfig`] and never lets a
//! connection string escape through an error.

pub mod config;
pub mod dml;
pub mod driver;
pub mod error;
pub mod export;
pub mod guard;
pub mod manager;
pub mod prelude;
pub mod results;
pub mod translation;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::{ConnectionInfo, ConnectionsConfig};
pub use driver::{Driver, Exporter};
pub use error::DbAccessError;
pub use guard::{validate_pk_columns, validate_read_only_sql};
pub use manager::{BackendFactory, DriverFactory, Manager};
pub use results::{Row, RowSet};
pub use translation::{PlaceholderStyle, translate_placeholders};
pub use types::{ColumnInfo, ColumnMap, DatabaseType, RowValues};
