use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "mysql")]
use sqlx;
#[cfg(feature = "mssql")]
use tiberius;
#[cfg(feature = "postgres")]
use tokio_postgres;

/// Every failure the access layer can report.
///
/// Validation variants (`NoColumns` through `NotReadOnly`) are raised before any statement
/// reaches a backend. Backend client errors pass through unchanged because they never carry
/// connection credentials; construction failures are sanitized into `ConnectionFailed` by the
/// [`Manager`](crate::manager::Manager).
#[derive(Debug, Error)]
pub enum DbAccessError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PoolErrorPostgres(#[from] deadpool_postgres::PoolError),

    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MysqlError(#[from] sqlx::Error),

    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unknown connection {0:?}")]
    UnknownConnection(String),

    #[error("connection {id:?} has unsupported database type {db_type:?}")]
    UnsupportedType { id: String, db_type: String },

    /// Sanitized construction failure. Only the id and type tag are ever exposed.
    #[error("failed to connect to {id:?} ({db_type}); check server logs for details")]
    ConnectionFailed { id: String, db_type: String },

    #[error("no columns provided")]
    NoColumns,

    #[error("table {table} has no primary key; refusing to update")]
    NoPrimaryKey { table: String },

    #[error("key columns {provided:?} do not match primary key columns {expected:?}")]
    KeyMismatch {
        expected: Vec<String>,
        provided: Vec<String>,
    },

    #[error("no row matched the given primary key")]
    RowNotFound,

    #[error("empty SQL statement")]
    EmptyStatement,

    #[error("query contains forbidden keyword: {keyword}")]
    NotReadOnly { keyword: String },

    #[error("connection is closed")]
    ConnectionClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("{tool} not found; install it or add it to PATH")]
    ToolNotFound { tool: String },

    #[error("{tool} failed: {status}\nOutput: {output}")]
    ToolFailed {
        tool: String,
        status: String,
        output: String,
    },

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}
