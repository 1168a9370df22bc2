use std::fmt;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::DbAccessError;
use crate::results::RowSet;
use crate::types::{ColumnInfo, ColumnMap, DatabaseType, RowValues};

/// Uniform operations every backend provides.
///
/// Each method is a future; dropping it cancels the operation at its next await point. No
/// method retries or applies its own timeout.
///
/// `schema` is dialect-specific: `None` means `public` on PostgreSQL, `dbo` on SQL Server,
/// the current database on MySQL, and is ignored by SQLite.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Backend this driver talks to.
    fn database_type(&self) -> DatabaseType;

    /// Verify the connection is alive.
    async fn ping(&self) -> Result<(), DbAccessError>;

    /// Base table names in `schema`, sorted by name.
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<String>, DbAccessError>;

    /// Columns of `table` in ordinal order, with primary-key membership.
    async fn describe_table(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, DbAccessError>;

    /// Run caller-supplied SQL written with `$1, $2, …` markers.
    ///
    /// The driver does not check that the statement is read-only; callers pass it through
    /// [`validate_read_only_sql`](crate::guard::validate_read_only_sql) first.
    async fn run_read_only_query(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RowSet, DbAccessError>;

    /// Insert one row. Returns the generated identity value when the backend reports one.
    async fn insert_row(
        &self,
        schema: Option<&str>,
        table: &str,
        row: &ColumnMap,
    ) -> Result<Option<RowValues>, DbAccessError>;

    /// Update the single row identified by `key`, which must name exactly the table's
    /// primary-key columns. Returns the affected row count (never zero).
    async fn update_row(
        &self,
        schema: Option<&str>,
        table: &str,
        key: &ColumnMap,
        set: &ColumnMap,
    ) -> Result<u64, DbAccessError>;

    /// Release the underlying handle. Later calls are no-ops; other operations then fail
    /// with `DbAccessError::ConnectionClosed`.
    async fn close(&self) -> Result<(), DbAccessError>;

    /// Dump/restore support, when the backend has it.
    fn exporter(&self) -> Option<&dyn Exporter> {
        None
    }
}

/// Whole-database dump and restore.
///
/// Import replaces data in the target database; callers must obtain explicit confirmation
/// before invoking it.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Write a complete SQL dump to `path`. The parent directory must already exist.
    async fn export_database(&self, path: &Path) -> Result<(), DbAccessError>;

    /// Replay the SQL file at `path` against the connection.
    async fn import_database(&self, path: &Path) -> Result<(), DbAccessError>;
}

impl fmt::Debug for dyn Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("database_type", &self.database_type())
            .finish_non_exhaustive()
    }
}

/// Holds a backend handle until the driver is closed.
///
/// Pool handles are cheap clones, so operations clone the handle out and never hold the
/// lock across an await.
pub(crate) struct HandleSlot<T> {
    inner: RwLock<Option<T>>,
}

impl<T: Clone> HandleSlot<T> {
    pub(crate) fn new(handle: T) -> Self {
        Self {
            inner: RwLock::new(Some(handle)),
        }
    }

    /// Current handle.
    ///
    /// # Errors
    /// Returns `DbAccessError::ConnectionClosed` once the handle has been taken.
    pub(crate) fn get(&self) -> Result<T, DbAccessError> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DbAccessError::ConnectionClosed)
    }

    /// Remove the handle; `None` if it was already taken.
    pub(crate) fn take(&self) -> Option<T> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<T> fmt::Debug for HandleSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = self
            .inner
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        f.debug_struct("HandleSlot").field("open", &open).finish()
    }
}

/// Shared argument checks for `update_row`, run before any metadata lookup.
pub(crate) fn ensure_update_maps(key: &ColumnMap, set: &ColumnMap) -> Result<(), DbAccessError> {
    if key.is_empty() {
        return Err(DbAccessError::ParameterError(
            "update row: key must contain at least one column".into(),
        ));
    }
    if set.is_empty() {
        return Err(DbAccessError::ParameterError(
            "update row: set must contain at least one column".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_reports_closed_after_take() {
        let slot = HandleSlot::new(5_u8);
        assert_eq!(slot.get().unwrap(), 5);
        assert_eq!(slot.take(), Some(5));
        assert_eq!(slot.take(), None);
        assert!(matches!(slot.get(), Err(DbAccessError::ConnectionClosed)));
    }

    #[test]
    fn empty_update_maps_are_rejected() {
        let mut key = ColumnMap::new();
        let set = ColumnMap::new();
        assert!(ensure_update_maps(&key, &set).is_err());
        key.insert("id".into(), RowValues::Int(1));
        let err = ensure_update_maps(&key, &set).unwrap_err();
        assert!(err.to_string().contains("set must contain"));
    }
}
