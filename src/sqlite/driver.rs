use async_trait::async_trait;

use crate::dml::Dialect;
use crate::driver::{Driver, Exporter, HandleSlot, ensure_update_maps};
use crate::error::DbAccessError;
use crate::guard::validate_pk_columns;
use crate::results::RowSet;
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::types::{ColumnInfo, ColumnMap, DatabaseType, RowValues};

use super::config::{SharedSqliteConnection, open_connection};
use super::export::SqliteExporter;
use super::params::Params;
use super::query::{build_result_set, describe_table_sync, execute_sync, run_blocking};

/// `SQLite` backend over a single rusqlite connection.
///
/// Statements run one at a time on the blocking pool. `update_row` reports rows matched by
/// the key, so an update that writes the current values still counts as 1.
#[derive(Debug)]
pub struct SqliteDriver {
    conn: HandleSlot<SharedSqliteConnection>,
    exporter: SqliteExporter,
}

const DIALECT: Dialect = Dialect::new(DatabaseType::Sqlite);

impl SqliteDriver {
    /// Open the database at `uri` (a path, a `file:` URI, or `:memory:`).
    ///
    /// # Errors
    /// Returns `DbAccessError::SqliteError` if the database cannot be opened.
    pub async fn connect(uri: &str) -> Result<Self, DbAccessError> {
        let conn = open_connection(uri).await?;
        Ok(Self {
            conn: HandleSlot::new(conn),
            exporter: SqliteExporter::new(uri),
        })
    }

    async fn with_connection<F, R>(&self, func: F) -> Result<R, DbAccessError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, DbAccessError> + Send + 'static,
        R: Send + 'static,
    {
        run_blocking(self.conn.get()?, func).await
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    async fn ping(&self) -> Result<(), DbAccessError> {
        self.with_connection(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(DbAccessError::SqliteError)
        })
        .await
    }

    async fn list_tables(&self, _schema: Option<&str>) -> Result<Vec<String>, DbAccessError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(names)
        })
        .await
    }

    async fn describe_table(
        &self,
        _schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, DbAccessError> {
        let quoted = DIALECT.quote_ident(table);
        self.with_connection(move |conn| describe_table_sync(conn, &quoted))
            .await
    }

    async fn run_read_only_query(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RowSet, DbAccessError> {
        let sql = translate_placeholders(sql, PlaceholderStyle::Sqlite).into_owned();
        let params = Params::convert(params);
        self.with_connection(move |conn| build_result_set(conn, &sql, &params))
            .await
    }

    async fn insert_row(
        &self,
        schema: Option<&str>,
        table: &str,
        row: &ColumnMap,
    ) -> Result<Option<RowValues>, DbAccessError> {
        if row.is_empty() {
            return Err(DbAccessError::NoColumns);
        }
        let stmt = DIALECT.build_insert(schema, table, row);
        let params = Params(stmt.params);
        let sql = stmt.sql;
        self.with_connection(move |conn| {
            execute_sync(conn, &sql, &params)?;
            let id = conn.last_insert_rowid();
            Ok((id > 0).then_some(RowValues::Int(id)))
        })
        .await
    }

    async fn update_row(
        &self,
        schema: Option<&str>,
        table: &str,
        key: &ColumnMap,
        set: &ColumnMap,
    ) -> Result<u64, DbAccessError> {
        ensure_update_maps(key, set)?;
        validate_pk_columns(self, schema, table, key).await?;

        let stmt = DIALECT.build_update(schema, table, key, set);
        let params = Params(stmt.params);
        let sql = stmt.sql;
        let affected = self
            .with_connection(move |conn| execute_sync(conn, &sql, &params))
            .await?;
        if affected == 0 {
            return Err(DbAccessError::RowNotFound);
        }
        Ok(affected as u64)
    }

    async fn close(&self) -> Result<(), DbAccessError> {
        if self.conn.take().is_some() {
            tracing::debug!("sqlite connection released");
        }
        Ok(())
    }

    fn exporter(&self) -> Option<&dyn Exporter> {
        Some(&self.exporter)
    }
}
