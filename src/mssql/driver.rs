use async_trait::async_trait;

use crate::dml::Dialect;
use crate::driver::{Driver, Exporter, HandleSlot, ensure_update_maps};
use crate::error::DbAccessError;
use crate::guard::validate_pk_columns;
use crate::results::RowSet;
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::types::{ColumnInfo, ColumnMap, DatabaseType, RowValues};

use super::config::{MssqlConnInfo, MssqlPool, build_pool, checkout};
use super::params::bind_query_params;
use super::query::{
    DESCRIBE_TABLE_SQL, LIST_TABLES_SQL, build_result_set, columns_from_rows,
    mssql_extract_value,
};

pub(crate) const DIALECT: Dialect = Dialect::new(DatabaseType::Mssql);

/// SQL Server backend over a bb8-tiberius pool.
///
/// The driver is its own [`Exporter`]: exports are generated from catalog queries rather
/// than an external dump tool.
#[derive(Debug)]
pub struct MssqlDriver {
    pub(super) pool: HandleSlot<MssqlPool>,
    pub(super) info: MssqlConnInfo,
}

pub(super) fn schema_or_default(schema: Option<&str>) -> &str {
    schema
        .filter(|s| !s.is_empty())
        .or(DIALECT.default_schema())
        .unwrap_or("dbo")
}

impl MssqlDriver {
    /// Connect using a `sqlserver://` URL or ADO.NET connection string.
    ///
    /// # Errors
    /// Returns `DbAccessError::ConfigError` for malformed strings, or the connection error
    /// from the first checkout.
    pub async fn connect(uri: &str) -> Result<Self, DbAccessError> {
        let info = MssqlConnInfo::parse(uri)?;
        let pool = build_pool(&info).await?;
        Ok(Self {
            pool: HandleSlot::new(pool),
            info,
        })
    }

    /// Run `sql` and return every row of the first result, unconverted.
    pub(super) async fn query_rows(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<tiberius::Row>, DbAccessError> {
        let pool = self.pool.get()?;
        let mut conn = checkout(&pool).await?;
        let rows = bind_query_params(sql, params)
            .query(&mut *conn)
            .await?
            .into_first_result()
            .await?;
        Ok(rows)
    }

    /// Run a read query with `$n` markers already translated.
    pub(super) async fn fetch(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RowSet, DbAccessError> {
        let pool = self.pool.get()?;
        let mut conn = checkout(&pool).await?;
        build_result_set(&mut conn, sql, params).await
    }
}

#[async_trait]
impl Driver for MssqlDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mssql
    }

    async fn ping(&self) -> Result<(), DbAccessError> {
        let pool = self.pool.get()?;
        let mut conn = checkout(&pool).await?;
        conn.simple_query("SELECT 1").await?.into_results().await?;
        Ok(())
    }

    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<String>, DbAccessError> {
        let schema = RowValues::Text(schema_or_default(schema).to_string());
        let rows = self
            .query_rows(LIST_TABLES_SQL, std::slice::from_ref(&schema))
            .await?;
        rows.iter()
            .map(|row| {
                Ok(row
                    .try_get::<&str, _>(0)?
                    .unwrap_or_default()
                    .to_string())
            })
            .collect()
    }

    async fn describe_table(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, DbAccessError> {
        let params = [
            RowValues::Text(schema_or_default(schema).to_string()),
            RowValues::Text(table.to_string()),
        ];
        let rows = self.query_rows(DESCRIBE_TABLE_SQL, &params).await?;
        columns_from_rows(&rows)
    }

    async fn run_read_only_query(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RowSet, DbAccessError> {
        let sql = translate_placeholders(sql, PlaceholderStyle::Mssql);
        self.fetch(&sql, params).await
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
        let pool = self.pool.get()?;
        let mut conn = checkout(&pool).await?;
        let inserted = bind_query_params(&stmt.sql, &stmt.params)
            .query(&mut *conn)
            .await?
            .into_row()
            .await?;

        let Some(inserted) = inserted else {
            return Ok(None);
        };
        if inserted.columns().is_empty() {
            return Ok(None);
        }
        let value = mssql_extract_value(&inserted, 0)?;
        Ok((!value.is_null()).then_some(value))
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
        let pool = self.pool.get()?;
        let mut conn = checkout(&pool).await?;
        let affected = bind_query_params(&stmt.sql, &stmt.params)
            .execute(&mut *conn)
            .await?
            .total();
        if affected == 0 {
            return Err(DbAccessError::RowNotFound);
        }
        Ok(affected)
    }

    async fn close(&self) -> Result<(), DbAccessError> {
        if self.pool.take().is_some() {
            tracing::debug!("sql server pool released");
        }
        Ok(())
    }

    fn exporter(&self) -> Option<&dyn Exporter> {
        Some(self)
    }
}
