use async_trait::async_trait;
use sqlx::mysql::MySqlPool;

use crate::dml::Dialect;
use crate::driver::{Driver, Exporter, HandleSlot, ensure_update_maps};
use crate::error::DbAccessError;
use crate::guard::validate_pk_columns;
use crate::results::RowSet;
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::types::{ColumnInfo, ColumnMap, DatabaseType, RowValues};

use super::config::{MysqlConnInfo, build_pool};
use super::export::MysqlExporter;
use super::params::bind_all;
use super::query::{DESCRIBE_TABLE_SQL, LIST_TABLES_SQL, build_result_set};

const DIALECT: Dialect = Dialect::new(DatabaseType::Mysql);

/// `MySQL` backend over a sqlx pool.
///
/// sqlx always negotiates `CLIENT_FOUND_ROWS`, so `update_row` sees rows *matched* and an
/// update that rewrites the current values still counts as 1.
#[derive(Debug)]
pub struct MysqlDriver {
    pool: HandleSlot<MySqlPool>,
    exporter: MysqlExporter,
}

fn non_empty(schema: Option<&str>) -> Option<&str> {
    schema.filter(|s| !s.is_empty())
}

impl MysqlDriver {
    /// Connect using a `user:pass@tcp(host:port)/db` or `mysql://` DSN.
    ///
    /// # Errors
    /// Returns `DbAccessError::ConfigError` for malformed DSNs or the sqlx connection error.
    pub async fn connect(dsn: &str) -> Result<Self, DbAccessError> {
        let info = MysqlConnInfo::parse(dsn)?;
        let pool = build_pool(&info).await?;
        Ok(Self {
            pool: HandleSlot::new(pool),
            exporter: MysqlExporter::new(info),
        })
    }
}

#[async_trait]
impl Driver for MysqlDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mysql
    }

    async fn ping(&self) -> Result<(), DbAccessError> {
        let pool = self.pool.get()?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<String>, DbAccessError> {
        let pool = self.pool.get()?;
        let names: Vec<String> = sqlx::query_scalar(LIST_TABLES_SQL)
            .bind(non_empty(schema))
            .fetch_all(&pool)
            .await?;
        Ok(names)
    }

    async fn describe_table(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, DbAccessError> {
        let pool = self.pool.get()?;
        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(DESCRIBE_TABLE_SQL)
            .bind(non_empty(schema))
            .bind(table)
            .fetch_all(&pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(name, data_type, nullable, is_pk)| ColumnInfo {
                name,
                data_type,
                nullable: nullable != 0,
                is_pk: is_pk != 0,
            })
            .collect())
    }

    async fn run_read_only_query(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RowSet, DbAccessError> {
        let sql = translate_placeholders(sql, PlaceholderStyle::Mysql);
        let pool = self.pool.get()?;
        let rows = bind_all(sqlx::query(&sql), params).fetch_all(&pool).await?;
        build_result_set(&rows)
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
        let stmt = DIALECT.build_insert(non_empty(schema), table, row);
        let pool = self.pool.get()?;
        let result = bind_all(sqlx::query(&stmt.sql), &stmt.params)
            .execute(&pool)
            .await?;
        let id = result.last_insert_id();
        Ok((id > 0)
            .then(|| i64::try_from(id).ok())
            .flatten()
            .map(RowValues::Int))
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

        let stmt = DIALECT.build_update(non_empty(schema), table, key, set);
        let pool = self.pool.get()?;
        let result = bind_all(sqlx::query(&stmt.sql), &stmt.params)
            .execute(&pool)
            .await?;
        match result.rows_affected() {
            0 => Err(DbAccessError::RowNotFound),
            n => Ok(n),
        }
    }

    async fn close(&self) -> Result<(), DbAccessError> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            tracing::debug!("mysql pool closed");
        }
        Ok(())
    }

    fn exporter(&self) -> Option<&dyn Exporter> {
        Some(&self.exporter)
    }
}
