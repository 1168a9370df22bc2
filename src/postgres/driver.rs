use async_trait::async_trait;
use deadpool_postgres::Pool;

use crate::dml::Dialect;
use crate::driver::{Driver, Exporter, HandleSlot, ensure_update_maps};
use crate::error::DbAccessError;
use crate::guard::validate_pk_columns;
use crate::results::RowSet;
use crate::types::{ColumnInfo, ColumnMap, DatabaseType, RowValues};

use super::config::{build_pool, parse_uri};
use super::export::PostgresExporter;
use super::params::Params;
use super::query::{
    DESCRIBE_TABLE_SQL, LIST_TABLES_SQL, build_result_set, columns_from_rows,
    postgres_extract_value,
};

const DIALECT: Dialect = Dialect::new(DatabaseType::Postgres);

/// `PostgreSQL` backend over a deadpool-postgres pool.
///
/// Queries already use `$n` markers natively, so no translation happens.
#[derive(Debug)]
pub struct PostgresDriver {
    pool: HandleSlot<Pool>,
    exporter: PostgresExporter,
}

impl PostgresDriver {
    /// Connect using a URL or key/value connection string.
    ///
    /// # Errors
    /// Returns `DbAccessError::ConfigError` for malformed strings, or the pool/client error
    /// from the first connection.
    pub async fn connect(uri: &str) -> Result<Self, DbAccessError> {
        let config = parse_uri(uri)?;
        let pool = build_pool(config.clone()).await?;
        Ok(Self {
            pool: HandleSlot::new(pool),
            exporter: PostgresExporter::new(config),
        })
    }

    fn schema_or_default(schema: Option<&str>) -> &str {
        schema
            .filter(|s| !s.is_empty())
            .or(DIALECT.default_schema())
            .unwrap_or("public")
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    async fn ping(&self) -> Result<(), DbAccessError> {
        let client = self.pool.get()?.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<String>, DbAccessError> {
        let schema = Self::schema_or_default(schema);
        let client = self.pool.get()?.get().await?;
        let rows = client.query(LIST_TABLES_SQL, &[&schema]).await?;
        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(DbAccessError::from))
            .collect()
    }

    async fn describe_table(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, DbAccessError> {
        let schema = Self::schema_or_default(schema);
        let client = self.pool.get()?.get().await?;
        let rows = client.query(DESCRIBE_TABLE_SQL, &[&schema, &table]).await?;
        columns_from_rows(&rows)
    }

    async fn run_read_only_query(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RowSet, DbAccessError> {
        let client = self.pool.get()?.get().await?;
        let stmt = client.prepare(sql).await?;
        let params = Params::convert(params);
        build_result_set(&client, &stmt, params.as_refs()).await
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
        let client = self.pool.get()?.get().await?;
        let params = Params::convert(&stmt.params);
        let rows = client.query(stmt.sql.as_str(), params.as_refs()).await?;

        let Some(first) = rows.first() else {
            return Ok(None);
        };
        if first.is_empty() {
            return Ok(None);
        }
        // The row is already committed; a value we cannot read is reported as absent.
        match postgres_extract_value(first, 0) {
            Ok(value) => Ok((!value.is_null()).then_some(value)),
            Err(err) => {
                tracing::warn!(error = %err, "inserted row's first column could not be decoded");
                Ok(None)
            }
        }
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
        let client = self.pool.get()?.get().await?;
        let params = Params::convert(&stmt.params);
        let affected = client.execute(stmt.sql.as_str(), params.as_refs()).await?;
        if affected == 0 {
            return Err(DbAccessError::RowNotFound);
        }
        Ok(affected)
    }

    async fn close(&self) -> Result<(), DbAccessError> {
        if let Some(pool) = self.pool.take() {
            pool.close();
            tracing::debug!("postgres pool closed");
        }
        Ok(())
    }

    fn exporter(&self) -> Option<&dyn Exporter> {
        Some(&self.exporter)
    }
}
