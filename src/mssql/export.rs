use std::fmt::Write as _;
use std::path::Path;

use async_trait::async_trait;

use crate::driver::{Driver, Exporter};
use crate::error::DbAccessError;
use crate::export::{ToolInvocation, validate_export_path, validate_import_path};
use crate::results::RowSet;
use crate::types::{ColumnInfo, RowValues};

use super::driver::{DIALECT, MssqlDriver};

const EXPORT_SCHEMA: &str = "dbo";
const SCRIPT_HEADER: &str = "-- SQL Server database export\n\n";

/// Render a value as a T-SQL literal.
#[must_use]
pub fn sql_literal(value: &RowValues) -> String {
    match value {
        RowValues::Null => "NULL".to_string(),
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) => f.to_string(),
        RowValues::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        RowValues::Text(s) => format!("N'{}'", s.replace('\'', "''")),
        RowValues::Blob(bytes) => {
            let mut out = String::with_capacity(2 + bytes.len() * 2);
            out.push_str("0x");
            for b in bytes {
                let _ = write!(out, "{b:02X}");
            }
            out
        }
    }
}

/// `CREATE TABLE` for `table` from its described columns, with a `PRIMARY KEY` clause
/// when any column is flagged.
///
/// # Errors
/// `DbAccessError::ExecutionError` when the table has no columns.
pub fn create_table_sql(
    schema: &str,
    table: &str,
    columns: &[ColumnInfo],
) -> Result<String, DbAccessError> {
    if columns.is_empty() {
        return Err(DbAccessError::ExecutionError(format!(
            "table {table} has no columns"
        )));
    }
    let mut out = format!("CREATE TABLE {} (\n", DIALECT.qualify(Some(schema), table));
    let mut pk_cols = Vec::new();
    for (idx, col) in columns.iter().enumerate() {
        if idx > 0 {
            out.push_str(",\n");
        }
        let nullable = if col.nullable { "NULL" } else { "NOT NULL" };
        let _ = write!(
            out,
            "    {} {} {nullable}",
            DIALECT.quote_ident(&col.name),
            col.data_type
        );
        if col.is_pk {
            pk_cols.push(DIALECT.quote_ident(&col.name));
        }
    }
    if !pk_cols.is_empty() {
        let _ = write!(out, ",\n    PRIMARY KEY ({})", pk_cols.join(", "));
    }
    out.push_str("\n);");
    Ok(out)
}

/// One `INSERT` line per row of `rows`, followed by a batch separator.
#[must_use]
pub fn insert_statements(schema: &str, table: &str, rows: &RowSet) -> String {
    let target = DIALECT.qualify(Some(schema), table);
    let columns: Vec<String> = rows
        .column_names()
        .iter()
        .map(|c| DIALECT.quote_ident(c))
        .collect();
    let column_list = columns.join(", ");

    let mut out = String::new();
    for row in rows {
        let values: Vec<String> = row.values.iter().map(sql_literal).collect();
        let _ = writeln!(
            out,
            "INSERT INTO {target} ({column_list}) VALUES ({});",
            values.join(", ")
        );
    }
    out.push_str("GO\n");
    out
}

impl MssqlDriver {
    async fn export_script(&self) -> Result<String, DbAccessError> {
        let mut script = String::from(SCRIPT_HEADER);
        for table in self.list_tables(Some(EXPORT_SCHEMA)).await? {
            let columns = self.describe_table(Some(EXPORT_SCHEMA), &table).await?;
            let create = create_table_sql(EXPORT_SCHEMA, &table, &columns)?;
            let _ = write!(script, "{create}\nGO\n\n");

            let select = format!(
                "SELECT * FROM {}",
                DIALECT.qualify(Some(EXPORT_SCHEMA), &table)
            );
            let rows = self.fetch(&select, &[]).await?;
            script.push_str(&insert_statements(EXPORT_SCHEMA, &table, &rows));
            script.push('\n');
        }
        Ok(script)
    }
}

#[async_trait]
impl Exporter for MssqlDriver {
    /// Write a generated script covering every `dbo` table.
    async fn export_database(&self, path: &Path) -> Result<(), DbAccessError> {
        let target = validate_export_path(path)?;
        let script = self.export_script().await?;
        tokio::fs::write(&target, script).await?;
        tracing::debug!("sql server export script written");
        Ok(())
    }

    /// Replay the file with `sqlcmd`; the password travels in `SQLCMDPASSWORD`.
    ///
    /// Needs a `sqlserver://` URI; ADO.NET strings carry nothing `sqlcmd` can reuse.
    async fn import_database(&self, path: &Path) -> Result<(), DbAccessError> {
        let source = validate_import_path(path)?;
        let Some(target) = self.info.sqlcmd_target() else {
            return Err(DbAccessError::ConfigError(
                "SQL Server import requires a sqlserver:// connection URI".into(),
            ));
        };
        ToolInvocation::find("sqlcmd")?
            .arg("-S")
            .arg(target.server())
            .arg("-U")
            .arg(target.user.as_str())
            .arg("-d")
            .arg(target.database.as_str())
            .arg("-b")
            .arg("-i")
            .arg(source)
            .env("SQLCMDPASSWORD", target.password())
            .run()
            .await
    }
}
