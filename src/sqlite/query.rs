use rusqlite::types::Value;

use crate::error::DbAccessError;
use crate::results::RowSet;
use crate::types::{ColumnInfo, RowValues};

use super::config::SharedSqliteConnection;
use super::params::Params;

/// Run `func` against the shared connection on the blocking pool.
pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, DbAccessError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, DbAccessError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| DbAccessError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `DbAccessError` if the value cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, DbAccessError> {
    let value: Value = row.get(idx).map_err(DbAccessError::SqliteError)?;
    match value {
        Value::Null => Ok(RowValues::Null),
        Value::Integer(i) => Ok(RowValues::Int(i)),
        Value::Real(f) => Ok(RowValues::Float(f)),
        Value::Text(s) => Ok(RowValues::Text(s)),
        Value::Blob(b) => Ok(RowValues::Blob(b)),
    }
}

/// Prepare and run `sql`, collecting every row.
///
/// # Errors
/// Returns `DbAccessError::SqliteError` if preparation, binding, or stepping fails.
pub fn build_result_set(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &Params,
) -> Result<RowSet, DbAccessError> {
    let mut stmt = conn.prepare(sql)?;
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut result_set = RowSet::with_capacity(10);
    result_set.set_column_names(column_names);

    let mut rows_iter = stmt.query(&params.as_refs()[..])?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value_sync(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Column metadata from `PRAGMA table_info`.
///
/// # Errors
/// Returns `DbAccessError::SqliteError` if the pragma fails.
pub fn describe_table_sync(
    conn: &rusqlite::Connection,
    quoted_table: &str,
) -> Result<Vec<ColumnInfo>, DbAccessError> {
    // cid, name, type, notnull, dflt_value, pk
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({quoted_table})"))?;
    let columns = stmt
        .query_map([], |row| {
            let notnull: i64 = row.get(3)?;
            let pk: i64 = row.get(5)?;
            Ok(ColumnInfo {
                name: row.get(1)?,
                data_type: row.get(2)?,
                nullable: notnull == 0,
                is_pk: pk > 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Run a single mutating statement, returning the changed-row count.
///
/// # Errors
/// Returns `DbAccessError::SqliteError` on failure.
pub fn execute_sync(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &Params,
) -> Result<usize, DbAccessError> {
    let mut stmt = conn.prepare(sql)?;
    Ok(stmt.execute(&params.as_refs()[..])?)
}
