use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::DbAccessError;
use crate::results::RowSet;
use crate::types::RowValues;

/// Base tables of the given schema, or of the current database when the bound schema is NULL.
pub(crate) const LIST_TABLES_SQL: &str = "SELECT CAST(TABLE_NAME AS CHAR) \
     FROM information_schema.TABLES \
     WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_TYPE = 'BASE TABLE' \
     ORDER BY TABLE_NAME";

// Cast to CHAR to avoid BINARY type mismatch with Rust String
pub(crate) const DESCRIBE_TABLE_SQL: &str = "SELECT CAST(c.COLUMN_NAME AS CHAR), \
            CAST(c.DATA_TYPE AS CHAR), \
            CAST(c.IS_NULLABLE = 'YES' AS SIGNED), \
            CAST(c.COLUMN_KEY = 'PRI' AS SIGNED) \
     FROM information_schema.COLUMNS c \
     WHERE c.TABLE_SCHEMA = COALESCE(?, DATABASE()) AND c.TABLE_NAME = ? \
     ORDER BY c.ORDINAL_POSITION";

/// Extract a `RowValues` by trying decoders from most to least specific.
///
/// Unsigned values above `i64::MAX` and decimals become text; temporal values become
/// ISO-8601 text.
///
/// # Errors
/// Returns `DbAccessError::ExecutionError` naming the column type when no decoder fits, and
/// the sqlx error if the raw value cannot be read.
pub fn mysql_extract_value(row: &MySqlRow, idx: usize) -> Result<RowValues, DbAccessError> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(RowValues::Null);
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Ok(RowValues::Int(v));
    }
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return Ok(match i64::try_from(v) {
            Ok(i) => RowValues::Int(i),
            Err(_) => RowValues::Text(v.to_string()),
        });
    }
    if let Ok(v) = row.try_get::<i32, _>(idx) {
        return Ok(RowValues::Int(i64::from(v)));
    }
    if let Ok(v) = row.try_get::<u32, _>(idx) {
        return Ok(RowValues::Int(i64::from(v)));
    }
    if let Ok(v) = row.try_get::<i16, _>(idx) {
        return Ok(RowValues::Int(i64::from(v)));
    }
    if let Ok(v) = row.try_get::<u16, _>(idx) {
        return Ok(RowValues::Int(i64::from(v)));
    }
    if let Ok(v) = row.try_get::<i8, _>(idx) {
        return Ok(RowValues::Int(i64::from(v)));
    }
    if let Ok(v) = row.try_get::<u8, _>(idx) {
        return Ok(RowValues::Int(i64::from(v)));
    }
    if let Ok(v) = row.try_get::<bool, _>(idx) {
        return Ok(RowValues::Bool(v));
    }
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return Ok(RowValues::Float(v));
    }
    if let Ok(v) = row.try_get::<f32, _>(idx) {
        return Ok(RowValues::Float(f64::from(v)));
    }
    if let Ok(v) = row.try_get::<Decimal, _>(idx) {
        return Ok(RowValues::Text(v.to_string()));
    }
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return Ok(RowValues::Text(v));
    }
    if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
        return Ok(RowValues::Text(v.to_rfc3339()));
    }
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
        return Ok(RowValues::Text(
            v.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        ));
    }
    if let Ok(v) = row.try_get::<NaiveDate, _>(idx) {
        return Ok(RowValues::Text(v.to_string()));
    }
    if let Ok(v) = row.try_get::<NaiveTime, _>(idx) {
        return Ok(RowValues::Text(v.to_string()));
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
        return Ok(RowValues::Blob(v));
    }
    if let Ok(v) = row.try_get::<serde_json::Value, _>(idx) {
        return Ok(RowValues::Text(v.to_string()));
    }
    Err(DbAccessError::ExecutionError(format!(
        "unsupported MySQL column type {} in column {}",
        row.column(idx).type_info().name(),
        row.column(idx).name()
    )))
}

/// Collect fetched rows; column names come from the first row.
///
/// # Errors
/// Propagates the first value that cannot be extracted.
pub fn build_result_set(rows: &[MySqlRow]) -> Result<RowSet, DbAccessError> {
    let mut result_set = RowSet::with_capacity(rows.len());
    if let Some(row) = rows.first() {
        let cols: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
        result_set.set_column_names(cols);
    }

    for row in rows {
        let col_count = row.columns().len();
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(mysql_extract_value(row, i)?);
        }
        result_set.add_row_values(row_values);
    }
    Ok(result_set)
}
