use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use tiberius::numeric::Numeric;
use tiberius::xml::XmlData;
use tiberius::{ColumnType, Row, Uuid};

use super::config::MssqlClient;
use super::params::bind_query_params;
use crate::error::DbAccessError;
use crate::results::RowSet;
use crate::types::{ColumnInfo, RowValues};

pub(crate) const LIST_TABLES_SQL: &str = "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_SCHEMA = @P1 AND TABLE_TYPE = 'BASE TABLE' \
     ORDER BY TABLE_NAME";

pub(crate) const DESCRIBE_TABLE_SQL: &str = "SELECT c.COLUMN_NAME, c.DATA_TYPE, \
            CASE WHEN c.IS_NULLABLE = 'YES' THEN 1 ELSE 0 END, \
            CASE WHEN pk.COLUMN_NAME IS NOT NULL THEN 1 ELSE 0 END \
     FROM INFORMATION_SCHEMA.COLUMNS c \
     LEFT JOIN ( \
       SELECT ku.TABLE_SCHEMA, ku.TABLE_NAME, ku.COLUMN_NAME \
       FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
       JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku \
         ON tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME AND tc.TABLE_SCHEMA = ku.TABLE_SCHEMA \
       WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' \
     ) pk ON c.TABLE_SCHEMA = pk.TABLE_SCHEMA AND c.TABLE_NAME = pk.TABLE_NAME \
         AND c.COLUMN_NAME = pk.COLUMN_NAME \
     WHERE c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2 \
     ORDER BY c.ORDINAL_POSITION";

/// First integer representation the column accepts. `Intn` columns carry any width.
fn int_value(row: &Row, idx: usize) -> Result<Option<RowValues>, DbAccessError> {
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Ok(v.map(RowValues::Int));
    }
    if let Ok(v) = row.try_get::<i32, _>(idx) {
        return Ok(v.map(|v| RowValues::Int(i64::from(v))));
    }
    if let Ok(v) = row.try_get::<i16, _>(idx) {
        return Ok(v.map(|v| RowValues::Int(i64::from(v))));
    }
    Ok(row.try_get::<u8, _>(idx)?.map(|v| RowValues::Int(i64::from(v))))
}

fn float_value(row: &Row, idx: usize) -> Result<Option<RowValues>, DbAccessError> {
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return Ok(v.map(RowValues::Float));
    }
    Ok(row.try_get::<f32, _>(idx)?.map(|v| RowValues::Float(f64::from(v))))
}

/// Extracts a `RowValues` from a tiberius Row at the given index.
///
/// Decimal, GUID, XML and temporal values become their canonical text.
///
/// # Errors
/// Returns `DbAccessError` if the value cannot be read as its reported type.
pub fn mssql_extract_value(row: &Row, idx: usize) -> Result<RowValues, DbAccessError> {
    let Some(column) = row.columns().get(idx) else {
        return Ok(RowValues::Null);
    };

    let value = match column.column_type() {
        ColumnType::Null => None,
        ColumnType::Int1
        | ColumnType::Int2
        | ColumnType::Int4
        | ColumnType::Int8
        | ColumnType::Intn => int_value(row, idx)?,
        ColumnType::Float4
        | ColumnType::Float8
        | ColumnType::Floatn
        | ColumnType::Money
        | ColumnType::Money4 => float_value(row, idx)?,
        ColumnType::Decimaln | ColumnType::Numericn => row
            .try_get::<Numeric, _>(idx)?
            .map(|n| RowValues::Text(n.to_string())),
        ColumnType::Bit | ColumnType::Bitn => row.try_get::<bool, _>(idx)?.map(RowValues::Bool),
        ColumnType::Datetime
        | ColumnType::Datetime2
        | ColumnType::Datetimen
        | ColumnType::Datetime4 => row
            .try_get::<NaiveDateTime, _>(idx)?
            .map(|dt| RowValues::Text(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        ColumnType::DatetimeOffsetn => row
            .try_get::<DateTime<Utc>, _>(idx)?
            .map(|dt| RowValues::Text(dt.to_rfc3339())),
        ColumnType::Daten => row
            .try_get::<NaiveDate, _>(idx)?
            .map(|d| RowValues::Text(d.to_string())),
        ColumnType::Timen => row
            .try_get::<NaiveTime, _>(idx)?
            .map(|t| RowValues::Text(t.to_string())),
        ColumnType::BigVarBin | ColumnType::BigBinary | ColumnType::Image => row
            .try_get::<&[u8], _>(idx)?
            .map(|b| RowValues::Blob(b.to_vec())),
        ColumnType::Guid => row
            .try_get::<Uuid, _>(idx)?
            .map(|u| RowValues::Text(u.to_string())),
        ColumnType::Xml => row
            .try_get::<&XmlData, _>(idx)?
            .map(|xml| RowValues::Text(xml.to_owned().into_string())),
        _ => row
            .try_get::<&str, _>(idx)?
            .map(|s| RowValues::Text(s.to_string())),
    };
    Ok(value.unwrap_or(RowValues::Null))
}

/// Run `sql` with `params` and collect every row of the first result.
///
/// # Errors
/// Returns `DbAccessError` if execution, streaming, or value extraction fails.
pub async fn build_result_set(
    client: &mut MssqlClient,
    sql: &str,
    params: &[RowValues],
) -> Result<RowSet, DbAccessError> {
    let mut stream = bind_query_params(sql, params).query(client).await?;

    let column_names: Vec<String> = stream
        .columns()
        .await?
        .map(|cols| cols.iter().map(|col| col.name().to_string()).collect())
        .unwrap_or_default();

    let mut result_set = RowSet::with_capacity(10);
    result_set.set_column_names(column_names);
    let col_count = result_set.column_names().len();

    let mut rows = stream.into_row_stream();
    while let Some(row) = rows.try_next().await? {
        let mut values = Vec::with_capacity(col_count);
        for idx in 0..col_count {
            values.push(mssql_extract_value(&row, idx)?);
        }
        result_set.add_row_values(values);
    }
    Ok(result_set)
}

/// Map rows of [`DESCRIBE_TABLE_SQL`] to column metadata.
///
/// # Errors
/// Returns `DbAccessError` if a metadata column has an unexpected type.
pub(crate) fn columns_from_rows(rows: &[Row]) -> Result<Vec<ColumnInfo>, DbAccessError> {
    rows.iter()
        .map(|row| {
            Ok(ColumnInfo {
                name: row.try_get::<&str, _>(0)?.unwrap_or_default().to_string(),
                data_type: row.try_get::<&str, _>(1)?.unwrap_or_default().to_string(),
                nullable: row.try_get::<i32, _>(2)?.unwrap_or(0) == 1,
                is_pk: row.try_get::<i32, _>(3)?.unwrap_or(0) == 1,
            })
        })
        .collect()
}
