use crate::driver::Driver;
use crate::error::DbAccessError;
use crate::types::{ColumnInfo, ColumnMap};

/// Confirm `key` names exactly the primary-key columns of `table`.
///
/// Describes the table through `driver`, then defers to [`check_primary_key`].
///
/// # Errors
/// Propagates `describe_table` failures; otherwise see [`check_primary_key`].
pub async fn validate_pk_columns<D>(
    driver: &D,
    schema: Option<&str>,
    table: &str,
    key: &ColumnMap,
) -> Result<(), DbAccessError>
where
    D: Driver + ?Sized,
{
    let columns = driver.describe_table(schema, table).await?;
    check_primary_key(&columns, table, key)
}

/// Compare the key's column names with the primary-key columns in `columns`.
///
/// The comparison is order-independent over sorted names.
///
/// # Errors
/// `DbAccessError::NoPrimaryKey` if no column is flagged as a key, or
/// `DbAccessError::KeyMismatch` naming both sets when any name is missing or extra.
pub fn check_primary_key(
    columns: &[ColumnInfo],
    table: &str,
    key: &ColumnMap,
) -> Result<(), DbAccessError> {
    let mut expected: Vec<String> = columns
        .iter()
        .filter(|col| col.is_pk)
        .map(|col| col.name.clone())
        .collect();
    if expected.is_empty() {
        return Err(DbAccessError::NoPrimaryKey {
            table: table.to_string(),
        });
    }
    expected.sort();

    // ColumnMap iterates in sorted order already.
    let provided: Vec<String> = key.keys().cloned().collect();
    if provided != expected {
        return Err(DbAccessError::KeyMismatch { expected, provided });
    }
    Ok(())
}
