use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};

use crate::types::RowValues;

/// Owned `SQLite` parameters, movable into a blocking task.
#[derive(Debug, Clone, Default)]
pub struct Params(pub Vec<RowValues>);

impl Params {
    #[must_use]
    pub fn convert(params: &[RowValues]) -> Self {
        Params(params.to_vec())
    }

    /// Build a borrowed params slice suitable for rusqlite execution.
    #[must_use]
    pub fn as_refs(&self) -> Vec<&dyn ToSql> {
        self.0.iter().map(|v| v as &dyn ToSql).collect()
    }
}

impl ToSql for RowValues {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            RowValues::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            RowValues::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            RowValues::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            // SQLite has no boolean storage class
            RowValues::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            RowValues::Blob(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes.as_slice())),
            RowValues::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}
