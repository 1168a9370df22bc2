use std::borrow::Cow;

use tiberius::{ColumnData, Query, ToSql};

use crate::types::RowValues;

/// ToSql for RowValues for passing parameters
impl ToSql for RowValues {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            RowValues::Int(i) => ColumnData::I64(Some(*i)),
            RowValues::Float(f) => ColumnData::F64(Some(*f)),
            RowValues::Text(s) => ColumnData::String(Some(Cow::from(s.as_str()))),
            RowValues::Bool(b) => ColumnData::Bit(Some(*b)),
            RowValues::Null => ColumnData::String(None),
            RowValues::Blob(bytes) => ColumnData::Binary(Some(Cow::from(bytes.as_slice()))),
        }
    }
}

/// Build a query with `params` bound as `@P1..@Pn`.
///
/// Tiberius takes ownership of bound values, so text and blobs are cloned.
pub fn bind_query_params<'a>(sql: &'a str, params: &[RowValues]) -> Query<'a> {
    let mut query = Query::new(sql);
    for param in params {
        match param {
            RowValues::Int(i) => query.bind(*i),
            RowValues::Float(f) => query.bind(*f),
            RowValues::Text(s) => query.bind(s.clone()),
            RowValues::Bool(b) => query.bind(*b),
            RowValues::Null => query.bind(Option::<String>::None),
            RowValues::Blob(bytes) => query.bind(bytes.clone()),
        }
    }
    query
}
