use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::Query;

use crate::types::RowValues;

/// Bind one value to a MySQL query.
pub fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q RowValues,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        RowValues::Int(i) => query.bind(i),
        RowValues::Float(f) => query.bind(f),
        RowValues::Bool(b) => query.bind(b),
        RowValues::Text(s) => query.bind(s.as_str()),
        RowValues::Blob(bytes) => query.bind(bytes.as_slice()),
        RowValues::Null => query.bind(Option::<String>::None),
    }
}

/// Bind every value in order; MySQL `?` markers are positional.
pub fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [RowValues],
) -> Query<'q, MySql, MySqlArguments> {
    for value in params {
        query = bind_value(query, value);
    }
    query
}
