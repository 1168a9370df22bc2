use std::error::Error;
use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::types::{FromSql, Kind, ToSql, Type};
use tokio_postgres::{Client, Statement};
use uuid::Uuid;

use crate::error::DbAccessError;
use crate::results::RowSet;
use crate::types::{ColumnInfo, RowValues};

pub(crate) const LIST_TABLES_SQL: &str = "SELECT table_name::text \
     FROM information_schema.tables \
     WHERE table_schema = $1::text AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

pub(crate) const DESCRIBE_TABLE_SQL: &str = "SELECT c.column_name::text, c.data_type::text, \
            c.is_nullable = 'YES', \
            EXISTS ( \
              SELECT 1 FROM information_schema.table_constraints tc \
              JOIN information_schema.key_column_usage kcu \
                ON tc.constraint_name = kcu.constraint_name \
               AND tc.table_schema = kcu.table_schema \
               AND tc.table_name = kcu.table_name \
              WHERE tc.table_schema = c.table_schema AND tc.table_name = c.table_name \
                AND tc.constraint_type = 'PRIMARY KEY' AND kcu.column_name = c.column_name \
            ) \
     FROM information_schema.columns c \
     WHERE c.table_schema = $1::text AND c.table_name = $2::text \
     ORDER BY c.ordinal_position";

/// A column value decoded without knowing its type up front.
///
/// Numbers, booleans, and bytea keep their shape. Temporal values become ISO-8601 text and
/// JSON, numeric, uuid, interval, and network values their text form. Arrays become JSON
/// text, domains decode as their base type, and enums and other text-format types come back
/// as text. Anything else is returned as raw bytes rather than failing the whole query.
struct AnyValue(RowValues);

impl<'a> FromSql<'a> for AnyValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let value = match *ty {
            Type::INT2 => RowValues::Int(i64::from(i16::from_sql(ty, raw)?)),
            Type::INT4 => RowValues::Int(i64::from(i32::from_sql(ty, raw)?)),
            Type::INT8 => RowValues::Int(i64::from_sql(ty, raw)?),
            Type::OID => RowValues::Int(i64::from(u32::from_sql(ty, raw)?)),
            Type::FLOAT4 => RowValues::Float(f64::from(f32::from_sql(ty, raw)?)),
            Type::FLOAT8 => RowValues::Float(f64::from_sql(ty, raw)?),
            Type::BOOL => RowValues::Bool(bool::from_sql(ty, raw)?),
            Type::BYTEA => RowValues::Blob(raw.to_vec()),
            Type::NUMERIC => RowValues::Text(Decimal::from_sql(ty, raw)?.to_string()),
            Type::UUID => RowValues::Text(Uuid::from_sql(ty, raw)?.hyphenated().to_string()),
            Type::TIMESTAMP => RowValues::Text(
                NaiveDateTime::from_sql(ty, raw)?
                    .format("%Y-%m-%dT%H:%M:%S%.f")
                    .to_string(),
            ),
            Type::TIMESTAMPTZ => RowValues::Text(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339()),
            Type::DATE => RowValues::Text(NaiveDate::from_sql(ty, raw)?.to_string()),
            Type::TIME => RowValues::Text(NaiveTime::from_sql(ty, raw)?.to_string()),
            Type::JSON | Type::JSONB => RowValues::Text(Value::from_sql(ty, raw)?.to_string()),
            Type::INTERVAL => RowValues::Text(interval_text(raw)?),
            Type::INET | Type::CIDR => RowValues::Text(inet_text(raw)?),
            _ => match ty.kind() {
                Kind::Array(_) => {
                    let items = Vec::<Option<AnyValue>>::from_sql(ty, raw)?
                        .into_iter()
                        .map(|item| item.map_or(RowValues::Null, |v| v.0))
                        .collect::<Vec<_>>();
                    RowValues::Text(serde_json::to_string(&items)?)
                }
                Kind::Domain(base) => AnyValue::from_sql(base, raw)?.0,
                Kind::Enum(_) => RowValues::Text(String::from_utf8_lossy(raw).into_owned()),
                _ if <&str as FromSql<'_>>::accepts(ty) || *ty == Type::XML => {
                    RowValues::Text(String::from_utf8_lossy(raw).into_owned())
                }
                _ => RowValues::Blob(raw.to_vec()),
            },
        };
        Ok(AnyValue(value))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn be_i32(raw: &[u8]) -> Result<i32, Box<dyn Error + Sync + Send>> {
    Ok(i32::from_be_bytes(raw.try_into()?))
}

fn plural(n: i64, unit: &str) -> String {
    if n.abs() == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Render an `interval` the way the server's default `postgres` style does.
fn interval_text(raw: &[u8]) -> Result<String, Box<dyn Error + Sync + Send>> {
    if raw.len() != 16 {
        return Err(format!("invalid interval length {}", raw.len()).into());
    }
    let micros = i64::from_be_bytes(raw[0..8].try_into()?);
    let days = i64::from(be_i32(&raw[8..12])?);
    let months = i64::from(be_i32(&raw[12..16])?);

    let mut parts = Vec::new();
    if months / 12 != 0 {
        parts.push(plural(months / 12, "year"));
    }
    if months % 12 != 0 {
        parts.push(plural(months % 12, "mon"));
    }
    if days != 0 {
        parts.push(plural(days, "day"));
    }
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let total = micros.unsigned_abs();
        let secs = total / 1_000_000;
        let frac = total % 1_000_000;
        let mut clock = format!("{sign}{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60);
        if frac != 0 {
            clock.push_str(format!(".{frac:06}").trim_end_matches('0'));
        }
        parts.push(clock);
    }
    Ok(parts.join(" "))
}

/// Render `inet`/`cidr`; the prefix is shown for networks and non-host masks.
fn inet_text(raw: &[u8]) -> Result<String, Box<dyn Error + Sync + Send>> {
    let [family, bits, is_cidr, len, addr @ ..] = raw else {
        return Err("invalid inet value".into());
    };
    if addr.len() != usize::from(*len) {
        return Err("invalid inet address length".into());
    }
    let (ip, max_bits) = match family {
        2 => (IpAddr::from(<[u8; 4]>::try_from(addr)?), 32),
        3 => (IpAddr::from(<[u8; 16]>::try_from(addr)?), 128),
        other => return Err(format!("unknown inet family {other}").into()),
    };
    if *is_cidr != 0 || *bits != max_bits {
        Ok(format!("{ip}/{bits}"))
    } else {
        Ok(ip.to_string())
    }
}

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `DbAccessError` if the raw value is malformed for its declared type.
pub fn postgres_extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<RowValues, DbAccessError> {
    Ok(row
        .try_get::<_, Option<AnyValue>>(idx)?
        .map_or(RowValues::Null, |v| v.0))
}

/// Run a prepared statement and collect its rows.
///
/// Column names come from the statement, so an empty result still reports them.
///
/// # Errors
/// Returns errors from query execution or result processing.
pub async fn build_result_set(
    client: &Client,
    stmt: &Statement,
    params: &[&(dyn ToSql + Sync)],
) -> Result<RowSet, DbAccessError> {
    let rows = client.query(stmt, params).await?;

    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let col_count = column_names.len();

    let mut result_set = RowSet::with_capacity(rows.len());
    result_set.set_column_names(column_names);

    for row in rows {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(postgres_extract_value(&row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Map catalog rows from [`DESCRIBE_TABLE_SQL`].
///
/// # Errors
/// Returns `DbAccessError::PostgresError` if a column has an unexpected type.
pub fn columns_from_rows(rows: &[tokio_postgres::Row]) -> Result<Vec<ColumnInfo>, DbAccessError> {
    rows.iter()
        .map(|row| {
            Ok(ColumnInfo {
                name: row.try_get(0)?,
                data_type: row.try_get(1)?,
                nullable: row.try_get::<_, Option<bool>>(2)?.unwrap_or(true),
                is_pk: row.try_get(3)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(ty: &Type, raw: &[u8]) -> RowValues {
        AnyValue::from_sql(ty, raw).unwrap().0
    }

    fn interval(micros: i64, days: i32, months: i32) -> Vec<u8> {
        let mut raw = micros.to_be_bytes().to_vec();
        raw.extend_from_slice(&days.to_be_bytes());
        raw.extend_from_slice(&months.to_be_bytes());
        raw
    }

    #[test]
    fn intervals_render_as_text() {
        assert_eq!(decode(&Type::INTERVAL, &interval(0, 1, 0)), RowValues::Text("1 day".into()));
        assert_eq!(
            decode(&Type::INTERVAL, &interval(3_723_500_000, 2, 14)),
            RowValues::Text("1 year 2 mons 2 days 01:02:03.5".into())
        );
        assert_eq!(decode(&Type::INTERVAL, &interval(0, 0, 0)), RowValues::Text("00:00:00".into()));
    }

    #[test]
    fn network_addresses_render_as_text() {
        assert_eq!(
            decode(&Type::INET, &[2, 32, 0, 4, 192, 168, 1, 5]),
            RowValues::Text("192.168.1.5".into())
        );
        assert_eq!(
            decode(&Type::CIDR, &[2, 24, 1, 4, 10, 1, 2, 0]),
            RowValues::Text("10.1.2.0/24".into())
        );
    }

    #[test]
    fn uuid_and_numeric_render_as_text() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            decode(&Type::UUID, id.as_bytes()),
            RowValues::Text("67e55044-10b1-426f-9247-bb680e5fe0c8".into())
        );

        let mut raw = tokio_util::bytes::BytesMut::new();
        "12.50".parse::<Decimal>().unwrap().to_sql(&Type::NUMERIC, &mut raw).unwrap();
        assert_eq!(decode(&Type::NUMERIC, &raw), RowValues::Text("12.50".into()));
    }

    #[test]
    fn enums_and_unknown_types_do_not_fail() {
        let mood = Type::new("mood".into(), 90_001, Kind::Enum(vec!["ok".into()]), "public".into());
        assert_eq!(decode(&mood, b"ok"), RowValues::Text("ok".into()));
        assert_eq!(decode(&Type::POINT, &[0; 16]), RowValues::Blob(vec![0; 16]));
    }

    #[test]
    fn arrays_render_as_json() {
        // one dimension, no nulls, int4 elements, two items starting at 1
        let mut raw = Vec::new();
        for word in [1_i32, 0, 23, 2, 1] {
            raw.extend_from_slice(&word.to_be_bytes());
        }
        for item in [7_i32, 8] {
            raw.extend_from_slice(&4_i32.to_be_bytes());
            raw.extend_from_slice(&item.to_be_bytes());
        }
        assert_eq!(decode(&Type::INT4_ARRAY, &raw), RowValues::Text("[7,8]".into()));
    }
}
