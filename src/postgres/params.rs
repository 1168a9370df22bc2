use std::error::Error;
use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use tokio_util::bytes;
use uuid::Uuid;

use crate::types::RowValues;

/// Borrowed parameter list for tokio-postgres calls.
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Convert from a slice of `RowValues` to Postgres parameters
    #[must_use]
    pub fn convert(params: &'a [RowValues]) -> Params<'a> {
        let mut references = Vec::with_capacity(params.len());
        for p in params {
            references.push(p as &(dyn ToSql + Sync));
        }
        Params { references }
    }

    /// Get a reference to the underlying parameter array
    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
}

/// Types whose binary wire format is their UTF-8 text.
fn is_text_like(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN | Type::XML
    ) || ty.name() == "citext"
        || matches!(ty.kind(), Kind::Enum(_))
}

fn mismatch(kind: &str, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("cannot encode {kind} value as postgres type {ty}").into()
}

/// `inet`/`cidr` wire format: family, prefix bits, cidr flag, address length, address.
fn encode_inet(
    text: &str,
    ty: &Type,
    out: &mut bytes::BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    let (addr, bits) = match text.split_once('/') {
        Some((addr, bits)) => (addr, Some(bits.parse::<u8>()?)),
        None => (text, None),
    };
    let (family, max_bits, octets) = match addr.parse::<IpAddr>()? {
        IpAddr::V4(v4) => (2_u8, 32_u8, v4.octets().to_vec()),
        IpAddr::V6(v6) => (3_u8, 128_u8, v6.octets().to_vec()),
    };
    let bits = bits.unwrap_or(max_bits);
    if bits > max_bits {
        return Err(format!("prefix length {bits} is too long for {addr}").into());
    }
    let is_cidr = u8::from(*ty == Type::CIDR);
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&[family, bits, is_cidr, octets.len() as u8]);
    out.extend_from_slice(&octets);
    Ok(IsNull::No)
}

/// Values are encoded for the type the server inferred for each placeholder, so an `Int`
/// binds to `int2`/`int4`/`int8`/`numeric` alike and text can feed date, time, JSON, uuid,
/// numeric, and network columns. `Null` binds to any type.
impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        if let Kind::Domain(base) = ty.kind() {
            return self.to_sql(base, out);
        }
        match self {
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::INT8 => i.to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                _ if is_text_like(ty) => i.to_string().to_sql(ty, out),
                _ => Err(mismatch("integer", ty)),
            },
            RowValues::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*f)?.to_sql(ty, out),
                _ if is_text_like(ty) => f.to_string().to_sql(ty, out),
                _ => Err(mismatch("float", ty)),
            },
            RowValues::Text(s) => match *ty {
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
                }
                Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
                Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(s)?
                    .with_timezone(&Utc)
                    .to_sql(ty, out),
                Type::DATE => NaiveDate::parse_from_str(s, "%Y-%m-%d")?.to_sql(ty, out),
                Type::TIME => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")?.to_sql(ty, out),
                Type::NUMERIC => s.trim().parse::<Decimal>()?.to_sql(ty, out),
                Type::UUID => Uuid::parse_str(s.trim())?.to_sql(ty, out),
                Type::INET | Type::CIDR => encode_inet(s.trim(), ty, out),
                _ if is_text_like(ty) => s.as_str().to_sql(ty, out),
                _ => Err(mismatch("text", ty)),
            },
            RowValues::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                _ if is_text_like(ty) => b.to_string().to_sql(ty, out),
                _ => Err(mismatch("boolean", ty)),
            },
            RowValues::Blob(bytes) => match *ty {
                Type::BYTEA => bytes.to_sql(ty, out),
                _ => Err(mismatch("binary", ty)),
            },
        }
    }

    // Every type is accepted here; `to_sql` reports the pairs it cannot encode.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
