//! Dynamically typed values used for bound parameters and decoded columns.
//!
//! A [`Value`] carries one of five runtime kinds. When it is bound to a statement the
//! server has already inferred the parameter type from the SQL, so [`ToSql`] converts the
//! value into that type: integers are range-checked into `int2`/`int4`, text is parsed into
//! dates, timestamps, UUIDs, JSON, `numeric` or an enum label, and so on. Domains bind as
//! their base type. A value that cannot represent the expected type fails the bind instead
//! of being coerced silently.

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

/// The semantic kind of a bound value, derived from its runtime variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
}

/// A scalar column or parameter value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> ParamKind {
        match self {
            Value::Null => ParamKind::Null,
            Value::Bool(_) => ParamKind::Bool,
            Value::Int(_) => ParamKind::Int,
            Value::Float(_) => ParamKind::Float,
            Value::Text(_) => ParamKind::Text,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer content; text holding an integer is parsed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Numeric content as `f64`; integers widen, text holding a number is parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Text(v.to_rfc3339())
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Text(v.to_string())
    }
}

/// Text-like server types that accept any value rendered as a string.
pub(crate) fn is_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    ) || ty.name() == "citext"
}

/// User-defined enum types, which take their label as text on the wire.
pub(crate) fn is_enum(ty: &Type) -> bool {
    matches!(ty.kind(), Kind::Enum(_))
}

/// Integer range exactly representable in the given float type.
const F32_EXACT: u64 = 1 << 24;
const F64_EXACT: u64 = 1 << 53;

/// `i64::MIN` and `i64::MAX + 1`, both exact in `f64`.
const I64_LOW: f64 = -9_223_372_036_854_775_808.0;
const I64_END: f64 = 9_223_372_036_854_775_808.0;

fn mismatch(kind: &str, ty: &Type) -> BoxError {
    format!("cannot bind {kind} value as {ty}").into()
}

fn encode_bool(v: bool, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::BOOL => v.to_sql(ty, out),
        _ if is_text(ty) => v.to_string().to_sql(ty, out),
        _ => Err(mismatch("boolean", ty)),
    }
}

fn encode_int(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        Type::FLOAT4 if v.unsigned_abs() <= F32_EXACT => (v as f32).to_sql(ty, out),
        Type::FLOAT8 if v.unsigned_abs() <= F64_EXACT => (v as f64).to_sql(ty, out),
        Type::FLOAT4 | Type::FLOAT8 => {
            Err(format!("integer {v} cannot be represented exactly as {ty}").into())
        }
        Type::NUMERIC => Decimal::from(v).to_sql(ty, out),
        Type::BOOL => (v != 0).to_sql(ty, out),
        _ if is_text(ty) => v.to_string().to_sql(ty, out),
        _ => Err(mismatch("integer", ty)),
    }
}

fn encode_float(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => v.to_sql(ty, out),
        Type::NUMERIC => Decimal::try_from(v)?.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8
            if v.fract() == 0.0 && (I64_LOW..I64_END).contains(&v) =>
        {
            encode_int(v as i64, ty, out)
        }
        _ if is_text(ty) => v.to_string().to_sql(ty, out),
        _ => Err(mismatch("float", ty)),
    }
}

fn encode_text(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        _ if is_text(ty) => s.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => {
            encode_int(s.trim().parse::<i64>()?, ty, out)
        }
        Type::FLOAT4 | Type::FLOAT8 => encode_float(s.trim().parse::<f64>()?, ty, out),
        Type::NUMERIC => Decimal::from_str(s.trim())?.to_sql(ty, out),
        Type::BOOL => encode_bool(parse_bool(s).ok_or_else(|| mismatch("text", ty))?, ty, out),
        Type::DATE => parse_date(s)?.to_sql(ty, out),
        Type::TIME => parse_time(s)?.to_sql(ty, out),
        Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => parse_timestamptz(s)?.to_sql(ty, out),
        Type::UUID => uuid::Uuid::parse_str(s.trim())?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        Type::BYTEA => s.as_bytes().to_sql(ty, out),
        _ if is_enum(ty) => {
            out.put_slice(s.as_bytes());
            Ok(IsNull::No)
        }
        _ => Err(mismatch("text", ty)),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, BoxError> {
    let s = s.trim();
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(d) => Ok(d),
        Err(_) => Ok(parse_timestamp(s)?.date()),
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, BoxError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| format!("invalid time {s:?}: {e}").into())
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, BoxError> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid timestamp {s:?}").into())
}

/// RFC 3339 keeps its offset; a timestamp without one is taken as UTC.
fn parse_timestamptz(s: &str) -> Result<DateTime<Utc>, BoxError> {
    match DateTime::parse_from_rfc3339(s.trim()) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(_) => Ok(parse_timestamp(s)?.and_utc()),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if let Kind::Domain(base) = ty.kind() {
            return self.to_sql(base, out);
        }
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => encode_bool(*b, ty, out),
            Value::Int(i) => encode_int(*i, ty, out),
            Value::Float(f) => encode_float(*f, ty, out),
            Value::Text(s) => encode_text(s, ty, out),
        }
    }

    // Conversion to the inferred type happens in `to_sql`, which reports a precise error.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
