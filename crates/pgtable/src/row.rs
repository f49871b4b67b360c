//! Records: ordered column-name to value mappings.
//!
//! A [`Record`] is what reads return for each row and what writes take as payload.

use crate::error::{QbError, QbResult};
use crate::value::{Value, is_enum, is_text};
use rust_decimal::Decimal;
use tokio_postgres::Row;
use std::error::Error;
use tokio_postgres::types::{FromSql, Type};

/// An ordered mapping of column names to values.
///
/// Column order is insertion order; inserting an existing column replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Set a column, replacing the previous value if the column is already present.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Decode a driver row, mapping each column by its PostgreSQL type.
    ///
    /// `numeric`, date/time, `uuid`, `json` and enum columns come back as text in their canonical
    /// PostgreSQL rendering; NULL in any column is [`Value::Null`].
    pub fn from_row(row: &Row) -> QbResult<Self> {
        let mut record = Record::with_capacity(row.len());
        for (idx, column) in row.columns().iter().enumerate() {
            let value = decode_column(row, idx, column.type_(), column.name())?;
            record.columns.push((column.name().to_string(), value));
        }
        Ok(record)
    }
}

/// Label of a user-defined enum column, kept as text.
struct EnumLabel(String);

impl<'a> FromSql<'a> for EnumLabel {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(EnumLabel(std::str::from_utf8(raw)?.to_owned()))
    }

    fn accepts(ty: &Type) -> bool {
        is_enum(ty)
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, name: &str) -> QbResult<Option<T>> {
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| QbError::decode(name, e.to_string()))
}

fn decode_column(row: &Row, idx: usize, ty: &Type, name: &str) -> QbResult<Value> {
    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx, name)?.map(Value::Bool),
        Type::INT2 => get::<i16>(row, idx, name)?.map(Value::from),
        Type::INT4 => get::<i32>(row, idx, name)?.map(Value::from),
        Type::INT8 => get::<i64>(row, idx, name)?.map(Value::Int),
        Type::OID => get::<u32>(row, idx, name)?.map(Value::from),
        Type::FLOAT4 => get::<f32>(row, idx, name)?.map(Value::from),
        Type::FLOAT8 => get::<f64>(row, idx, name)?.map(Value::Float),
        Type::NUMERIC => get::<Decimal>(row, idx, name)?.map(Value::from),
        Type::DATE => get::<chrono::NaiveDate>(row, idx, name)?.map(Value::from),
        Type::TIME => get::<chrono::NaiveTime>(row, idx, name)?.map(Value::from),
        Type::TIMESTAMP => get::<chrono::NaiveDateTime>(row, idx, name)?.map(Value::from),
        Type::TIMESTAMPTZ => {
            get::<chrono::DateTime<chrono::Utc>>(row, idx, name)?.map(Value::from)
        }
        Type::UUID => get::<uuid::Uuid>(row, idx, name)?.map(Value::from),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, idx, name)?.map(Value::from),
        _ if is_text(ty) => get::<String>(row, idx, name)?.map(Value::Text),
        _ if is_enum(ty) => {
            get::<EnumLabel>(row, idx, name)?.map(|label| Value::Text(label.0))
        }
        _ => {
            return Err(QbError::decode(
                name,
                format!("unsupported column type {ty}"),
            ));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Build a [`Record`] from `column => value` pairs.
///
/// ```ignore
/// let row = pgtable::record! { "name" => "A", "age" => 1 };
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(record.insert($column, $value);)+
        record
    }};
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

/// Payload accepted by insert-style operations: one record or several.
pub trait IntoRows {
    fn into_rows(self) -> Vec<Record>;
}

impl IntoRows for Record {
    fn into_rows(self) -> Vec<Record> {
        vec![self]
    }
}

impl IntoRows for Vec<Record> {
    fn into_rows(self) -> Vec<Record> {
        self
    }
}

impl<const N: usize> IntoRows for [Record; N] {
    fn into_rows(self) -> Vec<Record> {
        self.into()
    }
}

impl IntoRows for &[Record] {
    fn into_rows(self) -> Vec<Record> {
        self.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_labels_decode_as_text() {
        let mood = Type::new(
            "mood".into(),
            90_001,
            tokio_postgres::types::Kind::Enum(vec!["happy".into()]),
            "public".into(),
        );
        assert!(<EnumLabel as FromSql<'_>>::accepts(&mood));
        assert!(!<EnumLabel as FromSql<'_>>::accepts(&Type::INT4));

        let label = EnumLabel::from_sql(&mood, b"happy").unwrap();
        assert_eq!(label.0, "happy");
        assert!(EnumLabel::from_sql(&mood, &[0xff, 0xfe]).is_err());
        // NULL enum cells still come back as `None`.
        assert!(Option::<EnumLabel>::from_sql_null(&mood).unwrap().is_none());
    }

    #[test]
    fn insert_keeps_order_and_replaces_in_place() {
        let mut rec = Record::new();
        rec.insert("name", "A").insert("age", 1).insert("name", "B");
        assert_eq!(rec.columns().collect::<Vec<_>>(), ["name", "age"]);
        assert_eq!(rec.get("name"), Some(&Value::Text("B".into())));
        assert_eq!(rec.len(), 2);
    }

    #[test]
    fn record_macro() {
        let rec = crate::record! { "name" => "A", "age" => 1, "email" => None::<String> };
        assert_eq!(rec.get("age"), Some(&Value::Int(1)));
        assert_eq!(rec.get("email"), Some(&Value::Null));
        assert!(!rec.contains("missing"));
        assert!(crate::record! {}.is_empty());
    }

    #[test]
    fn collect_from_pairs() {
        let rec: Record = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(rec.iter().map(|(c, _)| c).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn into_rows_shapes() {
        let one = crate::record! { "a" => 1 };
        assert_eq!(one.clone().into_rows().len(), 1);
        assert_eq!([one.clone(), one.clone()].into_rows().len(), 2);
        assert_eq!(vec![one.clone()].into_rows().len(), 1);
        let slice: &[Record] = &[one];
        assert_eq!(slice.into_rows().len(), 1);
    }
}
