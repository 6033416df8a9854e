use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_query::Value;

use crate::criterion::{Op, Qx};
use crate::entity::is_null_value;

/// A value supplied for one column: a plain bind value, a column expression,
/// or a comparator.
///
/// Which variants are accepted depends on where the value is used. Inserts
/// and updates take values and [`Op`]s; predicates take values and [`Qx`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Bound as a `?` placeholder.
    Value(Value),
    /// Rendered as a column expression.
    Op(Op),
    /// Rendered as a comparison against the column.
    Qx(Qx),
}

macro_rules! impl_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    Self::Value(value.into())
                }
            }
        )*
    };
}

impl_from_value!(
    Value,
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    &str,
    String,
    Vec<u8>,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    DateTime<Utc>,
);

impl<T> From<Option<T>> for FieldValue
where
    Option<T>: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        Self::Value(value.into())
    }
}

impl From<Op> for FieldValue {
    fn from(op: Op) -> Self {
        Self::Op(op)
    }
}

impl From<Qx> for FieldValue {
    fn from(qx: Qx) -> Self {
        Self::Qx(qx)
    }
}

/// Uniform field access over entities and field maps.
///
/// A field is "set" when it has a value: `Option` fields that are `None` and
/// map entries bound to `NULL` are not set.
pub trait Fields {
    /// The value of `name`, if set.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Number of set fields.
    fn count_set_fields(&self) -> usize;

    /// Whether `name` is set.
    fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

/// An owned field map, keyed by column name (`alias::column` on joined
/// queries).
///
/// ```ignore
/// let changes = Record::new().set("name", "Ada").set("visits", Op::inc());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: HashMap<String, FieldValue>,
}

impl Record {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    /// Copy every set field of `source` named in `columns`.
    #[must_use]
    pub fn from_fields(source: &(impl Fields + ?Sized), columns: &[&str]) -> Self {
        let entries = columns
            .iter()
            .filter_map(|name| source.field(name).map(|value| ((*name).to_string(), value)))
            .collect();
        Self { entries }
    }

    /// Whether the map has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Fields for Record {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match self.entries.get(name)? {
            FieldValue::Value(value) if is_null_value(value) => None,
            other => Some(other.clone()),
        }
    }

    fn count_set_fields(&self) -> usize {
        self.entries
            .values()
            .filter(|value| !matches!(value, FieldValue::Value(v) if is_null_value(v)))
            .count()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), |record, (name, value)| record.set(name, value))
    }
}
