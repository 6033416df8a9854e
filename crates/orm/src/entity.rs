use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_query::Value;

use crate::record::{FieldValue, Fields};
use crate::{DataType, Row};

/// Trait for types that can be extracted from database rows.
///
/// This trait is implemented for all standard Rust types that can be
/// fetched from a database row (`i32`, `String`, `DateTime`, etc.).
/// Conversions are lenient where drivers are known to widen types: `SQLite`
/// reports every integer as `Int64` and every timestamp as text.
pub trait FetchValue: Sized {
    /// Fetch a value from a row by column name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or the value cannot be converted to the target type.
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self>;
}

/// Trait for entity field types that can be bound as statement arguments.
///
/// `None` means "not set": the column is left out of inserts, updates and
/// by-example predicates.
pub trait ToField {
    /// The bindable value of this field, if set.
    fn to_field(&self) -> Option<FieldValue>;
}

/// Declares an ORM entity with automatic `Entity` and `Fields` implementations.
///
/// Every field is a column, named after the field. `primary_key` lists the
/// key columns in key order; `auto_increment` (optional) lists columns the
/// database generates on insert. Generated columns are usually declared as
/// `Option<_>` so an unsaved entity can leave them unset.
///
/// # Examples
///
/// ```ignore
/// entity! {
///     table = "posts",
///     primary_key = ["id"],
///     auto_increment = ["id"],
///     #[derive(Debug, Clone)]
///     pub struct Post {
///         pub id: Option<i64>,
///         pub title: String,
///     }
/// }
/// ```
#[macro_export]
macro_rules! entity {
    // Full form (single code-generation arm)
    (
        table = $table:literal,
        primary_key = [$($pk:literal),+ $(,)?],
        auto_increment = [$($auto:literal),* $(,)?],
        $(#[$meta:meta])*
        pub struct $struct_name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field_name:ident : $field_type:ty
            ),* $(,)?
        }
    ) => {
        #[allow(missing_docs)]
        $(#[$meta])*
        pub struct $struct_name {
            $(
                $(#[$field_meta])*
                pub $field_name : $field_type
            ),*
        }

        impl $crate::Entity for $struct_name {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] = &[ $( stringify!($field_name) ),* ];
            const PRIMARY_KEY: &'static [&'static str] = &[ $($pk),+ ];
            const AUTO_INCREMENT: &'static [&'static str] = &[ $($auto),* ];

            fn from_row(row: &$crate::Row) -> $crate::__private::anyhow::Result<Self> {
                Ok(Self {
                    $(
                        $field_name: <$field_type as $crate::FetchValue>::fetch(row, stringify!($field_name))?,
                    )*
                })
            }
        }

        impl $crate::Fields for $struct_name {
            fn field(&self, name: &str) -> Option<$crate::FieldValue> {
                match name {
                    $(
                        stringify!($field_name) => $crate::ToField::to_field(&self.$field_name),
                    )*
                    _ => None,
                }
            }

            fn count_set_fields(&self) -> usize {
                0 $( + usize::from($crate::ToField::to_field(&self.$field_name).is_some()) )*
            }
        }
    };

    // No generated columns → forward with an empty list
    (
        table = $table:literal,
        primary_key = [$($pk:literal),+ $(,)?],
        $($rest:tt)*
    ) => {
        $crate::entity! {
            table = $table,
            primary_key = [$($pk),+],
            auto_increment = [],
            $($rest)*
        }
    };
}

/// Trait for database entities with the schema metadata repositories need.
///
/// Typically implemented via the `entity!` macro rather than manually.
pub trait Entity: Fields + Sized + 'static {
    /// The database table name for this entity.
    const TABLE: &'static str;

    /// Column names in declared order.
    const COLUMNS: &'static [&'static str];

    /// Primary key columns in key order.
    const PRIMARY_KEY: &'static [&'static str];

    /// Columns generated by the database on insert.
    const AUTO_INCREMENT: &'static [&'static str];

    /// Construct an entity instance from a database row.
    ///
    /// # Errors
    ///
    /// Returns an error if any required column is missing or cannot be converted to the expected type.
    fn from_row(row: &Row) -> Result<Self>;
}

// Outbound conversion
pub fn values_to_datatypes(values: Vec<Value>) -> Result<Vec<DataType>> {
    values.into_iter().map(value_to_datatype).collect()
}

pub fn value_to_datatype(value: Value) -> Result<DataType> {
    let data_type = match value {
        Value::Bool(v) => DataType::Boolean(v),
        Value::TinyInt(v) => DataType::Int32(v.map(i32::from)),
        Value::SmallInt(v) => DataType::Int32(v.map(i32::from)),
        Value::Int(v) => DataType::Int32(v),
        Value::BigInt(v) => DataType::Int64(v),
        Value::TinyUnsigned(v) => DataType::Uint32(v.map(u32::from)),
        Value::SmallUnsigned(v) => DataType::Uint32(v.map(u32::from)),
        Value::Unsigned(v) => DataType::Uint32(v),
        Value::BigUnsigned(v) => DataType::Uint64(v),
        Value::Float(v) => DataType::Float(v),
        Value::Double(v) => DataType::Double(v),
        Value::String(v) => DataType::Str(v.map(|value| *value)),
        Value::ChronoDate(v) => DataType::Date(v.map(|value| {
            let date = *value;
            date.to_string() // "%Y-%m-%d"
        })),
        Value::ChronoTime(v) => DataType::Time(v.map(|value| {
            let time = *value;
            time.to_string() // "%H:%M:%S%.f"
        })),
        Value::ChronoDateTime(v) => DataType::Timestamp(v.map(|value| {
            let dt = *value;
            dt.to_string() // "%Y-%m-%d %H:%M:%S%.f"
        })),
        Value::ChronoDateTimeUtc(v) => DataType::Timestamp(v.map(|value| {
            let dt: DateTime<Utc> = *value;
            dt.to_rfc3339() // "%Y-%m-%dT%H:%M:%S%.f%:z"
        })),
        Value::Char(v) => DataType::Str(v.map(|ch| ch.to_string())),
        Value::Bytes(v) => DataType::Binary(v.map(|bytes| *bytes)),
        _ => {
            bail!("unsupported values require explicit conversion before binding")
        }
    };
    Ok(data_type)
}

// Inbound conversion of scalar results (generated ids, key echoes)
pub fn datatype_to_value(value: &DataType) -> Value {
    match value {
        DataType::Boolean(v) => Value::Bool(*v),
        DataType::Int32(v) => Value::Int(*v),
        DataType::Int64(v) => Value::BigInt(*v),
        DataType::Uint32(v) => Value::Unsigned(*v),
        DataType::Uint64(v) => Value::BigUnsigned(*v),
        DataType::Float(v) => Value::Float(*v),
        DataType::Double(v) => Value::Double(*v),
        DataType::Str(v) | DataType::Date(v) | DataType::Time(v) | DataType::Timestamp(v) => {
            Value::String(v.clone().map(Box::new))
        }
        DataType::Binary(v) => Value::Bytes(v.clone().map(Box::new)),
    }
}

/// Whether a bind value is SQL `NULL`. Unconvertible values count as set.
pub fn is_null_value(value: &Value) -> bool {
    value_to_datatype(value.clone()).is_ok_and(|dt| dt.is_null())
}

macro_rules! impl_to_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToField for $ty {
                fn to_field(&self) -> Option<FieldValue> {
                    Some(FieldValue::Value(self.clone().into()))
                }
            }
        )*
    };
}

impl_to_field!(
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
    String,
    Vec<u8>,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    DateTime<Utc>,
);

impl ToField for serde_json::Value {
    fn to_field(&self) -> Option<FieldValue> {
        Some(FieldValue::Value(Value::String(Some(Box::new(self.to_string())))))
    }
}

impl<T: ToField> ToField for Option<T> {
    fn to_field(&self) -> Option<FieldValue> {
        self.as_ref().and_then(ToField::to_field)
    }
}

// Inbound conversion
impl FetchValue for bool {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_bool(row_field(row, col)?)
    }
}

impl FetchValue for i32 {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_i32(row_field(row, col)?)
    }
}

impl FetchValue for i64 {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_i64(row_field(row, col)?)
    }
}

impl FetchValue for u32 {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_u32(row_field(row, col)?)
    }
}

impl FetchValue for u64 {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_u64(row_field(row, col)?)
    }
}

impl FetchValue for f32 {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_f32(row_field(row, col)?)
    }
}

impl FetchValue for f64 {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_f64(row_field(row, col)?)
    }
}

impl FetchValue for String {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_string(row_field(row, col)?)
    }
}

impl FetchValue for Vec<u8> {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_binary(row_field(row, col)?)
    }
}

impl FetchValue for DateTime<Utc> {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_timestamp(row_field(row, col)?)
    }
}

impl FetchValue for NaiveDateTime {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_timestamp(row_field(row, col)?).map(|dt| dt.naive_utc())
    }
}

impl FetchValue for NaiveDate {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_date(row_field(row, col)?)
    }
}

impl FetchValue for NaiveTime {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_time(row_field(row, col)?)
    }
}

impl FetchValue for serde_json::Value {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        as_json(row_field(row, col)?)
    }
}

impl<T: FetchValue> FetchValue for Option<T> {
    fn fetch(row: &Row, col: &str) -> anyhow::Result<Self> {
        match row_field(row, col) {
            Ok(field) if !field.is_null() => Ok(Some(T::fetch(row, col)?)),
            _ => Ok(None),
        }
    }
}

fn row_field<'a>(row: &'a Row, name: &str) -> Result<&'a DataType> {
    row.get(name).ok_or_else(|| anyhow!("missing column '{name}'"))
}

fn as_bool(value: &DataType) -> Result<bool> {
    match value {
        DataType::Boolean(Some(v)) => Ok(*v),
        DataType::Int32(Some(v)) => Ok(*v != 0),
        DataType::Int64(Some(v)) => Ok(*v != 0),
        _ => bail!("expected boolean data type"),
    }
}

fn as_i32(value: &DataType) -> Result<i32> {
    match value {
        DataType::Int32(Some(v)) => Ok(*v),
        DataType::Int64(Some(v)) => Ok(i32::try_from(*v)?),
        DataType::Uint32(Some(v)) => Ok(i32::try_from(*v)?),
        _ => bail!("expected int32 data type"),
    }
}

fn as_i64(value: &DataType) -> Result<i64> {
    match value {
        DataType::Int64(Some(v)) => Ok(*v),
        DataType::Int32(Some(v)) => Ok(i64::from(*v)),
        DataType::Uint32(Some(v)) => Ok(i64::from(*v)),
        DataType::Uint64(Some(v)) => Ok(i64::try_from(*v)?),
        _ => bail!("expected int64 data type"),
    }
}

fn as_u32(value: &DataType) -> Result<u32> {
    match value {
        DataType::Uint32(Some(v)) => Ok(*v),
        DataType::Int64(Some(v)) => Ok(u32::try_from(*v)?),
        DataType::Int32(Some(v)) => Ok(u32::try_from(*v)?),
        _ => bail!("expected uint32 data type"),
    }
}

pub fn as_u64(value: &DataType) -> Result<u64> {
    match value {
        DataType::Uint64(Some(v)) => Ok(*v),
        DataType::Uint32(Some(v)) => Ok(u64::from(*v)),
        DataType::Int64(Some(v)) => Ok(u64::try_from(*v)?),
        DataType::Int32(Some(v)) => Ok(u64::try_from(*v)?),
        _ => bail!("expected uint64 data type"),
    }
}

fn as_f32(value: &DataType) -> Result<f32> {
    match value {
        DataType::Float(Some(v)) => Ok(*v),
        #[allow(clippy::cast_possible_truncation)]
        DataType::Double(Some(v)) => Ok(*v as f32),
        _ => bail!("expected float data type"),
    }
}

fn as_f64(value: &DataType) -> Result<f64> {
    match value {
        DataType::Double(Some(v)) => Ok(*v),
        DataType::Float(Some(v)) => Ok(f64::from(*v)),
        _ => bail!("expected double data type"),
    }
}

fn as_string(value: &DataType) -> Result<String> {
    match value {
        DataType::Str(Some(raw))
        | DataType::Date(Some(raw))
        | DataType::Time(Some(raw))
        | DataType::Timestamp(Some(raw)) => Ok(raw.clone()),
        _ => bail!("expected string data type"),
    }
}

fn as_binary(value: &DataType) -> Result<Vec<u8>> {
    match value {
        DataType::Binary(Some(bytes)) => Ok(bytes.clone()),
        _ => bail!("expected binary data type"),
    }
}

fn as_timestamp(value: &DataType) -> Result<DateTime<Utc>> {
    match value {
        DataType::Timestamp(Some(raw)) | DataType::Str(Some(raw)) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return Ok(parsed.with_timezone(&Utc));
            }

            if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
                return Ok(DateTime::<Utc>::from_naive_utc_and_offset(parsed, Utc));
            }

            bail!(
                "unsupported timestamp: {raw}; expected RFC3339 or \"%Y-%m-%d %H:%M:%S%.f\" format"
            )
        }
        _ => bail!("expected timestamp data type"),
    }
}

fn as_date(value: &DataType) -> Result<NaiveDate> {
    match value {
        DataType::Date(Some(raw)) | DataType::Str(Some(raw)) => {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_e| anyhow!("unsupported date: {raw}; expected \"%Y-%m-%d\" format"))
        }
        _ => bail!("expected date data type"),
    }
}

fn as_time(value: &DataType) -> Result<NaiveTime> {
    match value {
        DataType::Time(Some(raw)) | DataType::Str(Some(raw)) => {
            NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
                .map_err(|_e| anyhow!("unsupported time: {raw}; expected \"%H:%M:%S%.f\" format"))
        }
        _ => bail!("expected time data type"),
    }
}

fn as_json(value: &DataType) -> Result<serde_json::Value> {
    match value {
        DataType::Str(Some(raw)) => Ok(serde_json::from_str(raw)?),
        DataType::Binary(Some(bytes)) => Ok(serde_json::from_slice(bytes)?),
        _ => bail!("expected json compatible data type"),
    }
}
