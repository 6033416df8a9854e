/// A nullable value crossing the driver boundary.
///
/// Temporal values are carried as text: dates as `%Y-%m-%d`, times as
/// `%H:%M:%S%.f` and timestamps as RFC 3339 or `%Y-%m-%d %H:%M:%S%.f`.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    /// Boolean value.
    Boolean(Option<bool>),
    /// 32-bit signed integer.
    Int32(Option<i32>),
    /// 64-bit signed integer.
    Int64(Option<i64>),
    /// 32-bit unsigned integer.
    Uint32(Option<u32>),
    /// 64-bit unsigned integer.
    Uint64(Option<u64>),
    /// Single precision float.
    Float(Option<f32>),
    /// Double precision float.
    Double(Option<f64>),
    /// Text.
    Str(Option<String>),
    /// Raw bytes.
    Binary(Option<Vec<u8>>),
    /// Calendar date.
    Date(Option<String>),
    /// Time of day.
    Time(Option<String>),
    /// Date and time.
    Timestamp(Option<String>),
}

impl DataType {
    /// Whether the value is SQL `NULL`, regardless of its declared type.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Boolean(None)
                | Self::Int32(None)
                | Self::Int64(None)
                | Self::Uint32(None)
                | Self::Uint64(None)
                | Self::Float(None)
                | Self::Double(None)
                | Self::Str(None)
                | Self::Binary(None)
                | Self::Date(None)
                | Self::Time(None)
                | Self::Timestamp(None)
        )
    }
}

/// A named column value within a [`Row`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column name (or alias) as reported by the driver.
    pub name: String,

    /// Column value.
    pub value: DataType,
}

/// A single result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Columns in the order the statement projected them.
    pub fields: Vec<Field>,
}

impl Row {
    /// Look up a column value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataType> {
        self.fields.iter().find(|field| field.name == name).map(|field| &field.value)
    }

    /// The value at `index`, in projection order.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<&DataType> {
        self.fields.get(index).map(|field| &field.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_detection() {
        assert!(DataType::Str(None).is_null());
        assert!(DataType::Timestamp(None).is_null());
        assert!(!DataType::Int64(Some(0)).is_null());
    }

    #[test]
    fn row_lookup() {
        let row = Row {
            fields: vec![
                Field {
                    name: "id".to_string(),
                    value: DataType::Int64(Some(7)),
                },
                Field {
                    name: "name".to_string(),
                    value: DataType::Str(Some("Ada".to_string())),
                },
            ],
        };

        assert_eq!(row.get("id"), Some(&DataType::Int64(Some(7))));
        assert_eq!(row.value_at(1), Some(&DataType::Str(Some("Ada".to_string()))));
        assert!(row.get("missing").is_none());
    }
}
