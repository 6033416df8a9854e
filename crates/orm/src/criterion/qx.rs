use sea_query::Value;

/// Qx is a comparator placed in a field map in place of a plain value, turning
/// the default `column=?` predicate into another comparison.
///
/// ```ignore
/// repo.r#where(Record::new().set("age", Qx::greater_equal(18)).set("email", Qx::not_null()))
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Qx {
    /// column IS NOT NULL
    NotNull,
    /// column IS NULL
    IsNull,
    /// column LIKE pattern
    Like(Value),
    /// column IN (values)
    In(Vec<Value>),
    /// column < value
    LessThan(Value),
    /// column <= value
    LessEqual(Value),
    /// column > value
    GreaterThan(Value),
    /// column >= value
    GreaterEqual(Value),
    /// column != value
    NotEqual(Value),
    /// column < NOW()
    TimePassed,
    /// column > NOW()
    TimeNotArrive,
}

impl Qx {
    #[must_use]
    pub const fn not_null() -> Self {
        Self::NotNull
    }

    #[must_use]
    pub const fn is_null() -> Self {
        Self::IsNull
    }

    #[must_use]
    pub fn like(pattern: impl Into<Value>) -> Self {
        Self::Like(pattern.into())
    }

    /// An empty list matches nothing.
    #[must_use]
    pub fn r#in<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::In(values.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn less_than(value: impl Into<Value>) -> Self {
        Self::LessThan(value.into())
    }

    #[must_use]
    pub fn less_equal(value: impl Into<Value>) -> Self {
        Self::LessEqual(value.into())
    }

    #[must_use]
    pub fn greater_than(value: impl Into<Value>) -> Self {
        Self::GreaterThan(value.into())
    }

    #[must_use]
    pub fn greater_equal(value: impl Into<Value>) -> Self {
        Self::GreaterEqual(value.into())
    }

    #[must_use]
    pub fn not_equal(value: impl Into<Value>) -> Self {
        Self::NotEqual(value.into())
    }

    #[must_use]
    pub const fn time_passed() -> Self {
        Self::TimePassed
    }

    #[must_use]
    pub const fn time_not_arrive() -> Self {
        Self::TimeNotArrive
    }

    /// The fragment following the quoted column, and the values it binds.
    #[must_use]
    pub fn fragment(&self) -> (String, Vec<Value>) {
        match self {
            Self::NotNull => ("IS NOT NULL".to_string(), vec![]),
            Self::IsNull => ("IS NULL".to_string(), vec![]),
            Self::Like(v) => ("LIKE ?".to_string(), vec![v.clone()]),
            Self::In(values) if values.is_empty() => ("IN (NULL)".to_string(), vec![]),
            Self::In(values) => {
                let marks = vec!["?"; values.len()].join(",");
                (format!("IN ({marks})"), values.clone())
            }
            Self::LessThan(v) => ("< ?".to_string(), vec![v.clone()]),
            Self::LessEqual(v) => ("<= ?".to_string(), vec![v.clone()]),
            Self::GreaterThan(v) => ("> ?".to_string(), vec![v.clone()]),
            Self::GreaterEqual(v) => (">= ?".to_string(), vec![v.clone()]),
            Self::NotEqual(v) => ("!= ?".to_string(), vec![v.clone()]),
            Self::TimePassed => ("< NOW()".to_string(), vec![]),
            Self::TimeNotArrive => ("> NOW()".to_string(), vec![]),
        }
    }
}
