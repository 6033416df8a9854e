use crate::column::ColumnProvider;
use crate::criterion::{Op, Operation};
use crate::error::Result;

/// One `ORDER BY` item.
#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    /// A quoted column, database default direction.
    Column(String),
    /// Columns in ascending order.
    Asc(Vec<String>),
    /// Columns in descending order.
    Desc(Vec<String>),
    /// An [`Op`] applied to a column in order position, e.g. `INET_ATON(col)`.
    Expr(String, Op),
}

impl Order {
    #[must_use]
    pub fn asc<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::Asc(columns.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn desc<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::Desc(columns.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn expr(column: impl Into<String>, op: Op) -> Self {
        Self::Expr(column.into(), op)
    }

    /// Render against `provider`.
    ///
    /// # Errors
    ///
    /// Returns an error if an [`Op`] cannot be used in order position.
    pub fn render(&self, provider: &dyn ColumnProvider) -> Result<String> {
        let quote = |name: &str| provider.resolve(name).quote(provider.dialect());
        let directed = |columns: &[String], direction: &str| {
            columns.iter().map(|c| format!("{} {direction}", quote(c))).collect::<Vec<_>>().join(",")
        };

        match self {
            Self::Column(name) => Ok(quote(name)),
            Self::Asc(columns) => Ok(directed(columns, "ASC")),
            Self::Desc(columns) => Ok(directed(columns, "DESC")),
            Self::Expr(name, op) => {
                let (sql, _) = op.apply(provider, Operation::Order, &provider.resolve(name))?;
                Ok(sql)
            }
        }
    }
}

impl From<&str> for Order {
    fn from(column: &str) -> Self {
        Self::Column(column.to_string())
    }
}

impl From<String> for Order {
    fn from(column: String) -> Self {
        Self::Column(column)
    }
}
