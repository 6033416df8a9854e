use std::fmt;

use sea_query::Value;

use crate::column::{ColumnProvider, ExtendedColumn};
use crate::error::{Error, Result};

/// Statement position a column expression is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `VALUES (...)` list of an insert.
    Insert,
    /// `SET` list of an update.
    Update,
    /// `ORDER BY` list.
    Order,
    /// `WHERE` or `HAVING` predicate.
    Where,
}

impl Operation {
    const fn bit(self) -> u8 {
        match self {
            Self::Insert => 1,
            Self::Update => 2,
            Self::Order => 4,
            Self::Where => 8,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => f.write_str("INSERT"),
            Self::Update => f.write_str("UPDATE"),
            Self::Order => f.write_str("ORDER"),
            Self::Where => f.write_str("WHERE"),
        }
    }
}

/// Set of [`Operation`]s an [`Op`] may be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operations(u8);

impl Operations {
    pub const INSERT: Self = Self(1);
    pub const UPDATE: Self = Self(2);
    pub const ORDER: Self = Self(4);

    /// Union of two sets.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether `operation` is in the set.
    #[must_use]
    pub const fn contains(self, operation: Operation) -> bool {
        self.0 & operation.bit() == operation.bit()
    }
}

/// A column expression used in place of a plain value.
///
/// ```ignore
/// repo.update(&user, &Record::new().set("visits", Op::inc()).set("seen_at", Op::now()))?;
/// ```
///
/// Function names are `MySQL`'s regardless of the configured dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Increment,
    Decrement,
    Add(Value),
    Subtract(Value),
    BitwiseAnd(Value),
    BitwiseOr(Value),
    CurrentDate,
    CurrentTime,
    Now,
    Null,
    DaysFromNow(i64),
    HoursFromNow(i64),
    InetAton(String),
    InetNtoa(Value),
}

impl Op {
    /// `col=col+1`.
    #[must_use]
    pub const fn inc() -> Self {
        Self::Increment
    }

    /// `col=col-1`.
    #[must_use]
    pub const fn dec() -> Self {
        Self::Decrement
    }

    /// `col=col+?`.
    #[must_use]
    pub fn add(value: impl Into<Value>) -> Self {
        Self::Add(value.into())
    }

    /// `col=col-?`.
    #[must_use]
    pub fn sub(value: impl Into<Value>) -> Self {
        Self::Subtract(value.into())
    }

    /// `col=col & ?`.
    #[must_use]
    pub fn bitwise_and(value: impl Into<Value>) -> Self {
        Self::BitwiseAnd(value.into())
    }

    /// `col=col | ?`.
    #[must_use]
    pub fn bitwise_or(value: impl Into<Value>) -> Self {
        Self::BitwiseOr(value.into())
    }

    /// `CURDATE()`.
    #[must_use]
    pub const fn current_date() -> Self {
        Self::CurrentDate
    }

    /// `CURTIME()`.
    #[must_use]
    pub const fn current_time() -> Self {
        Self::CurrentTime
    }

    /// `NOW()`.
    #[must_use]
    pub const fn now() -> Self {
        Self::Now
    }

    /// `NULL`.
    #[must_use]
    pub const fn null() -> Self {
        Self::Null
    }

    /// `DATE_ADD(NOW(), INTERVAL n DAY)`.
    #[must_use]
    pub const fn days_from_now(n: i64) -> Self {
        Self::DaysFromNow(n)
    }

    /// `DATE_ADD(NOW(), INTERVAL n HOUR)`.
    #[must_use]
    pub const fn hours_from_now(n: i64) -> Self {
        Self::HoursFromNow(n)
    }

    /// `INET_ATON(?)` bound to a dotted address.
    #[must_use]
    pub fn inet_aton(address: impl Into<String>) -> Self {
        Self::InetAton(address.into())
    }

    /// `INET_NTOA(?)` bound to a numeric address.
    #[must_use]
    pub fn inet_ntoa(address: impl Into<Value>) -> Self {
        Self::InetNtoa(address.into())
    }

    /// Short name used in error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Increment => "increment",
            Self::Decrement => "decrement",
            Self::Add(_) => "add",
            Self::Subtract(_) => "subtract",
            Self::BitwiseAnd(_) => "bitwise-and",
            Self::BitwiseOr(_) => "bitwise-or",
            Self::CurrentDate => "current-date",
            Self::CurrentTime => "current-time",
            Self::Now => "now",
            Self::Null => "null",
            Self::DaysFromNow(_) => "days-from-now",
            Self::HoursFromNow(_) => "hours-from-now",
            Self::InetAton(_) => "inet-aton",
            Self::InetNtoa(_) => "inet-ntoa",
        }
    }

    /// Positions this expression can be rendered in.
    #[must_use]
    pub const fn allowed(&self) -> Operations {
        match self {
            Self::Increment
            | Self::Decrement
            | Self::Add(_)
            | Self::Subtract(_)
            | Self::BitwiseAnd(_)
            | Self::BitwiseOr(_) => Operations::UPDATE,
            Self::CurrentDate
            | Self::CurrentTime
            | Self::Now
            | Self::Null
            | Self::DaysFromNow(_)
            | Self::HoursFromNow(_) => Operations::INSERT.with(Operations::UPDATE),
            Self::InetAton(_) | Self::InetNtoa(_) => {
                Operations::INSERT.with(Operations::UPDATE).with(Operations::ORDER)
            }
        }
    }

    /// Render for `column` in `operation` position.
    ///
    /// Insert position yields the bare expression for the `VALUES` list,
    /// update position yields `column=expression`, order position yields the
    /// expression applied to the column itself. The second element is the
    /// value bound to the expression's placeholder, if it has one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationNotSupported`] if this expression cannot be
    /// used in `operation` position.
    pub fn apply(
        &self, provider: &dyn ColumnProvider, operation: Operation, column: &ExtendedColumn,
    ) -> Result<(String, Option<Value>)> {
        if !self.allowed().contains(operation) {
            return Err(Error::OperationNotSupported {
                op: self.name(),
                operation,
            });
        }

        let col = column.quote(provider.dialect());

        let rendered = match self {
            Self::Increment => (format!("{col}={col}+1"), None),
            Self::Decrement => (format!("{col}={col}-1"), None),
            Self::Add(v) => (format!("{col}={col}+?"), Some(v.clone())),
            Self::Subtract(v) => (format!("{col}={col}-?"), Some(v.clone())),
            Self::BitwiseAnd(v) => (format!("{col}={col} & ?"), Some(v.clone())),
            Self::BitwiseOr(v) => (format!("{col}={col} | ?"), Some(v.clone())),
            Self::CurrentDate => (assign(operation, &col, "CURDATE()"), None),
            Self::CurrentTime => (assign(operation, &col, "CURTIME()"), None),
            Self::Now => (assign(operation, &col, "NOW()"), None),
            Self::Null => (assign(operation, &col, "NULL"), None),
            Self::DaysFromNow(n) => {
                (assign(operation, &col, &format!("DATE_ADD(NOW(), INTERVAL {n} DAY)")), None)
            }
            Self::HoursFromNow(n) => {
                (assign(operation, &col, &format!("DATE_ADD(NOW(), INTERVAL {n} HOUR)")), None)
            }
            Self::InetAton(address) => match operation {
                Operation::Order => (format!("INET_ATON({col})"), None),
                _ => (
                    assign(operation, &col, "INET_ATON(?)"),
                    Some(Value::String(Some(Box::new(address.clone())))),
                ),
            },
            Self::InetNtoa(v) => match operation {
                Operation::Order => (format!("INET_NTOA({col})"), None),
                _ => (assign(operation, &col, "INET_NTOA(?)"), Some(v.clone())),
            },
        };

        Ok(rendered)
    }
}

fn assign(operation: Operation, col: &str, expr: &str) -> String {
    match operation {
        Operation::Update => format!("{col}={expr}"),
        Operation::Insert | Operation::Order | Operation::Where => expr.to_string(),
    }
}
