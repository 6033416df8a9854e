//! Composable predicate and expression fragments.
//!
//! Every fragment renders to a [`QueryWithArgs`]: SQL text with `?`
//! placeholders plus the values bound to them, left to right. Fragments are
//! plain data and are only rendered against a [`ColumnProvider`] when a
//! statement is built, so the same condition can be reused across
//! repositories.

mod logical;
mod op;
mod order;
mod qx;

use sea_query::Value;

pub use self::logical::Logical;
pub use self::op::{Op, Operation, Operations};
pub use self::order::Order;
pub use self::qx::Qx;
use crate::column::ColumnProvider;
use crate::entity::Entity;
use crate::error::Result;
use crate::record::Record;
use crate::unifier::DataUnifier;

/// SQL text and the values bound to its placeholders, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryWithArgs {
    /// SQL fragment with `?` placeholders.
    pub sql: String,
    /// Values for the fragment's placeholders, in order.
    pub args: Vec<Value>,
}

impl QueryWithArgs {
    #[must_use]
    pub const fn new(sql: String, args: Vec<Value>) -> Self {
        Self { sql, args }
    }

    /// Whether there is no SQL text.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// A raw SQL fragment with no bound values, for predicates the combinators
/// cannot express.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialCondition(String);

impl SpecialCondition {
    #[must_use]
    pub fn raw(condition: impl Into<String>) -> Self {
        Self(condition.into())
    }

    #[must_use]
    pub fn retrieve(&self) -> QueryWithArgs {
        QueryWithArgs::new(self.0.clone(), vec![])
    }
}

/// Anything usable as a `WHERE` or `HAVING` predicate.
///
/// A field map (or an entity, taken by example) renders as `col=?` terms
/// joined with `AND`; an empty map means "no filter".
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Fields(Record),
    Logical(Logical),
    Special(SpecialCondition),
}

impl Condition {
    /// The empty condition, matching every row.
    #[must_use]
    pub fn all() -> Self {
        Self::Fields(Record::new())
    }

    /// Render against `provider`.
    ///
    /// # Errors
    ///
    /// Returns an error if a field value cannot be used in a predicate.
    pub fn build_query(&self, provider: &dyn ColumnProvider) -> Result<QueryWithArgs> {
        match self {
            Self::Fields(record) => DataUnifier::new(record).build_query(provider),
            Self::Logical(logical) => logical.build_query(provider),
            Self::Special(special) => Ok(special.retrieve()),
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::all()
    }
}

impl From<Record> for Condition {
    fn from(record: Record) -> Self {
        Self::Fields(record)
    }
}

impl From<Logical> for Condition {
    fn from(logical: Logical) -> Self {
        Self::Logical(logical)
    }
}

impl From<SpecialCondition> for Condition {
    fn from(special: SpecialCondition) -> Self {
        Self::Special(special)
    }
}

impl<E: Entity> From<&E> for Condition {
    fn from(entity: &E) -> Self {
        Self::Fields(Record::from_fields(entity, E::COLUMNS))
    }
}
