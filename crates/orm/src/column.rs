//! Alias-qualified column references.

use crate::dialect::Dialect;

/// Separator between an alias and a column name in a qualified key, e.g.
/// `u::name`.
pub const DEFAULT_DELIMITER: &str = "::";

/// A column reference that may be qualified with a table alias.
///
/// `full_name` is the key the column is looked up by in field maps and the
/// name it is projected as: `alias::column` when aliased, the bare column
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedColumn {
    /// Table alias; empty on a plain repository.
    pub alias: String,
    /// Bare column name.
    pub column: String,
    /// `alias::column`, or `column` when unaliased.
    pub full_name: String,
}

impl ExtendedColumn {
    /// Parse `raw`, splitting off an `alias<delimiter>` prefix when present.
    ///
    /// The alias must start with an ASCII letter followed by ASCII letters or
    /// digits; anything else is treated as a plain column name qualified with
    /// `default_alias`.
    #[must_use]
    pub fn parse(raw: &str, default_alias: &str, delimiter: &str) -> Self {
        let (alias, column) = match raw.split_once(delimiter) {
            Some((alias, column)) if is_alias(alias) => (alias, column),
            _ => (default_alias, raw),
        };

        let full_name = if alias.is_empty() {
            column.to_string()
        } else {
            format!("{alias}{delimiter}{column}")
        };

        Self {
            alias: alias.to_string(),
            column: column.to_string(),
            full_name,
        }
    }

    /// Render as `alias."column"`, or just `"column"` when unaliased.
    #[must_use]
    pub fn quote(&self, dialect: &dyn Dialect) -> String {
        if self.alias.is_empty() {
            dialect.quote(&self.column)
        } else {
            format!("{}.{}", self.alias, dialect.quote(&self.column))
        }
    }

    /// Render as a projection item, aliasing qualified columns to their full
    /// name so joined result sets have unambiguous keys.
    #[must_use]
    pub fn as_projection(&self, dialect: &dyn Dialect) -> String {
        if self.alias.is_empty() {
            dialect.quote(&self.column)
        } else {
            format!("{} AS {}", self.quote(dialect), dialect.quote(&self.full_name))
        }
    }
}

pub(crate) fn is_alias(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric())
}

/// Resolves the columns and dialect a fragment is rendered against.
///
/// Implemented by repositories; criteria are built lazily against one.
pub trait ColumnProvider {
    /// Dialect used for quoting.
    fn dialect(&self) -> &dyn Dialect;

    /// Every column in canonical declared order.
    fn extended_columns(&self) -> &[ExtendedColumn];

    /// Alias applied to column names given without one.
    fn default_alias(&self) -> &str {
        ""
    }

    /// Alias/column separator.
    fn delimiter(&self) -> &str {
        DEFAULT_DELIMITER
    }

    /// Parse a caller-supplied column name in this provider's context.
    fn resolve(&self, name: &str) -> ExtendedColumn {
        ExtendedColumn::parse(name, self.default_alias(), self.delimiter())
    }
}
