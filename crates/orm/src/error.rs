//! Errors

use thiserror::Error;

use crate::criterion::Operation;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while composing or executing statements.
#[derive(Error, Debug)]
pub enum Error {
    /// Entity metadata is missing or inconsistent, or a statement cannot be
    /// composed from the supplied data.
    #[error("schema error: {0}")]
    Schema(String),

    /// An [`Op`](crate::Op) or [`Qx`](crate::Qx) was used in a position it
    /// does not support.
    #[error("operation not supported: {op} cannot be used in {operation} position")]
    OperationNotSupported {
        /// Name of the rejected expression.
        op: &'static str,
        /// Position it was used in.
        operation: Operation,
    },

    /// A primary key column required by the operation was not supplied.
    #[error("primary key `{column}` should exist on `{table}`")]
    MissingPrimaryKey {
        /// Table of the entity.
        table: String,
        /// Key column that was not set.
        column: String,
    },

    /// A composite primary key was addressed with the wrong shape of key.
    #[error("table `{table}` uses a composite key: {message}")]
    CompositeKeyMismatch {
        /// Table of the entity.
        table: String,
        /// What was wrong with the key.
        message: String,
    },

    /// A single-column primary key was addressed with a named key map.
    #[error("table `{table}` uses a simple primary key, input should be an integer or string")]
    KeyTypeMismatch {
        /// Table of the entity.
        table: String,
    },

    /// Exactly one row was expected and none was found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Exactly one row was expected and several were found.
    #[error("multiple ({count}) rows of `{table}` match after insert")]
    AmbiguousResult {
        /// Table of the entity.
        table: String,
        /// Number of matching rows.
        count: usize,
    },

    /// A lookup by primary key returned more than one row.
    #[error("find by id on `{table}` should have only one result, got {count}")]
    IntegrityViolation {
        /// Table of the entity.
        table: String,
        /// Number of rows sharing the key.
        count: usize,
    },

    /// The driver failed to prepare or execute a statement.
    #[error("failed to execute `{statement}`: {source}")]
    Driver {
        /// The failing statement.
        statement: String,
        /// Driver error.
        #[source]
        source: anyhow::Error,
    },

    /// A value could not be converted to or from its wire representation.
    #[error("conversion error: {0}")]
    Conversion(#[source] anyhow::Error),

    /// A unit of work failed with an error that did not originate here.
    #[error("transaction rolled back: {0}")]
    Transaction(#[source] anyhow::Error),
}

/// Build an [`Error::Schema`] from a format string.
#[macro_export]
macro_rules! schema_error {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Schema(format!($fmt, $($arg)*))
    };
    ($err:expr $(,)?) => {
        $crate::Error::Schema(format!($err))
    };
}
