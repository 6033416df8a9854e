use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;

use crate::{DataType, Row};

/// SQL providers implement the [`Connection`] trait so the query layer can
/// execute statements against a backend (`SQLite`, `MySQL`, etc).
///
/// Parameters are positional and bind to `?` placeholders left to right.
/// Implementations report failures as [`anyhow::Error`] with enough context to
/// identify the failing step (prepare, bind, execute or fetch).
pub trait Connection: Debug + Send + Sync {
    /// Execute a query and return the resulting rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be prepared or executed.
    fn query(&self, sql: &str, params: &[DataType]) -> Result<Vec<Row>>;

    /// Execute a statement that does not return rows (e.g., an `INSERT`,
    /// `UPDATE`, or `DELETE`) and return the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be prepared or executed.
    fn exec(&self, sql: &str, params: &[DataType]) -> Result<u64>;

    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the statement.
    fn begin(&self) -> Result<()> {
        self.exec("BEGIN", &[]).map(|_| ())
    }

    /// Commit the open transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the statement.
    fn commit(&self) -> Result<()> {
        self.exec("COMMIT", &[]).map(|_| ())
    }

    /// Roll back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the statement.
    fn rollback(&self) -> Result<()> {
        self.exec("ROLLBACK", &[]).map(|_| ())
    }
}

impl<T: Connection + ?Sized> Connection for Arc<T> {
    fn query(&self, sql: &str, params: &[DataType]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn exec(&self, sql: &str, params: &[DataType]) -> Result<u64> {
        (**self).exec(sql, params)
    }

    fn begin(&self) -> Result<()> {
        (**self).begin()
    }

    fn commit(&self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&self) -> Result<()> {
        (**self).rollback()
    }
}
