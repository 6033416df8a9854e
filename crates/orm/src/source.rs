use std::sync::Arc;

use crate::column::DEFAULT_DELIMITER;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::logger::{QueryLogger, TracingQueryLogger};
use crate::query::Query;
use crate::{Connection, Row};

/// Connection, dialect and logger shared by every repository built on it.
///
/// All statements go through [`DataSource::fetch_rows`] or
/// [`DataSource::execute`], which log them and wrap driver failures in
/// [`Error::Driver`]. Cloning is cheap.
///
/// ```ignore
/// let source = DataSource::new(SqliteConnection::connect()?, Sqlite);
/// let users = Repository::<User>::new(&source)?;
/// ```
#[derive(Debug, Clone)]
pub struct DataSource {
    conn: Arc<dyn Connection>,
    dialect: Arc<dyn Dialect>,
    logger: Arc<dyn QueryLogger>,
    delimiter: Arc<str>,
}

impl DataSource {
    /// Create a data source logging through [`TracingQueryLogger`].
    #[must_use]
    pub fn new(conn: impl Connection + 'static, dialect: impl Dialect + 'static) -> Self {
        Self {
            conn: Arc::new(conn),
            dialect: Arc::new(dialect),
            logger: Arc::new(TracingQueryLogger),
            delimiter: Arc::from(DEFAULT_DELIMITER),
        }
    }

    /// Replace the query logger.
    #[must_use]
    pub fn with_logger(mut self, logger: impl QueryLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Separator between alias and column in qualified column names.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = Arc::from(delimiter);
        self
    }

    /// The SQL dialect statements are rendered for.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Run a query and return its rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Driver`] if the driver fails.
    pub fn fetch_rows(&self, query: &Query) -> Result<Vec<Row>> {
        self.logger.before_action(&query.sql, &query.params);

        match self.conn.query(&query.sql, &query.params) {
            Ok(rows) => {
                self.logger.query(&query.sql, &query.params, rows.len());
                Ok(rows)
            }
            Err(source) => Err(self.failed(&query.sql, source)),
        }
    }

    /// Run a statement and return the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Driver`] if the driver fails.
    pub fn execute(&self, query: &Query) -> Result<u64> {
        self.logger.before_action(&query.sql, &query.params);

        match self.conn.exec(&query.sql, &query.params) {
            Ok(affected) => {
                self.logger.update(&query.sql, &query.params, true);
                Ok(affected)
            }
            Err(source) => Err(self.failed(&query.sql, source)),
        }
    }

    /// Run `unit` inside a transaction.
    ///
    /// Commits when `unit` succeeds, rolling back if the commit itself fails.
    /// Otherwise rolls back and returns the unit's error: errors of this crate are returned unchanged, anything
    /// else is wrapped in [`Error::Transaction`]. Transactions do not nest.
    ///
    /// # Errors
    ///
    /// Returns the unit's error, or [`Error::Driver`] if the transaction
    /// cannot be opened or committed.
    pub fn transaction<T>(&self, unit: impl FnOnce() -> anyhow::Result<T>) -> Result<T> {
        self.control("BEGIN", |conn| conn.begin())?;

        match unit() {
            Ok(value) => {
                if let Err(err) = self.control("COMMIT", |conn| conn.commit()) {
                    let _ = self.control("ROLLBACK", |conn| conn.rollback());
                    return Err(err);
                }
                Ok(value)
            }
            Err(err) => {
                // rollback failures are reported to the logger only
                let _ = self.control("ROLLBACK", |conn| conn.rollback());
                Err(err.downcast::<Error>().unwrap_or_else(Error::Transaction))
            }
        }
    }

    fn control(
        &self, statement: &str, run: impl FnOnce(&dyn Connection) -> anyhow::Result<()>,
    ) -> Result<()> {
        self.logger.before_action(statement, &[]);

        match run(self.conn.as_ref()) {
            Ok(()) => {
                self.logger.update(statement, &[], true);
                Ok(())
            }
            Err(source) => Err(self.failed(statement, source)),
        }
    }

    fn failed(&self, statement: &str, source: anyhow::Error) -> Error {
        let err = Error::Driver {
            statement: statement.to_string(),
            source,
        };
        self.logger.exception(&err);
        err
    }
}
