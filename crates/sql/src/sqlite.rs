//! `SQLite` implementation of [`Connection`].
//!
//! This is a lightweight implementation for development use only: a single
//! connection guarded by a mutex, no pooling.

#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::cast_possible_wrap)]

use std::sync::Arc;

use anyhow::{Context, Result};
use fromenv::FromEnv;
use rusqlite::types::{Value, ValueRef};
use rusqlite::params_from_iter;
use tracing::instrument;

use crate::{Connection, DataType, Field, Row};

/// Options used to connect to the SQL database.
///
/// This struct is used to load connection options from environment variables.
#[derive(Debug, Clone, FromEnv)]
pub struct ConnectOptions {
    /// Database path or `SQLite` URI.
    #[env(from = "SQL_DATABASE", default = "file::memory:?cache=shared")]
    pub database: String,
}

impl ConnectOptions {
    /// Load options from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable is present but invalid.
    pub fn load() -> Result<Self> {
        Self::from_env().finalize().context("issue loading connection options")
    }
}

/// A single `SQLite` connection.
#[derive(Debug, Clone)]
pub struct SqliteConnection {
    // Mutex is necessary since rusqlite::Connection isn't `Sync`
    conn: Arc<parking_lot::Mutex<rusqlite::Connection>>,
}

impl SqliteConnection {
    /// Connect using options loaded from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be loaded or the database cannot
    /// be opened.
    pub fn connect() -> Result<Self> {
        Self::connect_with(ConnectOptions::load()?)
    }

    /// Connect using explicit options.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    #[instrument]
    pub fn connect_with(options: ConnectOptions) -> Result<Self> {
        tracing::debug!("initializing SQLite connection to: {}", options.database);

        let conn = rusqlite::Connection::open(&options.database)
            .context("failed to open SQLite database")?;

        Ok(Self {
            conn: Arc::new(parking_lot::Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` cannot allocate the database.
    pub fn in_memory() -> Result<Self> {
        Self::connect_with(ConnectOptions {
            database: ":memory:".to_string(),
        })
    }

    /// Run a batch of `;`-separated statements without parameters, e.g. a
    /// schema script.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql).context("failed to execute batch")
    }
}

impl Connection for SqliteConnection {
    fn query(&self, sql: &str, params: &[DataType]) -> Result<Vec<Row>> {
        tracing::debug!("executing query: {sql}");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql).context("failed to prepare statement")?;

        let sqlite_params =
            params.iter().map(datatype_to_sqlite_value).collect::<Result<Vec<_>>>()?;
        let column_names: Vec<String> =
            stmt.column_names().iter().map(ToString::to_string).collect();

        let mut rows =
            stmt.query(params_from_iter(sqlite_params.iter())).context("failed to execute query")?;

        let mut result_rows = Vec::new();
        while let Some(row) = rows.next().context("failed to fetch row")? {
            let mut fields = Vec::with_capacity(column_names.len());
            for (i, name) in column_names.iter().enumerate() {
                let value = row.get_ref(i).context("failed to get column value")?;
                fields.push(Field {
                    name: name.clone(),
                    value: sqlite_value_to_datatype(value)?,
                });
            }
            result_rows.push(Row { fields });
        }

        Ok(result_rows)
    }

    fn exec(&self, sql: &str, params: &[DataType]) -> Result<u64> {
        tracing::debug!("executing statement: {sql}");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql).context("failed to prepare statement")?;

        let sqlite_params =
            params.iter().map(datatype_to_sqlite_value).collect::<Result<Vec<_>>>()?;
        let rows_affected = stmt
            .execute(params_from_iter(sqlite_params.iter()))
            .context("failed to execute statement")?;

        Ok(rows_affected as u64)
    }
}

fn datatype_to_sqlite_value(dt: &DataType) -> Result<Value> {
    let value = match dt {
        DataType::Boolean(Some(b)) => Value::Integer(i64::from(*b)),
        DataType::Int32(Some(i)) => Value::Integer(i64::from(*i)),
        DataType::Int64(Some(i)) => Value::Integer(*i),
        DataType::Uint32(Some(u)) => Value::Integer(i64::from(*u)),
        DataType::Uint64(Some(u)) => {
            Value::Integer(i64::try_from(*u).context("unsigned value out of range for SQLite")?)
        }
        DataType::Float(Some(f)) => Value::Real(f64::from(*f)),
        DataType::Double(Some(f)) => Value::Real(*f),
        DataType::Str(Some(s))
        | DataType::Date(Some(s))
        | DataType::Time(Some(s))
        | DataType::Timestamp(Some(s)) => Value::Text(s.clone()),
        DataType::Binary(Some(b)) => Value::Blob(b.clone()),
        // All None variants map to NULL
        _ => Value::Null,
    };
    Ok(value)
}

fn sqlite_value_to_datatype(value: ValueRef) -> Result<DataType> {
    match value {
        ValueRef::Null => Ok(DataType::Str(None)),
        ValueRef::Integer(i) => Ok(DataType::Int64(Some(i))),
        ValueRef::Real(f) => Ok(DataType::Double(Some(f))),
        ValueRef::Text(t) => {
            let s = std::str::from_utf8(t).context("invalid UTF-8 in text value")?;
            Ok(DataType::Str(Some(s.to_string())))
        }
        ValueRef::Blob(b) => Ok(DataType::Binary(Some(b.to_vec()))),
    }
}
