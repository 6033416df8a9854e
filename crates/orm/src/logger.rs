//! Statement logging hooks.
//!
//! Every statement executed through a [`DataSource`](crate::DataSource)
//! produces exactly one `before_action` call followed by exactly one of
//! `query`, `update` or `exception`.

use std::fmt::Debug;

use crate::DataType;
use crate::error::Error;

/// Observer of executed statements. Implementations must not affect
/// execution.
pub trait QueryLogger: Debug + Send + Sync {
    /// About to execute `sql`.
    fn before_action(&self, sql: &str, args: &[DataType]);

    /// A query returned `rows` rows.
    fn query(&self, sql: &str, args: &[DataType], rows: usize);

    /// A statement completed.
    fn update(&self, sql: &str, args: &[DataType], success: bool);

    /// A statement failed.
    fn exception(&self, error: &Error);
}

/// Logs statements with `tracing`: statement text at `debug`, failures at
/// `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingQueryLogger;

impl QueryLogger for TracingQueryLogger {
    fn before_action(&self, sql: &str, args: &[DataType]) {
        tracing::debug!(sql = %sql, param_count = args.len(), "executing statement");
        if !args.is_empty() {
            tracing::trace!(?args, "statement arguments");
        }
    }

    fn query(&self, sql: &str, _args: &[DataType], rows: usize) {
        tracing::debug!(sql = %sql, rows, "query complete");
    }

    fn update(&self, sql: &str, _args: &[DataType], success: bool) {
        tracing::debug!(sql = %sql, success, "statement complete");
    }

    fn exception(&self, error: &Error) {
        tracing::warn!(error = %error, "statement failed");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopQueryLogger;

impl QueryLogger for NoopQueryLogger {
    fn before_action(&self, _sql: &str, _args: &[DataType]) {}

    fn query(&self, _sql: &str, _args: &[DataType], _rows: usize) {}

    fn update(&self, _sql: &str, _args: &[DataType], _success: bool) {}

    fn exception(&self, _error: &Error) {}
}
