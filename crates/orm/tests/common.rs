//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use parking_lot::Mutex;
use tabula_orm::{
    Connection, DataSource, DataType, Dialect, Error, Field, NoopQueryLogger, QueryLogger, Row,
    Sqlite, entity,
};

// Common test entities used across multiple test files

entity! {
    table = "users",
    primary_key = ["id"],
    auto_increment = ["id"],
    #[derive(Debug, Clone, PartialEq)]
    pub struct User {
        pub id: Option<i64>,
        pub name: String,
        pub visits: i64,
    }
}

entity! {
    table = "posts",
    primary_key = ["id"],
    auto_increment = ["id"],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Post {
        pub id: Option<i64>,
        pub user_id: i64,
        pub title: String,
        pub published: bool,
    }
}

entity! {
    table = "comments",
    primary_key = ["id"],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Comment {
        pub id: i64,
        pub post_id: i64,
        pub body: String,
    }
}

entity! {
    table = "memberships",
    primary_key = ["group_id", "user_id"],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Membership {
        pub group_id: i64,
        pub user_id: i64,
        pub role: String,
    }
}

entity! {
    table = "tags",
    primary_key = ["name"],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Tag {
        pub name: String,
        pub hits: i64,
    }
}

impl User {
    pub fn new(name: &str, visits: i64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            visits,
        }
    }
}

/// Build a row from `(column, value)` pairs.
pub fn row(values: &[(&str, DataType)]) -> Row {
    Row {
        fields: values
            .iter()
            .map(|(name, value)| Field {
                name: (*name).to_string(),
                value: value.clone(),
            })
            .collect(),
    }
}

pub fn user_row(id: i64, name: &str, visits: i64) -> Row {
    row(&[
        ("id", DataType::Int64(Some(id))),
        ("name", DataType::Str(Some(name.to_string()))),
        ("visits", DataType::Int64(Some(visits))),
    ])
}

/// A scripted driver response.
#[derive(Debug, Clone)]
pub enum Reply {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(&'static str),
}

/// In-memory connection that answers from a script and records every
/// statement it receives.
///
/// Unscripted queries return no rows and unscripted statements affect no rows.
/// Transaction control is recorded but never consumes a scripted reply.
#[derive(Debug, Default)]
pub struct MockConnection {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(String, Vec<DataType>)>>,
    fail_commit: bool,
}

impl MockConnection {
    pub fn scripted(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::default(),
            fail_commit: false,
        })
    }

    /// Like [`scripted`](Self::scripted), but `COMMIT` fails.
    pub fn failing_commit(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::default(),
            fail_commit: true,
        })
    }

    pub fn statements(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(sql, _)| sql.clone()).collect()
    }

    pub fn params(&self, index: usize) -> Vec<DataType> {
        self.calls.lock()[index].1.clone()
    }

    fn record(&self, sql: &str, params: &[DataType]) {
        self.calls.lock().push((sql.to_string(), params.to_vec()));
    }
}

impl Connection for MockConnection {
    fn query(&self, sql: &str, params: &[DataType]) -> Result<Vec<Row>> {
        self.record(sql, params);
        match self.replies.lock().pop_front() {
            None => Ok(vec![]),
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Fail(message)) => Err(anyhow!(message)),
            Some(Reply::Affected(_)) => bail!("scripted an affected count for a query: {sql}"),
        }
    }

    fn exec(&self, sql: &str, params: &[DataType]) -> Result<u64> {
        self.record(sql, params);
        match self.replies.lock().pop_front() {
            None => Ok(0),
            Some(Reply::Affected(count)) => Ok(count),
            Some(Reply::Fail(message)) => Err(anyhow!(message)),
            Some(Reply::Rows(_)) => bail!("scripted rows for a statement: {sql}"),
        }
    }

    fn begin(&self) -> Result<()> {
        self.record("BEGIN", &[]);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.record("COMMIT", &[]);
        if self.fail_commit {
            bail!("database is locked");
        }
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.record("ROLLBACK", &[]);
        Ok(())
    }
}

pub fn mock_source(mock: &Arc<MockConnection>) -> DataSource {
    mock_source_with(mock, Sqlite)
}

pub fn mock_source_with(mock: &Arc<MockConnection>, dialect: impl Dialect + 'static) -> DataSource {
    DataSource::new(Arc::clone(mock), dialect).with_logger(NoopQueryLogger)
}

/// Logger that records one line per callback.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingLogger {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl QueryLogger for RecordingLogger {
    fn before_action(&self, sql: &str, _args: &[DataType]) {
        self.events.lock().push(format!("before {sql}"));
    }

    fn query(&self, sql: &str, _args: &[DataType], rows: usize) {
        self.events.lock().push(format!("query {sql} -> {rows}"));
    }

    fn update(&self, sql: &str, _args: &[DataType], success: bool) {
        self.events.lock().push(format!("update {sql} -> {success}"));
    }

    fn exception(&self, error: &Error) {
        self.events.lock().push(format!("exception {error}"));
    }
}

/// Normalize SQL by collapsing whitespace.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize SQL for comparison by removing identifier quotes and normalizing whitespace.
/// Preserves quotes inside string literals.
fn canonicalize_sql(sql: &str) -> String {
    let mut cleaned = String::with_capacity(sql.len());
    let mut in_single_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_single_quote = !in_single_quote;
                cleaned.push(ch);
            }
            '"' | '`' if !in_single_quote => {
                // Strip identifier quoting to avoid brittle comparisons.
            }
            _ => cleaned.push(ch),
        }
    }

    normalize_sql(&cleaned)
}

/// Assert that SQL contains all expected fragments in order.
///
/// Strips identifier quotes, normalizes whitespace, and checks that fragments
/// appear sequentially in the generated SQL.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual_canonical = canonicalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment_canonical = canonicalize_sql(fragment);
        if fragment_canonical.is_empty() {
            continue;
        }

        if let Some(pos) = actual_canonical[search_start..].find(&fragment_canonical) {
            search_start += pos + fragment_canonical.len();
        } else {
            panic!(
                "expected SQL fragment `{fragment_canonical}` not found in `{actual_canonical}`"
            );
        }
    }
}
