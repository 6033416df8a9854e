//! Vendor differences in rendered SQL.
//!
//! A [`Dialect`] decides how identifiers are quoted and supplies the handful
//! of vendor keywords the repository layer emits: the last-insert-id query,
//! the insert-or-ignore verb and the upsert clause. Everything else the
//! criteria engine renders is shared across dialects.

use std::fmt::Debug;

/// SQL dialect trait - defines how vendor specific fragments are rendered.
pub trait Dialect: Debug + Send + Sync {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column or alias-qualified key).
    fn quote(&self, identifier: &str) -> String;

    /// Single-row, single-column query returning the id generated by the last
    /// insert on this connection.
    fn last_insert_id_query(&self) -> &'static str;

    /// Verb for an insert that silently skips duplicate keys.
    fn insert_ignore(&self) -> &'static str {
        "INSERT IGNORE"
    }

    /// Verb for an insert that overwrites rows with duplicate keys.
    fn replace(&self) -> &'static str {
        "REPLACE"
    }

    /// Clause introducing the update list of an upsert, given the quoted
    /// primary key columns.
    fn upsert(&self, _primary_key: &[String]) -> String {
        "ON DUPLICATE KEY UPDATE".to_string()
    }
}

/// `MySQL` / `MariaDB`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote(&self, identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }

    fn last_insert_id_query(&self) -> &'static str {
        "SELECT LAST_INSERT_ID()"
    }
}

/// Microsoft SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSql;

impl Dialect for MsSql {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn quote(&self, identifier: &str) -> String {
        format!("[{}]", identifier.replace(']', "]]"))
    }

    fn last_insert_id_query(&self) -> &'static str {
        "SELECT SCOPE_IDENTITY()"
    }
}

/// `SQLite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    fn last_insert_id_query(&self) -> &'static str {
        "SELECT last_insert_rowid()"
    }

    fn insert_ignore(&self) -> &'static str {
        "INSERT OR IGNORE"
    }

    fn upsert(&self, primary_key: &[String]) -> String {
        format!("ON CONFLICT ({}) DO UPDATE SET", primary_key.join(","))
    }
}
