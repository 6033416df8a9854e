//! # Tabula SQL driver boundary
//!
//! Value types exchanged with a database driver and the [`Connection`] trait
//! the query layer executes statements through. The `sqlite` feature (on by
//! default) provides a single-connection `SQLite` implementation intended for
//! development and tests.

#![forbid(unsafe_code)]

mod connection;
#[cfg(feature = "sqlite")]
pub mod sqlite;
mod types;

pub use crate::connection::Connection;
pub use crate::types::{DataType, Field, Row};
