//! # Tabula ORM
//!
//! Typed SQL criteria and repository CRUD on top of a [`Connection`].
//!
//! Predicates are composed from plain data (field maps, [`Logical`]
//! combinators, [`Qx`] comparators, [`Op`] column expressions) and rendered to
//! parameterized SQL only when a statement is built against a repository.
//!
//! # Quick Start
//!
//! ## Define an Entity
//!
//! ```ignore
//! use tabula_orm::entity;
//!
//! entity! {
//!     table = "users",
//!     primary_key = ["id"],
//!     auto_increment = ["id"],
//!     #[derive(Debug, Clone)]
//!     pub struct User {
//!         pub id: Option<i64>,
//!         pub name: String,
//!         pub visits: i64,
//!     }
//! }
//! ```
//!
//! ## CRUD Operations
//!
//! ```ignore
//! use tabula_orm::{DataSource, Op, Record, Repository, Sqlite};
//! use tabula_sql::sqlite::SqliteConnection;
//!
//! let source = DataSource::new(SqliteConnection::connect()?, Sqlite);
//! let users = Repository::<User>::new(&source)?;
//!
//! // Insert, then read back the stored row (generated id included)
//! let ada = users.save(&User { id: None, name: "ada".into(), visits: 0 })?.unwrap();
//!
//! // Update by primary key with a column expression
//! users.update(&ada, Some(&Record::new().set("visits", Op::inc())))?;
//!
//! // Find and delete by primary key
//! let found = users.find_by_id(ada.id.unwrap())?;
//! users.delete_by_id(ada.id.unwrap())?;
//! ```
//!
//! ## Criteria
//!
//! ```ignore
//! use tabula_orm::{Logical, Qx, Record};
//!
//! let busy = users
//!     .r#where(Logical::or([
//!         Record::new().set("visits", Qx::greater_than(100)),
//!         Record::new().set("name", Qx::like("a%")),
//!     ]))
//!     .group_by(["name"])
//!     .desc(["visits"])
//!     .limit(0, 10)
//!     .fetch_all()?;
//!
//! let total = users.all().count("*")?;
//! ```
//!
//! ## Joins
//!
//! ```ignore
//! let rows = users
//!     .alias("u")?
//!     .join(&posts, "p", &[("id", "user_id")])?
//!     .r#where(Record::new().set("p::published", true))
//!     .fetch_all()?;
//! // rows are keyed `u::name`, `p::title`, ...
//! ```
//!
//! ## Transactions
//!
//! ```ignore
//! users.transaction(|repo| {
//!     repo.save(&first)?;
//!     repo.save(&second)?;
//!     Ok(())
//! })?;
//! ```

mod advanced;
mod clause;
mod column;
mod criterion;
mod dialect;
mod entity;
mod error;
mod logger;
mod metadata;
mod query;
mod record;
mod repository;
mod source;
mod unifier;

pub use advanced::{AdvancedRepository, JoinInfo, JoinKind};
pub use clause::{
    CanLimit, CanOrder, Chain, Fetchable, GroupByClause, HavingClause, LimitClause, OrderClause,
    WhereClause, stage,
};
pub use column::{ColumnProvider, DEFAULT_DELIMITER, ExtendedColumn};
pub use criterion::{
    Condition, Logical, Op, Operation, Operations, Order, QueryWithArgs, Qx, SpecialCondition,
};
pub use dialect::{Dialect, MsSql, MySql, Sqlite};
pub use entity::{Entity, FetchValue, ToField};
pub use error::{Error, Result};
pub use logger::{NoopQueryLogger, QueryLogger, TracingQueryLogger};
pub use metadata::{EntityMetadata, metadata, register};
pub use query::Query;
pub use record::{FieldValue, Fields, Record};
pub use repository::{Id, Repository};
pub use source::DataSource;
// Re-export the driver boundary types used in rows, arguments and custom
// value conversions.
pub use tabula_sql::{Connection, DataType, Field, Row};
pub use unifier::{ColumnValue, DataUnifier};

// Re-exports for `entity` macro use only.
#[doc(hidden)]
pub mod __private {
    pub use anyhow;
    pub use sea_query::Value;
}
