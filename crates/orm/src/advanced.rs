//! Multi-table reads.
//!
//! An [`AdvancedRepository`] starts from one table under an alias and joins
//! further tables, each under its own alias. Every column is addressed as
//! `alias::column` (with the source's delimiter), both in conditions and in
//! the rows returned.
//!
//! Joins chain: the `ON` pairs of each join relate the previously joined
//! alias (left) to the new one (right). Referencing any other alias is
//! rejected when the statement is rendered.
//!
//! ```ignore
//! let rows = users
//!     .alias("u")?
//!     .left_join(&posts, "p", &[("id", "user_id")])?
//!     .r#where(Record::new().set("p::published", true))
//!     .fetch_all()?;
//! let title = rows[0].get("p::title");
//! ```

use crate::clause::{Fetchable, WhereClause};
use crate::column::{ColumnProvider, ExtendedColumn, is_alias};
use crate::criterion::Condition;
use crate::dialect::Dialect;
use crate::entity::Entity;
use crate::error::Result;
use crate::repository::Repository;
use crate::source::DataSource;
use crate::{Row, schema_error};

/// How a table enters the `FROM` sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// The first table, introduced by `FROM`.
    Init,
    /// `JOIN`
    Join,
    /// `LEFT JOIN`
    LeftJoin,
}

/// One table of the `FROM` sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinInfo {
    /// Unquoted table name.
    pub table: String,
    /// Alias the table's columns are qualified with.
    pub alias: String,
    /// `(previous alias column, this alias column)` pairs.
    pub condition: Vec<(String, String)>,
    /// Join keyword.
    pub kind: JoinKind,
}

/// A chain of aliased tables queried as one, returning raw rows keyed
/// `alias::column`.
#[derive(Debug, Clone)]
pub struct AdvancedRepository {
    source: DataSource,
    joins: Vec<JoinInfo>,
    columns: Vec<ExtendedColumn>,
}

impl AdvancedRepository {
    pub(crate) fn new<E: Entity>(repo: &Repository<E>, alias: &str) -> Result<Self> {
        let mut advanced = Self {
            source: repo.source().clone(),
            joins: Vec::new(),
            columns: Vec::new(),
        };
        advanced.push(repo, alias, &[], JoinKind::Init)?;
        Ok(advanced)
    }

    /// `JOIN` `repo`'s table under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`](crate::Error::Schema) if `alias` is invalid
    /// or already in use.
    pub fn join<F: Entity>(
        mut self, repo: &Repository<F>, alias: &str, on: &[(&str, &str)],
    ) -> Result<Self> {
        self.push(repo, alias, on, JoinKind::Join)?;
        Ok(self)
    }

    /// `LEFT JOIN` `repo`'s table under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`](crate::Error::Schema) if `alias` is invalid
    /// or already in use.
    pub fn left_join<F: Entity>(
        mut self, repo: &Repository<F>, alias: &str, on: &[(&str, &str)],
    ) -> Result<Self> {
        self.push(repo, alias, on, JoinKind::LeftJoin)?;
        Ok(self)
    }

    #[must_use]
    pub fn joins(&self) -> &[JoinInfo] {
        &self.joins
    }

    /// Start a clause chain filtered by `condition`.
    pub fn r#where(&self, condition: impl Into<Condition>) -> WhereClause<'_, Self> {
        WhereClause::new(self, condition.into())
    }

    /// Start an unfiltered clause chain.
    #[must_use]
    pub fn all(&self) -> WhereClause<'_, Self> {
        WhereClause::new(self, Condition::all())
    }

    fn push<E: Entity>(
        &mut self, repo: &Repository<E>, alias: &str, on: &[(&str, &str)], kind: JoinKind,
    ) -> Result<()> {
        if !is_alias(alias) {
            return Err(schema_error!("`{alias}` is not a valid table alias"));
        }
        if self.joins.iter().any(|j| j.alias == alias) {
            return Err(schema_error!("alias `{alias}` is already joined"));
        }

        let delimiter = self.source.delimiter();
        let metadata = repo.metadata();
        self.columns.extend(
            metadata.columns.iter().map(|c| ExtendedColumn::parse(c, alias, delimiter)),
        );
        self.joins.push(JoinInfo {
            table: metadata.table.clone(),
            alias: alias.to_string(),
            condition: on.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
            kind,
        });
        Ok(())
    }

    /// Parse an `ON` column, which must belong to `expected`.
    fn on_column(&self, raw: &str, expected: &str) -> Result<String> {
        let column = ExtendedColumn::parse(raw, expected, self.delimiter());
        if column.alias != expected {
            return Err(schema_error!(
                "join condition `{raw}` references alias `{}`, expected `{expected}`: \
                 joins can only relate adjacent aliases",
                column.alias
            ));
        }
        Ok(column.quote(self.dialect()))
    }
}

impl ColumnProvider for AdvancedRepository {
    fn dialect(&self) -> &dyn Dialect {
        self.source.dialect()
    }

    fn extended_columns(&self) -> &[ExtendedColumn] {
        &self.columns
    }

    fn default_alias(&self) -> &str {
        self.joins.first().map_or("", |j| j.alias.as_str())
    }

    fn delimiter(&self) -> &str {
        self.source.delimiter()
    }
}

impl Fetchable for AdvancedRepository {
    type Output = Row;

    fn source(&self) -> &DataSource {
        &self.source
    }

    fn table(&self) -> &str {
        self.joins.first().map_or("", |j| j.table.as_str())
    }

    fn from_sentence(&self) -> Result<String> {
        let dialect = self.dialect();
        let mut sentence = String::from("FROM");
        let mut previous: Option<&str> = None;

        for join in &self.joins {
            let keyword = match join.kind {
                JoinKind::Init => "",
                JoinKind::Join => " JOIN",
                JoinKind::LeftJoin => " LEFT JOIN",
            };
            sentence.push_str(keyword);
            sentence.push(' ');
            sentence.push_str(&dialect.quote(&join.table));
            sentence.push(' ');
            sentence.push_str(&join.alias);

            if let (Some(prev), false) = (previous, join.condition.is_empty()) {
                let pairs = join
                    .condition
                    .iter()
                    .map(|(key, value)| -> Result<String> {
                        Ok(format!(
                            "{} = {}",
                            self.on_column(key, prev)?,
                            self.on_column(value, &join.alias)?
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;
                sentence.push_str(" ON ");
                sentence.push_str(&pairs.join(" AND "));
            }
            previous = Some(join.alias.as_str());
        }

        Ok(sentence)
    }

    fn projection(&self) -> String {
        let dialect = self.dialect();
        self.columns.iter().map(|c| c.as_projection(dialect)).collect::<Vec<_>>().join(",")
    }

    fn select_item(&self, field: &str) -> String {
        self.resolve(field).as_projection(self.dialect())
    }

    fn decode(&self, row: Row) -> Result<Row> {
        Ok(row)
    }
}
