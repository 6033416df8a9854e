//! `WHERE → GROUP BY → HAVING → ORDER BY → LIMIT` chains.
//!
//! A [`Chain`] accumulates the optional clauses of one `SELECT` and renders
//! them in a single pass when a terminal operation runs. The stage marker
//! restricts which clause may come next:
//!
//! | stage     | may chain                          |
//! |-----------|------------------------------------|
//! | `Where`   | `group_by`, `order`, `limit`       |
//! | `GroupBy` | `having`, `order`, `limit`         |
//! | `Having`  | `order`, `limit`                   |
//! | `Ordered` | `limit`                            |
//! | `Limited` | nothing                            |
//!
//! Every stage offers the terminal operations `fetch`, `fetch_all`,
//! `select`, `select_all`, `count` and `build`.

use std::marker::PhantomData;

use crate::column::ColumnProvider;
use crate::criterion::{Condition, Operation, Order, QueryWithArgs};
use crate::entity::{Entity, as_u64};
use crate::error::{Error, Result};
use crate::query::Query;
use crate::record::Fields;
use crate::repository::Repository;
use crate::source::DataSource;
use crate::unifier::DataUnifier;
use crate::{Row, schema_error};

/// A repository clause chains can render statements against.
pub trait Fetchable: ColumnProvider {
    /// What a fetched row decodes to.
    type Output;

    fn source(&self) -> &DataSource;

    /// Table name, for logging.
    fn table(&self) -> &str;

    /// `FROM ...` including any joins.
    ///
    /// # Errors
    ///
    /// Returns an error if the joins cannot be rendered.
    fn from_sentence(&self) -> Result<String>;

    /// Projection used by `fetch`.
    fn projection(&self) -> String;

    /// Projection item used by `select` for a caller-supplied column.
    fn select_item(&self, field: &str) -> String;

    /// Decode one fetched row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] if the row does not fit the output type.
    fn decode(&self, row: Row) -> Result<Self::Output>;
}

/// Stage markers.
pub mod stage {
    /// Filtered, nothing else yet.
    #[derive(Debug)]
    pub struct Where;
    /// Grouped.
    #[derive(Debug)]
    pub struct GroupBy;
    /// Grouped with a `HAVING` filter.
    #[derive(Debug)]
    pub struct Having;
    /// Ordered.
    #[derive(Debug)]
    pub struct Ordered;
    /// Limited; only terminals remain.
    #[derive(Debug)]
    pub struct Limited;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::stage::Where {}
    impl Sealed for super::stage::GroupBy {}
    impl Sealed for super::stage::Having {}
    impl Sealed for super::stage::Ordered {}
    impl Sealed for super::stage::Limited {}
}

/// Stages that may be followed by `ORDER BY`.
pub trait CanOrder: sealed::Sealed {}
impl CanOrder for stage::Where {}
impl CanOrder for stage::GroupBy {}
impl CanOrder for stage::Having {}

/// Stages that may be followed by `LIMIT`.
pub trait CanLimit: sealed::Sealed {}
impl CanLimit for stage::Where {}
impl CanLimit for stage::GroupBy {}
impl CanLimit for stage::Having {}
impl CanLimit for stage::Ordered {}

pub type WhereClause<'r, R> = Chain<'r, R, stage::Where>;
pub type GroupByClause<'r, R> = Chain<'r, R, stage::GroupBy>;
pub type HavingClause<'r, R> = Chain<'r, R, stage::Having>;
pub type OrderClause<'r, R> = Chain<'r, R, stage::Ordered>;
pub type LimitClause<'r, R> = Chain<'r, R, stage::Limited>;

#[derive(Debug, Clone, Default)]
struct Clauses {
    condition: Condition,
    group_by: Vec<String>,
    having: Option<Condition>,
    order: Vec<Order>,
    limit: Option<(i64, i64)>,
}

/// A `SELECT` under construction. See the [module docs](self).
#[derive(Debug)]
pub struct Chain<'r, R, S> {
    repo: &'r R,
    clauses: Clauses,
    _stage: PhantomData<S>,
}

impl<'r, R: Fetchable> Chain<'r, R, stage::Where> {
    pub(crate) fn new(repo: &'r R, condition: Condition) -> Self {
        Self {
            repo,
            clauses: Clauses {
                condition,
                ..Clauses::default()
            },
            _stage: PhantomData,
        }
    }

    #[must_use]
    pub fn group_by<S: Into<String>>(
        mut self, items: impl IntoIterator<Item = S>,
    ) -> Chain<'r, R, stage::GroupBy> {
        self.clauses.group_by = items.into_iter().map(Into::into).collect();
        self.advance()
    }
}

impl<'r, R: Fetchable> Chain<'r, R, stage::GroupBy> {
    #[must_use]
    pub fn having(mut self, condition: impl Into<Condition>) -> Chain<'r, R, stage::Having> {
        self.clauses.having = Some(condition.into());
        self.advance()
    }
}

impl<'r, R: Fetchable, S: CanOrder> Chain<'r, R, S> {
    /// Order by columns, [`Order`] wrappers or order-position
    /// [`Op`](crate::Op)s.
    #[must_use]
    pub fn order<O: Into<Order>>(
        mut self, items: impl IntoIterator<Item = O>,
    ) -> Chain<'r, R, stage::Ordered> {
        self.clauses.order = items.into_iter().map(Into::into).collect();
        self.advance()
    }

    #[must_use]
    pub fn asc<C: Into<String>>(
        self, columns: impl IntoIterator<Item = C>,
    ) -> Chain<'r, R, stage::Ordered> {
        self.order([Order::asc(columns)])
    }

    #[must_use]
    pub fn desc<C: Into<String>>(
        self, columns: impl IntoIterator<Item = C>,
    ) -> Chain<'r, R, stage::Ordered> {
        self.order([Order::desc(columns)])
    }
}

impl<'r, R: Fetchable, S: CanLimit> Chain<'r, R, S> {
    /// `LIMIT offset,row_count`.
    ///
    /// A `row_count` of zero or less renders `LIMIT offset` alone, which the
    /// database reads as a row count, not an offset.
    #[must_use]
    pub fn limit(mut self, offset: i64, row_count: i64) -> Chain<'r, R, stage::Limited> {
        self.clauses.limit = Some((offset, row_count));
        self.advance()
    }
}

impl<'r, R: Fetchable, S> Chain<'r, R, S> {
    fn advance<T>(self) -> Chain<'r, R, T> {
        Chain {
            repo: self.repo,
            clauses: self.clauses,
            _stage: PhantomData,
        }
    }

    /// Run `SELECT *` (or the joined projection) and pass each decoded row
    /// to `receiver`. Returns the number of rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be rendered or executed, or a
    /// row cannot be decoded.
    pub fn fetch(self, mut receiver: impl FnMut(R::Output)) -> Result<usize> {
        let query = self.statement(&self.repo.projection())?;
        let rows = self.repo.source().fetch_rows(&query)?;
        let count = rows.len();
        for row in rows {
            receiver(self.repo.decode(row)?);
        }
        Ok(count)
    }

    /// [`fetch`](Self::fetch), collected.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub fn fetch_all(self) -> Result<Vec<R::Output>> {
        let mut all = Vec::new();
        self.fetch(|item| all.push(item))?;
        Ok(all)
    }

    /// Run `SELECT <fields>` and pass each raw row to `receiver`. Returns the
    /// number of rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if `fields` is empty,
    /// or an error if the statement cannot be rendered or executed.
    pub fn select(self, fields: &[&str], mut receiver: impl FnMut(Row)) -> Result<usize> {
        if fields.is_empty() {
            return Err(schema_error!("no value"));
        }
        let projection =
            fields.iter().map(|f| self.repo.select_item(f)).collect::<Vec<_>>().join(",");
        let query = self.statement(&projection)?;
        let rows = self.repo.source().fetch_rows(&query)?;
        let count = rows.len();
        rows.into_iter().for_each(&mut receiver);
        Ok(count)
    }

    /// [`select`](Self::select), collected.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn select_all(self, fields: &[&str]) -> Result<Vec<Row>> {
        let mut all = Vec::new();
        self.select(fields, |row| all.push(row))?;
        Ok(all)
    }

    /// Run `SELECT COUNT(field)`; `"*"` counts rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be rendered or executed, or
    /// the result is not a count.
    pub fn count(self, field: &str) -> Result<u64> {
        let target = if field == "*" {
            field.to_string()
        } else {
            self.repo.resolve(field).quote(self.repo.dialect())
        };
        let query = self.statement(&format!("COUNT({target})"))?;
        let rows = self.repo.source().fetch_rows(&query)?;

        rows.first()
            .and_then(|row| row.value_at(0))
            .map_or(Ok(0), |value| as_u64(value).map_err(Error::Conversion))
    }

    /// Render the `fetch` statement without executing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be rendered.
    pub fn build(&self) -> Result<Query> {
        self.statement(&self.repo.projection())
    }

    fn statement(&self, projection: &str) -> Result<Query> {
        let tail = self.compose()?;
        let sql = format!("SELECT {projection} {}{}", self.repo.from_sentence()?, tail.sql);

        tracing::debug!(
            table = self.repo.table(),
            sql = %sql,
            param_count = tail.args.len(),
            "clause chain generated SQL"
        );

        Query::try_from(QueryWithArgs::new(sql, tail.args))
    }

    fn compose(&self) -> Result<QueryWithArgs> {
        let provider: &dyn ColumnProvider = self.repo;
        let quote = |name: &str| provider.resolve(name).quote(provider.dialect());

        let filter = self.clauses.condition.build_query(provider)?;
        let mut sql = where_sentence(&filter.sql);
        let mut args = filter.args;

        if !self.clauses.group_by.is_empty() {
            let items: Vec<String> = self.clauses.group_by.iter().map(|g| quote(g)).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&items.join(", "));
        }

        if let Some(having) = &self.clauses.having {
            let having = having.build_query(provider)?;
            if !having.is_empty() {
                sql.push_str(" HAVING ");
                sql.push_str(&having.sql);
                args.extend(having.args);
            }
        }

        if !self.clauses.order.is_empty() {
            let items = self
                .clauses
                .order
                .iter()
                .map(|o| o.render(provider))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&items.join(","));
        }

        if let Some((offset, row_count)) = self.clauses.limit {
            if row_count <= 0 {
                sql.push_str(&format!(" LIMIT {offset}"));
            } else {
                sql.push_str(&format!(" LIMIT {offset},{row_count}"));
            }
        }

        Ok(QueryWithArgs::new(sql, args))
    }
}

impl<E: Entity> Chain<'_, Repository<E>, stage::Where> {
    /// `DELETE` every row matching the condition. Returns the number of rows
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be rendered or executed.
    pub fn delete(self) -> Result<u64> {
        let filter = self.clauses.condition.build_query(self.repo)?;
        let sql = format!("DELETE FROM {}{}", self.repo.quoted_table(), where_sentence(&filter.sql));

        tracing::debug!(
            table = self.repo.table(),
            sql = %sql,
            param_count = filter.args.len(),
            "conditional delete"
        );

        let query = Query::try_from(QueryWithArgs::new(sql, filter.args))?;
        self.repo.source().execute(&query)
    }

    /// `UPDATE` every row matching the condition with the set fields of
    /// `fields`. Returns the number of rows updated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if `fields` sets no column, or an error if
    /// the statement cannot be rendered or executed.
    pub fn update(self, fields: &dyn Fields) -> Result<u64> {
        let data = DataUnifier::new(fields);
        let mut assignments = Vec::new();
        let mut args = Vec::new();

        for column in self.repo.extended_columns() {
            if let Some(value) = data.rich_column_value(self.repo, column, Operation::Update)? {
                assignments.extend(value.sql);
                args.extend(value.arg);
            }
        }
        if assignments.is_empty() {
            return Err(schema_error!("no value"));
        }

        let filter = self.clauses.condition.build_query(self.repo)?;
        let sql = format!(
            "UPDATE {} SET {}{}",
            self.repo.quoted_table(),
            assignments.join(", "),
            where_sentence(&filter.sql)
        );
        args.extend(filter.args);

        tracing::debug!(
            table = self.repo.table(),
            sql = %sql,
            param_count = args.len(),
            "conditional update"
        );

        let query = Query::try_from(QueryWithArgs::new(sql, args))?;
        self.repo.source().execute(&query)
    }
}

fn where_sentence(sentence: &str) -> String {
    if sentence.is_empty() { String::new() } else { format!(" WHERE {sentence}") }
}
