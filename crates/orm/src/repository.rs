//! CRUD over one entity table.
//!
//! A [`Repository`] renders every statement against its entity's metadata
//! and runs it through the shared [`DataSource`]. Inputs are taken as
//! [`Fields`], so an entity and a [`Record`] can be passed interchangeably.
//!
//! # Examples
//!
//! ```ignore
//! let users = Repository::<User>::new(&source)?;
//!
//! let saved = users.save(&User { id: None, name: "ada".into(), visits: 0 })?;
//! let found = users.find_by_id(1)?;
//! let active = users
//!     .r#where(Record::new().set("visits", Qx::greater_than(10)))
//!     .desc(["visits"])
//!     .limit(0, 20)
//!     .fetch_all()?;
//! ```

use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::Arc;

use sea_query::Value;

use crate::advanced::AdvancedRepository;
use crate::clause::{Fetchable, WhereClause};
use crate::column::{ColumnProvider, ExtendedColumn};
use crate::criterion::{Condition, Operation, QueryWithArgs};
use crate::dialect::Dialect;
use crate::entity::{Entity, datatype_to_value};
use crate::error::{Error, Result};
use crate::metadata::{EntityMetadata, metadata};
use crate::query::Query;
use crate::record::{FieldValue, Fields, Record};
use crate::source::DataSource;
use crate::unifier::DataUnifier;
use crate::{Row, schema_error};

/// A primary key value.
///
/// Single-column keys take a scalar; composite keys must name every key
/// column.
#[derive(Debug, Clone, PartialEq)]
pub enum Id {
    /// Value of a single-column key.
    Scalar(Value),
    /// `(column, value)` pairs of a composite key.
    Named(Vec<(String, Value)>),
}

impl Id {
    /// A composite key from `(column, value)` pairs.
    #[must_use]
    pub fn named<K: Into<String>, V: Into<Value>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::Named(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

macro_rules! impl_scalar_id {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Id {
                fn from(value: $ty) -> Self {
                    Self::Scalar(value.into())
                }
            }
        )*
    };
}

impl_scalar_id!(Value, i32, i64, u32, u64, &str, String);

/// Statement verbs for the insert family.
#[derive(Debug, Clone, Copy)]
enum Insert {
    Plain,
    Ignore,
    Overwrite,
}

/// CRUD operations for entity `E`.
pub struct Repository<E: Entity> {
    source: DataSource,
    metadata: Arc<EntityMetadata>,
    columns: Vec<ExtendedColumn>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("table", &self.metadata.table)
            .field("dialect", &self.source.dialect().name())
            .finish_non_exhaustive()
    }
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            metadata: Arc::clone(&self.metadata),
            columns: self.columns.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    /// Create a repository for `E` on `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if `E`'s metadata is inconsistent.
    pub fn new(source: &DataSource) -> Result<Self> {
        let metadata = metadata::<E>()?;
        let columns = metadata
            .columns
            .iter()
            .map(|c| ExtendedColumn::parse(c, "", source.delimiter()))
            .collect();

        Ok(Self {
            source: source.clone(),
            metadata,
            columns,
            _entity: PhantomData,
        })
    }

    #[must_use]
    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    pub(crate) fn quoted_table(&self) -> String {
        self.source.dialect().quote(&self.metadata.table)
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

    /// Every row of the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub fn find_all(&self) -> Result<Vec<E>> {
        self.all().fetch_all()
    }

    /// Every row whose columns equal the set fields of `example`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub fn find_by_example(&self, example: &dyn Fields) -> Result<Vec<E>> {
        self.r#where(Record::from_fields(example, &self.column_names())).fetch_all()
    }

    /// A join-capable view of this table under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if `alias` is not a valid alias.
    pub fn alias(&self, alias: &str) -> Result<AdvancedRepository> {
        AdvancedRepository::new(self, alias)
    }

    /// `INSERT` the set fields of `data`, then read the stored row back.
    ///
    /// Returns `None` when the driver reports no inserted row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if `data` sets no column,
    /// [`Error::NotFound`] or [`Error::AmbiguousResult`] if the stored row
    /// cannot be identified, or an error if a statement fails.
    pub fn save(&self, data: &dyn Fields) -> Result<Option<E>> {
        self.insert(Insert::Plain, data, None)
    }

    /// Like [`save`](Self::save), skipping rows with a duplicate key.
    ///
    /// # Errors
    ///
    /// See [`save`](Self::save).
    pub fn save_or_ignore(&self, data: &dyn Fields) -> Result<Option<E>> {
        self.insert(Insert::Ignore, data, None)
    }

    /// Like [`save`](Self::save), replacing rows with a duplicate key.
    ///
    /// # Errors
    ///
    /// See [`save`](Self::save).
    pub fn save_or_overwrite(&self, data: &dyn Fields) -> Result<Option<E>> {
        self.insert(Insert::Overwrite, data, None)
    }

    /// Insert `data`, or on a duplicate key update the existing row with the
    /// non-key fields of `on_update` (default: `data`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if either column list is empty; otherwise see
    /// [`save`](Self::save).
    pub fn save_or_update(
        &self, data: &dyn Fields, on_update: Option<&dyn Fields>,
    ) -> Result<Option<E>> {
        self.insert(Insert::Plain, data, Some(on_update.unwrap_or(data)))
    }

    /// `UPDATE` the row identified by `data`'s primary key, then read it back.
    ///
    /// The `SET` list comes from the non-key fields of `fields` when it sets
    /// any, otherwise from the non-key fields of `data`. A read-back that
    /// does not find exactly one row is logged, not raised.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPrimaryKey`] if `data` lacks a key column,
    /// [`Error::Schema`] if there is nothing to set, or an error if a
    /// statement fails.
    pub fn update(&self, data: &dyn Fields, fields: Option<&dyn Fields>) -> Result<Option<E>> {
        let key = self.key_of(data)?;
        let changes = fields.filter(|f| self.sets_non_key(*f)).unwrap_or(data);

        let (assignments, mut args) = self.assignments(changes)?;
        let predicate = self.key_predicate(&key);
        args.extend(key.iter().cloned());

        let sql = format!(
            "UPDATE {} SET {} WHERE {predicate}",
            self.quoted_table(),
            assignments.join(", ")
        );
        self.execute(sql, args)?;

        let mut found = self.find_by_key(key)?;
        if found.len() != 1 {
            tracing::warn!(
                table = %self.metadata.table,
                count = found.len(),
                "updated row could not be read back by primary key"
            );
        }
        Ok(if found.is_empty() { None } else { Some(found.swap_remove(0)) })
    }

    /// `UPDATE` every row matching `condition`. Returns the number of rows
    /// updated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if `fields` sets no column, or an error if
    /// the statement fails.
    pub fn conditional_update(
        &self, condition: impl Into<Condition>, fields: &dyn Fields,
    ) -> Result<u64> {
        self.r#where(condition).update(fields)
    }

    /// `DELETE` the row identified by `data`'s primary key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CompositeKeyMismatch`] if `data` lacks a column of a
    /// composite key, [`Error::MissingPrimaryKey`] if it lacks a single key
    /// column, or an error if the statement fails.
    pub fn delete(&self, data: &dyn Fields) -> Result<u64> {
        let key = match self.key_of(data) {
            Err(Error::MissingPrimaryKey { table, column })
                if self.metadata.primary_key.len() > 1 =>
            {
                return Err(Error::CompositeKeyMismatch {
                    table,
                    message: format!("primary key `{column}` should exist in input"),
                });
            }
            key => key?,
        };
        self.delete_key(key)
    }

    /// `DELETE` the row with primary key `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CompositeKeyMismatch`] or [`Error::KeyTypeMismatch`]
    /// if `id` does not fit the key, or an error if the statement fails.
    pub fn delete_by_id(&self, id: impl Into<Id>) -> Result<u64> {
        let key = self.key_of_id(id.into())?;
        self.delete_key(key)
    }

    /// Rows whose primary key equals `data`'s.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPrimaryKey`] if `data` lacks a key column, or
    /// an error if the query fails.
    pub fn find(&self, data: &dyn Fields) -> Result<Vec<E>> {
        let key = self.key_of(data)?;
        self.find_by_key(key)
    }

    /// The row with primary key `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IntegrityViolation`] if several rows share the key,
    /// [`Error::CompositeKeyMismatch`] or [`Error::KeyTypeMismatch`] if `id`
    /// does not fit the key, or an error if the query fails.
    pub fn find_by_id(&self, id: impl Into<Id>) -> Result<Option<E>> {
        let key = self.key_of_id(id.into())?;
        let mut found = self.find_by_key(key)?;

        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => Err(Error::IntegrityViolation {
                table: self.metadata.table.clone(),
                count,
            }),
        }
    }

    /// Run `unit` in a transaction on this repository's connection.
    ///
    /// # Errors
    ///
    /// Returns the unit's error after rolling back; see
    /// [`DataSource::transaction`].
    pub fn transaction<T>(&self, unit: impl FnOnce(&Self) -> anyhow::Result<T>) -> Result<T> {
        self.source.transaction(|| unit(self))
    }

    fn insert(
        &self, verb: Insert, data: &dyn Fields, on_update: Option<&dyn Fields>,
    ) -> Result<Option<E>> {
        let dialect = self.source.dialect();
        let unifier = DataUnifier::new(data);
        let mut columns = Vec::new();
        let mut slots = Vec::new();
        let mut args = Vec::new();

        for column in &self.columns {
            if let Some(value) = unifier.rich_column_value(self, column, Operation::Insert)? {
                columns.push(column.quote(dialect));
                slots.push(value.sql.unwrap_or_else(|| "?".to_string()));
                args.extend(value.arg);
            }
        }
        if columns.is_empty() {
            return Err(schema_error!("no value"));
        }

        let verb = match verb {
            Insert::Plain => "INSERT",
            Insert::Ignore => dialect.insert_ignore(),
            Insert::Overwrite => dialect.replace(),
        };
        let mut sql = format!(
            "{verb} INTO {} ({}) VALUES ({})",
            self.quoted_table(),
            columns.join(","),
            slots.join(",")
        );

        if let Some(on_update) = on_update {
            let (assignments, update_args) = self.assignments(on_update)?;
            let primary_key: Vec<String> =
                self.metadata.primary_key.iter().map(|pk| dialect.quote(pk)).collect();
            sql.push(' ');
            sql.push_str(&dialect.upsert(&primary_key));
            sql.push(' ');
            sql.push_str(&assignments.join(", "));
            args.extend(update_args);
        }

        if self.execute(sql, args)? == 0 {
            return Ok(None);
        }
        self.read_back(data).map(Some)
    }

    /// Locate the row an insert of `data` just stored.
    fn read_back(&self, data: &dyn Fields) -> Result<E> {
        let table = &self.metadata.table;

        if let [generated] = self.metadata.auto_increment.as_slice() {
            let id = match data.field(generated) {
                Some(FieldValue::Value(supplied)) => supplied,
                _ => self.last_insert_id()?,
            };
            return self
                .find_by_id(Id::Scalar(id))?
                .ok_or_else(|| Error::NotFound(format!("inserted row of `{table}`")));
        }

        // only plain values can be matched by example
        let example: Record = self
            .metadata
            .columns
            .iter()
            .filter_map(|c| match data.field(c) {
                Some(FieldValue::Value(v)) => Some((c.clone(), v)),
                _ => None,
            })
            .collect();

        let mut found = self.r#where(example).fetch_all()?;
        match found.len() {
            0 => Err(Error::NotFound(format!("inserted row of `{table}`"))),
            1 => Ok(found.swap_remove(0)),
            count => Err(Error::AmbiguousResult {
                table: table.clone(),
                count,
            }),
        }
    }

    fn last_insert_id(&self) -> Result<Value> {
        let query = Query::raw(self.source.dialect().last_insert_id_query());
        let rows = self.source.fetch_rows(&query)?;

        rows.first()
            .and_then(|row| row.value_at(0))
            .filter(|id| !id.is_null())
            .map(datatype_to_value)
            .ok_or_else(|| Error::NotFound("last insert id".to_string()))
    }

    fn sets_non_key(&self, data: &dyn Fields) -> bool {
        let unifier = DataUnifier::new(data);
        unifier.count_set_fields() > 0
            && self
                .metadata
                .columns
                .iter()
                .any(|c| !self.metadata.is_primary_key(c) && unifier.has_field(c))
    }

    /// Update-position rendering of every non-key set field of `data`.
    fn assignments(&self, data: &dyn Fields) -> Result<(Vec<String>, Vec<Value>)> {
        let unifier = DataUnifier::new(data);
        let mut assignments = Vec::new();
        let mut args = Vec::new();

        for column in &self.columns {
            if self.metadata.is_primary_key(&column.column) {
                continue;
            }
            if let Some(value) = unifier.rich_column_value(self, column, Operation::Update)? {
                assignments.extend(value.sql);
                args.extend(value.arg);
            }
        }
        if assignments.is_empty() {
            return Err(schema_error!("no value"));
        }
        Ok((assignments, args))
    }

    /// Key values of `data` in primary key order.
    fn key_of(&self, data: &dyn Fields) -> Result<Vec<Value>> {
        self.metadata
            .primary_key
            .iter()
            .map(|pk| match data.field(pk) {
                Some(FieldValue::Value(v)) => Ok(v),
                _ => Err(Error::MissingPrimaryKey {
                    table: self.metadata.table.clone(),
                    column: pk.clone(),
                }),
            })
            .collect()
    }

    fn key_of_id(&self, id: Id) -> Result<Vec<Value>> {
        let table = &self.metadata.table;

        match (self.metadata.primary_key.as_slice(), id) {
            ([_], Id::Scalar(value)) => Ok(vec![value]),
            ([_], Id::Named(_)) => Err(Error::KeyTypeMismatch { table: table.clone() }),
            (_, Id::Scalar(_)) => Err(Error::CompositeKeyMismatch {
                table: table.clone(),
                message: "id should name every primary key column".to_string(),
            }),
            (primary_key, Id::Named(mut pairs)) => primary_key
                .iter()
                .map(|pk| -> Result<Value> {
                    let at = pairs.iter().position(|(name, _)| name == pk).ok_or_else(|| {
                        Error::CompositeKeyMismatch {
                            table: table.clone(),
                            message: format!("primary key `{pk}` should exist in id"),
                        }
                    })?;
                    Ok(pairs.swap_remove(at).1)
                })
                .collect(),
        }
    }

    /// `"pk1"=? AND "pk2"=?`
    fn key_predicate(&self, key: &[Value]) -> String {
        let dialect = self.source.dialect();
        self.metadata
            .primary_key
            .iter()
            .take(key.len())
            .map(|pk| format!("{}=?", dialect.quote(pk)))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn find_by_key(&self, key: Vec<Value>) -> Result<Vec<E>> {
        let sql =
            format!("SELECT * FROM {} WHERE {}", self.quoted_table(), self.key_predicate(&key));
        let query = self.query(sql, key)?;

        self.source.fetch_rows(&query)?.into_iter().map(|row| self.decode(row)).collect()
    }

    fn delete_key(&self, key: Vec<Value>) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE {}", self.quoted_table(), self.key_predicate(&key));
        self.execute(sql, key)
    }

    fn execute(&self, sql: String, args: Vec<Value>) -> Result<u64> {
        let query = self.query(sql, args)?;
        self.source.execute(&query)
    }

    fn query(&self, sql: String, args: Vec<Value>) -> Result<Query> {
        tracing::debug!(table = %self.metadata.table, sql = %sql, param_count = args.len(), "repository generated SQL");
        Query::try_from(QueryWithArgs::new(sql, args))
    }

    fn column_names(&self) -> Vec<&str> {
        self.metadata.columns.iter().map(String::as_str).collect()
    }
}

impl<E: Entity> ColumnProvider for Repository<E> {
    fn dialect(&self) -> &dyn Dialect {
        self.source.dialect()
    }

    fn extended_columns(&self) -> &[ExtendedColumn] {
        &self.columns
    }

    fn delimiter(&self) -> &str {
        self.source.delimiter()
    }
}

impl<E: Entity> Fetchable for Repository<E> {
    type Output = E;

    fn source(&self) -> &DataSource {
        &self.source
    }

    fn table(&self) -> &str {
        &self.metadata.table
    }

    fn from_sentence(&self) -> Result<String> {
        Ok(format!("FROM {}", self.quoted_table()))
    }

    fn projection(&self) -> String {
        "*".to_string()
    }

    fn select_item(&self, field: &str) -> String {
        self.resolve(field).quote(self.source.dialect())
    }

    fn decode(&self, row: Row) -> Result<E> {
        E::from_row(&row).map_err(Error::Conversion)
    }
}
