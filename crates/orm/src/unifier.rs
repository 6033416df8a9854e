use sea_query::Value;

use crate::column::{ColumnProvider, ExtendedColumn};
use crate::criterion::{Operation, QueryWithArgs};
use crate::error::{Error, Result};
use crate::record::{FieldValue, Fields};

/// One column's contribution to an insert or update.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    /// SQL for the column's slot; `None` means a bare `?` placeholder.
    pub sql: Option<String>,
    /// Value bound to the slot's placeholder, if it has one.
    pub arg: Option<Value>,
}

/// Renders field data (entity or map) against a provider's columns.
///
/// Columns are always visited in the provider's declared order so that SQL
/// text and argument order are stable.
pub struct DataUnifier<'a> {
    data: &'a dyn Fields,
}

impl<'a> DataUnifier<'a> {
    /// Wrap `data`.
    #[must_use]
    pub const fn new(data: &'a dyn Fields) -> Self {
        Self { data }
    }

    /// Whether `name` is set on the data.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.data.has_field(name)
    }

    /// The value of `name`, if set.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<FieldValue> {
        self.data.field(name)
    }

    /// Number of set fields.
    #[must_use]
    pub fn count_set_fields(&self) -> usize {
        self.data.count_set_fields()
    }

    /// `col=?` per set column (or `col <comparator>` for a [`Qx`](crate::Qx)
    /// value), joined with ` AND `.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationNotSupported`] if a field holds an
    /// [`Op`](crate::Op).
    pub fn build_query(&self, provider: &dyn ColumnProvider) -> Result<QueryWithArgs> {
        let mut terms = Vec::new();
        let mut args = Vec::new();

        for column in provider.extended_columns() {
            let Some(value) = self.data.field(&column.full_name) else {
                continue;
            };
            let quoted = column.quote(provider.dialect());

            match value {
                FieldValue::Value(v) => {
                    terms.push(format!("{quoted}=?"));
                    args.push(v);
                }
                FieldValue::Qx(qx) => {
                    let (fragment, values) = qx.fragment();
                    terms.push(format!("{quoted} {fragment}"));
                    args.extend(values);
                }
                FieldValue::Op(op) => {
                    return Err(Error::OperationNotSupported {
                        op: op.name(),
                        operation: Operation::Where,
                    });
                }
            }
        }

        Ok(QueryWithArgs::new(terms.join(" AND "), args))
    }

    /// The insert- or update-position rendering of `column`, or `None` when
    /// the field is not set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationNotSupported`] for positions other than
    /// insert and update, for comparators, and for [`Op`](crate::Op)s not
    /// allowed in `operation` position.
    pub fn rich_column_value(
        &self, provider: &dyn ColumnProvider, column: &ExtendedColumn, operation: Operation,
    ) -> Result<Option<ColumnValue>> {
        let Some(value) = self.data.field(&column.full_name) else {
            return Ok(None);
        };

        let rendered = match (operation, value) {
            (Operation::Insert | Operation::Update, FieldValue::Op(op)) => {
                let (sql, arg) = op.apply(provider, operation, column)?;
                ColumnValue { sql: Some(sql), arg }
            }
            (Operation::Insert, FieldValue::Value(v)) => ColumnValue { sql: None, arg: Some(v) },
            (Operation::Update, FieldValue::Value(v)) => ColumnValue {
                sql: Some(format!("{}=?", column.quote(provider.dialect()))),
                arg: Some(v),
            },
            (Operation::Insert | Operation::Update, FieldValue::Qx(_)) => {
                return Err(Error::OperationNotSupported {
                    op: "comparator",
                    operation,
                });
            }
            (Operation::Order | Operation::Where, _) => {
                return Err(Error::OperationNotSupported {
                    op: "field value",
                    operation,
                });
            }
        };

        Ok(Some(rendered))
    }
}
