use crate::criterion::QueryWithArgs;
use crate::entity::values_to_datatypes;
use crate::error::{Error, Result};
use crate::DataType;

/// A rendered statement ready for the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Statement text with `?` placeholders.
    pub sql: String,
    /// Bound values in placeholder order.
    pub params: Vec<DataType>,
}

impl Query {
    /// A statement with no parameters.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: vec![],
        }
    }
}

impl TryFrom<QueryWithArgs> for Query {
    type Error = Error;

    fn try_from(query: QueryWithArgs) -> Result<Self> {
        let params = values_to_datatypes(query.args).map_err(Error::Conversion)?;
        Ok(Self {
            sql: query.sql,
            params,
        })
    }
}
