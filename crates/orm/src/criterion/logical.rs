use crate::column::ColumnProvider;
use crate::criterion::{Condition, QueryWithArgs};
use crate::error::Result;

/// Boolean combination of conditions.
///
/// `and`/`or` wrap each child in parentheses and join them with ` AND ` /
/// ` OR `; `not` renders `(NOT child)`. Bound values follow the children in
/// declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Logical {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Logical {
    #[must_use]
    pub fn and<C: Into<Condition>>(conditions: impl IntoIterator<Item = C>) -> Self {
        Self::And(conditions.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn or<C: Into<Condition>>(conditions: impl IntoIterator<Item = C>) -> Self {
        Self::Or(conditions.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn not(condition: impl Into<Condition>) -> Self {
        Self::Not(Box::new(condition.into()))
    }

    /// Render against `provider`.
    ///
    /// # Errors
    ///
    /// Returns an error if any child fails to render.
    pub fn build_query(&self, provider: &dyn ColumnProvider) -> Result<QueryWithArgs> {
        match self {
            Self::And(children) => join(provider, children, " AND "),
            Self::Or(children) => join(provider, children, " OR "),
            Self::Not(child) => {
                let inner = child.build_query(provider)?;
                Ok(QueryWithArgs::new(format!("(NOT {})", inner.sql), inner.args))
            }
        }
    }
}

fn join(
    provider: &dyn ColumnProvider, children: &[Condition], separator: &str,
) -> Result<QueryWithArgs> {
    let mut parts = Vec::with_capacity(children.len());
    let mut args = Vec::new();

    for child in children {
        let built = child.build_query(provider)?;
        parts.push(format!("({})", built.sql));
        args.extend(built.args);
    }

    Ok(QueryWithArgs::new(parts.join(separator), args))
}
