//! Entity schema metadata and its process-wide registry.
//!
//! Metadata is resolved once per entity type, validated, and shared. It
//! normally comes from the constants the `entity!` macro generates; a type
//! can instead be given explicit metadata with [`register`], e.g. when its
//! table name is only known at runtime.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use crate::entity::Entity;
use crate::error::Result;
use crate::schema_error;

static REGISTRY: LazyLock<RwLock<HashMap<TypeId, Arc<EntityMetadata>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Table, columns and keys of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    pub table: String,
    /// Columns in declared order.
    pub columns: Vec<String>,
    /// Primary key columns in key order.
    pub primary_key: Vec<String>,
    /// Columns generated by the database on insert.
    pub auto_increment: Vec<String>,
}

impl EntityMetadata {
    /// Build and validate metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`](crate::Error::Schema) if the table name,
    /// columns or primary key are missing, columns repeat, or a key or
    /// generated column is not a declared column.
    pub fn new<S: Into<String>>(
        table: impl Into<String>, columns: impl IntoIterator<Item = S>,
        primary_key: impl IntoIterator<Item = S>, auto_increment: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let metadata = Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            primary_key: primary_key.into_iter().map(Into::into).collect(),
            auto_increment: auto_increment.into_iter().map(Into::into).collect(),
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Metadata declared by `E`'s constants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`](crate::Error::Schema) if the declaration is
    /// inconsistent.
    pub fn of<E: Entity>() -> Result<Self> {
        Self::new(
            E::TABLE,
            E::COLUMNS.iter().copied(),
            E::PRIMARY_KEY.iter().copied(),
            E::AUTO_INCREMENT.iter().copied(),
        )
    }

    #[must_use]
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|pk| pk == column)
    }

    fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(schema_error!("entity has no table name"));
        }
        if self.columns.is_empty() {
            return Err(schema_error!("table `{}` has no columns", self.table));
        }
        if self.primary_key.is_empty() {
            return Err(schema_error!("table `{}` did not have primary key", self.table));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(schema_error!("table `{}` declares column `{dup}` twice", self.table));
        }

        let unknown = self
            .primary_key
            .iter()
            .chain(&self.auto_increment)
            .find(|c| !seen.contains(c.as_str()));
        if let Some(col) = unknown {
            return Err(schema_error!("table `{}` has no column `{col}`", self.table));
        }

        Ok(())
    }
}

/// Resolve (and cache) the metadata for `E`.
///
/// # Errors
///
/// Returns [`Error::Schema`](crate::Error::Schema) if `E`'s declaration is
/// inconsistent.
pub fn metadata<E: Entity>() -> Result<Arc<EntityMetadata>> {
    let key = TypeId::of::<E>();
    if let Some(found) = REGISTRY.read().get(&key) {
        return Ok(Arc::clone(found));
    }

    let resolved = Arc::new(EntityMetadata::of::<E>()?);
    tracing::debug!(table = %resolved.table, columns = resolved.columns.len(), "resolved entity metadata");

    let mut registry = REGISTRY.write();
    Ok(Arc::clone(registry.entry(key).or_insert(resolved)))
}

/// Use `metadata` for `E` from now on, replacing anything resolved before.
///
/// # Errors
///
/// Returns [`Error::Schema`](crate::Error::Schema) if `metadata` is
/// inconsistent.
pub fn register<E: Entity>(metadata: EntityMetadata) -> Result<Arc<EntityMetadata>> {
    metadata.validate()?;
    let metadata = Arc::new(metadata);
    REGISTRY.write().insert(TypeId::of::<E>(), Arc::clone(&metadata));
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn valid_metadata() {
        let meta = EntityMetadata::new("users", ["id", "name"], ["id"], ["id"]).unwrap();
        assert!(meta.is_primary_key("id"));
        assert!(!meta.is_primary_key("name"));
    }

    #[test]
    fn rejects_missing_parts() {
        let err = EntityMetadata::new("", ["id"], ["id"], []).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));

        let err = EntityMetadata::new("t", Vec::<&str>::new(), vec![], vec![]).unwrap_err();
        assert!(err.to_string().contains("no columns"));

        let err = EntityMetadata::new("t", ["a"], [], []).unwrap_err();
        assert!(err.to_string().contains("did not have primary key"));
    }

    #[test]
    fn rejects_inconsistent_columns() {
        let err = EntityMetadata::new("t", ["a", "a"], ["a"], []).unwrap_err();
        assert!(err.to_string().contains("twice"));

        let err = EntityMetadata::new("t", ["a"], ["b"], []).unwrap_err();
        assert!(err.to_string().contains("no column `b`"));

        let err = EntityMetadata::new("t", ["a"], ["a"], ["c"]).unwrap_err();
        assert!(err.to_string().contains("no column `c`"));
    }
}
