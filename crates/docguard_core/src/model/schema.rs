//! Record type descriptors.
//!
//! # Responsibility
//! - Name the collection a record type lives in.
//! - Expose the record type's permission table.
//! - Declare reference fields that can be populated.

use crate::model::permissions::PermissionTable;
use std::collections::BTreeMap;

/// Capability every record type handed to stores and services must expose.
pub trait RecordSchema: Send + Sync {
    /// Collection name, also used as the logging tag prefix.
    fn name(&self) -> &str;

    /// Field visibility declaration for this record type.
    fn permissions(&self) -> &PermissionTable;

    /// Collection referenced by `field`, when `field` holds document ids.
    fn reference_target(&self, _field: &str) -> Option<&str> {
        None
    }
}

/// Builder-style record type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    name: String,
    permissions: PermissionTable,
    references: BTreeMap<String, String>,
}

impl SchemaDescriptor {
    pub fn new(name: impl Into<String>, permissions: PermissionTable) -> Self {
        Self {
            name: name.into(),
            permissions,
            references: BTreeMap::new(),
        }
    }

    /// Declares that `field` holds ids of documents in `collection`.
    pub fn with_reference(mut self, field: impl Into<String>, collection: impl Into<String>) -> Self {
        self.references.insert(field.into(), collection.into());
        self
    }
}

impl RecordSchema for SchemaDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    fn reference_target(&self, field: &str) -> Option<&str> {
        self.references.get(field).map(String::as_str)
    }
}
