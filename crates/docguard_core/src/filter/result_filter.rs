//! Result filter applied to every successful CRUD outcome.
//!
//! # Invariants
//! - A field survives iff it is public, allowed for the role, or the role is
//!   `admin`.
//! - Sequences keep their order and length.
//! - Absent results pass through unchanged.

use crate::model::context::ADMIN_ROLE;
use crate::model::document::Document;
use crate::model::permissions::PermissionTable;
use serde_json::Value;

/// Whether `role` may view `field` under `table`.
pub fn is_field_visible(table: &PermissionTable, field: &str, role: &str) -> bool {
    if role == ADMIN_ROLE {
        return true;
    }
    match table.allowed_roles(field) {
        Some(_) if table.is_public(field) => true,
        Some(roles) => roles.iter().any(|allowed| allowed == role),
        None => false,
    }
}

/// Removes, in place, every attribute `role` may not view.
pub fn filter_document(document: &mut Document, table: &PermissionTable, role: &str) {
    if role == ADMIN_ROLE {
        return;
    }
    document.retain(|field, _| is_field_visible(table, field, role));
}

/// Filters a raw JSON result: objects are filtered, arrays per element,
/// everything else (including `null`) is left untouched.
pub fn filter_value(value: &mut Value, table: &PermissionTable, role: &str) {
    match value {
        Value::Object(document) => filter_document(document, table, role),
        Value::Array(items) => {
            for item in items {
                if let Value::Object(document) = item {
                    filter_document(document, table, role);
                }
            }
        }
        _ => {}
    }
}

/// Result shapes the filter knows how to walk.
pub trait Filterable {
    fn filter_fields(&mut self, table: &PermissionTable, role: &str);
}

impl Filterable for Document {
    fn filter_fields(&mut self, table: &PermissionTable, role: &str) {
        filter_document(self, table, role);
    }
}

impl<T: Filterable> Filterable for Option<T> {
    fn filter_fields(&mut self, table: &PermissionTable, role: &str) {
        if let Some(inner) = self {
            inner.filter_fields(table, role);
        }
    }
}

impl<T: Filterable> Filterable for Vec<T> {
    fn filter_fields(&mut self, table: &PermissionTable, role: &str) {
        for item in self.iter_mut() {
            item.filter_fields(table, role);
        }
    }
}

impl Filterable for Value {
    fn filter_fields(&mut self, table: &PermissionTable, role: &str) {
        filter_value(self, table, role);
    }
}
