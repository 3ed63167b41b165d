//! Store-side exclusion projections.
//!
//! Lets a store skip transporting declared fields the actor cannot view.
//! Undeclared attributes are not listed; the result filter still removes them.

use crate::filter::result_filter::is_field_visible;
use crate::model::document::Document;
use crate::model::permissions::PermissionTable;
use serde::{Deserialize, Serialize};

/// Attributes a store must drop from returned documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    excluded: Vec<String>,
}

impl Projection {
    /// Projection that keeps every attribute.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn excluding<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut excluded: Vec<String> = Vec::new();
        for field in fields {
            let field = field.into();
            if !excluded.contains(&field) {
                excluded.push(field);
            }
        }
        Self { excluded }
    }

    /// Projection for `role`, plus any caller-requested exclusions.
    pub fn for_role(table: &PermissionTable, role: &str, requested: &[String]) -> Self {
        Self::excluding(excluded_fields(table, role, requested))
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }

    pub fn apply(&self, document: &mut Document) {
        for field in &self.excluded {
            document.remove(field);
        }
    }
}

/// Declared fields `role` may not view, followed by `requested` exclusions.
///
/// The output contains no duplicates and keeps declaration order first.
pub fn excluded_fields(table: &PermissionTable, role: &str, requested: &[String]) -> Vec<String> {
    let mut excluded: Vec<String> = table
        .fields()
        .filter(|field| !is_field_visible(table, field, role))
        .map(str::to_string)
        .collect();

    for field in requested {
        if !excluded.contains(field) {
            excluded.push(field.clone());
        }
    }
    excluded
}

#[cfg(test)]
mod tests {
    use super::{excluded_fields, Projection};
    use crate::model::document::into_document;
    use crate::model::permissions::PermissionTable;
    use serde_json::json;

    fn table() -> PermissionTable {
        PermissionTable::builder()
            .public("name")
            .field("ssn", ["admin"])
            .field("email", ["user"])
            .build()
            .expect("valid table")
    }

    #[test]
    fn lists_hidden_declared_fields_for_role() {
        assert_eq!(excluded_fields(&table(), "null", &[]), vec!["email", "ssn"]);
        assert_eq!(excluded_fields(&table(), "user", &[]), vec!["ssn"]);
        assert!(excluded_fields(&table(), "admin", &[]).is_empty());
    }

    #[test]
    fn appends_requested_exclusions_without_duplicates() {
        let requested = vec!["ssn".to_string(), "name".to_string()];
        assert_eq!(excluded_fields(&table(), "user", &requested), vec!["ssn", "name"]);
    }

    #[test]
    fn apply_removes_excluded_attributes() {
        let projection = Projection::for_role(&table(), "user", &[]);
        let mut document =
            into_document(json!({"name": "A", "ssn": "1", "email": "e"})).expect("object");
        projection.apply(&mut document);
        assert_eq!(serde_json::Value::Object(document), json!({"name": "A", "email": "e"}));
        assert!(Projection::all().is_empty());
    }
}
