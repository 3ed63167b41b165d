//! Static field permission declarations.
//!
//! # Responsibility
//! - Declare, per record type, which roles may view each field.
//! - Reject malformed declarations at build/parse time.
//!
//! # Invariants
//! - A table is immutable after construction.
//! - Field names are non-empty and are never operator keys (`$set`, `$in`).
//! - Roles are non-empty strings; `"null"` marks a field as public.

use crate::model::context::PUBLIC_ROLE;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static OPERATOR_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$[A-Za-z_]\w*$").expect("valid operator key regex"));

fn is_valid_field_name(field: &str) -> bool {
    !field.is_empty() && !OPERATOR_KEY_RE.is_match(field)
}

/// Invalid permission declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    InvalidFieldName(String),
    EmptyRole { field: String },
}

impl Display for PermissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFieldName(name) => write!(f, "invalid permission field name `{name}`"),
            Self::EmptyRole { field } => {
                write!(f, "permission for field `{field}` declares an empty role")
            }
        }
    }
}

impl Error for PermissionError {}

/// Field name -> roles allowed to view it.
///
/// Fields absent from the table are hidden from everyone except `admin`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct PermissionTable {
    fields: BTreeMap<String, Vec<String>>,
}

impl PermissionTable {
    /// Starts an empty declaration.
    pub fn builder() -> PermissionTableBuilder {
        PermissionTableBuilder::default()
    }

    /// Allow-list declared for `field`, if any.
    pub fn allowed_roles(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Whether `field` is declared and contains the public role.
    pub fn is_public(&self, field: &str) -> bool {
        self.allowed_roles(field)
            .is_some_and(|roles| roles.iter().any(|role| role == PUBLIC_ROLE))
    }

    /// Declared field names in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for PermissionTable {
    type Error = PermissionError;

    fn try_from(value: BTreeMap<String, Vec<String>>) -> Result<Self, Self::Error> {
        value
            .into_iter()
            .fold(PermissionTable::builder(), |builder, (field, roles)| {
                builder.field(field, roles)
            })
            .build()
    }
}

impl From<PermissionTable> for BTreeMap<String, Vec<String>> {
    fn from(value: PermissionTable) -> Self {
        value.fields
    }
}

/// Collects field declarations and validates them once in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct PermissionTableBuilder {
    entries: Vec<(String, Vec<String>)>,
}

impl PermissionTableBuilder {
    /// Declares the roles allowed to view `field`.
    ///
    /// Declaring the same field twice keeps the last declaration.
    pub fn field<I, S>(mut self, field: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .push((field.into(), roles.into_iter().map(Into::into).collect()));
        self
    }

    /// Declares `field` as visible to everyone.
    pub fn public(self, field: impl Into<String>) -> Self {
        self.field(field, [PUBLIC_ROLE])
    }

    pub fn build(self) -> Result<PermissionTable, PermissionError> {
        let mut fields = BTreeMap::new();
        for (field, roles) in self.entries {
            if !is_valid_field_name(&field) {
                return Err(PermissionError::InvalidFieldName(field));
            }
            if roles.iter().any(|role| role.trim().is_empty()) {
                return Err(PermissionError::EmptyRole { field });
            }
            fields.insert(field, roles);
        }
        Ok(PermissionTable { fields })
    }
}

#[cfg(test)]
mod tests {
    use super::{PermissionError, PermissionTable};

    #[test]
    fn builder_declares_public_and_restricted_fields() {
        let table = PermissionTable::builder()
            .public("name")
            .field("ssn", ["admin"])
            .field("email", ["user", "support"])
            .build()
            .expect("valid table");

        assert!(table.is_public("name"));
        assert!(!table.is_public("ssn"));
        assert_eq!(
            table.allowed_roles("email"),
            Some(&["user".to_string(), "support".to_string()][..])
        );
        assert_eq!(table.allowed_roles("missing"), None);
        assert_eq!(table.fields().collect::<Vec<_>>(), vec!["email", "name", "ssn"]);
    }

    #[test]
    fn public_role_counts_anywhere_in_allow_list() {
        let table = PermissionTable::builder()
            .field("bio", ["user", "null"])
            .build()
            .expect("valid table");
        assert!(table.is_public("bio"));
    }

    #[test]
    fn rejects_invalid_field_names() {
        let err = PermissionTable::builder()
            .field("", ["null"])
            .build()
            .expect_err("empty field must fail");
        assert_eq!(err, PermissionError::InvalidFieldName(String::new()));

        let err = PermissionTable::builder()
            .field("$set", ["null"])
            .build()
            .expect_err("operator key must fail");
        assert!(matches!(err, PermissionError::InvalidFieldName(_)));
    }

    #[test]
    fn accepts_any_attribute_name_that_is_not_an_operator() {
        let table = PermissionTable::builder()
            .public("first-name")
            .public("has space")
            .public("2fa")
            .public("address.city")
            .build()
            .expect("valid table");
        assert_eq!(table.len(), 4);
        assert!(table.is_public("first-name"));
        assert!(table.is_public("has space"));
    }

    #[test]
    fn rejects_empty_roles() {
        let err = PermissionTable::builder()
            .field("name", [" "])
            .build()
            .expect_err("blank role must fail");
        assert_eq!(
            err,
            PermissionError::EmptyRole {
                field: "name".to_string()
            }
        );
    }

    #[test]
    fn deserializes_from_json_object() {
        let table: PermissionTable =
            serde_json::from_str(r#"{"name": ["null"], "ssn": ["admin"], "_id": ["null"]}"#)
                .expect("valid json table");
        assert_eq!(table.len(), 3);
        assert!(table.is_public("_id"));

        let hyphenated: PermissionTable =
            serde_json::from_str(r#"{"first-name": ["null"]}"#).expect("hyphenated field");
        assert!(hyphenated.is_public("first-name"));
        assert_eq!(
            serde_json::to_value(&hyphenated).expect("serialize"),
            serde_json::json!({"first-name": ["null"]})
        );

        let err = serde_json::from_str::<PermissionTable>(r#"{"$where": ["null"]}"#)
            .expect_err("operator key must fail");
        assert!(err.to_string().contains("$where"));
    }
}
