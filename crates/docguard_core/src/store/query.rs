//! Query, update and population payloads shared by store adapters.
//!
//! # Invariants
//! - Queries are conjunctions of top-level equality conditions.
//! - Updates never touch `_id`.
//! - Population only rewrites fields the schema declares as references.

use crate::model::document::{
    document_id, new_document_id, set_document_id, Document, DocumentId, ID_FIELD,
};
use crate::model::schema::RecordSchema;
use crate::store::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Equality conditions; an empty query matches every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query {
    conditions: Document,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    pub fn by_id(id: DocumentId) -> Self {
        Self::eq(ID_FIELD, id.to_string())
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), value.into());
        self
    }

    pub fn conditions(&self) -> &Document {
        &self.conditions
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| document.get(field).unwrap_or(&Value::Null) == expected)
    }
}

impl From<Document> for Query {
    fn from(conditions: Document) -> Self {
        Self { conditions }
    }
}

/// Field assignments (`$set`) and removals (`$unset`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Update {
    #[serde(rename = "$set", default, skip_serializing_if = "Document::is_empty")]
    pub set: Document,
    #[serde(rename = "$unset", default, skip_serializing_if = "Vec::is_empty")]
    pub unset: Vec<String>,
}

impl Update {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_set(field, value)
    }

    pub fn and_set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    pub fn and_unset(mut self, field: impl Into<String>) -> Self {
        self.unset.push(field.into());
        self
    }

    /// Rejects empty updates and updates touching `_id`.
    pub fn validate(&self) -> StoreResult<()> {
        if self.set.is_empty() && self.unset.is_empty() {
            return Err(StoreError::InvalidUpdate("update has no operations".to_string()));
        }
        if self.set.contains_key(ID_FIELD) || self.unset.iter().any(|field| field == ID_FIELD) {
            return Err(StoreError::InvalidUpdate(format!("`{ID_FIELD}` is immutable")));
        }
        Ok(())
    }

    /// Applies this update to `document`; returns whether anything changed.
    pub fn apply(&self, document: &mut Document) -> StoreResult<bool> {
        self.validate()?;
        let mut changed = false;
        for (field, value) in &self.set {
            if document.get(field) != Some(value) {
                document.insert(field.clone(), value.clone());
                changed = true;
            }
        }
        for field in &self.unset {
            changed |= document.remove(field).is_some();
        }
        Ok(changed)
    }
}

/// ORM update options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Insert a document built from the query and `$set` when nothing matches.
    #[serde(default)]
    pub upsert: bool,
    /// `find*AndUpdate` returns the updated document instead of the original.
    #[serde(default, rename = "new")]
    pub return_updated: bool,
    /// `update` modifies every match instead of the first one.
    #[serde(default)]
    pub multi: bool,
}

/// Outcome of a bulk `update`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSummary {
    pub matched: u64,
    pub modified: u64,
    pub upserted_id: Option<DocumentId>,
}

/// Reference fields to expand, parsed from a space-delimited path list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Populations {
    paths: Vec<String>,
}

impl Populations {
    pub fn none() -> Self {
        Self::default()
    }

    /// Parses `"author tags"` style path lists; blank input means none.
    pub fn parse(paths: &str) -> Self {
        let mut parsed: Vec<String> = Vec::new();
        for path in paths.split_whitespace() {
            if !parsed.iter().any(|existing| existing == path) {
                parsed.push(path.to_string());
            }
        }
        Self { paths: parsed }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Fails with [`StoreError::UnknownReference`] for a path `schema` does
    /// not declare as a reference.
    pub fn validate(&self, schema: &dyn RecordSchema) -> StoreResult<()> {
        match self
            .paths
            .iter()
            .find(|path| schema.reference_target(path).is_none())
        {
            Some(path) => Err(StoreError::UnknownReference {
                collection: schema.name().to_string(),
                field: path.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl From<&str> for Populations {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Replaces reference ids in `document` with the referenced documents.
///
/// Single references resolve to `null` when the target is missing; missing
/// entries in reference arrays are dropped.
pub(crate) fn populate<F>(
    document: &mut Document,
    schema: &dyn RecordSchema,
    populations: &Populations,
    mut lookup: F,
) -> StoreResult<()>
where
    F: FnMut(&str, DocumentId) -> StoreResult<Option<Document>>,
{
    for path in populations.paths() {
        let target = schema
            .reference_target(path)
            .ok_or_else(|| StoreError::UnknownReference {
                collection: schema.name().to_string(),
                field: path.clone(),
            })?;

        let Some(value) = document.get_mut(path) else {
            continue;
        };

        match value {
            Value::String(raw) => {
                let resolved = match Uuid::parse_str(raw) {
                    Ok(id) => lookup(target, id)?,
                    Err(_) => None,
                };
                *value = resolved.map_or(Value::Null, Value::Object);
            }
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items.iter() {
                    let Some(id) = item.as_str().and_then(|raw| Uuid::parse_str(raw).ok()) else {
                        continue;
                    };
                    if let Some(found) = lookup(target, id)? {
                        resolved.push(Value::Object(found));
                    }
                }
                *items = resolved;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Validates or assigns the identity of a document about to be inserted.
pub(crate) fn prepare_insert(mut document: Document) -> StoreResult<(DocumentId, Document)> {
    let id = match document.get(ID_FIELD) {
        None => {
            let id = new_document_id();
            set_document_id(&mut document, id);
            id
        }
        Some(_) => document_id(&document).ok_or_else(|| {
            StoreError::InvalidDocument(format!("`{ID_FIELD}` must be a UUID string"))
        })?,
    };
    Ok((id, document))
}

/// Builds the document inserted by an upsert: query equality fields, then `$set`.
pub(crate) fn upsert_seed(query: &Query, update: &Update) -> StoreResult<Document> {
    let mut seed = query.conditions().clone();
    update.validate()?;
    for (field, value) in &update.set {
        seed.insert(field.clone(), value.clone());
    }
    Ok(seed)
}
