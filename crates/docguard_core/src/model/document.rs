//! Document record model.
//!
//! # Responsibility
//! - Represent fetched records as attribute name -> JSON value maps.
//! - Provide identity helpers around the reserved `_id` attribute.
//!
//! # Invariants
//! - `_id` is serialized as a hyphenated UUID string.

use serde_json::{Map, Value};
use uuid::Uuid;

/// Stable identifier for every stored document.
pub type DocumentId = Uuid;

/// One record: attribute name to value.
pub type Document = Map<String, Value>;

/// Reserved attribute holding the document identity.
pub const ID_FIELD: &str = "_id";

/// Generates a new document identifier.
pub fn new_document_id() -> DocumentId {
    Uuid::new_v4()
}

/// Reads the document identity from `_id`.
///
/// Returns `None` when the attribute is missing or is not a UUID string.
pub fn document_id(document: &Document) -> Option<DocumentId> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|value| Uuid::parse_str(value).ok())
}

/// Stores `id` under `_id`, replacing any previous value.
pub fn set_document_id(document: &mut Document, id: DocumentId) {
    document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
}

/// Converts a JSON value into a document when it is an object.
pub fn into_document(value: Value) -> Option<Document> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
