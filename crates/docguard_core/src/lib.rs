//! Role-aware CRUD helpers over a document store.
//! Every record leaving this crate has passed the field permission filter.

pub mod config;
pub mod db;
pub mod filter;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use config::{ConfigError, CrudConfig, ErrorMode};
pub use filter::projection::{excluded_fields, Projection};
pub use filter::result_filter::{filter_document, filter_value, is_field_visible, Filterable};
pub use logging::{
    default_log_level, init_logging, logging_status, ActivityLog, CoreActivityLog, LoggingError,
};
pub use model::context::{ActiveUser, RequestContext, ADMIN_ROLE, PUBLIC_ROLE};
pub use model::document::{Document, DocumentId, ID_FIELD};
pub use model::permissions::{PermissionError, PermissionTable, PermissionTableBuilder};
pub use model::schema::{RecordSchema, SchemaDescriptor};
pub use service::crud_service::{CrudError, CrudResult, CrudService, FindOptions, Outcome};
pub use service::response::{ErrorCode, ErrorResponder, ErrorResponse, ResponseRecorder};
pub use store::{
    DocumentStore, MemoryDocumentStore, Populations, Query, SqliteDocumentStore, StoreError,
    StoreResult, Update, UpdateOptions, UpdateSummary,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
