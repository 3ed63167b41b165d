//! Generic CRUD service over a document store.
//!
//! # Responsibility
//! - Log every invocation as `<schema>.<operation>` and every success as
//!   `<schema>.<operation>.success`.
//! - Delegate to the store with exactly one request per call.
//! - Filter successful results for the actor's role before returning them.
//!
//! # Invariants
//! - Store failures are logged, then either answered through the responder
//!   (`ErrorMode::Handle`) or returned unchanged (`ErrorMode::Propagate`).
//! - No retries and no partial results.

use crate::config::{CrudConfig, ErrorMode};
use crate::filter::projection::Projection;
use crate::filter::result_filter::Filterable;
use crate::logging::{ActivityLog, CoreActivityLog};
use crate::model::context::RequestContext;
use crate::model::document::{Document, DocumentId};
use crate::model::permissions::PermissionTable;
use crate::model::schema::RecordSchema;
use crate::service::response::{ErrorCode, ErrorResponder, ResponseRecorder};
use crate::store::{
    DocumentStore, Populations, Query, StoreError, StoreResult, Update, UpdateOptions,
    UpdateSummary,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CrudResult<T> = Result<T, CrudError>;

/// Failure returned to callers in `ErrorMode::Propagate`.
#[derive(Debug)]
pub enum CrudError {
    Store(StoreError),
}

impl Display for CrudError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CrudError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for CrudError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// How a CRUD call settled without an `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Filtered store result.
    Resolved(T),
    /// The store failed and the request was answered with `code`.
    Handled(ErrorCode),
}

impl<T> Outcome<T> {
    pub fn resolved(self) -> Option<T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Handled(_) => None,
        }
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled(_))
    }
}

impl Filterable for UpdateSummary {
    fn filter_fields(&mut self, _table: &PermissionTable, _role: &str) {}
}

/// Read options for `find` / `find_by_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub populate: Populations,
    /// Extra attributes the caller does not want returned.
    pub exclude: Vec<String>,
}

impl FindOptions {
    pub fn populate(paths: &str) -> Self {
        Self {
            populate: Populations::parse(paths),
            exclude: Vec::new(),
        }
    }

    pub fn excluding<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(fields.into_iter().map(Into::into));
        self
    }
}

/// CRUD entry points shared by every record type.
pub struct CrudService<S, L = CoreActivityLog, R = ResponseRecorder> {
    store: S,
    log: L,
    responder: R,
    config: CrudConfig,
}

impl<S: DocumentStore> CrudService<S> {
    /// Service logging through `log` and recording error responses in memory.
    pub fn with_defaults(store: S, config: CrudConfig) -> Self {
        Self::new(store, CoreActivityLog, ResponseRecorder::new(), config)
    }
}

impl<S, L, R> CrudService<S, L, R>
where
    S: DocumentStore,
    L: ActivityLog,
    R: ErrorResponder,
{
    pub fn new(store: S, log: L, responder: R, config: CrudConfig) -> Self {
        Self {
            store,
            log,
            responder,
            config,
        }
    }

    pub fn config(&self) -> &CrudConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn responder(&self) -> &R {
        &self.responder
    }

    /// Creates one document, optionally populating reference fields.
    ///
    /// The invocation log records attribute names only; values are logged
    /// after filtering for the actor.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        schema: &dyn RecordSchema,
        document: Document,
        populations: &Populations,
    ) -> CrudResult<Outcome<Document>> {
        let tag = operation_tag(schema, "create");
        self.log.info(&tag, &json!({ "fields": document.keys().collect::<Vec<_>>() }));
        let result = self.store.create(schema, document, populations).await;
        self.settle(ctx, schema, &tag, result)
    }

    /// Lists documents matching `query`.
    ///
    /// Declared fields hidden from the actor, plus `options.exclude`, are
    /// projected away by the store before the result filter runs.
    pub async fn find(
        &self,
        ctx: &RequestContext,
        schema: &dyn RecordSchema,
        query: &Query,
        options: &FindOptions,
    ) -> CrudResult<Outcome<Vec<Document>>> {
        let tag = operation_tag(schema, "find");
        self.log.info(&tag, &to_payload(query));
        let projection = Projection::for_role(schema.permissions(), ctx.role(), &options.exclude);
        let result = self
            .store
            .find(schema, query, &options.populate, &projection)
            .await;
        self.settle(ctx, schema, &tag, result)
    }

    pub async fn find_one(
        &self,
        ctx: &RequestContext,
        schema: &dyn RecordSchema,
        query: &Query,
        populations: &Populations,
    ) -> CrudResult<Outcome<Option<Document>>> {
        let tag = operation_tag(schema, "findOne");
        self.log.info(&tag, &to_payload(query));
        let result = self.store.find_one(schema, query, populations).await;
        self.settle(ctx, schema, &tag, result)
    }

    pub async fn find_by_id(
        &self,
        ctx: &RequestContext,
        schema: &dyn RecordSchema,
        id: DocumentId,
        options: &FindOptions,
    ) -> CrudResult<Outcome<Option<Document>>> {
        let tag = operation_tag(schema, "findById");
        self.log.info(&tag, &json!(id.to_string()));
        let projection = Projection::for_role(schema.permissions(), ctx.role(), &options.exclude);
        let result = self
            .store
            .find_by_id(schema, id, &options.populate, &projection)
            .await;
        self.settle(ctx, schema, &tag, result)
    }

    /// Bulk update; resolves match/modify counts rather than documents.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        schema: &dyn RecordSchema,
        query: &Query,
        update: &Update,
        options: &UpdateOptions,
    ) -> CrudResult<Outcome<UpdateSummary>> {
        let tag = operation_tag(schema, "update");
        self.log.info(
            &tag,
            &json!({"query": to_payload(query), "update": to_payload(update), "options": to_payload(options)}),
        );
        let result = self.store.update(schema, query, update, options).await;
        self.settle(ctx, schema, &tag, result)
    }

    pub async fn find_one_and_update(
        &self,
        ctx: &RequestContext,
        schema: &dyn RecordSchema,
        query: &Query,
        update: &Update,
        options: &UpdateOptions,
        populations: &Populations,
    ) -> CrudResult<Outcome<Option<Document>>> {
        let tag = operation_tag(schema, "findOneAndUpdate");
        self.log.info(
            &tag,
            &json!({"query": to_payload(query), "update": to_payload(update)}),
        );
        let result = self
            .store
            .find_one_and_update(schema, query, update, options, populations)
            .await;
        self.settle(ctx, schema, &tag, result)
    }

    pub async fn find_by_id_and_update(
        &self,
        ctx: &RequestContext,
        schema: &dyn RecordSchema,
        id: DocumentId,
        update: &Update,
        options: &UpdateOptions,
        populations: &Populations,
    ) -> CrudResult<Outcome<Option<Document>>> {
        let tag = operation_tag(schema, "findByIdAndUpdate");
        self.log.info(
            &tag,
            &json!({"id": id.to_string(), "update": to_payload(update)}),
        );
        let result = self
            .store
            .find_by_id_and_update(schema, id, update, options, populations)
            .await;
        self.settle(ctx, schema, &tag, result)
    }

    /// Removes a document by id and resolves the removed document.
    pub async fn find_by_id_and_remove(
        &self,
        ctx: &RequestContext,
        schema: &dyn RecordSchema,
        id: DocumentId,
        populations: &Populations,
    ) -> CrudResult<Outcome<Option<Document>>> {
        let tag = operation_tag(schema, "findByIdAndRemove");
        self.log.info(&tag, &json!(id.to_string()));
        let result = self
            .store
            .find_by_id_and_remove(schema, id, populations)
            .await;
        self.settle(ctx, schema, &tag, result)
    }

    fn settle<T>(
        &self,
        ctx: &RequestContext,
        schema: &dyn RecordSchema,
        tag: &str,
        result: StoreResult<T>,
    ) -> CrudResult<Outcome<T>>
    where
        T: Filterable + Serialize,
    {
        match result {
            Ok(mut value) => {
                value.filter_fields(schema.permissions(), ctx.role());
                self.log.info(&format!("{tag}.success"), &to_payload(&value));
                Ok(Outcome::Resolved(value))
            }
            Err(err) => {
                self.log
                    .error("internal server error", &json!(err.to_string()));
                match self.config.error_mode {
                    ErrorMode::Handle => {
                        let code = ErrorCode::InternalServerError;
                        self.responder.error(ctx, code);
                        Ok(Outcome::Handled(code))
                    }
                    ErrorMode::Propagate => Err(CrudError::Store(err)),
                }
            }
        }
    }
}

fn operation_tag(schema: &dyn RecordSchema, operation: &str) -> String {
    format!("{}.{operation}", schema.name())
}

fn to_payload<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
