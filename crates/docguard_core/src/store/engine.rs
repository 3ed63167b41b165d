//! Store operations shared by embedded backends.
//!
//! # Invariants
//! - Population paths and updates are validated before any backend write.
//! - Writing operations run inside [`atomically`]; on failure the backend
//!   rolls back every write of that call.

use crate::filter::projection::Projection;
use crate::model::document::{document_id, Document, DocumentId};
use crate::model::schema::RecordSchema;
use crate::store::embedded::CollectionBackend;
use crate::store::query::{
    populate, prepare_insert, upsert_seed, Populations, Query, Update, UpdateOptions,
    UpdateSummary,
};
use crate::store::{StoreError, StoreResult};

pub(crate) fn create<B: CollectionBackend + ?Sized>(
    backend: &mut B,
    schema: &dyn RecordSchema,
    document: Document,
    populations: &Populations,
) -> StoreResult<Document> {
    populations.validate(schema)?;
    let (id, document) = prepare_insert(document)?;
    atomically(backend, |backend| {
        if backend.get(schema.name(), id)?.is_some() {
            return Err(StoreError::DuplicateId(id));
        }
        backend.insert(schema.name(), id, &document)?;
        shape(backend, schema, document, populations, &Projection::all())
    })
}

pub(crate) fn find<B: CollectionBackend + ?Sized>(
    backend: &mut B,
    schema: &dyn RecordSchema,
    query: &Query,
    populations: &Populations,
    projection: &Projection,
) -> StoreResult<Vec<Document>> {
    populations.validate(schema)?;
    let matched: Vec<Document> = backend
        .scan(schema.name())?
        .into_iter()
        .filter(|document| query.matches(document))
        .collect();

    matched
        .into_iter()
        .map(|document| shape(&mut *backend, schema, document, populations, projection))
        .collect()
}

pub(crate) fn find_one<B: CollectionBackend + ?Sized>(
    backend: &mut B,
    schema: &dyn RecordSchema,
    query: &Query,
    populations: &Populations,
) -> StoreResult<Option<Document>> {
    populations.validate(schema)?;
    match first_match(backend, schema, query)? {
        Some(document) => shape(backend, schema, document, populations, &Projection::all()).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn find_by_id<B: CollectionBackend + ?Sized>(
    backend: &mut B,
    schema: &dyn RecordSchema,
    id: DocumentId,
    populations: &Populations,
    projection: &Projection,
) -> StoreResult<Option<Document>> {
    populations.validate(schema)?;
    match backend.get(schema.name(), id)? {
        Some(document) => shape(backend, schema, document, populations, projection).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn update<B: CollectionBackend + ?Sized>(
    backend: &mut B,
    schema: &dyn RecordSchema,
    query: &Query,
    update: &Update,
    options: &UpdateOptions,
) -> StoreResult<UpdateSummary> {
    update.validate()?;
    atomically(backend, |backend| {
        let mut summary = UpdateSummary::default();
        for mut document in backend.scan(schema.name())? {
            if !query.matches(&document) {
                continue;
            }
            summary.matched += 1;
            if update.apply(&mut document)? {
                backend.replace(schema.name(), stored_id(&document)?, &document)?;
                summary.modified += 1;
            }
            if !options.multi {
                break;
            }
        }

        if summary.matched == 0 && options.upsert {
            let (id, seed) = prepare_insert(upsert_seed(query, update)?)?;
            backend.insert(schema.name(), id, &seed)?;
            summary.upserted_id = Some(id);
        }
        Ok(summary)
    })
}

pub(crate) fn find_one_and_update<B: CollectionBackend + ?Sized>(
    backend: &mut B,
    schema: &dyn RecordSchema,
    query: &Query,
    update: &Update,
    options: &UpdateOptions,
    populations: &Populations,
) -> StoreResult<Option<Document>> {
    update.validate()?;
    populations.validate(schema)?;
    atomically(backend, |backend| {
        let Some(original) = first_match(backend, schema, query)? else {
            if !options.upsert {
                return Ok(None);
            }
            let (id, seed) = prepare_insert(upsert_seed(query, update)?)?;
            backend.insert(schema.name(), id, &seed)?;
            if !options.return_updated {
                return Ok(None);
            }
            return shape(backend, schema, seed, populations, &Projection::all()).map(Some);
        };

        let mut updated = original.clone();
        if update.apply(&mut updated)? {
            backend.replace(schema.name(), stored_id(&updated)?, &updated)?;
        }

        let returned = if options.return_updated { updated } else { original };
        shape(backend, schema, returned, populations, &Projection::all()).map(Some)
    })
}

pub(crate) fn find_by_id_and_remove<B: CollectionBackend + ?Sized>(
    backend: &mut B,
    schema: &dyn RecordSchema,
    id: DocumentId,
    populations: &Populations,
) -> StoreResult<Option<Document>> {
    populations.validate(schema)?;
    atomically(backend, |backend| {
        let Some(document) = backend.get(schema.name(), id)? else {
            return Ok(None);
        };
        backend.remove(schema.name(), id)?;
        shape(backend, schema, document, populations, &Projection::all()).map(Some)
    })
}

/// Runs `op` in one backend transaction, rolling back when it fails.
fn atomically<B, T, F>(backend: &mut B, op: F) -> StoreResult<T>
where
    B: CollectionBackend + ?Sized,
    F: FnOnce(&mut B) -> StoreResult<T>,
{
    backend.begin()?;
    let result = op(&mut *backend).and_then(|value| backend.commit().map(|()| value));
    if let Err(err) = &result {
        if let Err(rollback_err) = backend.rollback() {
            log::error!(
                "event=store_rollback module=store status=error error={rollback_err} cause={err}"
            );
        }
    }
    result
}

fn first_match<B: CollectionBackend + ?Sized>(
    backend: &mut B,
    schema: &dyn RecordSchema,
    query: &Query,
) -> StoreResult<Option<Document>> {
    Ok(backend
        .scan(schema.name())?
        .into_iter()
        .find(|document| query.matches(document)))
}

fn shape<B: CollectionBackend + ?Sized>(
    backend: &mut B,
    schema: &dyn RecordSchema,
    mut document: Document,
    populations: &Populations,
    projection: &Projection,
) -> StoreResult<Document> {
    if !populations.is_empty() {
        populate(&mut document, schema, populations, |collection, id| {
            backend.get(collection, id)
        })?;
    }
    projection.apply(&mut document);
    Ok(document)
}

fn stored_id(document: &Document) -> StoreResult<DocumentId> {
    document_id(document)
        .ok_or_else(|| StoreError::InvalidDocument("stored document lacks a valid `_id`".to_string()))
}
