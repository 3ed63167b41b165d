use docguard_core::db::migrations::latest_version;
use docguard_core::db::{open_db, open_db_in_memory, DbError};
use docguard_core::store::{EmbeddedStore, SqliteCollections};
use docguard_core::{
    Document, DocumentStore, PermissionTable, Populations, Projection, Query, SchemaDescriptor,
    SqliteDocumentStore, StoreError, Update, UpdateOptions,
};
use rusqlite::Connection;
use serde_json::{json, Value};

fn notes() -> SchemaDescriptor {
    SchemaDescriptor::new(
        "Note",
        PermissionTable::builder().public("_id").public("body").build().unwrap(),
    )
    .with_reference("owner", "Owner")
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "documents");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docguard.db");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(&first), latest_version());
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    assert_table_exists(&second, "documents");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path) {
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema must be rejected"),
    }
}

#[tokio::test]
async fn documents_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");

    let created = {
        let store = SqliteDocumentStore::open(&path).unwrap();
        store
            .create(&notes(), doc(json!({"body": "first"})), &Populations::none())
            .await
            .unwrap()
    };

    let store = SqliteDocumentStore::open(&path).unwrap();
    let found = store
        .find(&notes(), &Query::all(), &Populations::none(), &Projection::all())
        .await
        .unwrap();
    assert_eq!(found, vec![created]);
}

#[tokio::test]
async fn crud_operations_roundtrip_through_sqlite() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let schema = notes();
    let none = Populations::none();

    let first = store
        .create(&schema, doc(json!({"body": "a", "tag": "x"})), &none)
        .await
        .unwrap();
    store
        .create(&schema, doc(json!({"body": "b", "tag": "x"})), &none)
        .await
        .unwrap();
    let first_id = first["_id"].as_str().unwrap().parse().unwrap();

    let summary = store
        .update(
            &schema,
            &Query::eq("tag", "x"),
            &Update::set("tag", "y"),
            &UpdateOptions {
                multi: true,
                ..UpdateOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!((summary.matched, summary.modified), (2, 2));

    let projected = store
        .find_by_id(&schema, first_id, &none, &Projection::excluding(["tag"]))
        .await
        .unwrap()
        .unwrap();
    assert!(!projected.contains_key("tag"));

    let updated = store
        .find_by_id_and_update(
            &schema,
            first_id,
            &Update::set("body", "a2"),
            &UpdateOptions {
                return_updated: true,
                ..UpdateOptions::default()
            },
            &none,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated["body"], json!("a2"));

    let removed = store
        .find_by_id_and_remove(&schema, first_id, &none)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removed["body"], json!("a2"));

    let remaining = store
        .find(&schema, &Query::all(), &none, &Projection::all())
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["body"], json!("b"));
}

#[tokio::test]
async fn population_reads_referenced_collection() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let owners = SchemaDescriptor::new("Owner", PermissionTable::default());
    let owner = store
        .create(&owners, doc(json!({"name": "o"})), &Populations::none())
        .await
        .unwrap();

    let note = store
        .create(
            &notes(),
            doc(json!({"body": "n", "owner": owner["_id"].clone()})),
            &Populations::parse("owner"),
        )
        .await
        .unwrap();
    assert_eq!(note["owner"], Value::Object(owner));
}

#[tokio::test]
async fn duplicate_and_malformed_ids_are_rejected() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let created = store
        .create(&notes(), doc(json!({"body": "a"})), &Populations::none())
        .await
        .unwrap();

    let err = store
        .create(&notes(), created.clone(), &Populations::none())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateId(_)));

    let err = store
        .create(&notes(), doc(json!({"_id": 7})), &Populations::none())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidDocument(_)));
}

#[tokio::test]
async fn failed_multi_update_rolls_back_earlier_rows() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_second_note
         BEFORE UPDATE ON documents
         WHEN json_extract(OLD.body, '$.body') = 'b'
         BEGIN
            SELECT RAISE(ABORT, 'rejected');
         END;",
    )
    .unwrap();
    let store = EmbeddedStore::with_backend(SqliteCollections::new(conn));
    let schema = notes();
    let none = Populations::none();
    for body in ["a", "b"] {
        store
            .create(&schema, doc(json!({"body": body, "tag": "x"})), &none)
            .await
            .unwrap();
    }

    let err = store
        .update(
            &schema,
            &Query::eq("tag", "x"),
            &Update::set("tag", "y"),
            &UpdateOptions {
                multi: true,
                ..UpdateOptions::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Db(_)), "unexpected error: {err}");

    let tags: Vec<Value> = store
        .find(&schema, &Query::all(), &none, &Projection::all())
        .await
        .unwrap()
        .into_iter()
        .map(|note| note["tag"].clone())
        .collect();
    assert_eq!(tags, vec![json!("x"), json!("x")]);

    let summary = store
        .update(
            &schema,
            &Query::eq("body", "a"),
            &Update::set("tag", "z"),
            &UpdateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!((summary.matched, summary.modified), (1, 1));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
