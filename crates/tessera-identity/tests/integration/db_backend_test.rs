use std::sync::Arc;

use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use serde_json::json;

use tessera_identity::{
    ContextOptions, DbDocumentBackend, DocumentBackend, DocumentFilter, IdentityContext,
    IdentityError, StoredDocument, UserClaimStore, UserEmailStore, UserStore, WriteKind, WriteOp,
};
use tessera_domain::Claim;
use tessera_identity_migration::Migrator;
use tessera_testing::shapes::{TestShapes, test_user};

async fn sqlite() -> DbDocumentBackend {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // One connection, or every pool member would see its own empty database.
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    DbDocumentBackend { db }
}

fn document(id: &str, stamp: &str) -> StoredDocument {
    StoredDocument {
        id: id.to_owned(),
        body: json!({ "id": id, "stamp": stamp }),
        stamp: Some(stamp.to_owned()),
    }
}

fn insert(collection: &str, document: StoredDocument) -> WriteOp {
    WriteOp {
        collection: collection.to_owned(),
        kind: WriteKind::Insert(document),
    }
}

#[tokio::test]
async fn should_insert_and_scan_documents_per_collection() {
    let backend = sqlite().await;
    backend
        .write(vec![
            insert("users", document("a1", "s1")),
            insert("users", document("b2", "s1")),
            insert("roles", document("a1", "s1")),
        ])
        .await
        .unwrap();

    let users = backend.scan("users").await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(backend.scan("roles").await.unwrap().len(), 1);

    let found = backend.find("users", "b2").await.unwrap().unwrap();
    assert_eq!(found, document("b2", "s1"));
    assert!(backend.find("users", "c3").await.unwrap().is_none());
}

fn ids(documents: Vec<StoredDocument>) -> Vec<String> {
    documents.into_iter().map(|d| d.id).collect()
}

#[tokio::test]
async fn should_select_documents_by_field_on_the_database() {
    let backend = sqlite().await;
    let user = |id: &str, email: &str, roles: serde_json::Value, claims: serde_json::Value| {
        insert(
            "users",
            StoredDocument {
                id: id.to_owned(),
                body: json!({
                    "id": id,
                    "normalized_email": email,
                    "roles": roles,
                    "claims": claims,
                }),
                stamp: None,
            },
        )
    };
    backend
        .write(vec![
            user(
                "a1",
                "A@X.COM",
                json!(["rid1", "rid2"]),
                json!([{"claim_type": "t1", "claim_value": "v1"}]),
            ),
            user(
                "b2",
                "B@X.COM",
                json!(["rid2"]),
                json!([
                    {"claim_type": "t1", "claim_value": "v2"},
                    {"claim_type": "t2", "claim_value": "v1"},
                ]),
            ),
            insert("roles", document("a1", "s1")),
        ])
        .await
        .unwrap();

    let by_email = DocumentFilter::eq("normalized_email", "B@X.COM");
    assert_eq!(ids(backend.query("users", &by_email).await.unwrap()), ["b2"]);
    assert!(backend.query("roles", &by_email).await.unwrap().is_empty());

    let in_role = DocumentFilter::eq("roles", "rid2");
    assert_eq!(ids(backend.query("users", &in_role).await.unwrap()), ["a1", "b2"]);
    let in_role = DocumentFilter::eq("roles", "rid1");
    assert_eq!(ids(backend.query("users", &in_role).await.unwrap()), ["a1"]);

    let claim = |claim_type: &str, value: &str| {
        DocumentFilter::elem_match(
            "claims",
            [
                ("claim_type", json!(claim_type)),
                ("claim_value", json!(value)),
            ],
        )
    };
    assert_eq!(ids(backend.query("users", &claim("t1", "v2")).await.unwrap()), ["b2"]);
    assert!(backend.query("users", &claim("t2", "v2")).await.unwrap().is_empty());
}

#[tokio::test]
async fn should_guard_replace_and_delete_with_stamp() {
    let backend = sqlite().await;
    backend
        .write(vec![insert("users", document("a1", "s1"))])
        .await
        .unwrap();

    let stale = backend
        .write(vec![WriteOp {
            collection: "users".to_owned(),
            kind: WriteKind::Replace {
                document: document("a1", "s3"),
                expected_stamp: Some("s0".to_owned()),
            },
        }])
        .await;
    assert!(
        matches!(stale, Err(IdentityError::ConcurrencyConflict { .. })),
        "expected ConcurrencyConflict, got {stale:?}"
    );

    backend
        .write(vec![WriteOp {
            collection: "users".to_owned(),
            kind: WriteKind::Replace {
                document: document("a1", "s2"),
                expected_stamp: Some("s1".to_owned()),
            },
        }])
        .await
        .unwrap();
    assert_eq!(
        backend.find("users", "a1").await.unwrap().unwrap().stamp.as_deref(),
        Some("s2")
    );

    let stale_delete = backend
        .write(vec![WriteOp {
            collection: "users".to_owned(),
            kind: WriteKind::Delete {
                id: "a1".to_owned(),
                expected_stamp: Some("s1".to_owned()),
            },
        }])
        .await;
    assert!(matches!(
        stale_delete,
        Err(IdentityError::ConcurrencyConflict { .. })
    ));
}

#[tokio::test]
async fn should_roll_back_whole_batch_on_duplicate_key() {
    let backend = sqlite().await;
    backend
        .write(vec![insert("users", document("a1", "s1"))])
        .await
        .unwrap();

    let result = backend
        .write(vec![
            insert("users", document("b2", "s1")),
            insert("users", document("a1", "s1")),
        ])
        .await;
    assert!(
        matches!(result, Err(IdentityError::DuplicateKey { .. })),
        "expected DuplicateKey, got {result:?}"
    );
    assert_eq!(backend.scan("users").await.unwrap().len(), 1);
}

#[tokio::test]
async fn should_run_user_store_against_sqlite() {
    let backend = Arc::new(sqlite().await);
    let context = Arc::new(IdentityContext::new(
        Arc::clone(&backend),
        ContextOptions::users_only(),
    ));
    let store = tessera_identity::DocumentUserOnlyStore::<_, TestShapes>::new(context);
    let mut user = test_user::first();
    assert!(store.create(&mut user).await.unwrap().succeeded());

    let fresh = tessera_identity::DocumentUserOnlyStore::<_, TestShapes>::new(Arc::new(
        IdentityContext::new(Arc::clone(&backend), ContextOptions::users_only()),
    ));
    let mut found = fresh.find_by_name("USER NAME1").await.unwrap().unwrap();
    assert_eq!(found.profile.custom_data.as_deref(), Some("Some Info 1"));

    found.phone_number = Some("555-0100".to_owned());
    assert!(fresh.update(&mut found).await.unwrap().succeeded());

    // The first store still holds the old stamp.
    let result = store.update(&mut user).await.unwrap();
    assert_eq!(result.errors()[0].code, "ConcurrencyFailure");
}

#[tokio::test]
async fn should_find_users_for_claim_against_sqlite() {
    let backend = Arc::new(sqlite().await);
    let context = Arc::new(IdentityContext::new(
        Arc::clone(&backend),
        ContextOptions::users_only(),
    ));
    let store = tessera_identity::DocumentUserOnlyStore::<_, TestShapes>::new(context);
    let claim = Claim::new("department", "sales");
    for (mut user, holds) in [(test_user::first(), true), (test_user::second(), false)] {
        if holds {
            store.add_claims(&mut user, &[claim.clone()]).await.unwrap();
        }
        store.create(&mut user).await.unwrap();
    }

    let fresh = tessera_identity::DocumentUserOnlyStore::<_, TestShapes>::new(Arc::new(
        IdentityContext::new(Arc::clone(&backend), ContextOptions::users_only()),
    ));
    let users = fresh.get_users_for_claim(&claim).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, "a1");
    let found = fresh.find_by_email("TEST2@TESTING.COM").await.unwrap().unwrap();
    assert_eq!(found.id, "b2");
}
