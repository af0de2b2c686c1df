use std::sync::{Arc, Mutex};

use tessera_identity::{
    ContextOptions, DiagnosticEvent, DiagnosticListener, EntryState, IdentityError,
};
use tessera_testing::database::TestDatabase;
use tessera_testing::shapes::{TestRole, TestUser, test_user};

use crate::helpers::seed_users;

#[derive(Debug, Default, Clone)]
struct RecordingListener {
    events: Arc<Mutex<Vec<DiagnosticEvent>>>,
}

impl DiagnosticListener for RecordingListener {
    fn on_event(&self, event: &DiagnosticEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[tokio::test]
async fn should_track_entry_states_through_a_save() {
    let db = TestDatabase::new();
    seed_users(&db, [test_user::first()]).await;
    let context = db.context();
    let users = context.set::<TestUser>().unwrap();

    let mut user = users.find(&"a1".to_owned()).await.unwrap().unwrap();
    assert_eq!(
        context.entry_state("users", "a1").await,
        Some(EntryState::Unchanged)
    );

    user.email = Some("changed@testing.com".to_owned());
    users.update(&user).await.unwrap();
    assert_eq!(
        context.entry_state("users", "a1").await,
        Some(EntryState::Modified)
    );
    assert!(context.has_changes().await);

    assert_eq!(context.save_changes().await.unwrap(), 1);
    assert_eq!(
        context.entry_state("users", "a1").await,
        Some(EntryState::Unchanged)
    );
    assert_eq!(context.save_changes().await.unwrap(), 0);

    context.detach("users", "a1").await;
    assert_eq!(context.entry_state("users", "a1").await, None);
}

#[tokio::test]
async fn should_answer_from_identity_map_before_save() {
    let db = TestDatabase::new();
    seed_users(&db, [test_user::first(), test_user::second()]).await;
    let context = db.context();
    let users = context.set::<TestUser>().unwrap();

    let mut user = users.find(&"a1".to_owned()).await.unwrap().unwrap();
    user.profile.custom_data = Some("Pending".to_owned());
    users.update(&user).await.unwrap();

    let again = users.find(&"a1".to_owned()).await.unwrap().unwrap();
    assert_eq!(again.profile.custom_data.as_deref(), Some("Pending"));
    let listed = users.first_or_default(|u| u.id == "a1").await.unwrap().unwrap();
    assert_eq!(listed.profile.custom_data.as_deref(), Some("Pending"));

    let second = users.find(&"b2".to_owned()).await.unwrap().unwrap();
    users.remove(&second).await.unwrap();
    assert!(users.find(&"b2".to_owned()).await.unwrap().is_none());
    assert_eq!(users.count(|_| true).await.unwrap(), 1);

    // Nothing reached the backend yet.
    let other = db.context();
    let stored = other
        .set::<TestUser>()
        .unwrap()
        .find(&"a1".to_owned())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.profile.custom_data.as_deref(), Some("Some Info 1"));
    assert_eq!(db.backend().len("users").await, 2);
}

#[tokio::test]
async fn should_query_collections_with_predicates() {
    let db = TestDatabase::new();
    seed_users(
        &db,
        [test_user::first(), test_user::second(), test_user::third()],
    )
    .await;
    let context = db.context();
    let users = context.set::<TestUser>().unwrap();

    assert!(users.any(|u| u.id == "c3").await.unwrap());
    assert!(users.all(|u| u.email.is_some()).await.unwrap());
    assert_eq!(
        users
            .filter(|u| u.id != "b2")
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect::<Vec<_>>(),
        ["a1", "c3"]
    );
    assert!(
        users
            .single_or_default(|u| u.id == "zz")
            .await
            .unwrap()
            .is_none()
    );
    assert!(matches!(
        users.single_or_default(|_| true).await,
        Err(IdentityError::NotUnique(_))
    ));
}

#[tokio::test]
async fn should_keep_failed_batch_out_of_the_backend() {
    let db = TestDatabase::new();
    seed_users(&db, [test_user::first()]).await;
    let context = db.context();
    let users = context.set::<TestUser>().unwrap();

    users.add(&test_user::second()).await.unwrap();
    users.add(&test_user::first()).await.unwrap();

    let result = context.save_changes().await;
    assert!(
        matches!(result, Err(IdentityError::DuplicateKey { ref id, .. }) if id == "a1"),
        "expected DuplicateKey, got {result:?}"
    );
    assert_eq!(db.backend().len("users").await, 1);
    assert!(context.has_changes().await);

    context.detach("users", "a1").await;
    assert_eq!(context.save_changes().await.unwrap(), 1);
    assert_eq!(db.backend().len("users").await, 2);
}

#[tokio::test]
async fn should_refuse_role_set_without_roles_collection() {
    let db = TestDatabase::new();
    let context = db.user_only_context();

    let result = context.set::<TestRole>();
    assert!(matches!(result, Err(IdentityError::Configuration(_))));
    assert!(context.set::<TestUser>().is_ok());
}

#[tokio::test]
async fn should_map_entities_to_configured_collections() {
    let db = TestDatabase::new();
    let options = ContextOptions {
        users_collection: "accounts".to_owned(),
        ..ContextOptions::with_roles()
    };
    let context = db.context_with(options);
    let users = context.set::<TestUser>().unwrap();
    assert_eq!(users.collection(), "accounts");

    users.add(&test_user::first()).await.unwrap();
    context.save_changes().await.unwrap();
    assert_eq!(db.backend().len("accounts").await, 1);
    assert!(db.backend().is_empty("users").await);
}

#[tokio::test]
async fn should_report_context_traffic_to_listener() {
    let db = TestDatabase::new();
    seed_users(&db, [test_user::first()]).await;
    let listener = RecordingListener::default();
    let context = db.context_with(ContextOptions::with_roles().diagnostics(listener.clone()));
    let users = context.set::<TestUser>().unwrap();

    let mut user = users.find(&"a1".to_owned()).await.unwrap().unwrap();
    users.find(&"a1".to_owned()).await.unwrap();
    user.email_confirmed = true;
    users.update(&user).await.unwrap();
    context.save_changes().await.unwrap();
    users.to_list().await.unwrap();

    let events = listener.events.lock().unwrap().clone();
    assert_eq!(events.len(), 4);
    assert!(matches!(
        &events[0],
        DiagnosticEvent::Find { tracked: false, found: true, .. }
    ));
    assert!(matches!(
        &events[1],
        DiagnosticEvent::Find { tracked: true, .. }
    ));
    assert!(matches!(
        &events[2],
        DiagnosticEvent::Commit { operations: 1 }
    ));
    assert!(matches!(
        &events[3],
        DiagnosticEvent::Scan { documents: 1, .. }
    ));
}

#[tokio::test]
async fn should_drop_everything_on_dispose() {
    let db = TestDatabase::new();
    let context = db.context();
    let users = context.set::<TestUser>().unwrap();
    users.add(&test_user::first()).await.unwrap();
    assert!(context.has_changes().await);

    context.dispose().await;
    assert!(!context.has_changes().await);
    assert_eq!(context.save_changes().await.unwrap(), 0);
    assert!(db.backend().is_empty("users").await);
}
