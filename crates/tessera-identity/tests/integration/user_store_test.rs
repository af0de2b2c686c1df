use tessera_domain::{Claim, LoginInfo};
use tessera_identity::{
    IdentityError, RoleStore, UserClaimStore, UserLoginStore, UserRoleStore, UserStore,
};
use tessera_testing::database::TestDatabase;
use tessera_testing::shapes::{TestRole, test_user};

use crate::helpers::{role_store, seed_user_in_roles, seed_users, user_store};

// ── get_roles / is_in_role ───────────────────────────────────────────────────

#[tokio::test]
async fn should_list_role_names_of_user() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let store = user_store(&db);
    let user = store.find_by_id("a1").await.unwrap().unwrap();

    let roles = store.get_roles(&user).await.unwrap();
    assert_eq!(roles, ["Role 1", "Role 2"]);
}

#[tokio::test]
async fn should_answer_membership_by_normalized_name() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let store = user_store(&db);
    let user = store.find_by_id("a1").await.unwrap().unwrap();

    assert!(store.is_in_role(&user, "ROLE 1").await.unwrap());
    assert!(!store.is_in_role(&user, "ROLE 3").await.unwrap());
    assert!(!store.is_in_role(&user, "Role 3").await.unwrap());
    assert!(!store.is_in_role(&user, "NO ROLE").await.unwrap());
}

#[tokio::test]
async fn should_reject_empty_role_name() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let store = user_store(&db);
    let mut user = test_user::first();

    assert!(matches!(
        store.is_in_role(&user, "").await,
        Err(IdentityError::InvalidArgument("normalized_role_name"))
    ));
    assert!(matches!(
        store.add_to_role(&mut user, "").await,
        Err(IdentityError::InvalidArgument("normalized_role_name"))
    ));
}

// ── add_to_role / remove_from_role ───────────────────────────────────────────

#[tokio::test]
async fn should_fail_to_add_unknown_role_and_leave_user_unchanged() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let store = user_store(&db);
    let mut user = store.find_by_id("a1").await.unwrap().unwrap();

    let result = store.add_to_role(&mut user, "ROLE 9").await;
    match result {
        Err(IdentityError::InvalidOperation(message)) => {
            assert_eq!(message, "Role ROLE 9 does not exist");
        }
        other => panic!("expected InvalidOperation, got {other:?}"),
    }
    assert_eq!(user.roles, ["rid1", "rid2"]);
}

#[tokio::test]
async fn should_add_role_once() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let store = user_store(&db);
    let mut user = store.find_by_id("a1").await.unwrap().unwrap();

    store.add_to_role(&mut user, "ROLE 1").await.unwrap();
    assert_eq!(user.roles, ["rid1", "rid2"]);

    store.add_to_role(&mut user, "ROLE 3").await.unwrap();
    store.add_to_role(&mut user, "ROLE 3").await.unwrap();
    assert_eq!(user.roles, ["rid1", "rid2", "rid3"]);
    assert!(store.update(&mut user).await.unwrap().succeeded());

    let fresh = user_store(&db);
    let members = fresh.get_users_in_role("ROLE 3").await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, "a1");
}

#[tokio::test]
async fn should_remove_role_and_ignore_unknown_names() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let store = user_store(&db);
    let mut user = store.find_by_id("a1").await.unwrap().unwrap();

    store.remove_from_role(&mut user, "ROLE 9").await.unwrap();
    assert_eq!(user.roles, ["rid1", "rid2"]);

    store.remove_from_role(&mut user, "ROLE 1").await.unwrap();
    assert_eq!(user.roles, ["rid2"]);
}

#[tokio::test]
async fn should_return_no_users_for_unknown_role() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let store = user_store(&db);

    assert!(store.get_users_in_role("ROLE 9").await.unwrap().is_empty());
    assert!(store.get_users_in_role("ROLE 3").await.unwrap().is_empty());
    assert_eq!(store.get_users_in_role("ROLE 2").await.unwrap().len(), 1);
}

#[tokio::test]
async fn should_fail_membership_lookup_when_role_name_is_shared() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let roles = role_store(&db);
    let mut duplicate = TestRole::new("rid4".to_owned(), "Role 1").unwrap();
    roles.create(&mut duplicate).await.unwrap();

    let store = user_store(&db);
    let user = store.find_by_id("a1").await.unwrap().unwrap();
    let result = store.is_in_role(&user, "ROLE 1").await;
    assert!(
        matches!(result, Err(IdentityError::NotUnique(_))),
        "expected NotUnique, got {result:?}"
    );
}

// ── find_user_role ───────────────────────────────────────────────────────────

#[tokio::test]
async fn should_find_user_role_for_member() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let store = user_store(&db);

    let membership = store.find_user_role("a1", "rid1").await.unwrap().unwrap();
    assert_eq!(membership.user_id, "a1");
    assert_eq!(membership.role_id, "rid1");
}

#[tokio::test]
async fn should_not_find_user_role_for_unknown_role_or_user() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let store = user_store(&db);

    assert!(store.find_user_role("a1", "none-rid1").await.unwrap().is_none());
    assert!(store.find_user_role("none-a1", "rid1").await.unwrap().is_none());
    assert!(matches!(
        store.find_user_role("", "rid1").await,
        Err(IdentityError::InvalidArgument("user_id"))
    ));
}

#[tokio::test]
async fn should_see_role_staged_in_same_context() {
    let db = TestDatabase::new();
    seed_users(&db, [test_user::first()]).await;
    let store = user_store(&db);
    let mut roles = crate::helpers::TestRoleStore::new(store.context().clone());
    roles.set_auto_save_changes(false);
    let mut role = TestRole::new("rid5".to_owned(), "Role 5").unwrap();
    roles.create(&mut role).await.unwrap();

    let mut user = store.find_by_id("a1").await.unwrap().unwrap();
    store.add_to_role(&mut user, "ROLE 5").await.unwrap();
    assert_eq!(user.roles, ["rid5"]);
    assert!(store.update(&mut user).await.unwrap().succeeded());
    assert_eq!(db.backend().len("roles").await, 1);
}

// ── disposal ─────────────────────────────────────────────────────────────────

fn assert_disposed<T: std::fmt::Debug>(result: Result<T, IdentityError>) {
    assert!(
        matches!(result, Err(IdentityError::ObjectDisposed("DocumentUserStore"))),
        "expected ObjectDisposed, got {result:?}"
    );
}

#[tokio::test]
async fn should_fail_every_membership_call_after_dispose() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let mut store = user_store(&db);
    let mut user = store.find_by_id("a1").await.unwrap().unwrap();
    store.dispose();

    assert_disposed(store.add_to_role(&mut user, "ROLE 3").await);
    assert_disposed(store.add_to_role(&mut user, "").await);
    assert_disposed(store.remove_from_role(&mut user, "ROLE 1").await);
    assert_disposed(store.remove_from_role(&mut user, "").await);
    assert_disposed(store.get_roles(&user).await);
    assert_disposed(store.is_in_role(&user, "ROLE 1").await);
    assert_disposed(store.is_in_role(&user, "").await);
    assert_disposed(store.get_users_in_role("ROLE 1").await);
    assert_disposed(store.get_users_in_role("").await);
    assert_disposed(store.find_user_role("a1", "rid1").await);
    assert_disposed(store.find_user_role("", "").await);
    assert_disposed(store.find_role("ROLE 1").await);
    assert_eq!(user.roles, ["rid1", "rid2"]);
}

#[tokio::test]
async fn should_fail_every_claim_and_login_call_after_dispose() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let mut store = user_store(&db);
    let mut user = store.find_by_id("a1").await.unwrap().unwrap();
    let claim = Claim::new("type", "value");
    let login = LoginInfo::new("provider1", "key1", None);
    store.dispose();

    assert_disposed(store.get_claims(&user).await);
    assert_disposed(store.add_claims(&mut user, &[claim.clone()]).await);
    assert_disposed(store.replace_claim(&mut user, &claim, &claim).await);
    assert_disposed(store.remove_claims(&mut user, &[claim.clone()]).await);
    assert_disposed(store.get_users_for_claim(&claim).await);
    assert_disposed(store.add_login(&mut user, &login).await);
    assert_disposed(
        store
            .add_login(&mut user, &LoginInfo::new("", "", None))
            .await,
    );
    assert_disposed(store.remove_login(&mut user, "provider1", "key1").await);
    assert_disposed(store.remove_login(&mut user, "", "").await);
    assert_disposed(store.get_logins(&user).await);
    assert_disposed(store.find_by_login("provider1", "key1").await);
    assert_disposed(store.find_by_login("", "").await);
    assert_disposed(store.find_user_login("a1", "provider1", "key1").await);
    assert_disposed(store.find_user_login("", "", "").await);
    assert_disposed(store.find_any_user_login("", "").await);
    assert!(user.claims.is_empty());
    assert!(user.logins.is_empty());
}

// ── tracked edits ────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_save_membership_change_of_loaded_user_without_update() {
    let db = TestDatabase::new();
    seed_user_in_roles(&db).await;
    let mut store = user_store(&db);
    store.set_auto_save_changes(false);
    let mut user = store.find_by_id("a1").await.unwrap().unwrap();

    store.add_to_role(&mut user, "ROLE 3").await.unwrap();
    store.remove_from_role(&mut user, "ROLE 1").await.unwrap();
    assert_eq!(store.context().save_changes().await.unwrap(), 1);

    let fresh = user_store(&db);
    let found = fresh.find_by_id("a1").await.unwrap().unwrap();
    assert_eq!(fresh.get_roles(&found).await.unwrap(), ["Role 2", "Role 3"]);
    assert_eq!(fresh.get_users_in_role("ROLE 3").await.unwrap().len(), 1);
}
