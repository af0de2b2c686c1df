use tessera_identity::{
    DocumentRoleStore, DocumentUserOnlyStore, DocumentUserStore, MemoryDocumentBackend, UserStore,
};
use tessera_testing::database::TestDatabase;
use tessera_testing::shapes::{TestIntShapes, TestShapes, TestUser, test_user};

pub type TestUserStore = DocumentUserStore<MemoryDocumentBackend, TestShapes>;
pub type TestUserOnlyStore = DocumentUserOnlyStore<MemoryDocumentBackend, TestShapes>;
pub type TestUserIntStore = DocumentUserOnlyStore<MemoryDocumentBackend, TestIntShapes>;
pub type TestRoleStore = DocumentRoleStore<MemoryDocumentBackend, TestShapes>;

pub fn user_store(db: &TestDatabase) -> TestUserStore {
    TestUserStore::new(db.context())
}

pub fn user_only_store(db: &TestDatabase) -> TestUserOnlyStore {
    TestUserOnlyStore::new(db.user_only_context())
}

pub fn user_int_store(db: &TestDatabase) -> TestUserIntStore {
    TestUserIntStore::new(db.user_only_context())
}

pub fn role_store(db: &TestDatabase) -> TestRoleStore {
    TestRoleStore::new(db.context())
}

/// Persist `users` through a throwaway context.
pub async fn seed_users(db: &TestDatabase, users: impl IntoIterator<Item = TestUser>) {
    let store = user_only_store(db);
    for mut user in users {
        assert!(store.create(&mut user).await.unwrap().succeeded());
    }
}

/// Roles rid1..rid3 plus user a1 in rid1 and rid2.
pub async fn seed_user_in_roles(db: &TestDatabase) {
    db.seed_roles().await;
    let mut user = test_user::first();
    user.roles.push("rid1".to_owned());
    user.roles.push("rid2".to_owned());
    seed_users(db, [user]).await;
}
