//! Shared in-memory database for store tests.
//!
//! Every context opened from one `TestDatabase` sees the same documents, so a
//! test can seed through one context and assert through a fresh one.

use std::sync::Arc;

use tessera_identity::{ContextOptions, IdentityContext, MemoryDocumentBackend};

use crate::fixture::Fixture;
use crate::shapes::TestRole;

pub const ROLES_FIXTURE: &str = "fixtures/identity/roles.json";

pub type TestContext = IdentityContext<MemoryDocumentBackend>;

#[derive(Debug, Clone, Default)]
pub struct TestDatabase {
    backend: Arc<MemoryDocumentBackend>,
}

impl TestDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(&self) -> &MemoryDocumentBackend {
        &self.backend
    }

    /// A fresh context with users and roles collections.
    pub fn context(&self) -> Arc<TestContext> {
        self.context_with(ContextOptions::with_roles())
    }

    /// A fresh context without a roles collection.
    pub fn user_only_context(&self) -> Arc<TestContext> {
        self.context_with(ContextOptions::users_only())
    }

    pub fn context_with(&self, options: ContextOptions) -> Arc<TestContext> {
        Arc::new(IdentityContext::new(Arc::clone(&self.backend), options))
    }

    /// Insert the roles from the roles fixture and return them.
    ///
    /// Panics if the fixture cannot be saved.
    pub async fn seed_roles(&self) -> Vec<TestRole> {
        let roles: Vec<TestRole> = Fixture::load_as(ROLES_FIXTURE);
        let context = self.context();
        let set = context.set::<TestRole>().unwrap();
        for role in &roles {
            set.add(role).await.unwrap();
        }
        context.save_changes().await.unwrap();
        roles
    }
}
