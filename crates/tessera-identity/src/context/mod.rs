//! Unit of work over a document backend.
//!
//! A context owns an identity map of every document it has read or staged.
//! Stores sharing one context see each other's pending edits; nothing reaches
//! the backend until [`IdentityContext::save_changes`].

mod set;
mod tracker;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use tessera_domain::{IdentityKey, IdentityShapes, Role, User};

use crate::diagnostics::{DiagnosticEvent, DiagnosticListener, NoOpDiagnostics};
use crate::domain::backend::DocumentBackend;
use crate::error::IdentityError;

pub use set::DocumentSet;
pub use tracker::EntryState;
use tracker::ChangeTracker;

pub const DEFAULT_USERS_COLLECTION: &str = "users";
pub const DEFAULT_ROLES_COLLECTION: &str = "roles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    User,
    Role,
}

/// An entity a context can hold.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Key: IdentityKey;
    const KIND: DocumentKind;

    fn id(&self) -> &Self::Key;
    fn concurrency_stamp(&self) -> Option<&str>;
}

impl<S: IdentityShapes> Document for User<S> {
    type Key = S::Key;
    const KIND: DocumentKind = DocumentKind::User;

    fn id(&self) -> &S::Key {
        &self.id
    }

    fn concurrency_stamp(&self) -> Option<&str> {
        self.concurrency_stamp.as_deref()
    }
}

impl<S: IdentityShapes> Document for Role<S> {
    type Key = S::Key;
    const KIND: DocumentKind = DocumentKind::Role;

    fn id(&self) -> &S::Key {
        &self.id
    }

    fn concurrency_stamp(&self) -> Option<&str> {
        self.concurrency_stamp.as_deref()
    }
}

/// Collections a context maps entities to, and who hears about its traffic.
#[derive(Clone)]
pub struct ContextOptions {
    pub users_collection: String,
    /// `None` makes this a user-only context.
    pub roles_collection: Option<String>,
    pub diagnostics: Arc<dyn DiagnosticListener>,
}

impl ContextOptions {
    pub fn users_only() -> Self {
        Self {
            users_collection: DEFAULT_USERS_COLLECTION.to_owned(),
            roles_collection: None,
            diagnostics: Arc::new(NoOpDiagnostics),
        }
    }

    pub fn with_roles() -> Self {
        Self {
            roles_collection: Some(DEFAULT_ROLES_COLLECTION.to_owned()),
            ..Self::users_only()
        }
    }

    pub fn diagnostics(mut self, listener: impl DiagnosticListener + 'static) -> Self {
        self.diagnostics = Arc::new(listener);
        self
    }

    pub fn has_roles(&self) -> bool {
        self.roles_collection.is_some()
    }
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self::with_roles()
    }
}

impl fmt::Debug for ContextOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextOptions")
            .field("users_collection", &self.users_collection)
            .field("roles_collection", &self.roles_collection)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

pub struct IdentityContext<B> {
    backend: Arc<B>,
    options: ContextOptions,
    tracker: Mutex<ChangeTracker>,
}

impl<B: DocumentBackend> IdentityContext<B> {
    pub fn new(backend: Arc<B>, options: ContextOptions) -> Self {
        Self {
            backend,
            options,
            tracker: Mutex::new(ChangeTracker::default()),
        }
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Typed view over the collection holding `D`.
    pub fn set<D: Document>(&self) -> Result<DocumentSet<'_, B, D>, IdentityError> {
        let collection = match D::KIND {
            DocumentKind::User => self.options.users_collection.as_str(),
            DocumentKind::Role => self.options.roles_collection.as_deref().ok_or_else(|| {
                IdentityError::Configuration(format!(
                    "context has no roles collection for {}",
                    std::any::type_name::<D>()
                ))
            })?,
        };
        Ok(DocumentSet::new(self, collection))
    }

    /// Flush the pending change set in one atomic batch. Returns the number
    /// of documents written. On failure every entry stays pending.
    pub async fn save_changes(&self) -> Result<usize, IdentityError> {
        let mut tracker = self.tracker.lock().await;
        let ops = tracker.pending();
        if ops.is_empty() {
            return Ok(0);
        }
        let operations = ops.len();
        self.backend.write(ops).await?;
        tracker.accept_all();
        self.emit(DiagnosticEvent::Commit { operations });
        Ok(operations)
    }

    pub async fn has_changes(&self) -> bool {
        self.tracker.lock().await.has_changes()
    }

    /// Tracking state of one document, `None` when untracked.
    pub async fn entry_state(&self, collection: &str, id: &str) -> Option<EntryState> {
        self.tracker.lock().await.state(collection, id)
    }

    /// Forget one document, discarding any pending change to it.
    pub async fn detach(&self, collection: &str, id: &str) {
        self.tracker.lock().await.detach(collection, id);
    }

    /// Evict the identity map, discarding pending changes.
    pub async fn dispose(&self) {
        self.tracker.lock().await.clear();
    }

    fn emit(&self, event: DiagnosticEvent) {
        self.options.diagnostics.on_event(&event);
    }
}

impl<B> fmt::Debug for IdentityContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityContext")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
