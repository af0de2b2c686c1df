//! Identity user and role stores over a document backend.
//!
//! Users and roles are stored as whole documents: claims, logins, tokens and
//! role ids live inside the user document. Stores stage edits in an
//! [`IdentityContext`] and commit them in one batch, guarded by each
//! document's concurrency stamp.
//!
//! Two backends ship with the crate: [`MemoryDocumentBackend`] for tests and
//! embedded use, and [`DbDocumentBackend`] over sea-orm.

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod infra;
pub mod registration;
pub mod store;

pub use config::IdentityConfig;
pub use context::{ContextOptions, DocumentSet, EntryState, IdentityContext};
pub use diagnostics::{DiagnosticEvent, DiagnosticListener, NoOpDiagnostics, TracingDiagnostics};
pub use domain::backend::{DocumentBackend, DocumentFilter, StoredDocument, WriteKind, WriteOp};
pub use domain::store::*;
pub use error::{IdentityError, IdentityFailure, IdentityResult};
pub use infra::db::DbDocumentBackend;
pub use infra::memory::MemoryDocumentBackend;
pub use registration::{
    IdentityBuilder, IdentityScope, IdentityServices, ResolvedUserStore, StoreDescriptor,
    StoreVariant, connect, select_variant,
};
pub use store::{
    AUTHENTICATOR_KEY_TOKEN_NAME, DocumentRoleStore, DocumentUserOnlyStore, DocumentUserStore,
    INTERNAL_LOGIN_PROVIDER, RECOVERY_CODE_TOKEN_NAME, RoleMode, UsersOnly, WithRoles,
};
