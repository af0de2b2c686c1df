//! User and role stores over an [`IdentityContext`].
//!
//! Every public operation checks, in order: disposal, cancellation, then
//! required arguments. Only then does it touch the context.

mod role;
mod user;

use tokio_util::sync::CancellationToken;

use crate::context::IdentityContext;
use crate::domain::backend::DocumentBackend;
use crate::error::{IdentityError, IdentityFailure, IdentityResult};

pub use role::DocumentRoleStore;
pub use user::{DocumentUserOnlyStore, DocumentUserStore};

/// Login provider under which the store keeps its own tokens.
pub const INTERNAL_LOGIN_PROVIDER: &str = "[TesseraUserStore]";
pub const AUTHENTICATOR_KEY_TOKEN_NAME: &str = "AuthenticatorKey";
pub const RECOVERY_CODE_TOKEN_NAME: &str = "RecoveryCodes";

/// Whether a user store manages role membership.
pub trait RoleMode: Send + Sync + 'static {
    const ROLES: bool;
    const STORE_NAME: &'static str;
}

/// User store with role membership backed by the roles collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct WithRoles;

/// User store for contexts without roles.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsersOnly;

impl RoleMode for WithRoles {
    const ROLES: bool = true;
    const STORE_NAME: &'static str = "DocumentUserStore";
}

impl RoleMode for UsersOnly {
    const ROLES: bool = false;
    const STORE_NAME: &'static str = "DocumentUserOnlyStore";
}

/// Disposal flag and cancellation token shared by the store types.
#[derive(Debug, Clone, Default)]
pub(crate) struct Lifecycle {
    disposed: bool,
    cancellation: CancellationToken,
}

impl Lifecycle {
    pub fn check(&self, store: &'static str) -> Result<(), IdentityError> {
        if self.disposed {
            return Err(IdentityError::ObjectDisposed(store));
        }
        if self.cancellation.is_cancelled() {
            return Err(IdentityError::Cancelled);
        }
        Ok(())
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancellation = token;
    }
}

pub(crate) fn required<'a>(value: &'a str, name: &'static str) -> Result<&'a str, IdentityError> {
    if value.is_empty() {
        return Err(IdentityError::InvalidArgument(name));
    }
    Ok(value)
}

/// Flush the context when auto-save is on.
///
/// A conflicting or duplicate document is detached so it does not poison
/// later saves; a conflict becomes a failed result.
pub(crate) async fn commit<B: DocumentBackend>(
    context: &IdentityContext<B>,
    auto_save_changes: bool,
) -> Result<IdentityResult, IdentityError> {
    if !auto_save_changes {
        return Ok(IdentityResult::Success);
    }
    match context.save_changes().await {
        Ok(_) => Ok(IdentityResult::Success),
        Err(IdentityError::ConcurrencyConflict { collection, id }) => {
            context.detach(&collection, &id).await;
            Ok(IdentityResult::failed([
                IdentityFailure::concurrency_failure(),
            ]))
        }
        Err(IdentityError::DuplicateKey { collection, id }) => {
            context.detach(&collection, &id).await;
            Err(IdentityError::DuplicateKey { collection, id })
        }
        Err(e) => Err(e),
    }
}
