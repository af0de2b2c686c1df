//! Type-level configuration of the identity document shapes.
//!
//! A shapes type names the key, the application profile and the embedded
//! claim/login/token records in one place. `DefaultShapes<K>` covers the
//! common case; applications override any single shape by declaring their own
//! zero-sized type:
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use tessera_domain::{IdentityShapes, RoleClaim, UserClaim, UserLogin, UserToken};
//!
//! #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
//! pub struct Profile {
//!     pub custom_data: Option<String>,
//! }
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! pub struct AppShapes;
//!
//! impl IdentityShapes for AppShapes {
//!     type Key = String;
//!     type Profile = Profile;
//!     type UserClaim = UserClaim<String>;
//!     type UserLogin = UserLogin<String>;
//!     type UserToken = UserToken<String>;
//!     type RoleClaim = RoleClaim<String>;
//! }
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::claim::{ClaimShape, RoleClaim, UserClaim};
use crate::id::IdentityKey;
use crate::login::{LoginShape, UserLogin};
use crate::token::{TokenShape, UserToken};

pub trait IdentityShapes: Clone + fmt::Debug + Default + PartialEq + Send + Sync + 'static {
    type Key: IdentityKey;
    /// Application fields stored inline on the user document.
    type Profile: Clone
        + fmt::Debug
        + Default
        + PartialEq
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;
    type UserClaim: ClaimShape<Self::Key>;
    type UserLogin: LoginShape<Self::Key>;
    type UserToken: TokenShape<Self::Key>;
    type RoleClaim: ClaimShape<Self::Key>;
}

/// Default records keyed by `K` with no profile fields.
pub struct DefaultShapes<K = String>(PhantomData<fn() -> K>);

// Hand-written so the marker carries no bounds on `K`.
impl<K> Clone for DefaultShapes<K> {
    fn clone(&self) -> Self {
        Self(PhantomData)
    }
}

impl<K> Default for DefaultShapes<K> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<K> PartialEq for DefaultShapes<K> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<K> fmt::Debug for DefaultShapes<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefaultShapes<{}>", std::any::type_name::<K>())
    }
}

impl<K: IdentityKey> IdentityShapes for DefaultShapes<K> {
    type Key = K;
    type Profile = NoProfile;
    type UserClaim = UserClaim<K>;
    type UserLogin = UserLogin<K>;
    type UserToken = UserToken<K>;
    type RoleClaim = RoleClaim<K>;
}

/// Empty profile; contributes no fields to the stored document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoProfile {}
