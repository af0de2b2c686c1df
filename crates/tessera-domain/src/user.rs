//! User account document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{GenerateKey, IdentityKey, new_stamp};
use crate::normalize::normalize;
use crate::shapes::{DefaultShapes, IdentityShapes};

/// A user account with its claims, logins, tokens and role ids embedded.
///
/// Normalized fields are kept in sync by the caller; stores compare them as
/// stored. Missing fields in a stored document deserialize to their defaults,
/// so the embedded lists are never absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "S: IdentityShapes", default)]
pub struct User<S: IdentityShapes = DefaultShapes> {
    pub id: S::Key,
    pub user_name: Option<String>,
    pub normalized_user_name: Option<String>,
    pub email: Option<String>,
    pub normalized_email: Option<String>,
    pub email_confirmed: bool,
    pub password_hash: Option<String>,
    /// Changes whenever credentials change; invalidates issued cookies.
    pub security_stamp: Option<String>,
    /// Changes on every persisted update; guards against lost updates.
    pub concurrency_stamp: Option<String>,
    pub phone_number: Option<String>,
    pub phone_number_confirmed: bool,
    pub two_factor_enabled: bool,
    pub lockout_end: Option<DateTime<Utc>>,
    pub lockout_enabled: bool,
    pub access_failed_count: u32,
    pub roles: Vec<S::Key>,
    pub claims: Vec<S::UserClaim>,
    pub logins: Vec<S::UserLogin>,
    pub tokens: Vec<S::UserToken>,
    #[serde(flatten)]
    pub profile: S::Profile,
}

// Hand-written so the embedded record types need not implement `Default`.
impl<S: IdentityShapes> Default for User<S> {
    fn default() -> Self {
        Self {
            id: Default::default(),
            user_name: None,
            normalized_user_name: None,
            email: None,
            normalized_email: None,
            email_confirmed: false,
            password_hash: None,
            security_stamp: None,
            concurrency_stamp: None,
            phone_number: None,
            phone_number_confirmed: false,
            two_factor_enabled: false,
            lockout_end: None,
            lockout_enabled: false,
            access_failed_count: 0,
            roles: Vec::new(),
            claims: Vec::new(),
            logins: Vec::new(),
            tokens: Vec::new(),
            profile: Default::default(),
        }
    }
}

impl<S: IdentityShapes> User<S> {
    /// A user with the given id and name, normalized name filled in and
    /// fresh security and concurrency stamps.
    pub fn new(id: S::Key, user_name: impl Into<String>) -> Self {
        let user_name = user_name.into();
        Self {
            id,
            normalized_user_name: Some(normalize(&user_name)),
            user_name: Some(user_name),
            security_stamp: Some(new_stamp()),
            concurrency_stamp: Some(new_stamp()),
            ..Default::default()
        }
    }

    /// Set the email and its normalized form together.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        let email = email.into();
        self.normalized_email = Some(normalize(&email));
        self.email = Some(email);
        self
    }

    pub fn with_profile(mut self, profile: S::Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.lockout_enabled && self.lockout_end.is_some_and(|end| end > now)
    }
}

impl<S> User<S>
where
    S: IdentityShapes,
    S::Key: GenerateKey,
{
    /// A user with a generated id.
    pub fn with_user_name(user_name: impl Into<String>) -> Self {
        Self::new(S::Key::generate(), user_name)
    }
}

/// String-keyed user with the default embedded records.
pub type IdentityUser = User<DefaultShapes<String>>;

/// Membership of a user in a role, projected from the user's role-id list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "K: IdentityKey")]
pub struct UserRole<K> {
    pub user_id: K,
    pub role_id: K,
}
