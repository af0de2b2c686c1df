#![allow(async_fn_in_trait)]

//! Capabilities an identity manager expects from user and role stores.
//!
//! Mutators change the entity in memory only; `UserStore::update` (or
//! `RoleStore::update`) persists them. Identifiers cross this boundary as
//! strings and are converted to the store's native key.

use chrono::{DateTime, Utc};

use tessera_domain::{Claim, LoginInfo};

use crate::error::{IdentityError, IdentityResult};

// ── Users ────────────────────────────────────────────────────────────────────

pub trait UserStore: Send + Sync {
    type User;

    async fn create(&self, user: &mut Self::User) -> Result<IdentityResult, IdentityError>;
    /// Persist `user`, rotating its concurrency stamp. A stale stamp yields a
    /// failed result rather than an error.
    async fn update(&self, user: &mut Self::User) -> Result<IdentityResult, IdentityError>;
    async fn delete(&self, user: &Self::User) -> Result<IdentityResult, IdentityError>;
    async fn find_by_id(&self, user_id: &str) -> Result<Option<Self::User>, IdentityError>;
    async fn find_by_name(
        &self,
        normalized_user_name: &str,
    ) -> Result<Option<Self::User>, IdentityError>;
    async fn get_user_id(&self, user: &Self::User) -> Result<Option<String>, IdentityError>;
    async fn get_user_name(&self, user: &Self::User) -> Result<Option<String>, IdentityError>;
    async fn set_user_name(
        &self,
        user: &mut Self::User,
        user_name: Option<&str>,
    ) -> Result<(), IdentityError>;
    async fn get_normalized_user_name(
        &self,
        user: &Self::User,
    ) -> Result<Option<String>, IdentityError>;
    async fn set_normalized_user_name(
        &self,
        user: &mut Self::User,
        normalized_name: Option<&str>,
    ) -> Result<(), IdentityError>;
}

pub trait UserPasswordStore: UserStore {
    async fn set_password_hash(
        &self,
        user: &mut Self::User,
        password_hash: Option<&str>,
    ) -> Result<(), IdentityError>;
    async fn get_password_hash(&self, user: &Self::User) -> Result<Option<String>, IdentityError>;
    async fn has_password(&self, user: &Self::User) -> Result<bool, IdentityError>;
}

pub trait UserSecurityStampStore: UserStore {
    async fn set_security_stamp(
        &self,
        user: &mut Self::User,
        stamp: &str,
    ) -> Result<(), IdentityError>;
    async fn get_security_stamp(&self, user: &Self::User)
    -> Result<Option<String>, IdentityError>;
}

pub trait UserEmailStore: UserStore {
    async fn set_email(&self, user: &mut Self::User, email: Option<&str>)
    -> Result<(), IdentityError>;
    async fn get_email(&self, user: &Self::User) -> Result<Option<String>, IdentityError>;
    async fn get_email_confirmed(&self, user: &Self::User) -> Result<bool, IdentityError>;
    async fn set_email_confirmed(
        &self,
        user: &mut Self::User,
        confirmed: bool,
    ) -> Result<(), IdentityError>;
    /// # Errors
    ///
    /// `NotUnique` when several users share the normalized email.
    async fn find_by_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<Self::User>, IdentityError>;
    async fn get_normalized_email(&self, user: &Self::User)
    -> Result<Option<String>, IdentityError>;
    async fn set_normalized_email(
        &self,
        user: &mut Self::User,
        normalized_email: Option<&str>,
    ) -> Result<(), IdentityError>;
}

pub trait UserPhoneNumberStore: UserStore {
    async fn set_phone_number(
        &self,
        user: &mut Self::User,
        phone_number: Option<&str>,
    ) -> Result<(), IdentityError>;
    async fn get_phone_number(&self, user: &Self::User) -> Result<Option<String>, IdentityError>;
    async fn get_phone_number_confirmed(&self, user: &Self::User) -> Result<bool, IdentityError>;
    async fn set_phone_number_confirmed(
        &self,
        user: &mut Self::User,
        confirmed: bool,
    ) -> Result<(), IdentityError>;
}

pub trait UserLockoutStore: UserStore {
    async fn get_lockout_end_date(
        &self,
        user: &Self::User,
    ) -> Result<Option<DateTime<Utc>>, IdentityError>;
    async fn set_lockout_end_date(
        &self,
        user: &mut Self::User,
        lockout_end: Option<DateTime<Utc>>,
    ) -> Result<(), IdentityError>;
    /// Returns the incremented count.
    async fn increment_access_failed_count(
        &self,
        user: &mut Self::User,
    ) -> Result<u32, IdentityError>;
    async fn reset_access_failed_count(&self, user: &mut Self::User)
    -> Result<(), IdentityError>;
    async fn get_access_failed_count(&self, user: &Self::User) -> Result<u32, IdentityError>;
    async fn get_lockout_enabled(&self, user: &Self::User) -> Result<bool, IdentityError>;
    async fn set_lockout_enabled(
        &self,
        user: &mut Self::User,
        enabled: bool,
    ) -> Result<(), IdentityError>;
}

pub trait UserTwoFactorStore: UserStore {
    async fn set_two_factor_enabled(
        &self,
        user: &mut Self::User,
        enabled: bool,
    ) -> Result<(), IdentityError>;
    async fn get_two_factor_enabled(&self, user: &Self::User) -> Result<bool, IdentityError>;
}

pub trait UserClaimStore: UserStore {
    /// Claims in the order they were added.
    async fn get_claims(&self, user: &Self::User) -> Result<Vec<Claim>, IdentityError>;
    async fn add_claims(&self, user: &mut Self::User, claims: &[Claim])
    -> Result<(), IdentityError>;
    /// Overwrite every record matching `claim` with `new_claim`.
    async fn replace_claim(
        &self,
        user: &mut Self::User,
        claim: &Claim,
        new_claim: &Claim,
    ) -> Result<(), IdentityError>;
    async fn remove_claims(
        &self,
        user: &mut Self::User,
        claims: &[Claim],
    ) -> Result<(), IdentityError>;
    async fn get_users_for_claim(&self, claim: &Claim) -> Result<Vec<Self::User>, IdentityError>;
}

pub trait UserLoginStore: UserStore {
    async fn add_login(&self, user: &mut Self::User, login: &LoginInfo)
    -> Result<(), IdentityError>;
    async fn remove_login(
        &self,
        user: &mut Self::User,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<(), IdentityError>;
    async fn get_logins(&self, user: &Self::User) -> Result<Vec<LoginInfo>, IdentityError>;
    async fn find_by_login(
        &self,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<Option<Self::User>, IdentityError>;
}

pub trait UserRoleStore: UserStore {
    /// # Errors
    ///
    /// `InvalidOperation` when no role has the normalized name.
    async fn add_to_role(
        &self,
        user: &mut Self::User,
        normalized_role_name: &str,
    ) -> Result<(), IdentityError>;
    async fn remove_from_role(
        &self,
        user: &mut Self::User,
        normalized_role_name: &str,
    ) -> Result<(), IdentityError>;
    async fn get_roles(&self, user: &Self::User) -> Result<Vec<String>, IdentityError>;
    async fn is_in_role(
        &self,
        user: &Self::User,
        normalized_role_name: &str,
    ) -> Result<bool, IdentityError>;
    async fn get_users_in_role(
        &self,
        normalized_role_name: &str,
    ) -> Result<Vec<Self::User>, IdentityError>;
}

pub trait UserAuthenticationTokenStore: UserStore {
    async fn set_token(
        &self,
        user: &mut Self::User,
        login_provider: &str,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), IdentityError>;
    async fn remove_token(
        &self,
        user: &mut Self::User,
        login_provider: &str,
        name: &str,
    ) -> Result<(), IdentityError>;
    async fn get_token(
        &self,
        user: &Self::User,
        login_provider: &str,
        name: &str,
    ) -> Result<Option<String>, IdentityError>;
}

pub trait UserAuthenticatorKeyStore: UserStore {
    async fn set_authenticator_key(
        &self,
        user: &mut Self::User,
        key: &str,
    ) -> Result<(), IdentityError>;
    async fn get_authenticator_key(
        &self,
        user: &Self::User,
    ) -> Result<Option<String>, IdentityError>;
}

pub trait UserTwoFactorRecoveryCodeStore: UserStore {
    async fn replace_codes(
        &self,
        user: &mut Self::User,
        recovery_codes: &[String],
    ) -> Result<(), IdentityError>;
    /// `true` when `code` was valid; it cannot be redeemed again.
    async fn redeem_code(&self, user: &mut Self::User, code: &str) -> Result<bool, IdentityError>;
    async fn count_codes(&self, user: &Self::User) -> Result<usize, IdentityError>;
}

pub trait QueryableUserStore: UserStore {
    async fn users(&self) -> Result<Vec<Self::User>, IdentityError>;
}

// ── Roles ────────────────────────────────────────────────────────────────────

pub trait RoleStore: Send + Sync {
    type Role;

    async fn create(&self, role: &mut Self::Role) -> Result<IdentityResult, IdentityError>;
    async fn update(&self, role: &mut Self::Role) -> Result<IdentityResult, IdentityError>;
    async fn delete(&self, role: &Self::Role) -> Result<IdentityResult, IdentityError>;
    async fn find_by_id(&self, role_id: &str) -> Result<Option<Self::Role>, IdentityError>;
    /// # Errors
    ///
    /// `NotUnique` when several roles share the normalized name.
    async fn find_by_name(
        &self,
        normalized_role_name: &str,
    ) -> Result<Option<Self::Role>, IdentityError>;
    async fn get_role_id(&self, role: &Self::Role) -> Result<Option<String>, IdentityError>;
    async fn get_role_name(&self, role: &Self::Role) -> Result<Option<String>, IdentityError>;
    async fn set_role_name(
        &self,
        role: &mut Self::Role,
        role_name: Option<&str>,
    ) -> Result<(), IdentityError>;
    async fn get_normalized_role_name(
        &self,
        role: &Self::Role,
    ) -> Result<Option<String>, IdentityError>;
    async fn set_normalized_role_name(
        &self,
        role: &mut Self::Role,
        normalized_name: Option<&str>,
    ) -> Result<(), IdentityError>;
}

pub trait RoleClaimStore: RoleStore {
    async fn get_claims(&self, role: &Self::Role) -> Result<Vec<Claim>, IdentityError>;
    async fn add_claim(&self, role: &mut Self::Role, claim: &Claim) -> Result<(), IdentityError>;
    /// Removes every record matching the claim's type and value.
    async fn remove_claim(&self, role: &mut Self::Role, claim: &Claim)
    -> Result<(), IdentityError>;
}

pub trait QueryableRoleStore: RoleStore {
    async fn roles(&self) -> Result<Vec<Self::Role>, IdentityError>;
}
