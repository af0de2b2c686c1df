use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use anyhow::Context as _;
use serde_json::Value;
use tessera_domain::{
    Claim, ClaimShape, DefaultShapes, IdentityShapes, LoginInfo, LoginShape, Role, TokenShape,
    User, UserRole, key_to_string, new_stamp, parse_key,
};

use crate::context::{DocumentSet, IdentityContext};
use crate::domain::backend::{DocumentBackend, DocumentFilter};
use crate::domain::store::{
    QueryableUserStore, UserAuthenticationTokenStore, UserAuthenticatorKeyStore, UserClaimStore,
    UserEmailStore, UserLockoutStore, UserLoginStore, UserPasswordStore, UserPhoneNumberStore,
    UserRoleStore, UserSecurityStampStore, UserStore, UserTwoFactorRecoveryCodeStore,
    UserTwoFactorStore,
};
use crate::error::{IdentityError, IdentityResult};

use super::{
    AUTHENTICATOR_KEY_TOKEN_NAME, INTERNAL_LOGIN_PROVIDER, Lifecycle, RECOVERY_CODE_TOKEN_NAME,
    RoleMode, UsersOnly, WithRoles, commit, required,
};

/// User store over the users collection of an [`IdentityContext`].
///
/// `M` selects whether role membership is available: [`WithRoles`] stores
/// implement [`UserRoleStore`], [`UsersOnly`] stores do not and never touch
/// the roles collection.
pub struct DocumentUserStore<B, S = DefaultShapes, M = WithRoles> {
    context: Arc<IdentityContext<B>>,
    auto_save_changes: bool,
    lifecycle: Lifecycle,
    _marker: PhantomData<fn() -> (S, M)>,
}

/// User store for contexts without a roles collection.
pub type DocumentUserOnlyStore<B, S = DefaultShapes> = DocumentUserStore<B, S, UsersOnly>;

impl<B, S, M> DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    pub fn new(context: Arc<IdentityContext<B>>) -> Self {
        Self {
            context,
            auto_save_changes: true,
            lifecycle: Lifecycle::default(),
            _marker: PhantomData,
        }
    }

    /// Honor `token` at the start of every operation.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.lifecycle.set_cancellation(token);
        self
    }

    pub fn context(&self) -> &Arc<IdentityContext<B>> {
        &self.context
    }

    /// Whether create, update and delete commit immediately.
    pub fn auto_save_changes(&self) -> bool {
        self.auto_save_changes
    }

    pub fn set_auto_save_changes(&mut self, auto_save_changes: bool) {
        self.auto_save_changes = auto_save_changes;
    }

    pub fn dispose(&mut self) {
        self.lifecycle.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle.is_disposed()
    }

    pub fn convert_id_from_string(&self, id: &str) -> Result<S::Key, IdentityError> {
        Ok(parse_key(id)?)
    }

    pub fn convert_id_to_string(&self, id: &S::Key) -> Option<String> {
        key_to_string(id)
    }

    fn ensure_active(&self) -> Result<(), IdentityError> {
        self.lifecycle.check(M::STORE_NAME)
    }

    fn user_set(&self) -> Result<DocumentSet<'_, B, User<S>>, IdentityError> {
        self.context.set::<User<S>>()
    }

    /// Stage an in-memory edit when the context already tracks `user`.
    async fn track(&self, user: &User<S>) -> Result<(), IdentityError> {
        self.user_set()?.track(user).await?;
        Ok(())
    }

    fn login_filter(login_provider: &str, provider_key: &str) -> DocumentFilter {
        DocumentFilter::elem_match(
            "logins",
            [
                (
                    <S::UserLogin as LoginShape<S::Key>>::PROVIDER_FIELD,
                    Value::from(login_provider),
                ),
                (
                    <S::UserLogin as LoginShape<S::Key>>::KEY_FIELD,
                    Value::from(provider_key),
                ),
            ],
        )
    }

    /// Identity-map aware lookup by native key.
    pub async fn find_user(&self, user_id: &S::Key) -> Result<Option<User<S>>, IdentityError> {
        self.ensure_active()?;
        self.user_set()?.find(user_id).await
    }

    /// The login record `(login_provider, provider_key)` of one user.
    pub async fn find_user_login(
        &self,
        user_id: &str,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<Option<S::UserLogin>, IdentityError> {
        self.ensure_active()?;
        let user_id = required(user_id, "user_id")?;
        let login_provider = required(login_provider, "login_provider")?;
        let provider_key = required(provider_key, "provider_key")?;
        let key = self.convert_id_from_string(user_id)?;
        let Some(user) = self.user_set()?.find(&key).await? else {
            return Ok(None);
        };
        Ok(user
            .logins
            .into_iter()
            .find(|login| login.is_for(login_provider, provider_key)))
    }

    /// The login record `(login_provider, provider_key)` of any user.
    pub async fn find_any_user_login(
        &self,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<Option<S::UserLogin>, IdentityError> {
        self.ensure_active()?;
        let login_provider = required(login_provider, "login_provider")?;
        let provider_key = required(provider_key, "provider_key")?;
        let users = self
            .user_set()?
            .query(&Self::login_filter(login_provider, provider_key), |user| {
                user.logins
                    .iter()
                    .any(|login| login.is_for(login_provider, provider_key))
            })
            .await?;
        Ok(users
            .into_iter()
            .flat_map(|user| user.logins)
            .find(|login| login.is_for(login_provider, provider_key)))
    }

    fn token_value(user: &User<S>, login_provider: &str, name: &str) -> Option<String> {
        user.tokens
            .iter()
            .find(|token| token.is_for(login_provider, name))
            .and_then(|token| token.value().map(str::to_owned))
    }

    fn put_token(user: &mut User<S>, login_provider: &str, name: &str, value: Option<&str>) {
        match user
            .tokens
            .iter_mut()
            .find(|token| token.is_for(login_provider, name))
        {
            Some(token) => token.set_value(value),
            None => {
                let token = S::UserToken::new(&user.id, login_provider, name, value);
                user.tokens.push(token);
            }
        }
    }

    fn recovery_codes(user: &User<S>) -> Vec<String> {
        Self::token_value(user, INTERNAL_LOGIN_PROVIDER, RECOVERY_CODE_TOKEN_NAME)
            .map(|merged| {
                merged
                    .split(';')
                    .filter(|code| !code.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<B, S> DocumentUserStore<B, S, WithRoles>
where
    B: DocumentBackend,
    S: IdentityShapes,
{
    fn role_set(&self) -> Result<DocumentSet<'_, B, Role<S>>, IdentityError> {
        self.context.set::<Role<S>>()
    }

    /// The role with the given normalized name.
    ///
    /// # Errors
    ///
    /// `NotUnique` when several roles share the name.
    pub async fn find_role(
        &self,
        normalized_role_name: &str,
    ) -> Result<Option<Role<S>>, IdentityError> {
        self.ensure_active()?;
        let name = required(normalized_role_name, "normalized_role_name")?;
        self.role_set()?
            .query_single(&DocumentFilter::eq("normalized_name", name), |role| {
                role.normalized_name.as_deref() == Some(name)
            })
            .await
    }

    /// Membership of `user_id` in `role_id`, `None` when the user is unknown
    /// or not a member.
    pub async fn find_user_role(
        &self,
        user_id: &str,
        role_id: &str,
    ) -> Result<Option<UserRole<S::Key>>, IdentityError> {
        self.ensure_active()?;
        let user_id = self.convert_id_from_string(required(user_id, "user_id")?)?;
        let role_id = self.convert_id_from_string(required(role_id, "role_id")?)?;
        let Some(user) = self.user_set()?.find(&user_id).await? else {
            return Ok(None);
        };
        Ok(user
            .roles
            .contains(&role_id)
            .then_some(UserRole { user_id, role_id }))
    }
}

impl<B, S, M> UserStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    type User = User<S>;

    async fn create(&self, user: &mut User<S>) -> Result<IdentityResult, IdentityError> {
        self.ensure_active()?;
        if user.concurrency_stamp.is_none() {
            user.concurrency_stamp = Some(new_stamp());
        }
        self.user_set()?.add(user).await?;
        commit(&self.context, self.auto_save_changes).await
    }

    async fn update(&self, user: &mut User<S>) -> Result<IdentityResult, IdentityError> {
        self.ensure_active()?;
        let mut staged = user.clone();
        let expected = staged.concurrency_stamp.replace(new_stamp());
        self.user_set()?.update_with_stamp(&staged, expected).await?;
        user.concurrency_stamp = staged.concurrency_stamp;
        commit(&self.context, self.auto_save_changes).await
    }

    async fn delete(&self, user: &User<S>) -> Result<IdentityResult, IdentityError> {
        self.ensure_active()?;
        self.user_set()?.remove(user).await?;
        commit(&self.context, self.auto_save_changes).await
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<User<S>>, IdentityError> {
        self.ensure_active()?;
        let key = self.convert_id_from_string(required(user_id, "user_id")?)?;
        self.user_set()?.find(&key).await
    }

    async fn find_by_name(
        &self,
        normalized_user_name: &str,
    ) -> Result<Option<User<S>>, IdentityError> {
        self.ensure_active()?;
        let name = required(normalized_user_name, "normalized_user_name")?;
        self.user_set()?
            .query_first(&DocumentFilter::eq("normalized_user_name", name), |user| {
                user.normalized_user_name.as_deref() == Some(name)
            })
            .await
    }

    async fn get_user_id(&self, user: &User<S>) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        Ok(self.convert_id_to_string(&user.id))
    }

    async fn get_user_name(&self, user: &User<S>) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        Ok(user.user_name.clone())
    }

    async fn set_user_name(
        &self,
        user: &mut User<S>,
        user_name: Option<&str>,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        user.user_name = user_name.map(str::to_owned);
        self.track(user).await
    }

    async fn get_normalized_user_name(
        &self,
        user: &User<S>,
    ) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        Ok(user.normalized_user_name.clone())
    }

    async fn set_normalized_user_name(
        &self,
        user: &mut User<S>,
        normalized_name: Option<&str>,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        user.normalized_user_name = normalized_name.map(str::to_owned);
        self.track(user).await
    }
}

impl<B, S, M> UserPasswordStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    async fn set_password_hash(
        &self,
        user: &mut User<S>,
        password_hash: Option<&str>,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        user.password_hash = password_hash.map(str::to_owned);
        self.track(user).await
    }

    async fn get_password_hash(&self, user: &User<S>) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        Ok(user.password_hash.clone())
    }

    async fn has_password(&self, user: &User<S>) -> Result<bool, IdentityError> {
        self.ensure_active()?;
        Ok(user.password_hash.is_some())
    }
}

impl<B, S, M> UserSecurityStampStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    async fn set_security_stamp(
        &self,
        user: &mut User<S>,
        stamp: &str,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        let stamp = required(stamp, "stamp")?;
        user.security_stamp = Some(stamp.to_owned());
        self.track(user).await
    }

    async fn get_security_stamp(&self, user: &User<S>) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        Ok(user.security_stamp.clone())
    }
}

impl<B, S, M> UserEmailStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    async fn set_email(&self, user: &mut User<S>, email: Option<&str>) -> Result<(), IdentityError> {
        self.ensure_active()?;
        user.email = email.map(str::to_owned);
        self.track(user).await
    }

    async fn get_email(&self, user: &User<S>) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        Ok(user.email.clone())
    }

    async fn get_email_confirmed(&self, user: &User<S>) -> Result<bool, IdentityError> {
        self.ensure_active()?;
        Ok(user.email_confirmed)
    }

    async fn set_email_confirmed(
        &self,
        user: &mut User<S>,
        confirmed: bool,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        user.email_confirmed = confirmed;
        self.track(user).await
    }

    async fn find_by_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<User<S>>, IdentityError> {
        self.ensure_active()?;
        let email = required(normalized_email, "normalized_email")?;
        self.user_set()?
            .query_single(&DocumentFilter::eq("normalized_email", email), |user| {
                user.normalized_email.as_deref() == Some(email)
            })
            .await
    }

    async fn get_normalized_email(&self, user: &User<S>) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        Ok(user.normalized_email.clone())
    }

    async fn set_normalized_email(
        &self,
        user: &mut User<S>,
        normalized_email: Option<&str>,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        user.normalized_email = normalized_email.map(str::to_owned);
        self.track(user).await
    }
}

impl<B, S, M> UserPhoneNumberStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    async fn set_phone_number(
        &self,
        user: &mut User<S>,
        phone_number: Option<&str>,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        user.phone_number = phone_number.map(str::to_owned);
        self.track(user).await
    }

    async fn get_phone_number(&self, user: &User<S>) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        Ok(user.phone_number.clone())
    }

    async fn get_phone_number_confirmed(&self, user: &User<S>) -> Result<bool, IdentityError> {
        self.ensure_active()?;
        Ok(user.phone_number_confirmed)
    }

    async fn set_phone_number_confirmed(
        &self,
        user: &mut User<S>,
        confirmed: bool,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        user.phone_number_confirmed = confirmed;
        self.track(user).await
    }
}

impl<B, S, M> UserLockoutStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    async fn get_lockout_end_date(
        &self,
        user: &User<S>,
    ) -> Result<Option<DateTime<Utc>>, IdentityError> {
        self.ensure_active()?;
        Ok(user.lockout_end)
    }

    async fn set_lockout_end_date(
        &self,
        user: &mut User<S>,
        lockout_end: Option<DateTime<Utc>>,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        user.lockout_end = lockout_end;
        self.track(user).await
    }

    async fn increment_access_failed_count(
        &self,
        user: &mut User<S>,
    ) -> Result<u32, IdentityError> {
        self.ensure_active()?;
        user.access_failed_count = user.access_failed_count.saturating_add(1);
        self.track(user).await?;
        Ok(user.access_failed_count)
    }

    async fn reset_access_failed_count(&self, user: &mut User<S>) -> Result<(), IdentityError> {
        self.ensure_active()?;
        user.access_failed_count = 0;
        self.track(user).await
    }

    async fn get_access_failed_count(&self, user: &User<S>) -> Result<u32, IdentityError> {
        self.ensure_active()?;
        Ok(user.access_failed_count)
    }

    async fn get_lockout_enabled(&self, user: &User<S>) -> Result<bool, IdentityError> {
        self.ensure_active()?;
        Ok(user.lockout_enabled)
    }

    async fn set_lockout_enabled(
        &self,
        user: &mut User<S>,
        enabled: bool,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        user.lockout_enabled = enabled;
        self.track(user).await
    }
}

impl<B, S, M> UserTwoFactorStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    async fn set_two_factor_enabled(
        &self,
        user: &mut User<S>,
        enabled: bool,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        user.two_factor_enabled = enabled;
        self.track(user).await
    }

    async fn get_two_factor_enabled(&self, user: &User<S>) -> Result<bool, IdentityError> {
        self.ensure_active()?;
        Ok(user.two_factor_enabled)
    }
}

// ── Claims ───────────────────────────────────────────────────────────────────

impl<B, S, M> UserClaimStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    async fn get_claims(&self, user: &User<S>) -> Result<Vec<Claim>, IdentityError> {
        self.ensure_active()?;
        Ok(user.claims.iter().map(|record| record.to_claim()).collect())
    }

    async fn add_claims(&self, user: &mut User<S>, claims: &[Claim]) -> Result<(), IdentityError> {
        self.ensure_active()?;
        for claim in claims {
            let record = S::UserClaim::from_claim(&user.id, claim);
            user.claims.push(record);
        }
        self.track(user).await
    }

    async fn replace_claim(
        &self,
        user: &mut User<S>,
        claim: &Claim,
        new_claim: &Claim,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        for record in user.claims.iter_mut().filter(|record| record.matches(claim)) {
            record.assign(new_claim);
        }
        self.track(user).await
    }

    async fn remove_claims(
        &self,
        user: &mut User<S>,
        claims: &[Claim],
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        let owner = user.id.clone();
        for claim in claims {
            user.claims
                .retain(|record| !(record.matches(claim) && *record.owner_id() == owner));
        }
        self.track(user).await
    }

    async fn get_users_for_claim(&self, claim: &Claim) -> Result<Vec<User<S>>, IdentityError> {
        self.ensure_active()?;
        let filter = DocumentFilter::elem_match(
            "claims",
            [
                (
                    <S::UserClaim as ClaimShape<S::Key>>::TYPE_FIELD,
                    Value::from(claim.claim_type.as_str()),
                ),
                (
                    <S::UserClaim as ClaimShape<S::Key>>::VALUE_FIELD,
                    Value::from(claim.value.as_str()),
                ),
            ],
        );
        self.user_set()?
            .query(&filter, |user| {
                user.claims.iter().any(|record| record.matches(claim))
            })
            .await
    }
}

// ── Logins ───────────────────────────────────────────────────────────────────

impl<B, S, M> UserLoginStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    async fn add_login(&self, user: &mut User<S>, login: &LoginInfo) -> Result<(), IdentityError> {
        self.ensure_active()?;
        required(&login.login_provider, "login_provider")?;
        required(&login.provider_key, "provider_key")?;
        let record = S::UserLogin::from_info(&user.id, login);
        user.logins.push(record);
        self.track(user).await
    }

    async fn remove_login(
        &self,
        user: &mut User<S>,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        let login_provider = required(login_provider, "login_provider")?;
        let provider_key = required(provider_key, "provider_key")?;
        if let Some(index) = user
            .logins
            .iter()
            .position(|login| login.is_for(login_provider, provider_key))
        {
            user.logins.remove(index);
        }
        self.track(user).await
    }

    async fn get_logins(&self, user: &User<S>) -> Result<Vec<LoginInfo>, IdentityError> {
        self.ensure_active()?;
        Ok(user.logins.iter().map(|login| login.to_info()).collect())
    }

    async fn find_by_login(
        &self,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<Option<User<S>>, IdentityError> {
        self.ensure_active()?;
        if login_provider.is_empty() || provider_key.is_empty() {
            return Ok(None);
        }
        self.user_set()?
            .query_first(&Self::login_filter(login_provider, provider_key), |user| {
                user.logins
                    .iter()
                    .any(|login| login.is_for(login_provider, provider_key))
            })
            .await
    }
}

// ── Roles ────────────────────────────────────────────────────────────────────

impl<B, S> UserRoleStore for DocumentUserStore<B, S, WithRoles>
where
    B: DocumentBackend,
    S: IdentityShapes,
{
    async fn add_to_role(
        &self,
        user: &mut User<S>,
        normalized_role_name: &str,
    ) -> Result<(), IdentityError> {
        let Some(role) = self.find_role(normalized_role_name).await? else {
            return Err(IdentityError::InvalidOperation(format!(
                "Role {normalized_role_name} does not exist"
            )));
        };
        if !user.roles.contains(&role.id) {
            user.roles.push(role.id);
        }
        self.track(user).await
    }

    async fn remove_from_role(
        &self,
        user: &mut User<S>,
        normalized_role_name: &str,
    ) -> Result<(), IdentityError> {
        if let Some(role) = self.find_role(normalized_role_name).await? {
            user.roles.retain(|id| *id != role.id);
        }
        self.track(user).await
    }

    async fn get_roles(&self, user: &User<S>) -> Result<Vec<String>, IdentityError> {
        self.ensure_active()?;
        let roles = self
            .role_set()?
            .filter(|role| user.roles.contains(&role.id))
            .await?;
        Ok(roles.into_iter().filter_map(|role| role.name).collect())
    }

    async fn is_in_role(
        &self,
        user: &User<S>,
        normalized_role_name: &str,
    ) -> Result<bool, IdentityError> {
        Ok(self
            .find_role(normalized_role_name)
            .await?
            .is_some_and(|role| user.roles.contains(&role.id)))
    }

    async fn get_users_in_role(
        &self,
        normalized_role_name: &str,
    ) -> Result<Vec<User<S>>, IdentityError> {
        let Some(role) = self.find_role(normalized_role_name).await? else {
            return Ok(Vec::new());
        };
        let role_id = serde_json::to_value(&role.id).context("encode role id")?;
        self.user_set()?
            .query(&DocumentFilter::eq("roles", role_id), |user| {
                user.roles.contains(&role.id)
            })
            .await
    }
}

// ── Tokens ───────────────────────────────────────────────────────────────────

impl<B, S, M> UserAuthenticationTokenStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    async fn set_token(
        &self,
        user: &mut User<S>,
        login_provider: &str,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        let login_provider = required(login_provider, "login_provider")?;
        let name = required(name, "name")?;
        Self::put_token(user, login_provider, name, value);
        self.track(user).await
    }

    async fn remove_token(
        &self,
        user: &mut User<S>,
        login_provider: &str,
        name: &str,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        let login_provider = required(login_provider, "login_provider")?;
        let name = required(name, "name")?;
        user.tokens
            .retain(|token| !token.is_for(login_provider, name));
        self.track(user).await
    }

    async fn get_token(
        &self,
        user: &User<S>,
        login_provider: &str,
        name: &str,
    ) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        let login_provider = required(login_provider, "login_provider")?;
        let name = required(name, "name")?;
        Ok(Self::token_value(user, login_provider, name))
    }
}

impl<B, S, M> UserAuthenticatorKeyStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    async fn set_authenticator_key(
        &self,
        user: &mut User<S>,
        key: &str,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        Self::put_token(
            user,
            INTERNAL_LOGIN_PROVIDER,
            AUTHENTICATOR_KEY_TOKEN_NAME,
            Some(key),
        );
        self.track(user).await
    }

    async fn get_authenticator_key(&self, user: &User<S>) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        Ok(Self::token_value(
            user,
            INTERNAL_LOGIN_PROVIDER,
            AUTHENTICATOR_KEY_TOKEN_NAME,
        ))
    }
}

impl<B, S, M> UserTwoFactorRecoveryCodeStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    async fn replace_codes(
        &self,
        user: &mut User<S>,
        recovery_codes: &[String],
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        let merged = recovery_codes.join(";");
        Self::put_token(
            user,
            INTERNAL_LOGIN_PROVIDER,
            RECOVERY_CODE_TOKEN_NAME,
            Some(&merged),
        );
        self.track(user).await
    }

    async fn redeem_code(&self, user: &mut User<S>, code: &str) -> Result<bool, IdentityError> {
        self.ensure_active()?;
        let code = required(code, "code")?;
        let mut codes = Self::recovery_codes(user);
        let Some(index) = codes.iter().position(|c| c == code) else {
            return Ok(false);
        };
        codes.remove(index);
        let merged = codes.join(";");
        Self::put_token(
            user,
            INTERNAL_LOGIN_PROVIDER,
            RECOVERY_CODE_TOKEN_NAME,
            Some(&merged),
        );
        self.track(user).await?;
        Ok(true)
    }

    async fn count_codes(&self, user: &User<S>) -> Result<usize, IdentityError> {
        self.ensure_active()?;
        Ok(Self::recovery_codes(user).len())
    }
}

impl<B, S, M> QueryableUserStore for DocumentUserStore<B, S, M>
where
    B: DocumentBackend,
    S: IdentityShapes,
    M: RoleMode,
{
    async fn users(&self) -> Result<Vec<User<S>>, IdentityError> {
        self.ensure_active()?;
        self.user_set()?.to_list().await
    }
}
