use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use tessera_domain::{
    Claim, ClaimShape, DefaultShapes, IdentityShapes, Role, key_to_string, new_stamp, parse_key,
};

use crate::context::{DocumentSet, IdentityContext};
use crate::domain::backend::{DocumentBackend, DocumentFilter};
use crate::domain::store::{QueryableRoleStore, RoleClaimStore, RoleStore};
use crate::error::{IdentityError, IdentityResult};

use super::{Lifecycle, commit, required};

const STORE_NAME: &str = "DocumentRoleStore";

/// Role store over the roles collection of an [`IdentityContext`].
pub struct DocumentRoleStore<B, S = DefaultShapes> {
    context: Arc<IdentityContext<B>>,
    auto_save_changes: bool,
    lifecycle: Lifecycle,
    _marker: PhantomData<fn() -> S>,
}

impl<B, S> DocumentRoleStore<B, S>
where
    B: DocumentBackend,
    S: IdentityShapes,
{
    pub fn new(context: Arc<IdentityContext<B>>) -> Self {
        Self {
            context,
            auto_save_changes: true,
            lifecycle: Lifecycle::default(),
            _marker: PhantomData,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.lifecycle.set_cancellation(token);
        self
    }

    pub fn context(&self) -> &Arc<IdentityContext<B>> {
        &self.context
    }

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
        self.lifecycle.check(STORE_NAME)
    }

    fn role_set(&self) -> Result<DocumentSet<'_, B, Role<S>>, IdentityError> {
        self.context.set::<Role<S>>()
    }

    /// Stage an in-memory edit when the context already tracks `role`.
    async fn track(&self, role: &Role<S>) -> Result<(), IdentityError> {
        self.role_set()?.track(role).await?;
        Ok(())
    }
}

impl<B, S> RoleStore for DocumentRoleStore<B, S>
where
    B: DocumentBackend,
    S: IdentityShapes,
{
    type Role = Role<S>;

    async fn create(&self, role: &mut Role<S>) -> Result<IdentityResult, IdentityError> {
        self.ensure_active()?;
        if role.concurrency_stamp.is_none() {
            role.concurrency_stamp = Some(new_stamp());
        }
        self.role_set()?.add(role).await?;
        commit(&self.context, self.auto_save_changes).await
    }

    async fn update(&self, role: &mut Role<S>) -> Result<IdentityResult, IdentityError> {
        self.ensure_active()?;
        let mut staged = role.clone();
        let expected = staged.concurrency_stamp.replace(new_stamp());
        self.role_set()?.update_with_stamp(&staged, expected).await?;
        role.concurrency_stamp = staged.concurrency_stamp;
        commit(&self.context, self.auto_save_changes).await
    }

    async fn delete(&self, role: &Role<S>) -> Result<IdentityResult, IdentityError> {
        self.ensure_active()?;
        self.role_set()?.remove(role).await?;
        commit(&self.context, self.auto_save_changes).await
    }

    async fn find_by_id(&self, role_id: &str) -> Result<Option<Role<S>>, IdentityError> {
        self.ensure_active()?;
        let key = self.convert_id_from_string(required(role_id, "role_id")?)?;
        self.role_set()?.find(&key).await
    }

    async fn find_by_name(
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

    async fn get_role_id(&self, role: &Role<S>) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        Ok(self.convert_id_to_string(&role.id))
    }

    async fn get_role_name(&self, role: &Role<S>) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        Ok(role.name.clone())
    }

    async fn set_role_name(
        &self,
        role: &mut Role<S>,
        role_name: Option<&str>,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        role.name = role_name.map(str::to_owned);
        self.track(role).await
    }

    async fn get_normalized_role_name(
        &self,
        role: &Role<S>,
    ) -> Result<Option<String>, IdentityError> {
        self.ensure_active()?;
        Ok(role.normalized_name.clone())
    }

    async fn set_normalized_role_name(
        &self,
        role: &mut Role<S>,
        normalized_name: Option<&str>,
    ) -> Result<(), IdentityError> {
        self.ensure_active()?;
        role.normalized_name = normalized_name.map(str::to_owned);
        self.track(role).await
    }
}

impl<B, S> RoleClaimStore for DocumentRoleStore<B, S>
where
    B: DocumentBackend,
    S: IdentityShapes,
{
    async fn get_claims(&self, role: &Role<S>) -> Result<Vec<Claim>, IdentityError> {
        self.ensure_active()?;
        Ok(role.claims.iter().map(|record| record.to_claim()).collect())
    }

    async fn add_claim(&self, role: &mut Role<S>, claim: &Claim) -> Result<(), IdentityError> {
        self.ensure_active()?;
        let record = S::RoleClaim::from_claim(&role.id, claim);
        role.claims.push(record);
        self.track(role).await
    }

    async fn remove_claim(&self, role: &mut Role<S>, claim: &Claim) -> Result<(), IdentityError> {
        self.ensure_active()?;
        role.claims.retain(|record| !record.matches(claim));
        self.track(role).await
    }
}

impl<B, S> QueryableRoleStore for DocumentRoleStore<B, S>
where
    B: DocumentBackend,
    S: IdentityShapes,
{
    async fn roles(&self) -> Result<Vec<Role<S>>, IdentityError> {
        self.ensure_active()?;
        self.role_set()?.to_list().await
    }
}
