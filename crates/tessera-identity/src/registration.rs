//! Wiring stores to shapes at startup.
//!
//! Applications register each shapes type once, asking for user stores only
//! or for user and role stores. The registration is checked against the
//! context options immediately, so a role registration against a context
//! without a roles collection fails at startup instead of on first use.
//!
//! ```no_run
//! # async fn run() -> Result<(), tessera_identity::IdentityError> {
//! use tessera_domain::DefaultShapes;
//! use tessera_identity::{ContextOptions, IdentityBuilder, MemoryDocumentBackend};
//!
//! let services = IdentityBuilder::new(MemoryDocumentBackend::new(), ContextOptions::with_roles())
//!     .add_stores::<DefaultShapes>()?
//!     .build();
//!
//! let scope = services.scope();
//! let users = scope.user_store::<DefaultShapes>()?.into_with_roles();
//! # Ok(())
//! # }
//! ```

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context as _;
use sea_orm::Database;
use tokio_util::sync::CancellationToken;

use tessera_domain::IdentityShapes;

use crate::config::IdentityConfig;
use crate::context::{ContextOptions, IdentityContext};
use crate::domain::backend::DocumentBackend;
use crate::error::IdentityError;
use crate::infra::db::DbDocumentBackend;
use crate::store::{DocumentRoleStore, DocumentUserOnlyStore, DocumentUserStore};

/// What a registration asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDescriptor {
    pub shapes: &'static str,
    pub key: &'static str,
    pub roles: bool,
}

impl StoreDescriptor {
    pub fn of<S: IdentityShapes>(roles: bool) -> Self {
        Self {
            shapes: type_name::<S>(),
            key: type_name::<S::Key>(),
            roles,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreVariant {
    UserOnly,
    UserAndRole,
}

/// Pick the store variant for a registration.
///
/// # Errors
///
/// `Configuration` when roles are requested from a context without a roles
/// collection.
pub fn select_variant(
    descriptor: &StoreDescriptor,
    options: &ContextOptions,
) -> Result<StoreVariant, IdentityError> {
    match (descriptor.roles, options.has_roles()) {
        (false, _) => Ok(StoreVariant::UserOnly),
        (true, true) => Ok(StoreVariant::UserAndRole),
        (true, false) => Err(IdentityError::Configuration(format!(
            "{} requests role stores but the context has no roles collection",
            descriptor.shapes
        ))),
    }
}

#[derive(Debug, Clone)]
struct StoreRegistration {
    descriptor: StoreDescriptor,
    variant: StoreVariant,
}

type Registry = HashMap<TypeId, StoreRegistration>;

pub struct IdentityBuilder<B> {
    backend: Arc<B>,
    options: ContextOptions,
    auto_save_changes: bool,
    registry: Registry,
}

impl<B: DocumentBackend> IdentityBuilder<B> {
    pub fn new(backend: B, options: ContextOptions) -> Self {
        Self {
            backend: Arc::new(backend),
            options,
            auto_save_changes: true,
            registry: HashMap::new(),
        }
    }

    /// Builder with options and auto-save taken from `config`.
    pub fn from_config(backend: B, config: &IdentityConfig) -> Self {
        Self::new(backend, config.context_options()).auto_save_changes(config.auto_save_changes)
    }

    /// Auto-save setting handed to every resolved store.
    pub fn auto_save_changes(mut self, auto_save_changes: bool) -> Self {
        self.auto_save_changes = auto_save_changes;
        self
    }

    /// Register a user store without role membership for `S`.
    pub fn add_user_stores<S: IdentityShapes>(self) -> Result<Self, IdentityError> {
        self.register::<S>(false)
    }

    /// Register user and role stores for `S`.
    pub fn add_stores<S: IdentityShapes>(self) -> Result<Self, IdentityError> {
        self.register::<S>(true)
    }

    fn register<S: IdentityShapes>(mut self, roles: bool) -> Result<Self, IdentityError> {
        let descriptor = StoreDescriptor::of::<S>(roles);
        let variant = select_variant(&descriptor, &self.options)?;
        // First registration of a shapes type wins.
        if let std::collections::hash_map::Entry::Vacant(entry) =
            self.registry.entry(TypeId::of::<S>())
        {
            tracing::debug!(shapes = descriptor.shapes, ?variant, "registered identity stores");
            entry.insert(StoreRegistration {
                descriptor,
                variant,
            });
        }
        Ok(self)
    }

    pub fn build(self) -> IdentityServices<B> {
        IdentityServices {
            inner: Arc::new(ServicesInner {
                backend: self.backend,
                options: self.options,
                auto_save_changes: self.auto_save_changes,
                registry: self.registry,
            }),
        }
    }
}

/// Open the sea-orm backend named by `config.database_url`.
pub async fn connect(
    config: &IdentityConfig,
) -> Result<IdentityBuilder<DbDocumentBackend>, IdentityError> {
    let url = config.database_url.as_deref().ok_or_else(|| {
        IdentityError::Configuration("IDENTITY_DATABASE_URL is not set".to_owned())
    })?;
    let db = Database::connect(url)
        .await
        .context("connect identity database")?;
    Ok(IdentityBuilder::from_config(
        DbDocumentBackend { db },
        config,
    ))
}

struct ServicesInner<B> {
    backend: Arc<B>,
    options: ContextOptions,
    auto_save_changes: bool,
    registry: Registry,
}

/// Registered stores, shared across requests.
pub struct IdentityServices<B> {
    inner: Arc<ServicesInner<B>>,
}

impl<B> Clone for IdentityServices<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: DocumentBackend> IdentityServices<B> {
    pub fn descriptor<S: IdentityShapes>(&self) -> Option<&StoreDescriptor> {
        self.inner
            .registry
            .get(&TypeId::of::<S>())
            .map(|registration| &registration.descriptor)
    }

    pub fn variant<S: IdentityShapes>(&self) -> Option<StoreVariant> {
        self.inner
            .registry
            .get(&TypeId::of::<S>())
            .map(|registration| registration.variant)
    }

    /// A request scope with a fresh context.
    pub fn scope(&self) -> IdentityScope<B> {
        self.scope_with_cancellation(CancellationToken::new())
    }

    pub fn scope_with_cancellation(&self, cancellation: CancellationToken) -> IdentityScope<B> {
        let context = IdentityContext::new(
            Arc::clone(&self.inner.backend),
            self.inner.options.clone(),
        );
        IdentityScope {
            context: Arc::new(context),
            services: self.clone(),
            cancellation,
        }
    }
}

/// One unit of work: a context plus the stores resolved against it.
pub struct IdentityScope<B> {
    context: Arc<IdentityContext<B>>,
    services: IdentityServices<B>,
    cancellation: CancellationToken,
}

impl<B: DocumentBackend> IdentityScope<B> {
    pub fn context(&self) -> &Arc<IdentityContext<B>> {
        &self.context
    }

    fn registration<S: IdentityShapes>(&self) -> Result<&StoreRegistration, IdentityError> {
        self.services
            .inner
            .registry
            .get(&TypeId::of::<S>())
            .ok_or_else(|| {
                IdentityError::Configuration(format!(
                    "no identity stores registered for {}",
                    type_name::<S>()
                ))
            })
    }

    /// The user store selected when `S` was registered.
    pub fn user_store<S: IdentityShapes>(&self) -> Result<ResolvedUserStore<B, S>, IdentityError> {
        let auto_save_changes = self.services.inner.auto_save_changes;
        let resolved = match self.registration::<S>()?.variant {
            StoreVariant::UserOnly => {
                let mut store = DocumentUserOnlyStore::new(Arc::clone(&self.context))
                    .with_cancellation(self.cancellation.clone());
                store.set_auto_save_changes(auto_save_changes);
                ResolvedUserStore::UserOnly(store)
            }
            StoreVariant::UserAndRole => {
                let mut store = DocumentUserStore::new(Arc::clone(&self.context))
                    .with_cancellation(self.cancellation.clone());
                store.set_auto_save_changes(auto_save_changes);
                ResolvedUserStore::WithRoles(store)
            }
        };
        Ok(resolved)
    }

    /// # Errors
    ///
    /// `Configuration` when `S` is unregistered or was registered without roles.
    pub fn role_store<S: IdentityShapes>(&self) -> Result<DocumentRoleStore<B, S>, IdentityError> {
        let registration = self.registration::<S>()?;
        if registration.variant != StoreVariant::UserAndRole {
            return Err(IdentityError::Configuration(format!(
                "{} was registered without role stores",
                registration.descriptor.shapes
            )));
        }
        let mut store = DocumentRoleStore::new(Arc::clone(&self.context))
            .with_cancellation(self.cancellation.clone());
        store.set_auto_save_changes(self.services.inner.auto_save_changes);
        Ok(store)
    }
}

/// A user store in the variant chosen at registration.
pub enum ResolvedUserStore<B, S> {
    UserOnly(DocumentUserOnlyStore<B, S>),
    WithRoles(DocumentUserStore<B, S>),
}

impl<B, S> ResolvedUserStore<B, S> {
    pub fn variant(&self) -> StoreVariant {
        match self {
            Self::UserOnly(_) => StoreVariant::UserOnly,
            Self::WithRoles(_) => StoreVariant::UserAndRole,
        }
    }

    pub fn into_user_only(self) -> Option<DocumentUserOnlyStore<B, S>> {
        match self {
            Self::UserOnly(store) => Some(store),
            Self::WithRoles(_) => None,
        }
    }

    pub fn into_with_roles(self) -> Option<DocumentUserStore<B, S>> {
        match self {
            Self::WithRoles(store) => Some(store),
            Self::UserOnly(_) => None,
        }
    }
}
