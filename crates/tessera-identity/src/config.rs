use serde::Deserialize;

use tessera_core::config::Config;

use crate::context::{ContextOptions, DEFAULT_ROLES_COLLECTION, DEFAULT_USERS_COLLECTION};
use crate::diagnostics::TracingDiagnostics;

/// Identity store configuration loaded from `IDENTITY_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Database URL for the sea-orm backend. Env var: `IDENTITY_DATABASE_URL`.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Commit create/update/delete immediately (default true).
    #[serde(default = "default_auto_save_changes")]
    pub auto_save_changes: bool,
    #[serde(default = "default_users_collection")]
    pub users_collection: String,
    /// Empty for a user-only context (default "roles").
    #[serde(default = "default_roles_collection")]
    pub roles_collection: String,
    /// Log context traffic through `tracing` (default false).
    #[serde(default)]
    pub diagnostics: bool,
}

fn default_auto_save_changes() -> bool {
    true
}

fn default_users_collection() -> String {
    DEFAULT_USERS_COLLECTION.to_owned()
}

fn default_roles_collection() -> String {
    DEFAULT_ROLES_COLLECTION.to_owned()
}

impl Config for IdentityConfig {
    fn prefix() -> &'static str {
        "IDENTITY_"
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            auto_save_changes: default_auto_save_changes(),
            users_collection: default_users_collection(),
            roles_collection: default_roles_collection(),
            diagnostics: false,
        }
    }
}

impl IdentityConfig {
    pub fn context_options(&self) -> ContextOptions {
        let options = ContextOptions {
            users_collection: self.users_collection.clone(),
            roles_collection: Some(self.roles_collection.clone()).filter(|c| !c.is_empty()),
            ..ContextOptions::users_only()
        };
        if self.diagnostics {
            options.diagnostics(TracingDiagnostics)
        } else {
            options
        }
    }
}
