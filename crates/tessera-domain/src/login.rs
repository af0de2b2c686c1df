//! External login provider linkage.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::id::IdentityKey;

/// A login as reported by an external provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoginInfo {
    pub login_provider: String,
    /// Opaque identifier issued by the provider.
    pub provider_key: String,
    pub provider_display_name: Option<String>,
}

impl LoginInfo {
    pub fn new(
        login_provider: impl Into<String>,
        provider_key: impl Into<String>,
        provider_display_name: Option<String>,
    ) -> Self {
        Self {
            login_provider: login_provider.into(),
            provider_key: provider_key.into(),
            provider_display_name,
        }
    }
}

/// Contract for a login record embedded in a user document.
pub trait LoginShape<K: IdentityKey>:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Serialized member names of the provider and key.
    const PROVIDER_FIELD: &'static str = "login_provider";
    const KEY_FIELD: &'static str = "provider_key";

    fn from_info(owner: &K, info: &LoginInfo) -> Self;
    fn owner_id(&self) -> &K;
    fn login_provider(&self) -> &str;
    fn provider_key(&self) -> &str;
    fn provider_display_name(&self) -> Option<&str>;

    fn to_info(&self) -> LoginInfo {
        LoginInfo::new(
            self.login_provider(),
            self.provider_key(),
            self.provider_display_name().map(str::to_owned),
        )
    }

    fn is_for(&self, login_provider: &str, provider_key: &str) -> bool {
        self.login_provider() == login_provider && self.provider_key() == provider_key
    }
}

/// Default login record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "K: IdentityKey")]
pub struct UserLogin<K> {
    pub user_id: K,
    pub login_provider: String,
    pub provider_key: String,
    pub provider_display_name: Option<String>,
}

impl<K: IdentityKey> LoginShape<K> for UserLogin<K> {
    fn from_info(owner: &K, info: &LoginInfo) -> Self {
        Self {
            user_id: owner.clone(),
            login_provider: info.login_provider.clone(),
            provider_key: info.provider_key.clone(),
            provider_display_name: info.provider_display_name.clone(),
        }
    }

    fn owner_id(&self) -> &K {
        &self.user_id
    }

    fn login_provider(&self) -> &str {
        &self.login_provider
    }

    fn provider_key(&self) -> &str {
        &self.provider_key
    }

    fn provider_display_name(&self) -> Option<&str> {
        self.provider_display_name.as_deref()
    }
}
