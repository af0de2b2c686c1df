//! Named authentication tokens scoped to a user and provider.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::id::IdentityKey;

/// Contract for a token record embedded in a user document.
///
/// A user holds at most one token per `(login_provider, name)`.
pub trait TokenShape<K: IdentityKey>:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn new(owner: &K, login_provider: &str, name: &str, value: Option<&str>) -> Self;
    fn owner_id(&self) -> &K;
    fn login_provider(&self) -> &str;
    fn name(&self) -> &str;
    fn value(&self) -> Option<&str>;
    fn set_value(&mut self, value: Option<&str>);

    fn is_for(&self, login_provider: &str, name: &str) -> bool {
        self.login_provider() == login_provider && self.name() == name
    }
}

/// Default token record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "K: IdentityKey")]
pub struct UserToken<K> {
    pub user_id: K,
    pub login_provider: String,
    pub name: String,
    pub value: Option<String>,
}

impl<K: IdentityKey> TokenShape<K> for UserToken<K> {
    fn new(owner: &K, login_provider: &str, name: &str, value: Option<&str>) -> Self {
        Self {
            user_id: owner.clone(),
            login_provider: login_provider.to_owned(),
            name: name.to_owned(),
            value: value.map(str::to_owned),
        }
    }

    fn owner_id(&self) -> &K {
        &self.user_id
    }

    fn login_provider(&self) -> &str {
        &self.login_provider
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn set_value(&mut self, value: Option<&str>) {
        self.value = value.map(str::to_owned);
    }
}
