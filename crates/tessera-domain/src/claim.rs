//! Claims and the embedded records that store them.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::id::IdentityKey;

/// A type/value statement about a principal, as handed over by the identity framework.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }

    /// `true` when the type and value are both equal to `other`'s.
    pub fn matches(&self, claim_type: &str, value: &str) -> bool {
        self.claim_type == claim_type && self.value == value
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.claim_type, self.value)
    }
}

/// Contract for a claim record embedded in its owner's document.
///
/// Applications with extra per-claim fields implement this for their own
/// record and name it in their `IdentityShapes`.
pub trait ClaimShape<K: IdentityKey>:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Serialized member names of the type and value, used to select owners
    /// by claim on the backend.
    const TYPE_FIELD: &'static str = "claim_type";
    const VALUE_FIELD: &'static str = "claim_value";

    /// Build a record owned by `owner` from a framework claim.
    fn from_claim(owner: &K, claim: &Claim) -> Self;
    fn owner_id(&self) -> &K;
    fn claim_type(&self) -> &str;
    fn claim_value(&self) -> &str;
    /// Overwrite type and value in place, keeping any extra fields.
    fn assign(&mut self, claim: &Claim);

    fn to_claim(&self) -> Claim {
        Claim::new(self.claim_type(), self.claim_value())
    }

    fn matches(&self, claim: &Claim) -> bool {
        self.claim_type() == claim.claim_type && self.claim_value() == claim.value
    }
}

/// Default claim record embedded on a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "K: IdentityKey")]
pub struct UserClaim<K> {
    pub user_id: K,
    pub claim_type: String,
    pub claim_value: String,
}

impl<K: IdentityKey> ClaimShape<K> for UserClaim<K> {
    fn from_claim(owner: &K, claim: &Claim) -> Self {
        Self {
            user_id: owner.clone(),
            claim_type: claim.claim_type.clone(),
            claim_value: claim.value.clone(),
        }
    }

    fn owner_id(&self) -> &K {
        &self.user_id
    }

    fn claim_type(&self) -> &str {
        &self.claim_type
    }

    fn claim_value(&self) -> &str {
        &self.claim_value
    }

    fn assign(&mut self, claim: &Claim) {
        self.claim_type = claim.claim_type.clone();
        self.claim_value = claim.value.clone();
    }
}

/// Default claim record embedded on a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "K: IdentityKey")]
pub struct RoleClaim<K> {
    pub role_id: K,
    pub claim_type: String,
    pub claim_value: String,
}

impl<K: IdentityKey> ClaimShape<K> for RoleClaim<K> {
    fn from_claim(owner: &K, claim: &Claim) -> Self {
        Self {
            role_id: owner.clone(),
            claim_type: claim.claim_type.clone(),
            claim_value: claim.value.clone(),
        }
    }

    fn owner_id(&self) -> &K {
        &self.role_id
    }

    fn claim_type(&self) -> &str {
        &self.claim_type
    }

    fn claim_value(&self) -> &str {
        &self.claim_value
    }

    fn assign(&mut self, claim: &Claim) {
        self.claim_type = claim.claim_type.clone();
        self.claim_value = claim.value.clone();
    }
}
