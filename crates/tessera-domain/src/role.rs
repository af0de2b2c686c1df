//! Role document.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::{GenerateKey, new_stamp};
use crate::normalize::normalize;
use crate::shapes::{DefaultShapes, IdentityShapes};

/// A named permission group. Users reference roles by id; roles hold no
/// back-references to their members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "S: IdentityShapes", default)]
pub struct Role<S: IdentityShapes = DefaultShapes> {
    pub id: S::Key,
    pub name: Option<String>,
    pub normalized_name: Option<String>,
    pub concurrency_stamp: Option<String>,
    pub claims: Vec<S::RoleClaim>,
}

// Hand-written so the embedded claim type need not implement `Default`.
impl<S: IdentityShapes> Default for Role<S> {
    fn default() -> Self {
        Self {
            id: Default::default(),
            name: None,
            normalized_name: None,
            concurrency_stamp: None,
            claims: Vec::new(),
        }
    }
}

impl<S: IdentityShapes> Role<S> {
    pub fn new(id: S::Key, name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::EmptyRoleName);
        }
        Ok(Self {
            id,
            normalized_name: Some(normalize(&name)),
            name: Some(name),
            concurrency_stamp: Some(new_stamp()),
            claims: Vec::new(),
        })
    }
}

impl<S> Role<S>
where
    S: IdentityShapes,
    S::Key: GenerateKey,
{
    pub fn with_name(name: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(S::Key::generate(), name)
    }
}

impl<S: IdentityShapes> fmt::Display for Role<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_deref().unwrap_or_default())
    }
}

/// String-keyed role with default claim records.
pub type IdentityRole = Role<DefaultShapes<String>>;
