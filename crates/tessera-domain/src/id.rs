//! Document key handling.
//!
//! Stores receive identifiers as strings from the identity framework and
//! convert them to the shape's native key type.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// A primary key usable for users and roles.
///
/// Implemented for every type with the required capabilities, so `String`,
/// the integer types and `Uuid` all work out of the box.
pub trait IdentityKey:
    Clone
    + fmt::Debug
    + fmt::Display
    + Default
    + PartialEq
    + Eq
    + Hash
    + FromStr<Err: fmt::Display>
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> IdentityKey for T where
    T: Clone
        + fmt::Debug
        + fmt::Display
        + Default
        + PartialEq
        + Eq
        + Hash
        + FromStr<Err: fmt::Display>
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// A non-empty identifier string that does not parse as the key type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{input}' is not a valid {key_type}: {reason}")]
pub struct KeyParseError {
    pub input: String,
    pub key_type: &'static str,
    pub reason: String,
}

/// Convert a framework-supplied identifier into the native key.
///
/// An empty string is the absent identifier and maps to the key's default
/// value (`""`, `0`, nil UUID).
pub fn parse_key<K: IdentityKey>(value: &str) -> Result<K, KeyParseError> {
    if value.is_empty() {
        return Ok(K::default());
    }
    value.parse::<K>().map_err(|e| KeyParseError {
        input: value.to_owned(),
        key_type: std::any::type_name::<K>(),
        reason: e.to_string(),
    })
}

/// Render a key for the identity framework. The default key renders as `None`.
pub fn key_to_string<K: IdentityKey>(key: &K) -> Option<String> {
    if *key == K::default() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Keys the store can mint for new entities.
pub trait GenerateKey: IdentityKey {
    fn generate() -> Self;
}

impl GenerateKey for String {
    fn generate() -> Self {
        Uuid::new_v4().to_string()
    }
}

impl GenerateKey for Uuid {
    fn generate() -> Self {
        Uuid::now_v7()
    }
}

/// Fresh random value for security and concurrency stamps.
pub fn new_stamp() -> String {
    Uuid::new_v4().to_string()
}
