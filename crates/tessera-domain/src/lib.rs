//! Identity entity model shared by every Tessera crate.
//!
//! This crate contains only pure types with no storage dependencies.
//! Stores and backends live in `tessera-identity`; nothing here performs I/O.

pub mod claim;
pub mod error;
pub mod id;
pub mod login;
pub mod normalize;
pub mod role;
pub mod shapes;
pub mod token;
pub mod user;

pub use claim::{Claim, ClaimShape, RoleClaim, UserClaim};
pub use error::DomainError;
pub use id::{GenerateKey, IdentityKey, KeyParseError, key_to_string, new_stamp, parse_key};
pub use login::{LoginInfo, LoginShape, UserLogin};
pub use normalize::normalize;
pub use role::{IdentityRole, Role};
pub use shapes::{DefaultShapes, IdentityShapes, NoProfile};
pub use token::{TokenShape, UserToken};
pub use user::{IdentityUser, User, UserRole};
