//! Ambient concerns shared by the Tessera crates: environment configuration
//! and tracing setup.

pub mod config;
pub mod tracing;
