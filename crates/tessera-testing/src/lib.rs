//! Test utilities for Tessera crates.
//!
//! Provides the fixture loader, test document shapes and a shared in-memory
//! database. Import from tests only, never from production code.

pub mod database;
pub mod fixture;
pub mod shapes;
