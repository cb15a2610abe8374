//! Shared test utilities for the depot workspace
//!
//! Test-only helpers; unwrapping here is deliberate so failures surface as
//! test panics with useful messages.

pub mod store;

pub use store::{TestStore, memory_store};
