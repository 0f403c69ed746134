// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the trading room HTTP API.

pub mod identity;

pub use identity::{require_identity, CallerIdentity, MaybeIdentity};
