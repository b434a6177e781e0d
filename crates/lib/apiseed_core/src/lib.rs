//! # apiseed_core
//!
//! Core domain logic for apiseed: identities, credentials, tokens, sessions,
//! the OAuth bridge, and the city/media resource stores.

pub mod access;
pub mod auth;
pub mod city;
pub mod identity;
pub mod media;
pub mod migrate;
pub mod models;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
