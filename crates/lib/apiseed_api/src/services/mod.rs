//! Application services used by the handlers.

pub mod auth;
pub mod cookies;
