//! HTTP middleware components.

pub mod auth;

pub use auth::{CurrentUser, authenticate, authorize, require};
