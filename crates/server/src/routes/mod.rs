//! HTTP route handlers.

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod health;
pub mod helpers;
pub mod reviews;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Assemble the full API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(bootcamps::router())
        .merge(courses::router())
        .merge(reviews::router())
        .merge(users::router())
}
