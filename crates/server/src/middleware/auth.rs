//! Bearer token authentication middleware.
//!
//! Checks `Authorization: Bearer <token>` headers (with a `token` cookie
//! fallback), verifies the JWT, loads the user, and sets the request's
//! user context. Requests without credentials pass through; protected
//! handlers reject them via [`require`].

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Role, User};
use crate::state::AppState;

/// Cookie carrying the JWT for browser clients.
pub const TOKEN_COOKIE: &str = "token";

/// Authenticated user context stored in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Middleware to authenticate bearer JWTs.
///
/// If a valid token is present, sets [`CurrentUser`] in request
/// extensions. If no token is present, passes through without
/// modification. If an invalid token is present, returns 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(&request) else {
        return next.run(request).await;
    };

    let claims = match state.tokens().verify(&token) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "invalid bearer token");
            return AppError::Unauthorized.into_response();
        }
    };

    let Ok(user_id) = claims.sub.parse::<Uuid>() else {
        debug!(sub = %claims.sub, "invalid user ID in token");
        return AppError::Unauthorized.into_response();
    };

    let user = match User::find_by_id(state.db(), user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!(%user_id, "token subject no longer exists");
            return AppError::Unauthorized.into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to load token subject");
            return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response();
        }
    };

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        role: user.role(),
        name: user.name,
        email: user.email,
    });

    next.run(request).await
}

/// Pull the JWT from the Authorization header or the token cookie.
fn extract_token(request: &Request<Body>) -> Option<String> {
    if let Some(header_value) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        && let Some(token) = header_value.strip_prefix("Bearer ")
    {
        return Some(token.to_string());
    }

    let cookies = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?;

    for cookie in cookies.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix("token=")
            && !value.is_empty()
        {
            return Some(value.to_string());
        }
    }

    None
}

/// Require an authenticated user on a protected handler.
pub fn require(user: Option<axum::Extension<CurrentUser>>) -> Result<CurrentUser, AppError> {
    user.map(|axum::Extension(u)| u)
        .ok_or(AppError::Unauthorized)
}

/// Require the user to hold one of the given roles.
pub fn authorize(user: &CurrentUser, roles: &[Role]) -> Result<(), AppError> {
    if roles.contains(&user.role) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "user role '{}' is not authorized to access this route",
        user.role.as_str()
    )))
}
