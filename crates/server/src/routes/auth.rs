//! Authentication routes: register, login, profile, password management.
//!
//! Successful register/login responses carry the JWT both in the body and
//! as an httpOnly cookie.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::{self, CurrentUser};
use crate::models::{CreateUser, PasswordResetToken, Role, UpdateUser, User};
use crate::routes::helpers::data_response;
use crate::state::AppState;

/// Minimum accepted password length.
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
    role: Option<Role>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct UpdateDetailsRequest {
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdatePasswordRequest {
    current_password: String,
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordRequest {
    password: String,
}

/// Issue a token response with the cookie set.
fn token_response(state: &AppState, user: &User, status: StatusCode) -> AppResult<Response> {
    let token = state.tokens().issue(user.id)?;
    let cookie = format!(
        "token={token}; HttpOnly; Path=/; Max-Age={}; SameSite=Strict",
        state.tokens().lifetime_seconds()
    );

    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true, "token": token, "data": user })),
    )
        .into_response())
}

fn check_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Register a new account.
///
/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<Response> {
    check_password_strength(&input.password)?;

    // Admin accounts are provisioned through the admin surface only.
    let role = match input.role {
        Some(Role::Admin) => {
            return Err(AppError::BadRequest(
                "cannot register with the admin role".to_string(),
            ));
        }
        Some(role) => role,
        None => Role::User,
    };

    let user = User::create(
        state.db(),
        CreateUser {
            name: input.name,
            email: input.email,
            password: input.password,
            role,
        },
    )
    .await?;

    token_response(&state, &user, StatusCode::CREATED)
}

/// Log in with email and password.
///
/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Response> {
    if input.email.is_empty() || input.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let user = User::find_by_email(state.db(), &input.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !user.verify_password(&input.password) {
        return Err(AppError::InvalidCredentials);
    }

    token_response(&state, &user, StatusCode::OK)
}

/// Clear the token cookie.
///
/// GET /api/v1/auth/logout
async fn logout() -> Response {
    let cookie = "token=; HttpOnly; Path=/; Max-Age=0; SameSite=Strict";
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true, "data": {} })),
    )
        .into_response()
}

/// Get the current user.
///
/// GET /api/v1/auth/me
async fn me(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> AppResult<Json<serde_json::Value>> {
    let current = middleware::require(user)?;

    let user = User::find_by_id(state.db(), current.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    data_response(&user)
}

/// Update the current user's name and email.
///
/// PUT /api/v1/auth/updatedetails
async fn update_details(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(input): Json<UpdateDetailsRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let current = middleware::require(user)?;

    let user = User::update(
        state.db(),
        current.id,
        UpdateUser {
            name: input.name,
            email: input.email,
            role: None,
        },
    )
    .await?
    .ok_or(AppError::Unauthorized)?;

    data_response(&user)
}

/// Change the current user's password.
///
/// PUT /api/v1/auth/updatepassword
async fn update_password(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(input): Json<UpdatePasswordRequest>,
) -> AppResult<Response> {
    let current = middleware::require(user)?;
    check_password_strength(&input.new_password)?;

    let user = User::find_by_id(state.db(), current.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !user.verify_password(&input.current_password) {
        return Err(AppError::InvalidCredentials);
    }

    User::update_password(state.db(), user.id, &input.new_password).await?;
    PasswordResetToken::invalidate_for_user(state.db(), user.id).await?;

    token_response(&state, &user, StatusCode::OK)
}

/// Start the password reset flow.
///
/// POST /api/v1/auth/forgotpassword
async fn forgot_password(
    State(state): State<AppState>,
    Json(input): Json<ForgotPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let user = User::find_by_email(state.db(), &input.email)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;

    let (record, plain_token) = PasswordResetToken::create(state.db(), user.id).await?;

    if let Some(email) = state.email() {
        if let Err(e) = email.send_password_reset(&user.email, &plain_token).await {
            tracing::error!(error = %e, "failed to send password reset email");
            PasswordResetToken::mark_used(state.db(), record.id).await?;
            return Err(AppError::Internal(anyhow::anyhow!(
                "email could not be sent"
            )));
        }
    } else {
        tracing::warn!("SMTP not configured; password reset email not sent");
    }

    Ok(Json(json!({ "success": true, "data": "email sent" })))
}

/// Complete the password reset flow.
///
/// PUT /api/v1/auth/resetpassword/{token}
async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<Response> {
    check_password_strength(&input.password)?;

    let record = PasswordResetToken::find_valid(state.db(), &token)
        .await?
        .ok_or_else(|| AppError::BadRequest("invalid or expired reset token".to_string()))?;

    User::update_password(state.db(), record.user_id, &input.password).await?;
    PasswordResetToken::mark_used(state.db(), record.id).await?;
    PasswordResetToken::invalidate_for_user(state.db(), record.user_id).await?;

    let user = User::find_by_id(state.db(), record.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;

    token_response(&state, &user, StatusCode::OK)
}

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", get(logout))
        .route("/api/v1/auth/me", get(me))
        .route("/api/v1/auth/updatedetails", put(update_details))
        .route("/api/v1/auth/updatepassword", put(update_password))
        .route("/api/v1/auth/forgotpassword", post(forgot_password))
        .route("/api/v1/auth/resetpassword/{token}", put(reset_password))
}
