//! User administration routes (admin only).

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{self, CurrentUser};
use crate::models::{CreateUser, Role, UpdateUser, User};
use crate::query::ResultEnvelope;
use crate::routes::helpers::data_response;
use crate::state::AppState;
use crate::storage::USERS;

/// List users through the query engine.
///
/// GET /api/v1/users (admin)
async fn list_users(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Query(raw): Query<Vec<(String, String)>>,
) -> AppResult<Json<ResultEnvelope>> {
    let user = middleware::require(user)?;
    middleware::authorize(&user, &[Role::Admin])?;

    let envelope = state
        .assembler()
        .advanced_results(&USERS, &raw, None)
        .await?;

    Ok(Json(envelope))
}

/// Get a single user.
///
/// GET /api/v1/users/{id} (admin)
async fn get_user(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let current = middleware::require(user)?;
    middleware::authorize(&current, &[Role::Admin])?;

    let user = User::find_by_id(state.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;

    data_response(&user)
}

/// Create a user.
///
/// POST /api/v1/users (admin)
async fn create_user(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(input): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let current = middleware::require(user)?;
    middleware::authorize(&current, &[Role::Admin])?;

    let user = User::create(state.db(), input).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "data": user })),
    ))
}

/// Update a user.
///
/// PUT /api/v1/users/{id} (admin)
async fn update_user(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUser>,
) -> AppResult<Json<serde_json::Value>> {
    let current = middleware::require(user)?;
    middleware::authorize(&current, &[Role::Admin])?;

    let user = User::update(state.db(), id, input)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;

    data_response(&user)
}

/// Delete a user.
///
/// DELETE /api/v1/users/{id} (admin)
async fn delete_user(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let current = middleware::require(user)?;
    middleware::authorize(&current, &[Role::Admin])?;

    if current.id == id {
        return Err(AppError::BadRequest(
            "cannot delete your own account".to_string(),
        ));
    }

    let deleted = User::delete(state.db(), id).await?;
    if !deleted {
        return Err(AppError::NotFound("user".to_string()));
    }

    Ok(Json(serde_json::json!({ "success": true, "data": {} })))
}

/// Create the user admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/users", get(list_users).post(create_user))
        .route(
            "/api/v1/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}
