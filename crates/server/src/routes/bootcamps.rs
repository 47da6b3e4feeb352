//! Bootcamp routes.
//!
//! Listing runs through the query engine with courses populated; writes
//! require the publisher or admin role and ownership of the record.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{self, CurrentUser};
use crate::models::{Bootcamp, CreateBootcamp, Role, UpdateBootcamp};
use crate::query::{RelationSpec, ResultEnvelope};
use crate::routes::helpers::{data_response, ensure_owner, list_response};
use crate::state::AppState;
use crate::storage::BOOTCAMPS;

/// List bootcamps through the query engine.
///
/// GET /api/v1/bootcamps
async fn list_bootcamps(
    State(state): State<AppState>,
    Query(raw): Query<Vec<(String, String)>>,
) -> AppResult<Json<ResultEnvelope>> {
    let populate = RelationSpec::new("courses", &["title", "description", "tuition", "weeks"]);
    let envelope = state
        .assembler()
        .advanced_results(&BOOTCAMPS, &raw, Some(&populate))
        .await?;

    Ok(Json(envelope))
}

/// Get a single bootcamp.
///
/// GET /api/v1/bootcamps/{id}
async fn get_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let bootcamp = Bootcamp::find_by_id(state.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("bootcamp".to_string()))?;

    data_response(&bootcamp)
}

/// Create a bootcamp.
///
/// POST /api/v1/bootcamps (publisher/admin)
async fn create_bootcamp(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(input): Json<CreateBootcamp>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let user = middleware::require(user)?;
    middleware::authorize(&user, &[Role::Publisher, Role::Admin])?;

    // A publisher may own at most one bootcamp; admins are exempt.
    if user.role == Role::Publisher
        && Bootcamp::find_by_owner(state.db(), user.id).await?.is_some()
    {
        return Err(AppError::BadRequest(format!(
            "the user {} has already published a bootcamp",
            user.name
        )));
    }

    let location = match state.geocoder().geocode(&input.address).await {
        Ok(location) => Some(location.as_document()),
        Err(e) => {
            tracing::warn!(error = %e, "geocoding failed; storing bootcamp without location");
            None
        }
    };

    let bootcamp = Bootcamp::create(state.db(), user.id, input, location).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "data": bootcamp })),
    ))
}

/// Update a bootcamp.
///
/// PUT /api/v1/bootcamps/{id} (owner/admin)
async fn update_bootcamp(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateBootcamp>,
) -> AppResult<Json<serde_json::Value>> {
    let user = middleware::require(user)?;

    let existing = Bootcamp::find_by_id(state.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("bootcamp".to_string()))?;
    ensure_owner(&user, existing.user_id, "bootcamp")?;

    let bootcamp = Bootcamp::update(state.db(), id, input)
        .await?
        .ok_or_else(|| AppError::NotFound("bootcamp".to_string()))?;

    data_response(&bootcamp)
}

/// Delete a bootcamp (courses and reviews cascade).
///
/// DELETE /api/v1/bootcamps/{id} (owner/admin)
async fn delete_bootcamp(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let user = middleware::require(user)?;

    let existing = Bootcamp::find_by_id(state.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("bootcamp".to_string()))?;
    ensure_owner(&user, existing.user_id, "bootcamp")?;

    Bootcamp::delete(state.db(), id).await?;

    Ok(Json(serde_json::json!({ "success": true, "data": {} })))
}

/// Bootcamps within a radius of a zipcode.
///
/// GET /api/v1/bootcamps/radius/{zipcode}/{distance}
async fn bootcamps_in_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, f64)>,
) -> AppResult<Json<serde_json::Value>> {
    if !distance.is_finite() || distance <= 0.0 {
        return Err(AppError::BadRequest(
            "distance must be a positive number of miles".to_string(),
        ));
    }

    let location = state
        .geocoder()
        .geocode(&zipcode)
        .await
        .map_err(|e| AppError::BadRequest(format!("could not geocode '{zipcode}': {e}")))?;

    let bootcamps =
        Bootcamp::within_radius(state.db(), location.lat, location.lng, distance).await?;

    list_response(&bootcamps)
}

/// Create the bootcamp router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/bootcamps",
            get(list_bootcamps).post(create_bootcamp),
        )
        .route(
            "/api/v1/bootcamps/{id}",
            get(get_bootcamp)
                .put(update_bootcamp)
                .delete(delete_bootcamp),
        )
        .route(
            "/api/v1/bootcamps/radius/{zipcode}/{distance}",
            get(bootcamps_in_radius),
        )
}
