//! Review routes, both top-level and nested under bootcamps.
//!
//! A user may leave one review per bootcamp; every write recomputes the
//! bootcamp's average rating.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{self, CurrentUser};
use crate::models::{Bootcamp, CreateReview, Review, Role, UpdateReview};
use crate::query::{RelationSpec, ResultEnvelope};
use crate::routes::helpers::{data_response, ensure_owner, list_response};
use crate::state::AppState;
use crate::storage::REVIEWS;

/// List reviews through the query engine.
///
/// GET /api/v1/reviews
async fn list_reviews(
    State(state): State<AppState>,
    Query(raw): Query<Vec<(String, String)>>,
) -> AppResult<Json<ResultEnvelope>> {
    let populate = RelationSpec::new("bootcamp", &["name", "description"]);
    let envelope = state
        .assembler()
        .advanced_results(&REVIEWS, &raw, Some(&populate))
        .await?;

    Ok(Json(envelope))
}

/// List the reviews of one bootcamp.
///
/// GET /api/v1/bootcamps/{bootcampId}/reviews
async fn list_bootcamp_reviews(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let reviews = Review::list_for_bootcamp(state.db(), bootcamp_id).await?;
    list_response(&reviews)
}

/// Get a single review.
///
/// GET /api/v1/reviews/{id}
async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let review = Review::find_by_id(state.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("review".to_string()))?;

    data_response(&review)
}

/// Create a review on a bootcamp.
///
/// POST /api/v1/bootcamps/{bootcampId}/reviews (user/admin)
async fn create_review(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(bootcamp_id): Path<Uuid>,
    Json(input): Json<CreateReview>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let user = middleware::require(user)?;
    middleware::authorize(&user, &[Role::User, Role::Admin])?;

    if !(1..=10).contains(&input.rating) {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 10".to_string(),
        ));
    }

    Bootcamp::find_by_id(state.db(), bootcamp_id)
        .await?
        .ok_or_else(|| AppError::NotFound("bootcamp".to_string()))?;

    // The unique (bootcamp_id, user_id) index rejects a second review;
    // the conflict surfaces through the storage error classification.
    let review = Review::create(state.db(), bootcamp_id, user.id, input).await?;
    Review::recalculate_average_rating(state.db(), bootcamp_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "data": review })),
    ))
}

/// Update a review.
///
/// PUT /api/v1/reviews/{id} (author/admin)
async fn update_review(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateReview>,
) -> AppResult<Json<serde_json::Value>> {
    let user = middleware::require(user)?;

    if let Some(rating) = input.rating
        && !(1..=10).contains(&rating)
    {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 10".to_string(),
        ));
    }

    let existing = Review::find_by_id(state.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("review".to_string()))?;
    ensure_owner(&user, existing.user_id, "review")?;

    let review = Review::update(state.db(), id, input)
        .await?
        .ok_or_else(|| AppError::NotFound("review".to_string()))?;
    Review::recalculate_average_rating(state.db(), review.bootcamp_id).await?;

    data_response(&review)
}

/// Delete a review.
///
/// DELETE /api/v1/reviews/{id} (author/admin)
async fn delete_review(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let user = middleware::require(user)?;

    let existing = Review::find_by_id(state.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("review".to_string()))?;
    ensure_owner(&user, existing.user_id, "review")?;

    Review::delete(state.db(), id).await?;
    Review::recalculate_average_rating(state.db(), existing.bootcamp_id).await?;

    data_response(&existing)
}

/// Create the review router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/reviews", get(list_reviews))
        .route(
            "/api/v1/reviews/{id}",
            get(get_review).put(update_review).delete(delete_review),
        )
        .route(
            "/api/v1/bootcamps/{bootcamp_id}/reviews",
            get(list_bootcamp_reviews).post(create_review),
        )
}
