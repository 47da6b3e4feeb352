//! Course routes, both top-level and nested under bootcamps.
//!
//! Creating, updating, or deleting a course recomputes the owning
//! bootcamp's average cost.

use anyhow::Context;
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{self, CurrentUser};
use crate::models::{Bootcamp, Course, CreateCourse, Role, UpdateCourse};
use crate::query::{RelationSpec, ResultEnvelope};
use crate::routes::helpers::{data_response, ensure_owner, list_response};
use crate::state::AppState;
use crate::storage::COURSES;

/// List courses through the query engine.
///
/// GET /api/v1/courses
async fn list_courses(
    State(state): State<AppState>,
    Query(raw): Query<Vec<(String, String)>>,
) -> AppResult<Json<ResultEnvelope>> {
    let populate = RelationSpec::new("bootcamp", &["name", "description"]);
    let envelope = state
        .assembler()
        .advanced_results(&COURSES, &raw, Some(&populate))
        .await?;

    Ok(Json(envelope))
}

/// List the courses of one bootcamp.
///
/// GET /api/v1/bootcamps/{bootcampId}/courses
async fn list_bootcamp_courses(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let courses = Course::list_for_bootcamp(state.db(), bootcamp_id).await?;
    list_response(&courses)
}

/// Get a single course with its bootcamp populated.
///
/// GET /api/v1/courses/{id}
async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let course = Course::find_by_id(state.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("course".to_string()))?;

    let mut data = serde_json::to_value(&course).context("failed to serialize course")?;
    if let Some(bootcamp) = Bootcamp::find_by_id(state.db(), course.bootcamp_id).await? {
        data["bootcamp"] = serde_json::json!({
            "id": bootcamp.id,
            "name": bootcamp.name,
            "description": bootcamp.description,
        });
    }

    Ok(Json(serde_json::json!({ "success": true, "data": data })))
}

/// Create a course under a bootcamp.
///
/// POST /api/v1/bootcamps/{bootcampId}/courses (publisher/admin, owner)
async fn create_course(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(bootcamp_id): Path<Uuid>,
    Json(input): Json<CreateCourse>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let user = middleware::require(user)?;
    middleware::authorize(&user, &[Role::Publisher, Role::Admin])?;

    let bootcamp = Bootcamp::find_by_id(state.db(), bootcamp_id)
        .await?
        .ok_or_else(|| AppError::NotFound("bootcamp".to_string()))?;
    ensure_owner(&user, bootcamp.user_id, "bootcamp")?;

    let course = Course::create(state.db(), bootcamp_id, user.id, input).await?;
    Course::recalculate_average_cost(state.db(), bootcamp_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "data": course })),
    ))
}

/// Update a course.
///
/// PUT /api/v1/courses/{id} (owner/admin)
async fn update_course(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCourse>,
) -> AppResult<Json<serde_json::Value>> {
    let user = middleware::require(user)?;

    let existing = Course::find_by_id(state.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("course".to_string()))?;
    ensure_owner(&user, existing.user_id, "course")?;

    let course = Course::update(state.db(), id, input)
        .await?
        .ok_or_else(|| AppError::NotFound("course".to_string()))?;
    Course::recalculate_average_cost(state.db(), course.bootcamp_id).await?;

    data_response(&course)
}

/// Delete a course.
///
/// DELETE /api/v1/courses/{id} (owner/admin)
async fn delete_course(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let user = middleware::require(user)?;

    let existing = Course::find_by_id(state.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("course".to_string()))?;
    ensure_owner(&user, existing.user_id, "course")?;

    Course::delete(state.db(), id).await?;
    Course::recalculate_average_cost(state.db(), existing.bootcamp_id).await?;

    data_response(&existing)
}

/// Create the course router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/courses", get(list_courses))
        .route(
            "/api/v1/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route(
            "/api/v1/bootcamps/{bootcamp_id}/courses",
            get(list_bootcamp_courses).post(create_course),
        )
}
