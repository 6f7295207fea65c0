use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::middleware::ActingUser;
use crate::db::Database;
use crate::engine;
use crate::error::ProgressError;
use crate::models::*;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Map a progress error to a response. Store and invariant failures are
/// logged in full server-side; clients only see a generic message.
fn progress_error(e: ProgressError) -> (StatusCode, String) {
    match e {
        ProgressError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        ProgressError::Unauthorized => {
            tracing::warn!("Request without an acting user");
            (StatusCode::UNAUTHORIZED, e.to_string())
        }
        ProgressError::InvalidContent(_) => {
            tracing::warn!("Validation error: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        ProgressError::Conflict(_) => {
            tracing::warn!("Conflict: {}", e);
            (StatusCode::CONFLICT, e.to_string())
        }
        ProgressError::StoreUnavailable(_) | ProgressError::InvariantViolation(_) => {
            tracing::error!("Internal error: {:#}", anyhow::Error::from(e));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

/// Database errors carry a [`ProgressError`] when they are caller mistakes;
/// anything else is a store failure.
fn internal_error(e: anyhow::Error) -> (StatusCode, String) {
    match e.downcast::<ProgressError>() {
        Ok(e) => progress_error(e),
        Err(e) => progress_error(ProgressError::StoreUnavailable(e)),
    }
}

fn not_found(what: &str) -> (StatusCode, String) {
    progress_error(ProgressError::NotFound(what.to_string()))
}

fn require_user(user: &ActingUser) -> ApiResult<&str> {
    user.as_deref()
        .ok_or_else(|| progress_error(ProgressError::Unauthorized))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Courses
// ============================================================

pub async fn list_courses(State(db): State<Database>) -> ApiResult<Json<Vec<Course>>> {
    db.get_all_courses().map(Json).map_err(internal_error)
}

pub async fn get_course(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Course>> {
    db.get_course(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Course"))
}

pub async fn create_course(
    State(db): State<Database>,
    Json(input): Json<CreateCourseInput>,
) -> ApiResult<(StatusCode, Json<Course>)> {
    db.create_course(input)
        .map(|c| (StatusCode::CREATED, Json(c)))
        .map_err(internal_error)
}

pub async fn get_course_hierarchy(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CourseHierarchy>> {
    db.get_course_hierarchy(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Course"))
}

// ============================================================
// Structure
// ============================================================

pub async fn create_level(
    State(db): State<Database>,
    Path(course_id): Path<Uuid>,
    Json(input): Json<CreateLevelInput>,
) -> ApiResult<(StatusCode, Json<Level>)> {
    db.create_level(course_id, input)
        .map(|l| (StatusCode::CREATED, Json(l)))
        .map_err(internal_error)
}

pub async fn create_mission(
    State(db): State<Database>,
    Path(level_id): Path<Uuid>,
    Json(input): Json<CreateMissionInput>,
) -> ApiResult<(StatusCode, Json<Mission>)> {
    db.create_mission(level_id, input)
        .map(|m| (StatusCode::CREATED, Json(m)))
        .map_err(internal_error)
}

// ============================================================
// Nodes
// ============================================================

pub async fn list_course_nodes(
    State(db): State<Database>,
    Path(course_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Node>>> {
    db.get_course(course_id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Course"))?;

    db.get_course_nodes(course_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_node(
    State(db): State<Database>,
    Path(course_id): Path<Uuid>,
    Json(input): Json<CreateNodeInput>,
) -> ApiResult<(StatusCode, Json<Node>)> {
    db.create_node(course_id, input)
        .map(|n| (StatusCode::CREATED, Json(n)))
        .map_err(internal_error)
}

pub async fn get_node(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Node>> {
    db.get_node(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Node"))
}

// ============================================================
// Progress
// ============================================================

pub async fn get_course_progress(
    State(db): State<Database>,
    Path(course_id): Path<Uuid>,
    user: ActingUser,
) -> ApiResult<Json<CourseProgress>> {
    let user_id = require_user(&user)?;

    db.get_course(course_id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Course"))?;

    let nodes = db.get_course_nodes(course_id).map_err(internal_error)?;
    let progress = db
        .get_progress_for_course(user_id, course_id)
        .map_err(internal_error)?;

    Ok(Json(engine::build_course_progress(course_id, &nodes, &progress)))
}

pub async fn get_course_map(
    State(db): State<Database>,
    Path(course_id): Path<Uuid>,
    user: ActingUser,
) -> ApiResult<Json<CourseMap>> {
    let user_id = require_user(&user)?;

    let hierarchy = db
        .get_course_hierarchy(course_id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Course"))?;
    let progress = db
        .get_progress_for_course(user_id, course_id)
        .map_err(internal_error)?;

    Ok(Json(engine::build_course_map(&hierarchy, &progress)))
}

pub async fn complete_node(
    State(db): State<Database>,
    Path(node_id): Path<Uuid>,
    user: ActingUser,
) -> ApiResult<Json<CompletionOutcome>> {
    engine::complete_node(&db, user.as_deref(), node_id)
        .map(Json)
        .map_err(progress_error)
}
