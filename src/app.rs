//! Student performance API web application
//!
//! Each handler translates one HTTP endpoint into exactly one [StudentStore](crate::store::StudentStore)
//! operation and renders the result as JSON.

use crate::app_state::SharedAppState;
use crate::error::{ErrorResponse, StudentPerfError};
use crate::json_payload::JsonPayload;
use crate::metrics;
use crate::models::{
    AverageScoresResponse, FilterRequest, FilterResponse, GenderPerformanceResponse,
    LunchImpactResponse, PerformanceResponse, SchoolPerformanceResponse, SchoolsResponse,
    StudentDeleteResponse, StudentFields, StudentWriteResponse, StudentsResponse,
};
use crate::store;

use axum::{
    extract::{Path, State},
    http::{header, Method},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use std::any::Any;
use tower::Layer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// Column grouped by the performance-by-lunch endpoint.
const LUNCH_CATEGORY: &str = "lunch";

/// Student performance service type
pub type Service = NormalizePath<Router>;

/// Returns a [axum::Router] for the student performance API
///
/// The router is populated with all routes as well as the following middleware:
///
/// * a [tower_http::trace::TraceLayer] for tracing requests and responses and recording metrics
/// * a [tower_http::cors::CorsLayer] allowing any origin
/// * a [tower_http::catch_panic::CatchPanicLayer] turning handler panics into 500 responses
///
/// # Arguments
///
/// * `state`: Shared application state holding the record store
pub fn router(state: SharedAppState) -> Router {
    fn api() -> Router<SharedAppState> {
        Router::new()
            .route("/schools", get(list_schools))
            .route("/schools/:id/performance", get(school_performance))
            .route("/students", get(list_students).post(create_student))
            .route("/students/filter", post(filter_students))
            .route("/students/by-school/:school", get(students_by_school))
            .route("/students/by-gender/:gender", get(students_by_gender))
            .route("/students/:id", put(update_student).delete(delete_student))
            .route("/performance/:student_id", get(student_performance))
            .route("/performance-by-lunch", get(performance_by_lunch))
            .route("/average-scores", get(average_scores))
            .route("/performance-by-gender", get(performance_by_gender))
    }

    Router::new()
        .nest("/api", api())
        .route("/metrics", get(metrics::metrics_handler))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors())
        .layer(
            TraceLayer::new_for_http()
                .on_request(metrics::request_counter)
                .on_response(metrics::record_response_metrics),
        )
        .with_state(state)
}

/// Returns a [crate::app::Service] for the student performance API
///
/// The service is populated with all routes as well as the following middleware:
///
/// * a [tower_http::normalize_path::NormalizePathLayer] for trimming trailing slashes from
///   requests
///
/// # Arguments
///
/// * `state`: Shared application state holding the record store
pub fn service(state: SharedAppState) -> Service {
    // Note that any middleware that should affect routing must wrap the router.
    // See
    // https://docs.rs/axum/0.6.12/axum/middleware/index.html#rewriting-request-uri-in-middleware.
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// CORS policy applied to every response.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Convert a handler panic into a generic 500 response, logging the detail.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!("request handler panicked: {detail}");
    ErrorResponse::unhandled().into_response()
}

/// Student ids arrive as path text and match the way SQLite compares text with an integer key:
/// an integer literal, or a real literal with a whole value such as `1.0`. Any other text matches
/// no student.
fn parse_student_id(id: &str) -> Option<i64> {
    let id = id.trim();
    id.parse().ok().or_else(|| {
        id.parse::<f64>()
            .ok()
            .filter(|value| {
                value.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(value)
            })
            .map(|value| value as i64)
    })
}

async fn list_schools(
    State(state): State<SharedAppState>,
) -> Result<Json<SchoolsResponse>, StudentPerfError> {
    let schools = state.store.list_distinct_schools().await?;
    Ok(Json(SchoolsResponse { schools }))
}

async fn list_students(
    State(state): State<SharedAppState>,
) -> Result<Json<StudentsResponse>, StudentPerfError> {
    let students = state.store.list_all().await?;
    Ok(Json(StudentsResponse { students }))
}

async fn students_by_school(
    State(state): State<SharedAppState>,
    Path(school): Path<String>,
) -> Result<Json<StudentsResponse>, StudentPerfError> {
    let students = state.store.find_by_school(school).await?;
    Ok(Json(StudentsResponse { students }))
}

async fn students_by_gender(
    State(state): State<SharedAppState>,
    Path(gender): Path<String>,
) -> Result<Json<StudentsResponse>, StudentPerfError> {
    let students = state.store.find_by_gender(gender).await?;
    Ok(Json(StudentsResponse { students }))
}

async fn student_performance(
    State(state): State<SharedAppState>,
    Path(student_id): Path<String>,
) -> Result<Json<PerformanceResponse>, StudentPerfError> {
    let performance_data = match parse_student_id(&student_id) {
        Some(id) => state.store.get_performance(id).await?,
        None => None,
    };
    Ok(Json(PerformanceResponse { performance_data }))
}

async fn school_performance(
    State(state): State<SharedAppState>,
    Path(school): Path<String>,
) -> Result<Json<SchoolPerformanceResponse>, StudentPerfError> {
    let performance_data = state.store.get_performance_by_school(school).await?;
    Ok(Json(SchoolPerformanceResponse { performance_data }))
}

async fn performance_by_lunch(
    State(state): State<SharedAppState>,
) -> Result<Json<LunchImpactResponse>, StudentPerfError> {
    let impact_by_lunch = state
        .store
        .get_performance_by_category(LUNCH_CATEGORY)
        .await?;
    Ok(Json(LunchImpactResponse { impact_by_lunch }))
}

async fn average_scores(
    State(state): State<SharedAppState>,
) -> Result<Json<AverageScoresResponse>, StudentPerfError> {
    let average_scores = state.store.get_average_scores().await?;
    Ok(Json(AverageScoresResponse { average_scores }))
}

async fn performance_by_gender(
    State(state): State<SharedAppState>,
) -> Result<Json<GenderPerformanceResponse>, StudentPerfError> {
    let performance_by_gender = state.store.get_performance_by_gender().await?;
    Ok(Json(GenderPerformanceResponse {
        performance_by_gender,
    }))
}

async fn create_student(
    State(state): State<SharedAppState>,
    JsonPayload(fields): JsonPayload<StudentFields>,
) -> Result<Json<StudentWriteResponse>, StudentPerfError> {
    let student = state.store.create(fields).await?;
    Ok(Json(StudentWriteResponse::new(
        "Student created successfully",
        student,
    )))
}

async fn update_student(
    State(state): State<SharedAppState>,
    Path(id): Path<String>,
    JsonPayload(fields): JsonPayload<StudentFields>,
) -> Result<Json<StudentWriteResponse>, StudentPerfError> {
    let Some(id) = parse_student_id(&id) else {
        store::require_fields(&fields, store::UPDATE_REQUIRED_MESSAGE)?;
        return Err(StudentPerfError::NotFound);
    };
    let student = state.store.update(id, fields).await?;
    Ok(Json(StudentWriteResponse::new(
        "Student details updated successfully",
        student,
    )))
}

async fn delete_student(
    State(state): State<SharedAppState>,
    Path(id): Path<String>,
) -> Result<Json<StudentDeleteResponse>, StudentPerfError> {
    let student_id = parse_student_id(&id).ok_or(StudentPerfError::NotFound)?;
    state.store.delete(student_id).await?;
    Ok(Json(StudentDeleteResponse {
        success: true,
        message: "Student deleted successfully".to_string(),
        student_id,
    }))
}

async fn filter_students(
    State(state): State<SharedAppState>,
    JsonPayload(request): JsonPayload<FilterRequest>,
) -> Result<Json<FilterResponse>, StudentPerfError> {
    let filtered_students = state.store.filter(request.criteria).await?;
    Ok(Json(FilterResponse { filtered_students }))
}
