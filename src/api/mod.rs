use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::booking::Dispatcher;
use crate::db::models::{GolfCourse, TeeTime};
use crate::db::CourseCatalog;
use crate::error::ScrapeError;
use crate::jobs::JobRunner;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CourseCatalog>,
    pub dispatcher: Arc<Dispatcher>,
    pub jobs: JobRunner,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobStarted {
    job_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum JobView {
    Pending,
    #[serde(rename_all = "camelCase")]
    Complete { tee_times: Vec<TeeTime> },
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Build the Axum router for the tee-time API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/golf-courses", get(list_courses_handler))
        .route("/api/golf-courses/:id", get(course_handler))
        .route("/api/golf-courses/:id/tee-times", get(tee_times_handler))
        .route("/api/golf-courses/:id/scrape-jobs", post(start_job_handler))
        .route("/api/scrape-jobs/:job_id", get(job_status_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

fn error_response(err: ScrapeError) -> (StatusCode, String) {
    let status = match &err {
        ScrapeError::CourseNotFound(_) | ScrapeError::JobNotFound(_) => StatusCode::NOT_FOUND,
        ScrapeError::UnsupportedProvider(_) => StatusCode::BAD_REQUEST,
        ScrapeError::SessionBootstrapFailed { .. }
        | ScrapeError::ProviderFetchFailed { .. }
        | ScrapeError::Browser(_) => StatusCode::BAD_GATEWAY,
        ScrapeError::RenderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ScrapeError::Catalog(_) | ScrapeError::HttpClient(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

/// GET /api/golf-courses
async fn list_courses_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<GolfCourse>>> {
    state
        .catalog
        .list_courses()
        .await
        .map(Json)
        .map_err(|e| error_response(ScrapeError::Catalog(e.to_string())))
}

/// GET /api/golf-courses/:id
async fn course_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<GolfCourse>> {
    state
        .catalog
        .get_course_by_id(id)
        .await
        .map_err(|e| error_response(ScrapeError::Catalog(e.to_string())))?
        .map(Json)
        .ok_or_else(|| error_response(ScrapeError::CourseNotFound(id)))
}

/// GET /api/golf-courses/:id/tee-times
async fn tee_times_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<TeeTime>>> {
    state
        .dispatcher
        .fetch_tee_times(id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/golf-courses/:id/scrape-jobs
async fn start_job_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let job_id = state.jobs.start_job(id).await;
    (StatusCode::ACCEPTED, Json(JobStarted { job_id }))
}

/// GET /api/scrape-jobs/:job_id
async fn job_status_handler(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let not_found = || error_response(ScrapeError::JobNotFound(job_id.clone()));
    let id = Uuid::parse_str(&job_id).map_err(|_| not_found())?;

    let status = state.jobs.status(id).await;
    if !status.found {
        return Err(not_found());
    }
    match status.results {
        Some(tee_times) if status.complete => Ok(Json(JobView::Complete { tee_times })),
        _ => Ok(Json(JobView::Pending)),
    }
}
