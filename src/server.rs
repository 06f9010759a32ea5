use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::dora::{MetricsSnapshot, Period, PeriodError, PeriodKind, Rating};
use crate::reports::render_markdown;
use crate::sources::SourceKind;
use crate::workflow::{MetricsWorkflow, ReportRun};

type ReportKey = (PeriodKind, DateTime<Utc>);

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<MetricsWorkflow>,
    reports: Cache<ReportKey, Arc<ReportRun>>,
}

impl AppState {
    pub fn new(workflow: Arc<MetricsWorkflow>, report_ttl: Duration) -> Self {
        let reports = Cache::builder()
            .max_capacity(64)
            .time_to_live(report_ttl)
            .build();
        Self { workflow, reports }
    }

    /// Cached report for the last completed period of `kind`.
    async fn report(&self, kind: PeriodKind) -> Arc<ReportRun> {
        let now = Utc::now();
        let period = Period::last_completed(kind, now);
        let workflow = self.workflow.clone();

        self.reports
            .get_with((kind, period.start()), async move {
                Arc::new(workflow.report_for(&period, now).await)
            })
            .await
    }
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<PeriodError> for ApiError {
    fn from(err: PeriodError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct SnapshotResponse {
    #[serde(flatten)]
    snapshot: MetricsSnapshot,
    overall_rating: Rating,
}

#[derive(Serialize)]
struct ReportResponse<'a> {
    #[serde(flatten)]
    report: &'a crate::reports::Report,
    overall_rating: Rating,
    degraded_sources: &'a [SourceKind],
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics_snapshot(
    State(state): State<AppState>,
    Path(period): Path<String>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let kind: PeriodKind = period.parse()?;
    let snapshot = state.workflow.snapshot(kind, Utc::now()).await;
    let overall_rating = snapshot.overall_rating();
    Ok(Json(SnapshotResponse {
        snapshot,
        overall_rating,
    }))
}

/// Inclusive calendar dates, `YYYY-MM-DD`.
#[derive(Deserialize)]
struct RangeQuery {
    start: NaiveDate,
    end: NaiveDate,
}

async fn metrics_range(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    // Ranges shorter than a week are labelled weekly, everything else monthly
    let kind = if (range.end - range.start).num_days() < 7 {
        PeriodKind::Weekly
    } else {
        PeriodKind::Monthly
    };
    let period = Period::from_dates(kind, range.start, range.end)?;
    let snapshot = state.workflow.snapshot_for(&period).await;
    let overall_rating = snapshot.overall_rating();
    Ok(Json(SnapshotResponse {
        snapshot,
        overall_rating,
    }))
}

async fn report_json(
    State(state): State<AppState>,
    Path(period): Path<String>,
) -> Result<Response, ApiError> {
    let kind: PeriodKind = period.parse()?;
    let run = state.report(kind).await;
    let body = ReportResponse {
        report: &run.report,
        overall_rating: run.report.overall_rating(),
        degraded_sources: &run.degraded_sources,
    };
    Ok(Json(body).into_response())
}

async fn report_markdown(
    State(state): State<AppState>,
    Path(period): Path<String>,
) -> Result<Response, ApiError> {
    let kind: PeriodKind = period.parse()?;
    let run = state.report(kind).await;
    let markdown = render_markdown(&run.report);
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/markdown; charset=utf-8"))],
        markdown,
    )
        .into_response())
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/metrics/range", get(metrics_range))
        .route("/api/v1/metrics/{period}", get(metrics_snapshot))
        .route("/api/v1/reports/{period}", get(report_json))
        .route("/api/v1/reports/{period}/markdown", get(report_markdown))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
