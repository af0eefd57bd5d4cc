use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::auth::AuthService;
use super::service::{ReportService, ReportServiceError};
use super::store::{ReportId, ReportStore, ReportStoreError, SavedReportSummary};
use crate::scoring::{ComplianceScore, PropertyData};

/// Body accepted by `POST /api/v1/reports`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveReportRequest {
    pub property: PropertyData,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct SaveReportResponse {
    report: SavedReportSummary,
    score: ComplianceScore,
}

/// Router builder exposing saved-report endpoints.
pub fn report_router<A, S>(service: Arc<ReportService<A, S>>) -> Router
where
    A: AuthService + 'static,
    S: ReportStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/reports",
            get(list_handler::<A, S>).post(save_handler::<A, S>),
        )
        .route("/api/v1/reports/:report_id", get(fetch_handler::<A, S>))
        .with_state(service)
}

pub(crate) async fn save_handler<A, S>(
    State(service): State<Arc<ReportService<A, S>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<SaveReportRequest>,
) -> Response
where
    A: AuthService + 'static,
    S: ReportStore + 'static,
{
    let as_of = request.as_of.unwrap_or_else(|| Local::now().date_naive());
    match service.save_report(bearer_token(&headers), request.property, as_of) {
        Ok((saved, score)) => {
            let body = SaveReportResponse {
                report: SavedReportSummary::from(&saved),
                score,
            };
            (StatusCode::CREATED, axum::Json(body)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn fetch_handler<A, S>(
    State(service): State<Arc<ReportService<A, S>>>,
    headers: HeaderMap,
    Path(report_id): Path<String>,
) -> Response
where
    A: AuthService + 'static,
    S: ReportStore + 'static,
{
    match service.get_report(bearer_token(&headers), &ReportId(report_id)) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<A, S>(
    State(service): State<Arc<ReportService<A, S>>>,
    headers: HeaderMap,
) -> Response
where
    A: AuthService + 'static,
    S: ReportStore + 'static,
{
    match service.list_reports(bearer_token(&headers)) {
        Ok(reports) => {
            let summaries: Vec<SavedReportSummary> =
                reports.iter().map(SavedReportSummary::from).collect();
            (StatusCode::OK, axum::Json(json!({ "reports": summaries }))).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
}

fn error_response(err: ReportServiceError) -> Response {
    let status = match &err {
        ReportServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
        ReportServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ReportServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ReportServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ReportServiceError::Store(ReportStoreError::Rejected(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ReportServiceError::Store(ReportStoreError::Unavailable(_))
        | ReportServiceError::Auth(_) => StatusCode::SERVICE_UNAVAILABLE,
    };

    let payload = json!({
        "error": err.to_string(),
        "retryable": status == StatusCode::SERVICE_UNAVAILABLE,
    });
    (status, axum::Json(payload)).into_response()
}
