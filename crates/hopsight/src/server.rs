//! HTTP request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use hopsight_core::{Error, Pipeline, TraceReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Create the router with all endpoints.
pub(crate) fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/api/status", get(handle_status))
        .route("/api/report", post(handle_report))
        .with_state(pipeline)
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    message: &'static str,
}

#[derive(Debug, Deserialize)]
struct ReportRequest {
    url: Option<String>,
}

/// The report payload.
///
/// `executionTime` sits alongside the traceroute data so callers can
/// account for the whole request without summing per-section timings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    traceroute: TraceReport,
    execution_time: u64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: &str) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: String::from(message),
        }),
    )
}

async fn handle_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OK",
        message: "diagnostic server is functional",
    })
}

async fn handle_report(
    State(pipeline): State<Arc<Pipeline>>,
    Json(request): Json<ReportRequest>,
) -> Result<Json<ReportResponse>, HandlerError> {
    let Some(url) = request.url.as_deref() else {
        return Err(bad_request("url is required"));
    };
    let Some(host) = host_of(url) else {
        return Err(bad_request("invalid url"));
    };
    match pipeline.run(host).await {
        Ok(report) => Ok(Json(ReportResponse {
            execution_time: report.execution_time_ms,
            traceroute: report,
        })),
        Err(err @ Error::InvalidAddress(_)) => {
            error!("report for {host} failed: {err}");
            Err(bad_request(&err.to_string()))
        }
        Err(err @ Error::ProbeFailed(_)) => {
            error!("report for {host} failed: {err}");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            ))
        }
        Err(err) => {
            error!("report for {host} failed: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: String::from("error occurred while generating report"),
                }),
            ))
        }
    }
}

/// Extract and validate the host part of a user-supplied URL.
///
/// Accepts a bare hostname or one prefixed with an http(s) scheme; any
/// path, query, fragment or port is dropped.
fn host_of(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split(['/', '?', '#', ':']).next()?;
    let valid = host.contains('.')
        && !host.starts_with('.')
        && !host.ends_with('.')
        && !host.contains("..")
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    valid.then_some(host)
}
