use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::AppState;
use super::page;
use super::state::{ChartFilter, ChartSpec};
use crate::aggregate::DateRange;
use crate::charts::{DEFAULT_SIZE, render_svg};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn not_found(what: &str) -> Self {
        Self {
            error: "not_found".to_string(),
            message: format!("{what} not found"),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self {
            error: "bad_request".to_string(),
            message: message.to_string(),
        }
    }

    pub fn internal_error() -> Self {
        Self {
            error: "internal_error".to_string(),
            message: "An unexpected error occurred".to_string(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.error.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

/// Query string shared by the chart endpoints. Empty values count as absent,
/// which is what a cleared date input submits.
#[derive(Debug, Default, Deserialize)]
pub struct ChartParams {
    /// Comma-separated province names.
    pub provinces: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ErrorResponse> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Some).map_err(|_| {
            ErrorResponse::bad_request(&format!("{field} must be YYYY-MM-DD, got '{s}'"))
        }),
    }
}

impl ChartParams {
    pub fn to_filter(&self) -> Result<ChartFilter, ErrorResponse> {
        let provinces = self
            .provinces
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        Ok(ChartFilter {
            provinces,
            range: DateRange::new(
                parse_date("start", self.start.as_deref())?,
                parse_date("end", self.end.as_deref())?,
            ),
        })
    }
}

fn lookup(state: &AppState, id: &str) -> Result<&'static ChartSpec, ErrorResponse> {
    state
        .kind()
        .chart(id)
        .ok_or_else(|| ErrorResponse::not_found(&format!("chart '{id}'")))
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page::render(&state))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Redraws one chart for the current selection.
#[instrument(skip_all, fields(chart = %id))]
pub async fn chart_svg(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ChartParams>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let spec = lookup(&state, &id)?;
    let filter = params.to_filter()?;
    debug!(?filter, "Recomputing chart");

    let svg = state
        .chart(spec, &filter)
        .and_then(|chart| render_svg(&chart, DEFAULT_SIZE))
        .map_err(|e| {
            error!(error = %e, chart = %id, "Chart rendering failed");
            ErrorResponse::internal_error()
        })?;

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

/// The aggregate table behind one chart, as JSON. Undefined ratios are `null`.
#[instrument(skip_all, fields(chart = %id))]
pub async fn chart_table(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ChartParams>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let spec = lookup(&state, &id)?;
    let filter = params.to_filter()?;

    let table = state.table(spec, &filter).map_err(|e| {
        error!(error = %e, chart = %id, "Aggregation failed");
        ErrorResponse::internal_error()
    })?;

    Ok(Json(table))
}
