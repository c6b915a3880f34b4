//! Interactive dashboards served over HTTP.
//!
//! The page holds a province multi-select and a date range; every change
//! re-requests each chart, and each request reruns the aggregation on the
//! records loaded at startup.

mod handlers;
mod page;
pub mod state;

pub use handlers::{ChartParams, ErrorResponse};
pub use state::{ChartFilter, ChartSpec, DashboardData, DashboardKind};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

pub const DEFAULT_PORT: u16 = 8050;

pub type AppState = Arc<DashboardData>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/charts/:id", get(handlers::chart_svg))
        .route("/api/charts/:id", get(handlers::chart_table))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the dashboard on localhost until the process is stopped.
pub async fn serve(data: DashboardData, port: u16) -> Result<()> {
    let kind = data.kind();
    let app = router(Arc::new(data));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(dashboard = ?kind, "Dashboard listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CaseRecord;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use chrono::NaiveDate;
    use tower::ServiceExt;

    fn case(d: &str, province: &str, cases: u64) -> CaseRecord {
        CaseRecord {
            date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
            province: province.into(),
            region: "NA".into(),
            age_group: "NA".into(),
            sex: "NA".into(),
            cases,
        }
    }

    fn app() -> Router {
        router(Arc::new(DashboardData::Cases(vec![
            case("2020-03-01", "Antwerpen", 5),
            case("2020-03-01", "Namur", 3),
            case("2020-03-02", "Antwerpen", 2),
        ])))
    }

    async fn get(uri: &str) -> (StatusCode, String) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ok"));
    }

    #[tokio::test]
    async fn test_index_lists_provinces_and_charts() {
        let (status, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<option value=\"Antwerpen\">"));
        assert!(body.contains("<option value=\"Namur\">"));
        assert!(body.contains("id=\"confirmed-cases\""));
        assert!(body.contains("min=\"2020-03-01\" max=\"2020-03-02\""));
    }

    #[tokio::test]
    async fn test_table_without_filter_sums_all_provinces() {
        let (status, body) = get("/api/charts/confirmed-cases").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let rows = json["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["bucket"], "2020-03-01");
        assert_eq!(rows[0]["values"][0], 8.0);
        assert!(rows[0]["group"].is_null());
    }

    #[tokio::test]
    async fn test_table_with_province_and_start_date() {
        let (status, body) =
            get("/api/charts/confirmed-cases?provinces=Antwerpen&start=2020-03-02&end=").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let rows = json["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["group"], "Antwerpen");
        assert_eq!(rows[0]["values"][0], 2.0);
    }

    #[tokio::test]
    async fn test_chart_svg_content_type() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/charts/confirmed-cases")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[axum::http::header::CONTENT_TYPE],
            "image/svg+xml"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8(body.to_vec()).unwrap().starts_with("<svg"));
    }

    #[tokio::test]
    async fn test_chart_svg_with_selection_and_empty_range() {
        let (status, body) = get("/charts/confirmed-cases?provinces=Antwerpen,Namur").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Antwerpen"));
        assert!(body.contains("Namur"));

        // No rows after the start date still draws a titled frame.
        let (status, body) = get("/charts/confirmed-cases?start=2030-01-01").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("<svg"));
        assert!(!body.contains("<polyline"));
    }

    #[tokio::test]
    async fn test_bad_date_is_rejected() {
        let (status, body) = get("/api/charts/confirmed-cases?start=01-03-2020").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("bad_request"));
    }

    #[tokio::test]
    async fn test_unknown_chart_is_not_found() {
        let (status, _) = get("/api/charts/pos-rate-by-week").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get("/charts/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_params_split_provinces() {
        let params = ChartParams {
            provinces: Some("Antwerpen, Liège,,".into()),
            start: None,
            end: Some("2020-04-01".into()),
        };
        let filter = params.to_filter().unwrap();
        assert_eq!(filter.provinces, vec!["Antwerpen", "Liège"]);
        assert_eq!(filter.range.start, None);
        assert_eq!(filter.range.end, NaiveDate::from_ymd_opt(2020, 4, 1));
    }
}
