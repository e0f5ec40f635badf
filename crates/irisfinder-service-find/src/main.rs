//! IRIS zone lookup HTTP microservice.
//!
//! This service returns the IRIS zones lying within a geodesic radius of a
//! coordinate, paginated, backed by a PostGIS query.
//!
//! # Endpoints
//!
//! - `POST /find-iris` - Find IRIS zones within a radius (km) of a point
//!
//! Prometheus metrics are served by the exporter on `METRICS_PORT`, not by
//! this router.
//!
//! # Configuration
//!
//! - `DATABASE_URL` - PostgreSQL connection URI (required)
//! - `DATABASE_TLS` - disable, insecure (default) or verify
//! - `PORT` - HTTP port (default: 3000)
//! - `RUST_LOG` - Log level (default: info)
//! - `LOG_FORMAT` - Log format: json (default) or text
//!
//! A `.env` file in the working directory is loaded first when present.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Instrument};

use irisfinder_lib::{PgIrisStore, TlsMode};
use irisfinder_service_shared::{
    init_logging, init_metrics, record_search_completed, record_search_failed, AppState,
    ErrorResponse, FindIrisRequest, FindIrisResponse, LoggingConfig, MetricsConfig, RequestId,
    RequestTrackingLayer, ServiceConfig, Validate,
};

/// HTTP response - either the paginated result or an error envelope.
#[derive(Debug)]
enum Response {
    Success(FindIrisResponse),
    Error(ErrorResponse),
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        match self {
            Response::Success(data) => (StatusCode::OK, Json(data)).into_response(),
            Response::Error(error) => error.into_response(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging (reads LOG_FORMAT and SERVICE_NAME from environment)
    let logging_config = LoggingConfig::from_env().with_service("find-iris");
    init_logging(&logging_config);

    let service = logging_config.service_name().to_string();
    let root = info_span!("service", service = %service);
    run(service).instrument(root).await
}

async fn run(service: String) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize metrics
    let metrics_config = MetricsConfig::from_env().map_err(|e| {
        error!(error = %e, "invalid metrics configuration");
        e
    })?;
    if metrics_config.enabled {
        match init_metrics(&metrics_config) {
            Ok(()) => info!(addr = %metrics_config.listen_addr(), "metrics exporter listening"),
            // Log but don't fail - metrics are optional
            Err(e) => warn!(error = %e, "failed to initialize metrics, continuing without metrics"),
        }
    }

    let config = ServiceConfig::from_env().map_err(|e| {
        error!(error = %e, "invalid configuration");
        e
    })?;

    if config.database.tls == TlsMode::Insecure {
        warn!("database TLS certificate verification is disabled; set DATABASE_TLS=verify in production");
    }

    info!(
        database = %config.database.connection_summary(),
        tls = %config.database.tls,
        pool_size = config.database.pool_size,
        table = %config.database.source.table,
        "starting IRIS lookup service"
    );

    let store = PgIrisStore::connect(&config.database).map_err(|e| {
        error!(error = %e.chain(), "failed to create database pool");
        e
    })?;

    let state = AppState::with_max_limit(Arc::new(store.clone()), config.max_limit);
    let app = router(state, &service);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, port = config.port, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close();
    info!("database pool closed, shutdown complete");

    Ok(())
}

/// Build the router serving `POST /find-iris` over the given state.
fn router(state: AppState, service: &str) -> Router {
    Router::new()
        .route("/find-iris", post(find_iris_handler))
        .layer(TraceLayer::new_for_http())
        .layer(RequestTrackingLayer::new(service))
        .with_state(state)
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining in-flight requests");
}

/// Handle POST /find-iris requests.
async fn find_iris_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<FindIrisRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(
                request_id = %request_id,
                error = %rejection.body_text(),
                "rejected malformed request body"
            );
            record_search_failed("invalid_request");
            return Response::Error(rejection.into());
        }
    };

    let criteria = match request.validate(state.max_limit()) {
        Ok(criteria) => criteria,
        Err(error) => {
            warn!(
                request_id = %request_id,
                detail = error.detail.as_deref().unwrap_or(""),
                "rejected invalid search request"
            );
            record_search_failed("invalid_request");
            return Response::Error(*error);
        }
    };

    info!(
        request_id = %request_id,
        latitude = criteria.latitude,
        longitude = criteria.longitude,
        radius_km = criteria.radius_km,
        page = criteria.page,
        limit = criteria.limit,
        offset = criteria.offset(),
        "handling IRIS search"
    );

    match state.store().find_within(&criteria).await {
        Ok(page) => {
            info!(request_id = %request_id, total = page.total, "IRIS zones found in total");
            info!(
                request_id = %request_id,
                page = criteria.page,
                count = page.results.len(),
                "IRIS zones on current page"
            );
            record_search_completed(page.total, page.results.len());

            Response::Success(FindIrisResponse::new(&criteria, page))
        }
        Err(e) => {
            error!(
                request_id = %request_id,
                error = %e.chain(),
                details = ?e,
                "IRIS search failed"
            );
            record_search_failed("store_error");

            Response::Error(ErrorResponse::search_failed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    use irisfinder_service_shared::test_utils::{
        failing_state, fixture_zones, paris_store, test_state, PARIS,
    };
    use irisfinder_service_shared::SEARCH_FAILED_MESSAGE;

    fn server(state: AppState) -> TestServer {
        TestServer::new(router(state, "find-iris")).expect("test server")
    }

    fn codes(body: &Value) -> Vec<String> {
        body["results"]
            .as_array()
            .expect("results array")
            .iter()
            .map(|z| z["code_iris"].as_str().expect("code_iris").to_string())
            .collect()
    }

    #[tokio::test]
    async fn paris_one_kilometre_returns_nearby_zones() {
        let server = server(test_state());

        let response = server
            .post("/find-iris")
            .json(&json!({"latitude": 48.8566, "longitude": 2.3522, "radius": 1}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["page"], 1);
        assert_eq!(body["limit"], 100);
        assert_eq!(body["total"], 3);
        assert_eq!(
            codes(&body),
            vec![
                fixture_zones::CENTRE,
                fixture_zones::EAST_300M,
                fixture_zones::EAST_800M
            ]
        );
        for zone in body["results"].as_array().unwrap() {
            assert!(zone["nom_iris"].is_string());
        }
    }

    #[tokio::test]
    async fn numeric_strings_are_coerced() {
        let server = server(test_state());

        let response = server
            .post("/find-iris")
            .json(&json!({
                "latitude": "48.8566",
                "longitude": "2.3522",
                "radius": "2",
                "page": "1",
                "limit": "2"
            }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 4);
        assert_eq!(body["limit"], 2);
        assert_eq!(body["results"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn pages_cover_the_total_without_duplicates() {
        let server = server(test_state());
        let mut seen: Vec<String> = Vec::new();
        let mut total = None;

        for page in 1..=4 {
            let response = server
                .post("/find-iris")
                .json(&json!({
                    "latitude": PARIS.0,
                    "longitude": PARIS.1,
                    "radius": 10,
                    "page": page,
                    "limit": 2
                }))
                .await;
            response.assert_status_ok();
            let body: Value = response.json();

            assert_eq!(body["page"], page);
            let page_codes = codes(&body);
            assert!(page_codes.len() <= 2);
            total.get_or_insert(body["total"].as_i64().unwrap());
            seen.extend(page_codes);
        }

        let total = total.unwrap();
        assert_eq!(total, 5);
        assert_eq!(seen.len() as i64, total);
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), seen.len());
    }

    #[tokio::test]
    async fn identical_requests_are_idempotent() {
        let server = server(test_state());
        let request = json!({"latitude": PARIS.0, "longitude": PARIS.1, "radius": 2});

        let first: Value = server.post("/find-iris").json(&request).await.json();
        let second: Value = server.post("/find-iris").json(&request).await.json();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn zero_radius_matches_only_the_coincident_zone() {
        let server = server(test_state());

        let response = server
            .post("/find-iris")
            .json(&json!({"latitude": PARIS.0, "longitude": PARIS.1, "radius": 0}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 1);
        assert_eq!(codes(&body), vec![fixture_zones::CENTRE]);
    }

    #[tokio::test]
    async fn no_match_returns_empty_results() {
        let server = server(test_state());

        let response = server
            .post("/find-iris")
            .json(&json!({"latitude": -45.0, "longitude": 170.0, "radius": 5}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 0);
        assert_eq!(body["results"], json!([]));
    }

    #[tokio::test]
    async fn store_failure_returns_fixed_message() {
        let server = server(failing_state());

        let response = server
            .post("/find-iris")
            .json(&json!({"latitude": 48.8566, "longitude": 2.3522, "radius": 1}))
            .await;

        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body, json!({ "error": SEARCH_FAILED_MESSAGE }));
    }

    #[tokio::test]
    async fn missing_coordinate_is_a_bad_request() {
        let server = server(test_state());

        let response = server
            .post("/find-iris")
            .json(&json!({"longitude": 2.3522, "radius": 1}))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "Requête invalide");
        assert!(body["detail"].as_str().unwrap().contains("'latitude'"));
    }

    #[tokio::test]
    async fn non_numeric_radius_is_a_bad_request() {
        let server = server(test_state());

        let response = server
            .post("/find-iris")
            .json(&json!({"latitude": 48.8566, "longitude": 2.3522, "radius": "far"}))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["detail"].as_str().unwrap().contains("'radius'"));
    }

    #[tokio::test]
    async fn limit_above_maximum_is_a_bad_request() {
        let state = AppState::with_max_limit(Arc::new(paris_store()), 10);
        let server = server(state);

        let response = server
            .post("/find-iris")
            .json(&json!({"latitude": PARIS.0, "longitude": PARIS.1, "radius": 1, "limit": 11}))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let server = server(test_state());

        let response = server
            .post("/find-iris")
            .text("{\"latitude\": ")
            .content_type("application/json")
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "Requête invalide");
    }

    #[tokio::test]
    async fn wrong_json_type_is_a_bad_request() {
        let server = server(test_state());

        let response = server
            .post("/find-iris")
            .json(&json!({"latitude": [48.8], "longitude": 2.3522, "radius": 1}))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn request_id_is_echoed() {
        let server = server(test_state());

        let response = server
            .post("/find-iris")
            .add_header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("req-42"),
            )
            .json(&json!({"latitude": PARIS.0, "longitude": PARIS.1, "radius": 1}))
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("x-request-id"), "req-42");
    }

    #[tokio::test]
    async fn request_id_is_generated_on_errors_too() {
        let server = server(failing_state());

        let response = server
            .post("/find-iris")
            .json(&json!({"latitude": PARIS.0, "longitude": PARIS.1, "radius": 1}))
            .await;

        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let id = response.header("x-request-id");
        assert_eq!(id.to_str().unwrap().len(), 36);
    }

    #[tokio::test]
    async fn other_routes_are_not_served() {
        let server = server(test_state());

        let response = server.get("/health/live").expect_failure().await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        let response = server.get("/find-iris").expect_failure().await;
        assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
