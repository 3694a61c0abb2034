//! HTTP JSON API over the queue monitor
//!
//! Routes (all JSON unless noted):
//! - `PUT  /facilities/{id}/zones`       - replace zone layout
//! - `POST /facilities/{id}/frames`      - ingest a detection frame
//! - `POST /facilities/{id}/counts`      - ingest precomputed zone counts
//! - `GET  /facilities/{id}/status`      - queue status
//! - `GET  /facilities/{id}/analysis`    - pressure analysis, alerts, score
//! - `GET  /facilities/{id}/alerts`      - latest alert batch
//! - `GET  /facilities/{id}/performance` - performance summary
//! - `POST /facilities/{id}/release`     - emergency release
//! - `POST /facilities/{id}/optimize`    - apply flow optimizations
//! - `GET  /metrics`                     - Prometheus text
//! - `GET  /health`                      - plain `ok`
//!
//! Uses hyper for the HTTP server. Routing is a pure function over
//! `(method, path, body)` so it can be exercised without a socket.

use crate::domain::status::ZoneCounts;
use crate::domain::types::{DetectionFrame, FacilityId};
use crate::domain::zone::ZoneLayout;
use crate::infra::metrics::Metrics;
use crate::io::prometheus::format_prometheus_metrics;
use crate::services::monitor::QueueMonitor;
use anyhow::Context;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::header::HeaderValue;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Request bodies above this size are rejected
const MAX_BODY_BYTES: usize = 1024 * 1024;

const NO_DATA: &str = "No queue data available for this facility";

/// Response produced by the router before it is turned into HTTP
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json(StatusCode, Value),
    Text(StatusCode, &'static str, String),
}

impl ApiResponse {
    fn ok(mut body: Value) -> Self {
        if let Value::Object(map) = &mut body {
            map.insert("success".to_string(), Value::Bool(true));
        }
        ApiResponse::Json(StatusCode::OK, body)
    }

    fn error(status: StatusCode, message: impl Into<String>) -> Self {
        ApiResponse::Json(status, json!({ "success": false, "error": message.into() }))
    }

    fn not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND, "not_found")
    }

    fn no_data() -> Self {
        Self::error(StatusCode::NOT_FOUND, NO_DATA)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiResponse::Json(status, _) | ApiResponse::Text(status, _, _) => *status,
        }
    }

    fn into_http(self) -> Response<Full<Bytes>> {
        let (status, content_type, body) = match self {
            ApiResponse::Json(status, value) => {
                (status, "application/json", Bytes::from(value.to_string()))
            }
            ApiResponse::Text(status, content_type, text) => (status, content_type, Bytes::from(text)),
        };
        Response::builder()
            .status(status)
            .header("Content-Type", content_type)
            .header("Access-Control-Allow-Origin", "*")
            .body(Full::new(body))
            .expect("static response should not fail")
    }
}

/// Serialize a payload and place it under `key`
fn with_key<T: Serialize>(key: &str, payload: &T) -> ApiResponse {
    match serde_json::to_value(payload) {
        Ok(value) => {
            let mut map = serde_json::Map::new();
            map.insert(key.to_string(), value);
            ApiResponse::ok(Value::Object(map))
        }
        Err(e) => ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn parse_body<'a, T: serde::Deserialize<'a>>(body: &'a [u8], what: &str) -> anyhow::Result<T> {
    serde_json::from_slice(body).with_context(|| format!("invalid {what} body"))
}

/// Shared state for request handlers
pub struct Api {
    monitor: Mutex<QueueMonitor>,
    metrics: Arc<Metrics>,
}

impl Api {
    pub fn new(monitor: QueueMonitor, metrics: Arc<Metrics>) -> Self {
        Self { monitor: Mutex::new(monitor), metrics }
    }

    /// Route a request to the monitor
    pub fn dispatch(&self, method: &Method, path: &str, body: &[u8]) -> ApiResponse {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (method, segments.as_slice()) {
            (&Method::GET, ["health"]) => {
                ApiResponse::Text(StatusCode::OK, "text/plain", "ok".to_string())
            }
            (&Method::GET, ["metrics"]) => ApiResponse::Text(
                StatusCode::OK,
                "text/plain; version=0.0.4; charset=utf-8",
                format_prometheus_metrics(&self.metrics),
            ),
            (_, ["facilities", id, action]) => match id.parse::<FacilityId>() {
                Ok(facility) => self.facility_route(method, facility, action, body),
                Err(_) => ApiResponse::error(StatusCode::BAD_REQUEST, format!("invalid facility id {id}")),
            },
            _ => ApiResponse::not_found(),
        }
    }

    fn facility_route(
        &self,
        method: &Method,
        facility: FacilityId,
        action: &str,
        body: &[u8],
    ) -> ApiResponse {
        match (method, action) {
            (&Method::PUT, "zones") => match parse_body::<ZoneLayout>(body, "zones") {
                Ok(layout) => with_key("queue_status", &self.monitor.lock().configure_zones(facility, layout)),
                Err(e) => ApiResponse::error(StatusCode::BAD_REQUEST, format!("{e:#}")),
            },
            (&Method::POST, "frames") => {
                let frame = match parse_body::<DetectionFrame>(body, "frame") {
                    Ok(frame) => frame,
                    Err(e) => return ApiResponse::error(StatusCode::BAD_REQUEST, format!("{e:#}")),
                };
                match self.monitor.lock().ingest_frame(facility, &frame) {
                    Ok(status) => with_key("queue_status", &status),
                    Err(e) => {
                        warn!(facility = %facility, error = %format!("{e:#}"), "frame_rejected");
                        ApiResponse::error(StatusCode::UNPROCESSABLE_ENTITY, format!("{e:#}"))
                    }
                }
            }
            (&Method::POST, "counts") => match parse_body::<ZoneCounts>(body, "counts") {
                Ok(counts) => with_key("queue_status", &self.monitor.lock().ingest_counts(facility, &counts)),
                Err(e) => ApiResponse::error(StatusCode::BAD_REQUEST, format!("{e:#}")),
            },
            (&Method::GET, "status") => match self.monitor.lock().status(facility) {
                Some(status) => with_key("queue_status", &status),
                None => ApiResponse::no_data(),
            },
            (&Method::GET, "analysis") => match self.monitor.lock().analyze(facility) {
                Some(full) => match serde_json::to_value(&full) {
                    Ok(value) => ApiResponse::ok(value),
                    Err(e) => ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
                },
                None => ApiResponse::no_data(),
            },
            (&Method::GET, "alerts") => {
                let monitor = self.monitor.lock();
                let alerts = monitor.alerts(facility);
                match serde_json::to_value(alerts) {
                    Ok(value) => ApiResponse::ok(json!({ "alerts": value, "count": alerts.len() })),
                    Err(e) => ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
                }
            }
            (&Method::GET, "performance") => {
                with_key("performance", &self.monitor.lock().performance(facility))
            }
            (&Method::POST, "release") => match self.monitor.lock().emergency_release(facility) {
                Some(released) => ApiResponse::ok(json!({
                    "message": "Emergency release executed successfully",
                    "released": released,
                })),
                None => ApiResponse::no_data(),
            },
            (&Method::POST, "optimize") => match self.monitor.lock().optimize(facility) {
                Some(report) => ApiResponse::ok(json!({
                    "message": format!("Applied {} optimizations", report.optimizations.len()),
                    "optimizations": report.optimizations,
                    "removed": report.removed,
                })),
                None => ApiResponse::no_data(),
            },
            (&Method::OPTIONS, _) => ApiResponse::Text(StatusCode::OK, "text/plain", String::new()),
            _ => ApiResponse::not_found(),
        }
    }
}

/// Handle one HTTP request
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    api: Arc<Api>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let response =
                ApiResponse::error(StatusCode::PAYLOAD_TOO_LARGE, format!("unreadable body: {e}"));
            return Ok(response.into_http());
        }
    };

    let mut response = api.dispatch(&method, &path, &body).into_http();
    if method == Method::OPTIONS {
        let headers = response.headers_mut();
        headers.insert(
            "Access-Control-Allow-Methods",
            HeaderValue::from_static("GET, POST, PUT, OPTIONS"),
        );
        headers.insert("Access-Control-Allow-Headers", HeaderValue::from_static("Content-Type"));
    }

    let latency_us = started.elapsed().as_micros() as u64;
    api.metrics.record_request(latency_us);
    debug!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        latency_us = %latency_us,
        "request_handled"
    );

    Ok(response)
}

/// Start the API server and serve until shutdown is signalled
pub async fn start_api_server(
    addr: SocketAddr,
    api: Arc<Api>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener =
        TcpListener::bind(addr).await.with_context(|| format!("Failed to bind API on {addr}"))?;

    info!(addr = %addr, "api_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let api = api.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let api = api.clone();
                                async move { handle_request(req, api).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "api_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "api_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("api_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::detector::BoxDetector;
    use crate::services::monitor::MonitorSettings;

    fn api() -> Api {
        let metrics = Arc::new(Metrics::new());
        let monitor =
            QueueMonitor::new(MonitorSettings::default(), Arc::new(BoxDetector::default()), metrics.clone());
        Api::new(monitor, metrics)
    }

    fn json_body(response: &ApiResponse) -> &Value {
        match response {
            ApiResponse::Json(_, value) => value,
            ApiResponse::Text(..) => panic!("expected JSON response"),
        }
    }

    #[test]
    fn test_health() {
        let response = api().dispatch(&Method::GET, "/health", b"");
        assert_eq!(response, ApiResponse::Text(StatusCode::OK, "text/plain", "ok".to_string()));
    }

    #[test]
    fn test_unknown_facility_status_404() {
        let response = api().dispatch(&Method::GET, "/facilities/7/status", b"");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(&response)["success"], false);
        assert_eq!(json_body(&response)["error"], NO_DATA);
    }

    #[test]
    fn test_invalid_facility_id() {
        let response = api().dispatch(&Method::GET, "/facilities/abc/status", b"");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_configure_then_count_then_status() {
        let api = api();
        let zones = br#"{"entry": [[0, 0, 10, 10]]}"#;
        let response = api.dispatch(&Method::PUT, "/facilities/1/zones", zones);
        assert_eq!(response.status(), StatusCode::OK);

        let response = api.dispatch(&Method::POST, "/facilities/1/counts", br#"{"entry": 45}"#);
        assert_eq!(response.status(), StatusCode::OK);

        let response = api.dispatch(&Method::GET, "/facilities/1/status", b"");
        let body = json_body(&response);
        assert_eq!(body["success"], true);
        assert_eq!(body["queue_status"]["crowd_level"], "Medium");
        assert_eq!(body["queue_status"]["queues"]["entry"]["status"], "High");
    }

    #[test]
    fn test_frame_ingest() {
        let api = api();
        let frame = br#"{"width": 300, "height": 200, "detections": [
            {"x1": 40, "y1": 40, "x2": 60, "y2": 60, "class_id": 0, "confidence": 0.8},
            {"x1": 140, "y1": 40, "x2": 160, "y2": 60, "class_id": 0, "confidence": 0.8}
        ]}"#;
        let response = api.dispatch(&Method::POST, "/facilities/3/frames", frame);
        let body = json_body(&response);
        assert_eq!(body["queue_status"]["total_people"], 2);
        assert_eq!(body["queue_status"]["queues"]["entry"]["count"], 1);
    }

    #[test]
    fn test_bad_frame_rejected() {
        let api = api();
        let response = api.dispatch(&Method::POST, "/facilities/3/frames", br#"{"width": 0, "height": 0}"#);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let response = api.dispatch(&Method::POST, "/facilities/3/frames", b"not json");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_analysis_and_alerts() {
        let api = api();
        api.dispatch(&Method::POST, "/facilities/1/counts", br#"{"entry": 40, "exit": 1}"#);

        let response = api.dispatch(&Method::GET, "/facilities/1/analysis", b"");
        let body = json_body(&response);
        assert_eq!(body["success"], true);
        assert_eq!(body["priority_analysis"]["priority_queue"], "entry");
        assert!(body["optimization_score"]["grade"].is_string());

        let response = api.dispatch(&Method::GET, "/facilities/1/alerts", b"");
        let body = json_body(&response);
        assert!(body["count"].as_u64().unwrap() >= 1);
        assert_eq!(body["alerts"][0]["type"], "CRITICAL");
    }

    #[test]
    fn test_alerts_for_unknown_facility_empty() {
        let response = api().dispatch(&Method::GET, "/facilities/5/alerts", b"");
        assert_eq!(json_body(&response)["count"], 0);
    }

    #[test]
    fn test_performance_unknown_facility() {
        let response = api().dispatch(&Method::GET, "/facilities/5/performance", b"");
        let body = json_body(&response);
        assert_eq!(body["performance"]["efficiency_score"], 100.0);
        assert_eq!(body["performance"]["total_people"], 0);
    }

    #[test]
    fn test_release_and_optimize() {
        let api = api();
        assert_eq!(api.dispatch(&Method::POST, "/facilities/1/release", b"").status(), StatusCode::NOT_FOUND);

        api.dispatch(&Method::POST, "/facilities/1/counts", br#"{"entry": 1, "darshan": 12}"#);
        let response = api.dispatch(&Method::POST, "/facilities/1/optimize", b"");
        assert_eq!(json_body(&response)["removed"], 10);

        let response = api.dispatch(&Method::POST, "/facilities/1/release", b"");
        assert_eq!(json_body(&response)["released"], 1 + 1);
    }

    #[test]
    fn test_metrics_endpoint() {
        let api = api();
        api.dispatch(&Method::POST, "/facilities/1/counts", br#"{"entry": 1}"#);
        match api.dispatch(&Method::GET, "/metrics", b"") {
            ApiResponse::Text(status, _, text) => {
                assert_eq!(status, StatusCode::OK);
                assert!(text.contains("queue_watch_ingests_total 1"));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_unknown_route() {
        assert_eq!(api().dispatch(&Method::GET, "/nope", b"").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            api().dispatch(&Method::DELETE, "/facilities/1/status", b"").status(),
            StatusCode::NOT_FOUND
        );
    }
}
