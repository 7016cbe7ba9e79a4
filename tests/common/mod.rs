//! Shared helpers for the HTTP integration tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use dual_log_service::file_sink::{FileSink, JSON_LOG_FILE, TEXT_LOG_FILE};
use dual_log_service::memory_sink::MemorySink;
use dual_log_service::pipeline::{Loggers, Pipeline};
use dual_log_service::record::{Enricher, Level};
use dual_log_service::sink::LogSink;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

/// Pipelines backed by in-memory sinks, plus handles to read them back.
#[allow(dead_code)]
pub fn memory_loggers() -> (Loggers, MemorySink, MemorySink) {
    let text = MemorySink::new();
    let json = MemorySink::new();
    let loggers = pipelines(Arc::new(text.clone()), Arc::new(json.clone()));
    (loggers, text, json)
}

/// Pipelines writing `text.log` and `json.log` under `dir`.
#[allow(dead_code)]
pub fn file_loggers(dir: &Path) -> Loggers {
    pipelines(
        Arc::new(FileSink::new(dir.join(TEXT_LOG_FILE))),
        Arc::new(FileSink::new(dir.join(JSON_LOG_FILE))),
    )
}

#[allow(dead_code)]
pub fn pipelines(text: Arc<dyn LogSink>, json: Arc<dyn LogSink>) -> Loggers {
    Loggers::new(
        Pipeline::text(Level::Info, Enricher::default(), text),
        Pipeline::json(Level::Info, Enricher::default(), json),
    )
}

/// Send a GET to `app` and return status and body text.
#[allow(dead_code)]
pub async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Lines of a log file, or none if it was never created.
#[allow(dead_code)]
pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
