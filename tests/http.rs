//! Request handling and error capture through the router.

use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::Router;
use dual_log_service::capture::{RequestFailure, FAILURE_BODY, NO_STACKTRACE};
use dual_log_service::file_sink::{FileSink, JSON_LOG_FILE, TEXT_LOG_FILE};
use dual_log_service::server::{router, with_error_capture, AppState, HELLO_BODY};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

mod common;

const TRACE: &str = "Error: boom\n  at handler (src/server.rs:10:5)";

async fn fails_with_trace() -> Result<&'static str, RequestFailure> {
    Err(RequestFailure::with_stacktrace("boom", TRACE))
}

async fn fails_without_trace() -> Result<&'static str, RequestFailure> {
    Err(RequestFailure::without_stacktrace("boom"))
}

async fn panics() -> &'static str {
    panic!("boom")
}

fn failing_app(state: AppState) -> Router {
    let routes = Router::new()
        .route("/hello", get(|| async { HELLO_BODY }))
        .route("/fail", get(fails_with_trace))
        .route("/fail-bare", get(fails_without_trace))
        .route("/panic", get(panics));
    with_error_capture(routes, state)
}

#[tokio::test]
async fn hello_returns_fixed_body_and_logs_both_formats() {
    let (loggers, text, json) = common::memory_loggers();
    let app = router(AppState::new(loggers));

    let response = app
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .uri("/hello")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], HELLO_BODY.as_bytes());

    let text_lines = text.lines();
    assert_eq!(text_lines.len(), 1);
    assert!(text_lines[0].contains(" info "));
    assert!(text_lines[0].contains("[nodejs-app]"));
    assert!(text_lines[0].ends_with("User accessed /hello endpoint"));
    assert!(!text_lines[0].contains("Stacktrace:"));

    let json_lines = json.lines();
    assert_eq!(json_lines.len(), 1);
    let parsed: Value = serde_json::from_str(&json_lines[0]).unwrap();
    assert_eq!(parsed["message"], "User accessed /hello endpoint");
    assert_eq!(parsed["level"], "info");
    assert_eq!(parsed["service"], "nodejs-app");
    assert!(parsed["timestamp"].is_string());
}

#[tokio::test]
async fn handler_failure_is_logged_and_answered_with_500() {
    let (loggers, text, json) = common::memory_loggers();
    let app = failing_app(AppState::new(loggers));

    let (status, body) = common::get(app, "/fail").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, FAILURE_BODY);
    assert!(!body.contains("boom"));

    let text_lines = text.lines();
    assert_eq!(text_lines.len(), 1);
    assert!(text_lines[0].contains(" error [nodejs-app] An error occurred"));
    assert!(text_lines[0].ends_with(&format!("\nStacktrace: {}", TRACE)));

    let parsed: Value = serde_json::from_str(&json.lines()[0]).unwrap();
    assert_eq!(parsed["level"], "error");
    assert_eq!(parsed["message"], "An error occurred");
    assert_eq!(parsed["stacktrace"], TRACE);
}

#[tokio::test]
async fn failure_without_trace_logs_placeholder() {
    let (loggers, text, json) = common::memory_loggers();
    let app = failing_app(AppState::new(loggers));

    let (status, body) = common::get(app, "/fail-bare").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, FAILURE_BODY);

    assert!(text.lines()[0].ends_with(&format!("Stacktrace: {}", NO_STACKTRACE)));
    let parsed: Value = serde_json::from_str(&json.lines()[0]).unwrap();
    assert_eq!(parsed["stacktrace"], NO_STACKTRACE);
}

#[tokio::test]
async fn panicking_handler_is_captured() {
    let (loggers, text, json) = common::memory_loggers();
    let app = failing_app(AppState::new(loggers));

    let (status, body) = common::get(app, "/panic").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, FAILURE_BODY);

    let text_lines = text.lines();
    assert_eq!(text_lines.len(), 1);
    assert!(text_lines[0].contains("\nStacktrace: Error: boom"));
    assert!(!text_lines[0].contains(NO_STACKTRACE));

    let parsed: Value = serde_json::from_str(&json.lines()[0]).unwrap();
    let trace = parsed["stacktrace"].as_str().unwrap();
    assert!(trace.starts_with("Error: boom"), "unexpected trace: {trace}");
}

#[tokio::test]
async fn captured_backtrace_reaches_both_logs() {
    let (loggers, text, json) = common::memory_loggers();
    let routes = Router::new().route(
        "/fail-captured",
        get(|| async {
            Err::<&'static str, _>(RequestFailure::with_backtrace(
                "boom",
                &std::backtrace::Backtrace::force_capture(),
            ))
        }),
    );
    let app = with_error_capture(routes, AppState::new(loggers));

    let (status, body) = common::get(app, "/fail-captured").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, FAILURE_BODY);

    assert!(text.lines()[0].contains("\nStacktrace: Error: boom\n"));
    let parsed: Value = serde_json::from_str(&json.lines()[0]).unwrap();
    assert!(parsed["stacktrace"].as_str().unwrap().starts_with("Error: boom\n"));
}

#[tokio::test]
async fn successful_route_behind_capture_logs_nothing() {
    let (loggers, text, json) = common::memory_loggers();
    let app = failing_app(AppState::new(loggers));

    let (status, body) = common::get(app, "/hello").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, HELLO_BODY);
    assert!(text.is_empty());
    assert!(json.is_empty());
}

#[tokio::test]
async fn unwritable_text_log_does_not_affect_json_log_or_response() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the text log's directory should be.
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, "").unwrap();
    let json_path = dir.path().join(JSON_LOG_FILE);

    let loggers = common::pipelines(
        Arc::new(FileSink::new(blocker.join(TEXT_LOG_FILE))),
        Arc::new(FileSink::new(&json_path)),
    );
    let state = AppState::new(loggers);
    let app = router(state.clone());

    let (status, body) = common::get(app.clone(), "/hello").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, HELLO_BODY);

    let (status, body) = common::get(failing_app(state.clone()), "/fail").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, FAILURE_BODY);

    let json_lines = common::read_lines(&json_path);
    assert_eq!(json_lines.len(), 2);
    let first: Value = serde_json::from_str(&json_lines[0]).unwrap();
    assert_eq!(first["message"], "User accessed /hello endpoint");
    let second: Value = serde_json::from_str(&json_lines[1]).unwrap();
    assert_eq!(second["level"], "error");

    assert_eq!(
        state.loggers.text.failed.load(std::sync::atomic::Ordering::Relaxed),
        2
    );
}

#[tokio::test]
async fn repeated_requests_append_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(AppState::new(common::file_loggers(dir.path())));

    for _ in 0..3 {
        let (status, _) = common::get(app.clone(), "/hello").await;
        assert_eq!(status, StatusCode::OK);
    }

    let text_lines = common::read_lines(&dir.path().join(TEXT_LOG_FILE));
    let json_lines = common::read_lines(&dir.path().join(JSON_LOG_FILE));
    assert_eq!(text_lines.len(), 3);
    assert_eq!(json_lines.len(), 3);
    for line in &json_lines {
        let parsed: Value = serde_json::from_str(line).unwrap();
        assert_eq!(parsed["message"], "User accessed /hello endpoint");
    }
}
