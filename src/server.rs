//! HTTP surface.
//!
//! A single `GET /hello` endpoint. Every route sits behind
//! [`capture_failures`], so a handler that fails or panics is logged on both
//! pipelines and answered with the fixed failure response.

use crate::capture::{capture_failures, install_panic_hook};
use crate::pipeline::Loggers;
use crate::record::{Fields, Level};
use axum::{extract::State, middleware, routing::get, Router};
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Body returned by `GET /hello`.
pub const HELLO_BODY: &str = "Hello World";

/// Handler state. The pipelines are created by the composition root and
/// injected here.
#[derive(Clone)]
pub struct AppState {
    pub loggers: Arc<Loggers>,
}

impl AppState {
    pub fn new(loggers: Loggers) -> Self {
        Self {
            loggers: Arc::new(loggers),
        }
    }
}

/// The service router.
pub fn router(state: AppState) -> Router {
    with_error_capture(Router::new().route("/hello", get(hello)), state)
}

/// Put `routes` behind the error-capture middleware and attach `state`.
pub fn with_error_capture(routes: Router<AppState>, state: AppState) -> Router {
    install_panic_hook();
    routes
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.loggers),
            capture_failures,
        ))
        .with_state(state)
}

async fn hello(State(state): State<AppState>) -> &'static str {
    log_access(&state.loggers, "/hello").await;
    HELLO_BODY
}

/// Record an endpoint access. The text pipeline gets a plain message, the
/// JSON pipeline an object payload carrying only `message`.
pub async fn log_access(loggers: &Loggers, endpoint: &str) {
    let message = format!("User accessed {} endpoint", endpoint);

    let mut payload = Fields::new();
    payload.insert("message".to_string(), message.clone().into());

    let (_text, _json) = tokio::join!(
        loggers.text.emit(Level::Info, message.as_str(), Fields::new()),
        loggers.json.emit_object(Level::Info, payload),
    );
}

/// Serve until Ctrl+C.
pub async fn serve(listener: TcpListener, state: AppState) -> io::Result<()> {
    serve_with_shutdown(listener, state, shutdown_signal()).await
}

/// Serve until `signal` resolves, then flush both pipelines.
pub async fn serve_with_shutdown<F>(listener: TcpListener, state: AppState, signal: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Server is running on http://localhost:{}", addr.port());

    let loggers = Arc::clone(&state.loggers);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(signal)
        .await?;

    loggers.flush().await;
    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
