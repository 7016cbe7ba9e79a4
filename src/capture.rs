use crate::pipeline::Loggers;
use crate::record::{Fields, Level, STACKTRACE_FIELD};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Once};

/// Message logged for every failed request.
pub const ERROR_MESSAGE: &str = "An error occurred";

/// Logged in place of a trace when the failure carries none.
pub const NO_STACKTRACE: &str = "No stacktrace available";

/// Body of every failure response. Failure details never reach the caller.
pub const FAILURE_BODY: &str = "Internal Server Error";

/// An unrecoverable failure raised while handling a request.
///
/// Handlers return it as their error type; the response it turns into is
/// tagged so that [`capture_failures`] can log it and answer with the fixed
/// failure response.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{message}")]
pub struct RequestFailure {
    message: String,
    stacktrace: Option<String>,
}

impl RequestFailure {
    /// Failure with a backtrace of the current call site, when the runtime
    /// has backtraces enabled (`RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`).
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_backtrace(message, &Backtrace::capture())
    }

    /// Failure whose trace is `backtrace` rendered as `Error: <message>`
    /// followed by the frames. A disabled or unsupported backtrace leaves the
    /// failure without a trace.
    pub fn with_backtrace(message: impl Into<String>, backtrace: &Backtrace) -> Self {
        let message = message.into();
        let stacktrace = match backtrace.status() {
            BacktraceStatus::Captured => Some(render_trace(&message, Some(&backtrace.to_string()))),
            _ => None,
        };
        Self { message, stacktrace }
    }

    pub fn with_stacktrace(message: impl Into<String>, stacktrace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stacktrace: Some(stacktrace.into()),
        }
    }

    pub fn without_stacktrace(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stacktrace: None,
        }
    }

    /// Failure for a handler that panicked on this thread.
    ///
    /// The trace is `Error: <panic message>`, followed by the frames the
    /// panic hook captured when backtraces are enabled.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        let frames = PANIC_FRAMES.with(|slot| slot.borrow_mut().take());
        let stacktrace = render_trace(&message, frames.as_deref());
        Self::with_stacktrace(message, stacktrace)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stacktrace(&self) -> Option<&str> {
        self.stacktrace.as_deref().filter(|s| !s.is_empty())
    }

    /// The trace to log: the captured one, or [`NO_STACKTRACE`].
    pub fn logged_trace(&self) -> &str {
        self.stacktrace().unwrap_or(NO_STACKTRACE)
    }
}

fn render_trace(message: &str, frames: Option<&str>) -> String {
    match frames {
        Some(frames) => format!("Error: {}\n{}", message, frames),
        None => format!("Error: {}", message),
    }
}

thread_local! {
    // Frames of the last panic on this thread, until `from_panic` takes them.
    static PANIC_FRAMES: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Chain a panic hook that keeps the panicking thread's backtrace for
/// [`RequestFailure::from_panic`]. The previous hook still runs. Idempotent.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let backtrace = Backtrace::capture();
            let frames = match backtrace.status() {
                BacktraceStatus::Captured => Some(backtrace.to_string()),
                _ => None,
            };
            // The slot is gone during thread teardown.
            let _ = PANIC_FRAMES.try_with(|slot| *slot.borrow_mut() = frames);
            previous(info);
        }));
    });
}

impl IntoResponse for RequestFailure {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// The fixed response sent for every failed request.
pub fn failure_response() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY).into_response()
}

/// Where a request ended up once its handler returned.
pub enum RequestState {
    Normal(Response),
    Failed(RequestFailure),
}

impl RequestState {
    /// Classify a handler response; a response tagged by
    /// [`RequestFailure::into_response`] means the request failed.
    pub fn from_response(mut response: Response) -> Self {
        match response.extensions_mut().remove::<RequestFailure>() {
            Some(failure) => RequestState::Failed(failure),
            None => RequestState::Normal(response),
        }
    }

    /// Produce the response for the caller. A failed request is logged on
    /// both pipelines first; sink errors are ignored and never change the
    /// response.
    pub async fn respond(self, loggers: &Loggers) -> Response {
        match self {
            RequestState::Normal(response) => response,
            RequestState::Failed(failure) => {
                log_failure(loggers, &failure).await;
                failure_response()
            }
        }
    }
}

/// Log `failure` as an error record on both pipelines.
pub async fn log_failure(loggers: &Loggers, failure: &RequestFailure) {
    tracing::debug!(error = %failure, "request failed");

    let mut fields = Fields::new();
    fields.insert(STACKTRACE_FIELD.to_string(), failure.logged_trace().into());

    // Outcomes were already reported by the pipelines.
    let (_text, _json) = loggers.emit_both(Level::Error, ERROR_MESSAGE, fields).await;
}

/// Middleware moving a request to [`RequestState::Failed`] when its handler
/// returns a [`RequestFailure`] or panics.
///
/// Install with `axum::middleware::from_fn_with_state(loggers, capture_failures)`
/// after calling [`install_panic_hook`]; `server::with_error_capture` does both.
pub async fn capture_failures(
    State(loggers): State<Arc<Loggers>>,
    request: Request,
    next: Next,
) -> Response {
    let state = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => RequestState::from_response(response),
        Err(payload) => RequestState::Failed(RequestFailure::from_panic(payload)),
    };
    state.respond(&loggers).await
}
