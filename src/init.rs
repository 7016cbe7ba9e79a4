use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_CONSOLE_FILTER: &str = "dual_log_service=info";

/// Install the operator console subscriber.
///
/// This only covers process diagnostics (startup, sink failures). Request
/// events go through the text and JSON pipelines, not through `tracing`.
///
/// **Returns**
/// - `Err(..)` if a global subscriber is already installed.
pub fn init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_FILTER));

    Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
