use dual_log_service::config::ServiceConfig;
use dual_log_service::init::init_tracing;
use dual_log_service::pipeline::Loggers;
use dual_log_service::server::{self, AppState};
use tokio::net::TcpListener;

// One request at a time on a single cooperative loop; sink appends are the
// suspension points.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        bind_address = %config.bind_addr,
        log_dir = %config.log_dir.display(),
        service = %config.service_name,
        level = %config.level,
        "Configuration loaded"
    );

    let state = AppState::new(Loggers::open(&config));
    let listener = TcpListener::bind(config.bind_addr).await?;
    server::serve(listener, state).await?;

    Ok(())
}
