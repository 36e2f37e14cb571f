//! Listener setup and graceful shutdown.

use std::time::Duration;

use destiny_config::Config;
use destiny_core::defaults;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::router;
use crate::error::ServerError;
use crate::maintenance::spawn_maintenance;
use crate::state::AppState;

/// Default time allowed for in-flight requests after shutdown begins.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration =
    Duration::from_secs(defaults::DEFAULT_SHUTDOWN_TIMEOUT_SECS);

/// Run the server until `shutdown` is cancelled.
pub async fn run_with_shutdown(
    config: Config,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let state = AppState::from_config(&config)?;
    let listener = TcpListener::bind(&config.server.listen).await?;
    info!(
        address = %config.server.listen,
        daily_limit = config.usage.daily_limit,
        images_root = %config.images.root,
        "listening"
    );

    let maintenance = config.maintenance.enabled.then(|| {
        spawn_maintenance(
            state.clone(),
            Duration::from_secs(config.maintenance.check_interval_secs),
            shutdown.clone(),
        )
    });

    let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    let result = serve(listener, state, shutdown.clone(), timeout).await;

    shutdown.cancel();
    if let Some(handle) = maintenance
        && let Err(e) = handle.await
    {
        warn!(error = %e, "maintenance task ended abnormally");
    }
    result
}

/// Serve `state` on an already-bound listener.
///
/// After `shutdown` fires, in-flight requests get `shutdown_timeout` to
/// finish before the server returns.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
    shutdown_timeout: Duration,
) -> Result<(), ServerError> {
    let app = router(state);
    let signal = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result.map_err(ServerError::from),
        _ = shutdown.cancelled() => {
            info!("shutdown signal received, draining connections");
        }
    }

    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(result) => {
            info!("all connections closed");
            result.map_err(ServerError::from)
        }
        Err(_) => {
            warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "shutdown timeout, dropping remaining connections"
            );
            Ok(())
        }
    }
}
