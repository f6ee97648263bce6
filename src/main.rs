//! waytour engine entry point.
//!
//! Wires the engine against the configured remote backend and keeps the
//! local mirror fresh: one sync at startup, one on every reconnect, and
//! a periodic run in between.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use waytour::app_state::AppState;
use waytour::config::TourConfig;
use waytour::domain::TourEvent;
use waytour::engine::narration::TracingSynthesizer;
use waytour::error::TourError;
use waytour::remote::{RemoteSource, RestRemote};
use waytour::service::SyncCoordinator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = TourConfig::from_env()?;
    tracing::info!(
        database = %config.database_path,
        remote = %config.remote_base_url,
        "starting waytour"
    );

    // Build the remote client and wire the engine
    let remote = RestRemote::new(&config)?;
    let state = AppState::new(config, remote, TracingSynthesizer).await?;

    // First sync: populate (or refresh) the mirror before anything else
    run_sync(&state.sync, "startup").await;

    // Reconnects trigger an immediate sync
    let sync = Arc::clone(&state.sync);
    let mut events = state.event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(TourEvent::ConnectivityChanged { online: true, .. }) => {
                    run_sync(&sync, "online").await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Periodic refresh until shutdown
    let mut interval = tokio::time::interval(Duration::from_secs(state.config.sync_interval_secs));
    interval.tick().await; // first tick fires immediately; startup sync already ran
    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_sync(&state.sync, "periodic").await;
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("shutting down");
                state.tracker.stop().await;
                break;
            }
        }
    }

    Ok(())
}

/// Runs one sync cycle, logging instead of propagating failures: the
/// engine keeps serving from the mirror when the remote is unreachable.
async fn run_sync<R: RemoteSource>(sync: &SyncCoordinator<R>, reason: &str) {
    match sync.run(reason).await {
        Ok(report) => {
            if report.failed > 0 {
                tracing::warn!(
                    failed = report.failed,
                    "{} changes could not be synced",
                    report.failed
                );
            }
        }
        Err(TourError::SyncInProgress) => {
            tracing::debug!(reason, "sync already running");
        }
        Err(e) => {
            tracing::warn!(reason, error = %e, "sync failed, will retry later");
        }
    }
}
