//! Shared application state wiring every layer together.

use std::sync::{Arc, Mutex as StdMutex};

use crate::config::TourConfig;
use crate::domain::{EventBus, GuideState};
use crate::engine::narration::{NarrationController, SpeechSynthesizer};
use crate::engine::tracking::GpsTracker;
use crate::error::TourError;
use crate::persistence::{LocalStore, OutboxPolicy};
use crate::remote::RemoteSource;
use crate::service::{GuideService, SyncCoordinator};

/// Fully wired engine state, shared across an embedding UI's tasks.
///
/// Everything is behind an [`Arc`]; clone the handles you need into
/// each task.
#[derive(Debug)]
pub struct AppState<R: RemoteSource, S: SpeechSynthesizer> {
    /// Loaded configuration.
    pub config: TourConfig,
    /// Local mirror and outbox.
    pub store: Arc<LocalStore>,
    /// Broadcast bus for domain events.
    pub event_bus: EventBus,
    /// Owner of the currently loaded guide.
    pub guide_state: Arc<GuideState>,
    /// Narration playback controller.
    pub narration: Arc<StdMutex<NarrationController<S>>>,
    /// Catalog, authoring, and rating operations.
    pub guides: Arc<GuideService<R>>,
    /// Outbox replay and mirror refresh.
    pub sync: Arc<SyncCoordinator<R>>,
    /// Live GPS tracking session owner.
    pub tracker: Arc<GpsTracker<S>>,
}

impl<R, S> AppState<R, S>
where
    R: RemoteSource + Clone,
    S: SpeechSynthesizer + Send + 'static,
{
    /// Opens the local store and wires every component.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] when the local database cannot be
    /// opened; the engine cannot run without its mirror and outbox.
    pub async fn new(config: TourConfig, remote: R, synthesizer: S) -> Result<Self, TourError> {
        let store = Arc::new(LocalStore::open(&config.database_path).await?);
        let event_bus = EventBus::new(config.event_bus_capacity);
        let guide_state = Arc::new(GuideState::new());
        let narration = Arc::new(StdMutex::new(NarrationController::new(
            synthesizer,
            "en",
        )));

        let policy = OutboxPolicy {
            max_attempts: config.outbox_max_attempts,
            backoff_base_secs: config.outbox_backoff_base_secs,
        };

        let guides = Arc::new(GuideService::new(
            Arc::clone(&store),
            remote.clone(),
            event_bus.clone(),
        ));
        let sync = Arc::new(SyncCoordinator::new(
            Arc::clone(&store),
            remote,
            event_bus.clone(),
            policy,
        ));
        let tracker = Arc::new(GpsTracker::new(
            Arc::clone(&guide_state),
            event_bus.clone(),
            Arc::clone(&narration),
            config.proximity_threshold_m,
        ));

        Ok(Self {
            config,
            store,
            event_bus,
            guide_state,
            narration,
            guides,
            sync,
            tracker,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::engine::narration::TracingSynthesizer;
    use crate::remote::mock::MockRemote;

    #[tokio::test]
    async fn wires_up_against_a_fresh_database() {
        let path = std::env::temp_dir().join(format!("waytour-test-{}.db", uuid::Uuid::new_v4()));
        let config = TourConfig {
            database_path: path.to_string_lossy().into_owned(),
            ..TourConfig::default()
        };

        let Ok(state) = AppState::new(config, MockRemote::new(), TracingSynthesizer).await else {
            panic!("wiring failed");
        };
        assert!(state.guides.is_online());
        assert!(!state.tracker.is_tracking().await);
        let Ok(len) = state.store.outbox_len().await else {
            panic!("outbox query failed");
        };
        assert_eq!(len, 0);

        let _ = std::fs::remove_file(path);
    }
}
