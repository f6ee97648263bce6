//! Live GPS tracking session.
//!
//! [`GpsTracker`] models the platform geolocation watch: at most one
//! active subscription, consumed strictly in delivery order, torn down
//! explicitly. Each sample is fed to the [`ProximityEngine`] against
//! the current [`GuideState`] snapshot; triggers drive narration and
//! are published on the [`EventBus`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::domain::{Coordinate, EventBus, GuideState, PoiId, TourEvent};
use crate::engine::narration::{NarrationController, SpeechSynthesizer};
use crate::engine::proximity::ProximityEngine;

/// One geolocation reading: a coordinate, or a non-fatal error message
/// (permission denied, unavailable, timeout).
pub type PositionSample = Result<Coordinate, String>;

struct Session {
    task: JoinHandle<()>,
    engine: Arc<StdMutex<ProximityEngine>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Owner of the single active position watch.
#[derive(Debug)]
pub struct GpsTracker<S: SpeechSynthesizer> {
    state: Arc<GuideState>,
    event_bus: EventBus,
    narration: Arc<StdMutex<NarrationController<S>>>,
    threshold_m: f64,
    session: Mutex<Option<Session>>,
}

impl<S: SpeechSynthesizer + Send + 'static> GpsTracker<S> {
    /// Creates a tracker that is not yet watching.
    #[must_use]
    pub fn new(
        state: Arc<GuideState>,
        event_bus: EventBus,
        narration: Arc<StdMutex<NarrationController<S>>>,
        threshold_m: f64,
    ) -> Self {
        Self {
            state,
            event_bus,
            narration,
            threshold_m,
            session: Mutex::new(None),
        }
    }

    /// Starts consuming position samples, replacing any previous watch.
    ///
    /// Samples are processed in delivery order; errors on the channel
    /// are logged and skipped (the subscription stays active). The watch
    /// ends when the sender side closes or [`stop`](Self::stop) is
    /// called. Replacing an active watch publishes `TrackingStopped`
    /// for it before the new `TrackingStarted`.
    pub async fn start(&self, mut samples: mpsc::Receiver<PositionSample>) {
        let mut session = self.session.lock().await;
        if let Some(old) = session.take() {
            old.task.abort();
            // A replaced watch ends like a stopped one; subscribers see
            // a balanced started/stopped stream.
            let _ = self.event_bus.publish(TourEvent::TrackingStopped {
                timestamp: Utc::now(),
            });
        }

        let engine = Arc::new(StdMutex::new(ProximityEngine::new(self.threshold_m)));
        let state = Arc::clone(&self.state);
        let event_bus = self.event_bus.clone();
        let narration = Arc::clone(&self.narration);
        let task_engine = Arc::clone(&engine);

        let task = tokio::spawn(async move {
            while let Some(sample) = samples.recv().await {
                let position = match sample {
                    Ok(position) => position,
                    Err(message) => {
                        tracing::warn!(error = %message, "geolocation error, waiting for next sample");
                        continue;
                    }
                };

                let Some(snapshot) = state.snapshot().await else {
                    continue;
                };

                // The engine and narration locks are held only for the
                // synchronous trigger computation, never across awaits.
                let trigger = match task_engine.lock() {
                    Ok(mut engine) => engine.on_position_sample(
                        position,
                        &snapshot.pois,
                        &snapshot.language,
                        &snapshot.guide.default_language,
                    ),
                    Err(poisoned) => {
                        tracing::error!("proximity engine lock poisoned: {poisoned}");
                        continue;
                    }
                };

                if let Some(event) = trigger {
                    tracing::info!(
                        poi = %event.poi.id,
                        distance_m = event.distance_m,
                        "poi reached"
                    );
                    if let Ok(mut narration) = narration.lock() {
                        narration.speak_trigger(&event);
                    }
                    let _ = event_bus.publish(TourEvent::PoiTriggered {
                        poi_id: event.poi.id.clone(),
                        guide_id: event.poi.guide_id,
                        title: event.title,
                        narration: event.narration,
                        language: event.language,
                        timestamp: Utc::now(),
                    });
                }
            }
            tracing::debug!("position sample channel closed");
        });

        *session = Some(Session { task, engine });
        let _ = self.event_bus.publish(TourEvent::TrackingStarted {
            timestamp: Utc::now(),
        });
    }

    /// Cancels the active watch, stops narration, and resets the
    /// session's visited set. No-op when not tracking.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        if let Some(old) = session.take() {
            old.task.abort();
            if let Ok(mut narration) = self.narration.lock() {
                narration.stop();
            }
            let _ = self.event_bus.publish(TourEvent::TrackingStopped {
                timestamp: Utc::now(),
            });
        }
    }

    /// Returns `true` while a watch is active.
    pub async fn is_tracking(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Snapshot of the POI ids visited this session (empty when not
    /// tracking). Feed this to [`crate::engine::route::compute_segments`].
    pub async fn visited(&self) -> HashSet<PoiId> {
        let session = self.session.lock().await;
        session
            .as_ref()
            .and_then(|s| s.engine.lock().ok().map(|e| e.visited().clone()))
            .unwrap_or_default()
    }
}
