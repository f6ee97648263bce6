//! Two-phase sync: outbox replay, then mirror refresh.
//!
//! A run uploads queued mutations first so the subsequent download
//! reflects the user's own writes, then replaces the local mirror with
//! the current published catalog. Runs never overlap: a second caller
//! gets [`TourError::SyncInProgress`] immediately instead of queueing.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::{EventBus, Guide, PointOfInterest, TourEvent};
use crate::error::TourError;
use crate::persistence::{
    GuideDeletePayload, LocalStore, MutationKind, MutationRecord, OutboxPolicy, PoiDeletePayload,
    RateGuidePayload,
};
use crate::remote::RemoteSource;

/// Outcome of one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Mutations replayed and removed from the outbox.
    pub replayed: usize,
    /// Mutations that failed this run and were retained.
    pub failed: usize,
    /// Mutations skipped because an earlier mutation on the same entity
    /// failed this run.
    pub skipped: usize,
    /// Guides in the mirror after the download phase.
    pub guides: usize,
    /// POIs in the mirror after the download phase.
    pub pois: usize,
}

/// Orchestrates outbox replay and mirror refresh against the remote.
#[derive(Debug)]
pub struct SyncCoordinator<R: RemoteSource> {
    store: Arc<LocalStore>,
    remote: R,
    event_bus: EventBus,
    policy: OutboxPolicy,
    run_guard: Mutex<()>,
}

impl<R: RemoteSource> SyncCoordinator<R> {
    /// Creates a coordinator with the given retry policy.
    #[must_use]
    pub fn new(store: Arc<LocalStore>, remote: R, event_bus: EventBus, policy: OutboxPolicy) -> Self {
        Self {
            store,
            remote,
            event_bus,
            policy,
            run_guard: Mutex::new(()),
        }
    }

    /// Runs one sync cycle.
    ///
    /// Phase 1 replays every due outbox mutation in enqueue order; a
    /// failure marks the entry for retry and skips later entries on the
    /// same entity, but other entities continue. Phase 2 downloads the
    /// published catalog and atomically replaces the mirror. Phase 1
    /// results stick even when phase 2 fails.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::SyncInProgress`] when a run is already in
    /// flight, and the underlying error when the download phase or a
    /// store operation fails.
    pub async fn run(&self, reason: &str) -> Result<SyncReport, TourError> {
        let Ok(_guard) = self.run_guard.try_lock() else {
            tracing::debug!(reason, "sync already running, rejecting");
            return Err(TourError::SyncInProgress);
        };

        tracing::info!(reason, "sync started");
        let _ = self.event_bus.publish(TourEvent::SyncStarted {
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });

        let result = self.run_phases().await;
        match &result {
            Ok(report) => {
                tracing::info!(
                    replayed = report.replayed,
                    failed = report.failed,
                    guides = report.guides,
                    pois = report.pois,
                    "sync completed"
                );
                let _ = self.event_bus.publish(TourEvent::SyncCompleted {
                    replayed: report.replayed,
                    failed: report.failed,
                    guides: report.guides,
                    pois: report.pois,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "sync failed");
                let _ = self.event_bus.publish(TourEvent::SyncFailed {
                    message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
        result
    }

    async fn run_phases(&self) -> Result<SyncReport, TourError> {
        let mut report = self.replay_outbox().await?;
        let (guides, pois) = self.refresh_mirror().await?;
        report.guides = guides;
        report.pois = pois;
        Ok(report)
    }

    /// Phase 1: replay due mutations, oldest first.
    async fn replay_outbox(&self) -> Result<SyncReport, TourError> {
        let due = self.store.due_mutations(Utc::now(), &self.policy).await?;
        let mut report = SyncReport::default();
        let mut failed_entities: HashSet<String> = HashSet::new();

        for record in due {
            if failed_entities.contains(&record.entity_key) {
                report.skipped += 1;
                continue;
            }
            match self.replay_one(&record).await {
                Ok(()) => {
                    self.store.mark_succeeded(record.id).await?;
                    report.replayed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        outbox_id = record.id,
                        kind = record.kind.as_str(),
                        entity = %record.entity_key,
                        error = %e,
                        "mutation replay failed, retained for retry"
                    );
                    self.store.mark_failed(record.id, &e.to_string()).await?;
                    failed_entities.insert(record.entity_key.clone());
                    report.failed += 1;
                }
            }
        }

        if report.failed > 0 {
            tracing::warn!(
                count = report.failed,
                "changes could not be synced and will be retried"
            );
        }
        Ok(report)
    }

    async fn replay_one(&self, record: &MutationRecord) -> Result<(), TourError> {
        let decode = |e: serde_json::Error| TourError::Internal(format!("bad payload: {e}"));
        match record.kind {
            MutationKind::RateGuide => {
                let payload: RateGuidePayload =
                    serde_json::from_value(record.payload.clone()).map_err(decode)?;
                self.remote
                    .rate_guide(payload.guide_id, payload.rating)
                    .await
            }
            MutationKind::GuideCreate => {
                let guide: Guide =
                    serde_json::from_value(record.payload.clone()).map_err(decode)?;
                self.remote.insert_guide(&guide).await
            }
            MutationKind::GuideDelete => {
                let payload: GuideDeletePayload =
                    serde_json::from_value(record.payload.clone()).map_err(decode)?;
                self.remote.delete_guide(payload.guide_id).await
            }
            MutationKind::PoiUpsert => {
                let poi: PointOfInterest =
                    serde_json::from_value(record.payload.clone()).map_err(decode)?;
                self.remote.upsert_poi(&poi).await.map(|_| ())
            }
            MutationKind::PoiDelete => {
                let payload: PoiDeletePayload =
                    serde_json::from_value(record.payload.clone()).map_err(decode)?;
                self.remote.delete_poi(&payload.poi_id).await
            }
        }
    }

    /// Phase 2: download the published catalog and swap the mirror.
    async fn refresh_mirror(&self) -> Result<(usize, usize), TourError> {
        let guides = self.remote.published_guides().await?;
        let ids: Vec<_> = guides.iter().map(|g| g.id).collect();
        let pois = self.remote.pois_for_guides(&ids).await?;
        self.store.replace_mirror(&guides, &pois).await?;
        Ok((guides.len(), pois.len()))
    }
}
