//! Guide catalog, authoring, and rating operations.
//!
//! [`GuideService`] is the write path of the app. Reads prefer the
//! remote catalog while online and fall back to the local mirror;
//! writes go straight to the remote when possible and are queued in the
//! outbox otherwise. Ratings are always queued: the sync replay is the
//! only component that talks to the rating endpoint, so online and
//! offline submissions follow the identical path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use crate::domain::{EventBus, Guide, GuideId, GuideState, PoiId, PointOfInterest, TourEvent};
use crate::error::TourError;
use crate::persistence::{
    GuideDeletePayload, LocalStore, MutationKind, PoiDeletePayload, RateGuidePayload,
    guide_entity_key, poi_entity_key,
};
use crate::remote::RemoteSource;

/// Catalog and authoring operations over the remote source and the
/// local mirror/outbox.
#[derive(Debug)]
pub struct GuideService<R: RemoteSource> {
    store: Arc<LocalStore>,
    remote: R,
    event_bus: EventBus,
    online: Arc<AtomicBool>,
}

impl<R: RemoteSource> GuideService<R> {
    /// Creates the service, initially assumed online.
    #[must_use]
    pub fn new(store: Arc<LocalStore>, remote: R, event_bus: EventBus) -> Self {
        Self {
            store,
            remote,
            event_bus,
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Current connectivity assumption.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Shared handle to the connectivity flag (for the sync scheduler).
    #[must_use]
    pub fn online_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.online)
    }

    /// Records a connectivity transition and notifies subscribers.
    /// Publishes only on an actual flip.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous != online {
            tracing::info!(online, "connectivity changed");
            let _ = self.event_bus.publish(TourEvent::ConnectivityChanged {
                online,
                timestamp: Utc::now(),
            });
        }
    }

    /// Published guides: remote catalog while online, local mirror
    /// otherwise (or when the remote read fails).
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] when the mirror read fails.
    pub async fn list_guides(&self) -> Result<Vec<Guide>, TourError> {
        if self.is_online() {
            match self.remote.published_guides().await {
                Ok(guides) => return Ok(guides),
                Err(e) if e.is_deferrable() => {
                    tracing::warn!(error = %e, "remote catalog unavailable, using mirror");
                }
                Err(e) => return Err(e),
            }
        }
        self.store.published_guides().await
    }

    /// Published guides offered in the given language.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] when the mirror read fails.
    pub async fn list_guides_with_language(
        &self,
        language: &str,
    ) -> Result<Vec<Guide>, TourError> {
        let guides = self.list_guides().await?;
        Ok(guides
            .into_iter()
            .filter(|g| g.available_languages.iter().any(|l| l == language))
            .collect())
    }

    /// Resolves a guide and its POIs by slug, loads them into `state`,
    /// and publishes [`TourEvent::GuideLoaded`].
    ///
    /// # Errors
    ///
    /// Returns [`TourError::GuideNotFound`] when the slug is unknown both
    /// remotely and in the mirror.
    pub async fn load_guide(&self, state: &GuideState, slug: &str) -> Result<Guide, TourError> {
        let (guide, pois) = self.fetch_guide(slug).await?;
        let poi_count = pois.len();
        state.load(guide.clone(), pois).await;
        let _ = self.event_bus.publish(TourEvent::GuideLoaded {
            guide_id: guide.id,
            slug: guide.slug.clone(),
            poi_count,
            timestamp: Utc::now(),
        });
        Ok(guide)
    }

    async fn fetch_guide(&self, slug: &str) -> Result<(Guide, Vec<PointOfInterest>), TourError> {
        if self.is_online() {
            match self.remote.guide_by_slug(slug).await {
                Ok(Some(guide)) => {
                    let pois = self.remote.pois_for_guide(guide.id).await?;
                    return Ok((guide, pois));
                }
                Ok(None) => return Err(TourError::GuideNotFound(slug.to_string())),
                Err(e) if e.is_deferrable() => {
                    tracing::warn!(error = %e, slug, "remote lookup failed, trying mirror");
                }
                Err(e) => return Err(e),
            }
        }
        let guide = self
            .store
            .guide_by_slug(slug)
            .await?
            .ok_or_else(|| TourError::GuideNotFound(slug.to_string()))?;
        let pois = self.store.pois_for_guide(guide.id).await?;
        Ok((guide, pois))
    }

    /// Submits a 1–5 rating. The rating is enqueued and delivered by the
    /// next sync run, never sent directly.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::InvalidRequest`] for a rating outside 1–5 and
    /// [`TourError::Storage`] when the outbox insert fails.
    pub async fn rate_guide(&self, guide_id: GuideId, rating: u8) -> Result<(), TourError> {
        if !(1..=5).contains(&rating) {
            return Err(TourError::InvalidRequest(format!(
                "rating must be 1-5, got {rating}"
            )));
        }
        let payload = serde_json::to_value(RateGuidePayload { guide_id, rating })
            .map_err(|e| TourError::Internal(e.to_string()))?;
        let id = self
            .store
            .enqueue_mutation(MutationKind::RateGuide, &guide_entity_key(guide_id), &payload)
            .await?;
        tracing::debug!(%guide_id, rating, outbox_id = id, "rating queued");
        Ok(())
    }

    /// Creates a guide on the remote, or queues the creation when
    /// offline or the remote is unreachable.
    ///
    /// # Errors
    ///
    /// Returns non-deferrable remote errors and [`TourError::Storage`]
    /// when the outbox insert fails.
    pub async fn create_guide(&self, guide: &Guide) -> Result<(), TourError> {
        if self.is_online() {
            match self.remote.insert_guide(guide).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_deferrable() => {
                    tracing::warn!(error = %e, slug = %guide.slug, "create deferred to outbox");
                }
                Err(e) => return Err(e),
            }
        }
        let payload =
            serde_json::to_value(guide).map_err(|e| TourError::Internal(e.to_string()))?;
        self.store
            .enqueue_mutation(
                MutationKind::GuideCreate,
                &guide_entity_key(guide.id),
                &payload,
            )
            .await?;
        Ok(())
    }

    /// Deletes a guide (and its POIs) on the remote, or queues the
    /// deletion.
    ///
    /// # Errors
    ///
    /// Returns non-deferrable remote errors and [`TourError::Storage`]
    /// when the outbox insert fails.
    pub async fn delete_guide(&self, guide_id: GuideId) -> Result<(), TourError> {
        if self.is_online() {
            match self.remote.delete_guide(guide_id).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_deferrable() => {
                    tracing::warn!(error = %e, %guide_id, "delete deferred to outbox");
                }
                Err(e) => return Err(e),
            }
        }
        let payload = serde_json::to_value(GuideDeletePayload { guide_id })
            .map_err(|e| TourError::Internal(e.to_string()))?;
        self.store
            .enqueue_mutation(
                MutationKind::GuideDelete,
                &guide_entity_key(guide_id),
                &payload,
            )
            .await?;
        Ok(())
    }

    /// Persists an authoring session's POI list for one guide.
    ///
    /// Route order is reassigned from list position (the drag-and-drop
    /// order wins over whatever `order` values the POIs carried).
    /// Deletions marked via `pending_delete` are applied first, then the
    /// surviving POIs are upserted in route order; temporary ids are
    /// replaced by the server-assigned id in the returned list. A POI
    /// that was never saved and is already marked for deletion is simply
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::InvalidRequest`] when a POI belongs to a
    /// different guide, plus non-deferrable remote and storage errors.
    pub async fn save_guide_pois(
        &self,
        guide_id: GuideId,
        pois: Vec<PointOfInterest>,
    ) -> Result<Vec<PointOfInterest>, TourError> {
        if let Some(foreign) = pois.iter().find(|p| p.guide_id != guide_id) {
            return Err(TourError::InvalidRequest(format!(
                "poi {} belongs to guide {}, not {guide_id}",
                foreign.id, foreign.guide_id
            )));
        }

        let (deleted, kept): (Vec<_>, Vec<_>) =
            pois.into_iter().partition(|p| p.pending_delete);

        for poi in &deleted {
            // Never saved: the server has nothing to delete.
            if poi.id.is_temporary() {
                continue;
            }
            self.delete_poi(&poi.id).await?;
        }

        let mut saved = Vec::with_capacity(kept.len());
        for (position, mut poi) in kept.into_iter().enumerate() {
            #[allow(clippy::cast_possible_wrap)]
            {
                poi.order = position as i64;
            }
            let id = self.upsert_poi(&poi).await?;
            poi.id = id;
            saved.push(poi);
        }
        Ok(saved)
    }

    async fn delete_poi(&self, poi_id: &PoiId) -> Result<(), TourError> {
        if self.is_online() {
            match self.remote.delete_poi(poi_id).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_deferrable() => {
                    tracing::warn!(error = %e, %poi_id, "poi delete deferred to outbox");
                }
                Err(e) => return Err(e),
            }
        }
        let payload = serde_json::to_value(PoiDeletePayload {
            poi_id: poi_id.clone(),
        })
        .map_err(|e| TourError::Internal(e.to_string()))?;
        self.store
            .enqueue_mutation(MutationKind::PoiDelete, &poi_entity_key(poi_id), &payload)
            .await?;
        Ok(())
    }

    async fn upsert_poi(&self, poi: &PointOfInterest) -> Result<PoiId, TourError> {
        if self.is_online() {
            match self.remote.upsert_poi(poi).await {
                Ok(id) => return Ok(id),
                Err(e) if e.is_deferrable() => {
                    tracing::warn!(error = %e, poi = %poi.id, "poi upsert deferred to outbox");
                }
                Err(e) => return Err(e),
            }
        }
        let payload =
            serde_json::to_value(poi).map_err(|e| TourError::Internal(e.to_string()))?;
        self.store
            .enqueue_mutation(MutationKind::PoiUpsert, &poi_entity_key(&poi.id), &payload)
            .await?;
        // Queued: the temporary id stays until the replay reaches the
        // server.
        Ok(poi.id.clone())
    }
}
