//! Single owner of the loaded guide and its POIs.
//!
//! [`GuideState`] replaces the ambient globals a UI would otherwise
//! accumulate (`currentGuide`, `pois`, ...). Every mutation of the
//! active guide's POI collection goes through this one owner, so the
//! proximity engine, the route projection, and the edit flow observe
//! consistent snapshots.

use tokio::sync::RwLock;

use super::guide::Guide;
use super::ids::{GuideId, PoiId};
use super::poi::PointOfInterest;
use crate::error::TourError;

/// Immutable copy of the active guide handed to the engines.
#[derive(Debug, Clone)]
pub struct TourSnapshot {
    /// The active guide.
    pub guide: Guide,
    /// POIs sorted by `order`, excluding those marked for deletion.
    pub pois: Vec<PointOfInterest>,
    /// Currently selected narration/display language.
    pub language: String,
}

#[derive(Debug)]
struct LoadedGuide {
    guide: Guide,
    /// All POIs including those pending deletion, sorted by `order`.
    pois: Vec<PointOfInterest>,
    language: String,
}

/// Owner of the currently loaded guide, behind a [`tokio::sync::RwLock`].
#[derive(Debug, Default)]
pub struct GuideState {
    inner: RwLock<Option<LoadedGuide>>,
}

impl GuideState {
    /// Creates an empty state with no guide loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `guide` the active tour with the given POIs.
    ///
    /// POIs are sorted by their explicit `order` field (ties by id) —
    /// never by input position. The selected language resets to the
    /// guide's default.
    pub async fn load(&self, guide: Guide, mut pois: Vec<PointOfInterest>) {
        pois.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        let language = guide.default_language.clone();
        *self.inner.write().await = Some(LoadedGuide {
            guide,
            pois,
            language,
        });
    }

    /// Unloads the active guide.
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    /// Returns a consistent copy of the active tour, or `None` when no
    /// guide is loaded. POIs pending deletion are excluded.
    pub async fn snapshot(&self) -> Option<TourSnapshot> {
        let inner = self.inner.read().await;
        inner.as_ref().map(|loaded| TourSnapshot {
            guide: loaded.guide.clone(),
            pois: loaded
                .pois
                .iter()
                .filter(|p| !p.pending_delete)
                .cloned()
                .collect(),
            language: loaded.language.clone(),
        })
    }

    /// Returns the active guide's id, if any.
    pub async fn current_guide_id(&self) -> Option<GuideId> {
        self.inner.read().await.as_ref().map(|l| l.guide.id)
    }

    /// Selects the narration/display language.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::InvalidRequest`] when no guide is loaded or
    /// the language is not among the guide's available languages.
    pub async fn set_language(&self, language: &str) -> Result<(), TourError> {
        let mut inner = self.inner.write().await;
        let loaded = inner
            .as_mut()
            .ok_or_else(|| TourError::InvalidRequest("no guide loaded".to_string()))?;
        if !loaded
            .guide
            .available_languages
            .iter()
            .any(|l| l == language)
        {
            return Err(TourError::InvalidRequest(format!(
                "language {language} not available for guide {}",
                loaded.guide.slug
            )));
        }
        loaded.language = language.to_string();
        Ok(())
    }

    /// Inserts or replaces a POI (matched by id) and re-sorts the route.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::InvalidRequest`] when no guide is loaded or
    /// the POI belongs to a different guide.
    pub async fn upsert_poi(&self, poi: PointOfInterest) -> Result<(), TourError> {
        let mut inner = self.inner.write().await;
        let loaded = inner
            .as_mut()
            .ok_or_else(|| TourError::InvalidRequest("no guide loaded".to_string()))?;
        if poi.guide_id != loaded.guide.id {
            return Err(TourError::InvalidRequest(format!(
                "poi {} belongs to guide {}, not the loaded guide",
                poi.id, poi.guide_id
            )));
        }
        if let Some(existing) = loaded.pois.iter_mut().find(|p| p.id == poi.id) {
            *existing = poi;
        } else {
            loaded.pois.push(poi);
        }
        loaded
            .pois
            .sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(())
    }

    /// Marks a POI for deletion; it disappears from snapshots and is
    /// purged on the next save.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::PoiNotFound`] when the id is unknown.
    pub async fn mark_poi_deleted(&self, id: &PoiId) -> Result<(), TourError> {
        let mut inner = self.inner.write().await;
        let loaded = inner
            .as_mut()
            .ok_or_else(|| TourError::InvalidRequest("no guide loaded".to_string()))?;
        let poi = loaded
            .pois
            .iter_mut()
            .find(|p| p.id == *id)
            .ok_or_else(|| TourError::PoiNotFound(id.clone()))?;
        poi.pending_delete = true;
        Ok(())
    }

    /// Removes a POI outright, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::PoiNotFound`] when the id is unknown.
    pub async fn remove_poi(&self, id: &PoiId) -> Result<PointOfInterest, TourError> {
        let mut inner = self.inner.write().await;
        let loaded = inner
            .as_mut()
            .ok_or_else(|| TourError::InvalidRequest("no guide loaded".to_string()))?;
        let idx = loaded
            .pois
            .iter()
            .position(|p| p.id == *id)
            .ok_or_else(|| TourError::PoiNotFound(id.clone()))?;
        Ok(loaded.pois.remove(idx))
    }

    /// Route order as POI ids (ascending `order`, deletions excluded).
    pub async fn route_ids(&self) -> Vec<PoiId> {
        let inner = self.inner.read().await;
        inner.as_ref().map_or_else(Vec::new, |loaded| {
            loaded
                .pois
                .iter()
                .filter(|p| !p.pending_delete)
                .map(|p| p.id.clone())
                .collect()
        })
    }

    /// All POIs including those pending deletion, for the save path.
    pub async fn all_pois(&self) -> Vec<PointOfInterest> {
        let inner = self.inner.read().await;
        inner
            .as_ref()
            .map_or_else(Vec::new, |loaded| loaded.pois.clone())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::guide::{GuideStatus, InitialView, LocalizedDetails, RatingAggregate};
    use crate::domain::{Coordinate, LocalizedText};
    use std::collections::BTreeMap;

    fn make_guide() -> Guide {
        let mut details = BTreeMap::new();
        details.insert(
            "en".to_string(),
            LocalizedDetails {
                title: "Walk".to_string(),
                summary: String::new(),
            },
        );
        Guide {
            id: GuideId::new(),
            slug: "walk".to_string(),
            default_language: "en".to_string(),
            available_languages: vec!["en".to_string(), "es".to_string()],
            details,
            status: GuideStatus::Published,
            initial_view: InitialView {
                center: Coordinate::new(40.0, -3.0),
                zoom: 14,
            },
            rating: RatingAggregate::default(),
        }
    }

    fn make_poi(guide_id: GuideId, id: &str, order: i64) -> PointOfInterest {
        let mut texts = BTreeMap::new();
        texts.insert(
            "en".to_string(),
            LocalizedText {
                title: id.to_string(),
                description: String::new(),
            },
        );
        PointOfInterest {
            id: PoiId::new(id),
            guide_id,
            coordinate: Some(Coordinate::new(40.0, -3.0)),
            texts,
            order,
            pending_delete: false,
        }
    }

    #[tokio::test]
    async fn load_sorts_by_order_not_input_position() {
        let state = GuideState::new();
        let guide = make_guide();
        let gid = guide.id;
        state
            .load(
                guide,
                vec![
                    make_poi(gid, "p2", 1),
                    make_poi(gid, "p3", 2),
                    make_poi(gid, "p1", 0),
                ],
            )
            .await;

        let ids = state.route_ids().await;
        assert_eq!(
            ids,
            vec![PoiId::new("p1"), PoiId::new("p2"), PoiId::new("p3")]
        );
    }

    #[tokio::test]
    async fn snapshot_excludes_pending_deletions() {
        let state = GuideState::new();
        let guide = make_guide();
        let gid = guide.id;
        state
            .load(guide, vec![make_poi(gid, "p1", 0), make_poi(gid, "p2", 1)])
            .await;

        let Ok(()) = state.mark_poi_deleted(&PoiId::new("p2")).await else {
            panic!("mark failed");
        };

        let Some(snapshot) = state.snapshot().await else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.pois.len(), 1);
        // The save path still sees the marked POI.
        assert_eq!(state.all_pois().await.len(), 2);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let state = GuideState::new();
        let guide = make_guide();
        let gid = guide.id;
        state.load(guide, vec![make_poi(gid, "p1", 0)]).await;

        let mut updated = make_poi(gid, "p1", 5);
        updated.texts.insert(
            "en".to_string(),
            LocalizedText {
                title: "Renamed".to_string(),
                description: String::new(),
            },
        );
        let Ok(()) = state.upsert_poi(updated).await else {
            panic!("upsert failed");
        };

        let Some(snapshot) = state.snapshot().await else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.pois.len(), 1);
        assert_eq!(snapshot.pois.first().map(|p| p.order), Some(5));
    }

    #[tokio::test]
    async fn upsert_rejects_foreign_guide() {
        let state = GuideState::new();
        let guide = make_guide();
        state.load(guide, Vec::new()).await;

        let foreign = make_poi(GuideId::new(), "px", 0);
        assert!(state.upsert_poi(foreign).await.is_err());
    }

    #[tokio::test]
    async fn set_language_validates_membership() {
        let state = GuideState::new();
        state.load(make_guide(), Vec::new()).await;

        let Ok(()) = state.set_language("es").await else {
            panic!("es should be available");
        };
        assert!(state.set_language("zh").await.is_err());

        let Some(snapshot) = state.snapshot().await else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.language, "es");
    }

    #[tokio::test]
    async fn operations_without_guide_fail_or_are_empty() {
        let state = GuideState::new();
        assert!(state.snapshot().await.is_none());
        assert!(state.route_ids().await.is_empty());
        assert!(state.set_language("en").await.is_err());
        assert!(state.remove_poi(&PoiId::new("p1")).await.is_err());
    }
}
