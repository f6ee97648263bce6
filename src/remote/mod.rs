//! Remote data source: the published-guide catalog and the write API.
//!
//! [`RemoteSource`] is the seam between the engine and the hosted
//! backend. The sync coordinator and the guide service are generic over
//! it, so tests swap in an in-memory mock and production wires up
//! [`rest::RestRemote`].

pub mod rest;

use crate::domain::{Guide, GuideId, PoiId, PointOfInterest};
use crate::error::TourError;

pub use rest::RestRemote;

/// Operations the engine needs from the hosted backend.
///
/// Reads cover the published catalog only; drafts never leave the
/// authoring session. Writes are the replay targets of the outbox, so
/// every one of them must be safe to retry (the backend upserts by id
/// and treats delete-of-missing as success).
pub trait RemoteSource {
    /// All guides with `published` status.
    fn published_guides(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Guide>, TourError>> + Send;

    /// Looks a guide up by slug, published or not.
    fn guide_by_slug(
        &self,
        slug: &str,
    ) -> impl std::future::Future<Output = Result<Option<Guide>, TourError>> + Send;

    /// POIs of one guide, in route order.
    fn pois_for_guide(
        &self,
        guide_id: GuideId,
    ) -> impl std::future::Future<Output = Result<Vec<PointOfInterest>, TourError>> + Send;

    /// POIs of several guides in one round trip (sync download phase).
    fn pois_for_guides(
        &self,
        guide_ids: &[GuideId],
    ) -> impl std::future::Future<Output = Result<Vec<PointOfInterest>, TourError>> + Send;

    /// Creates a guide.
    fn insert_guide(
        &self,
        guide: &Guide,
    ) -> impl std::future::Future<Output = Result<(), TourError>> + Send;

    /// Deletes a guide and everything under it.
    fn delete_guide(
        &self,
        guide_id: GuideId,
    ) -> impl std::future::Future<Output = Result<(), TourError>> + Send;

    /// Inserts or updates a POI. Temporary client ids are replaced by a
    /// server-assigned id, which is returned.
    fn upsert_poi(
        &self,
        poi: &PointOfInterest,
    ) -> impl std::future::Future<Output = Result<PoiId, TourError>> + Send;

    /// Deletes a POI by id. Deleting an id the server does not know is
    /// not an error.
    fn delete_poi(
        &self,
        poi_id: &PoiId,
    ) -> impl std::future::Future<Output = Result<(), TourError>> + Send;

    /// Submits a 1–5 rating for a guide.
    fn rate_guide(
        &self,
        guide_id: GuideId,
        rating: u8,
    ) -> impl std::future::Future<Output = Result<(), TourError>> + Send;
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct Inner {
        guides: Vec<Guide>,
        pois: Vec<PointOfInterest>,
        ratings: Vec<(GuideId, u8)>,
        calls: Vec<String>,
        fail_all: bool,
        fail_poi_ids: HashSet<PoiId>,
        next_server_id: u32,
    }

    /// In-memory [`RemoteSource`] with failure injection and a call log.
    #[derive(Debug, Clone, Default)]
    pub struct MockRemote {
        inner: Arc<Mutex<Inner>>,
    }

    impl MockRemote {
        pub fn new() -> Self {
            Self::default()
        }

        fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
            let Ok(mut inner) = self.inner.lock() else {
                panic!("mock remote lock poisoned");
            };
            f(&mut inner)
        }

        pub fn seed_guide(&self, guide: Guide) {
            self.with_inner(|i| i.guides.push(guide));
        }

        pub fn seed_pois(&self, pois: Vec<PointOfInterest>) {
            self.with_inner(|i| i.pois.extend(pois));
        }

        /// Every subsequent call fails with a `Remote` error.
        pub fn set_fail_all(&self, fail: bool) {
            self.with_inner(|i| i.fail_all = fail);
        }

        /// Writes touching this POI id fail; everything else succeeds.
        pub fn fail_poi(&self, id: PoiId) {
            self.with_inner(|i| {
                i.fail_poi_ids.insert(id);
            });
        }

        pub fn calls(&self) -> Vec<String> {
            self.with_inner(|i| i.calls.clone())
        }

        pub fn ratings(&self) -> Vec<(GuideId, u8)> {
            self.with_inner(|i| i.ratings.clone())
        }

        pub fn stored_pois(&self) -> Vec<PointOfInterest> {
            self.with_inner(|i| i.pois.clone())
        }

        pub fn stored_guides(&self) -> Vec<Guide> {
            self.with_inner(|i| i.guides.clone())
        }

        fn check_fail(inner: &Inner) -> Result<(), TourError> {
            if inner.fail_all {
                return Err(TourError::Remote("injected failure".to_string()));
            }
            Ok(())
        }
    }

    impl RemoteSource for MockRemote {
        async fn published_guides(&self) -> Result<Vec<Guide>, TourError> {
            self.with_inner(|i| {
                i.calls.push("published_guides".to_string());
                Self::check_fail(i)?;
                Ok(i.guides
                    .iter()
                    .filter(|g| g.status == crate::domain::guide::GuideStatus::Published)
                    .cloned()
                    .collect())
            })
        }

        async fn guide_by_slug(&self, slug: &str) -> Result<Option<Guide>, TourError> {
            self.with_inner(|i| {
                i.calls.push(format!("guide_by_slug:{slug}"));
                Self::check_fail(i)?;
                Ok(i.guides.iter().find(|g| g.slug == slug).cloned())
            })
        }

        async fn pois_for_guide(
            &self,
            guide_id: GuideId,
        ) -> Result<Vec<PointOfInterest>, TourError> {
            self.with_inner(|i| {
                i.calls.push(format!("pois_for_guide:{guide_id}"));
                Self::check_fail(i)?;
                let mut pois: Vec<_> = i
                    .pois
                    .iter()
                    .filter(|p| p.guide_id == guide_id)
                    .cloned()
                    .collect();
                pois.sort_by(|a, b| a.order.cmp(&b.order));
                Ok(pois)
            })
        }

        async fn pois_for_guides(
            &self,
            guide_ids: &[GuideId],
        ) -> Result<Vec<PointOfInterest>, TourError> {
            self.with_inner(|i| {
                i.calls.push("pois_for_guides".to_string());
                Self::check_fail(i)?;
                Ok(i.pois
                    .iter()
                    .filter(|p| guide_ids.contains(&p.guide_id))
                    .cloned()
                    .collect())
            })
        }

        async fn insert_guide(&self, guide: &Guide) -> Result<(), TourError> {
            self.with_inner(|i| {
                i.calls.push(format!("insert_guide:{}", guide.slug));
                Self::check_fail(i)?;
                i.guides.retain(|g| g.id != guide.id);
                i.guides.push(guide.clone());
                Ok(())
            })
        }

        async fn delete_guide(&self, guide_id: GuideId) -> Result<(), TourError> {
            self.with_inner(|i| {
                i.calls.push(format!("delete_guide:{guide_id}"));
                Self::check_fail(i)?;
                i.guides.retain(|g| g.id != guide_id);
                i.pois.retain(|p| p.guide_id != guide_id);
                Ok(())
            })
        }

        async fn upsert_poi(&self, poi: &PointOfInterest) -> Result<PoiId, TourError> {
            self.with_inner(|i| {
                i.calls.push(format!("upsert_poi:{}", poi.id));
                Self::check_fail(i)?;
                if i.fail_poi_ids.contains(&poi.id) {
                    return Err(TourError::Remote(format!("injected failure for {}", poi.id)));
                }
                let id = if poi.id.is_temporary() {
                    i.next_server_id += 1;
                    PoiId::new(format!("srv-{}", i.next_server_id))
                } else {
                    poi.id.clone()
                };
                let mut stored = poi.clone();
                stored.id = id.clone();
                i.pois.retain(|p| p.id != poi.id && p.id != id);
                i.pois.push(stored);
                Ok(id)
            })
        }

        async fn delete_poi(&self, poi_id: &PoiId) -> Result<(), TourError> {
            self.with_inner(|i| {
                i.calls.push(format!("delete_poi:{poi_id}"));
                Self::check_fail(i)?;
                if i.fail_poi_ids.contains(poi_id) {
                    return Err(TourError::Remote(format!("injected failure for {poi_id}")));
                }
                i.pois.retain(|p| p.id != *poi_id);
                Ok(())
            })
        }

        async fn rate_guide(&self, guide_id: GuideId, rating: u8) -> Result<(), TourError> {
            self.with_inner(|i| {
                i.calls.push(format!("rate_guide:{guide_id}:{rating}"));
                Self::check_fail(i)?;
                i.ratings.push((guide_id, rating));
                Ok(())
            })
        }
    }
}
