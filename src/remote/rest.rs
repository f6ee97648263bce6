//! REST client for a PostgREST-style hosted backend.
//!
//! Tables are exposed under `/rest/v1/<table>` with filter query
//! parameters (`slug=eq.walk`, `guide_id=in.(a,b)`), and the rating
//! submission is a stored procedure under `/rest/v1/rpc/rate_guide`.
//! Wire rows are decoded into private DTOs and mapped to domain types
//! at this boundary; nothing above this module sees the wire shape.

use std::collections::BTreeMap;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;

use super::RemoteSource;
use crate::config::TourConfig;
use crate::domain::guide::{Guide, GuideStatus, InitialView, LocalizedDetails, RatingAggregate};
use crate::domain::{Coordinate, GuideId, LocalizedText, PoiId, PointOfInterest};
use crate::error::TourError;

#[derive(Debug, Deserialize)]
struct GuideRow {
    id: uuid::Uuid,
    slug: String,
    status: String,
    default_language: String,
    available_langs: Vec<String>,
    details: BTreeMap<String, LocalizedDetails>,
    initial_lat: f64,
    initial_lng: f64,
    initial_zoom: i64,
    #[serde(default)]
    rating_sum: i64,
    #[serde(default)]
    rating_count: i64,
}

#[derive(Debug, Deserialize)]
struct PoiRow {
    id: String,
    guide_id: uuid::Uuid,
    lat: Option<f64>,
    lng: Option<f64>,
    texts: BTreeMap<String, LocalizedText>,
    position: i64,
}

fn guide_from_row(row: GuideRow) -> Guide {
    let status = match row.status.as_str() {
        "published" => GuideStatus::Published,
        _ => GuideStatus::Draft,
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let zoom = row.initial_zoom.clamp(0, 22) as u8;
    Guide {
        id: GuideId::from_uuid(row.id),
        slug: row.slug,
        default_language: row.default_language,
        available_languages: row.available_langs,
        details: row.details,
        status,
        initial_view: InitialView {
            center: Coordinate::new(row.initial_lat, row.initial_lng),
            zoom,
        },
        rating: RatingAggregate {
            sum: row.rating_sum,
            count: row.rating_count,
        },
    }
}

fn poi_from_row(row: PoiRow) -> PointOfInterest {
    let coordinate = match (row.lat, row.lng) {
        (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
        _ => None,
    };
    PointOfInterest {
        id: PoiId::new(row.id),
        guide_id: GuideId::from_uuid(row.guide_id),
        coordinate,
        texts: row.texts,
        order: row.position,
        pending_delete: false,
    }
}

fn guide_to_row(guide: &Guide) -> serde_json::Value {
    serde_json::json!({
        "id": guide.id,
        "slug": guide.slug,
        "status": guide.status.as_str(),
        "default_language": guide.default_language,
        "available_langs": guide.available_languages,
        "details": guide.details,
        "initial_lat": guide.initial_view.center.latitude,
        "initial_lng": guide.initial_view.center.longitude,
        "initial_zoom": guide.initial_view.zoom,
    })
}

fn poi_to_row(poi: &PointOfInterest) -> serde_json::Value {
    let mut row = serde_json::json!({
        "guide_id": poi.guide_id,
        "lat": poi.coordinate.map(|c| c.latitude),
        "lng": poi.coordinate.map(|c| c.longitude),
        "texts": poi.texts,
        "position": poi.order,
    });
    // Temporary client ids are never sent; the server assigns the real
    // id on insert.
    if !poi.id.is_temporary()
        && let Some(map) = row.as_object_mut()
    {
        map.insert(
            "id".to_string(),
            serde_json::Value::String(poi.id.as_str().to_string()),
        );
    }
    row
}

/// [`RemoteSource`] over HTTP.
#[derive(Debug, Clone)]
pub struct RestRemote {
    client: reqwest::Client,
    base_url: String,
}

impl RestRemote {
    /// Builds a client from the configured base URL and API key.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::InvalidRequest`] when the API key contains
    /// characters that cannot appear in an HTTP header, and
    /// [`TourError::Remote`] when the client cannot be constructed.
    pub fn new(config: &TourConfig) -> Result<Self, TourError> {
        let mut headers = HeaderMap::new();
        if !config.remote_api_key.is_empty() {
            let key = HeaderValue::from_str(&config.remote_api_key)
                .map_err(|e| TourError::InvalidRequest(format!("invalid api key: {e}")))?;
            let bearer =
                HeaderValue::from_str(&format!("Bearer {}", config.remote_api_key))
                    .map_err(|e| TourError::InvalidRequest(format!("invalid api key: {e}")))?;
            headers.insert("apikey", key);
            headers.insert(AUTHORIZATION, bearer);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: config.remote_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    async fn fetch_guides(&self, query: &[(&str, String)]) -> Result<Vec<Guide>, TourError> {
        let rows: Vec<GuideRow> = self
            .client
            .get(self.table_url("guides"))
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(rows.into_iter().map(guide_from_row).collect())
    }

    async fn fetch_pois(&self, query: &[(&str, String)]) -> Result<Vec<PointOfInterest>, TourError> {
        let rows: Vec<PoiRow> = self
            .client
            .get(self.table_url("guide_poi"))
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(rows.into_iter().map(poi_from_row).collect())
    }
}

impl RemoteSource for RestRemote {
    async fn published_guides(&self) -> Result<Vec<Guide>, TourError> {
        self.fetch_guides(&[
            ("status", "eq.published".to_string()),
            ("select", "*".to_string()),
        ])
        .await
    }

    async fn guide_by_slug(&self, slug: &str) -> Result<Option<Guide>, TourError> {
        let mut guides = self
            .fetch_guides(&[
                ("slug", format!("eq.{slug}")),
                ("select", "*".to_string()),
                ("limit", "1".to_string()),
            ])
            .await?;
        Ok(guides.pop())
    }

    async fn pois_for_guide(&self, guide_id: GuideId) -> Result<Vec<PointOfInterest>, TourError> {
        self.fetch_pois(&[
            ("guide_id", format!("eq.{guide_id}")),
            ("order", "position.asc".to_string()),
        ])
        .await
    }

    async fn pois_for_guides(
        &self,
        guide_ids: &[GuideId],
    ) -> Result<Vec<PointOfInterest>, TourError> {
        if guide_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = guide_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.fetch_pois(&[
            ("guide_id", format!("in.({ids})")),
            ("order", "position.asc".to_string()),
        ])
        .await
    }

    async fn insert_guide(&self, guide: &Guide) -> Result<(), TourError> {
        self.client
            .post(self.table_url("guides"))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&guide_to_row(guide))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_guide(&self, guide_id: GuideId) -> Result<(), TourError> {
        // Child rows first; the backend has no cascading delete on the
        // anonymous role.
        self.client
            .delete(self.table_url("guide_poi"))
            .query(&[("guide_id", format!("eq.{guide_id}"))])
            .send()
            .await?
            .error_for_status()?;
        self.client
            .delete(self.table_url("guides"))
            .query(&[("id", format!("eq.{guide_id}"))])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn upsert_poi(&self, poi: &PointOfInterest) -> Result<PoiId, TourError> {
        let rows: Vec<PoiRow> = self
            .client
            .post(self.table_url("guide_poi"))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&poi_to_row(poi))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        rows.into_iter()
            .next()
            .map(|row| PoiId::new(row.id))
            .ok_or_else(|| TourError::Remote("upsert returned no row".to_string()))
    }

    async fn delete_poi(&self, poi_id: &PoiId) -> Result<(), TourError> {
        self.client
            .delete(self.table_url("guide_poi"))
            .query(&[("id", format!("eq.{poi_id}"))])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn rate_guide(&self, guide_id: GuideId, rating: u8) -> Result<(), TourError> {
        self.client
            .post(self.table_url("rpc/rate_guide"))
            .json(&serde_json::json!({
                "p_guide_id": guide_id,
                "p_rating": rating,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
