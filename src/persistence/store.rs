//! SQLite-backed local store: guide/POI mirror plus mutation outbox.
//!
//! The mirror is a full copy of the published-guide subset of the
//! remote store, refreshed wholesale by the sync download phase inside
//! one transaction so readers never observe a half-cleared state. The
//! outbox is append-only for producers; only the sync coordinator
//! consumes rows, and only on confirmed success.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use super::models::{MutationKind, MutationRecord, OutboxPolicy};
use crate::domain::guide::{Guide, GuideStatus, InitialView, LocalizedDetails, RatingAggregate};
use crate::domain::{Coordinate, GuideId, PoiId, PointOfInterest};
use crate::error::TourError;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS guides (
        id TEXT PRIMARY KEY,
        slug TEXT NOT NULL,
        status TEXT NOT NULL,
        default_language TEXT NOT NULL,
        available_languages TEXT NOT NULL,
        details TEXT NOT NULL,
        initial_lat REAL NOT NULL,
        initial_lon REAL NOT NULL,
        initial_zoom INTEGER NOT NULL,
        rating_sum INTEGER NOT NULL,
        rating_count INTEGER NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_guides_slug ON guides (slug)",
    "CREATE TABLE IF NOT EXISTS pois (
        id TEXT PRIMARY KEY,
        guide_id TEXT NOT NULL,
        lat REAL,
        lon REAL,
        texts TEXT NOT NULL,
        poi_order INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_pois_guide_id ON pois (guide_id)",
    "CREATE TABLE IF NOT EXISTS mutations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        entity_key TEXT NOT NULL,
        payload TEXT NOT NULL,
        created_at TEXT NOT NULL,
        error_count INTEGER NOT NULL DEFAULT 0,
        last_error_message TEXT,
        last_attempt_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_mutations_error_count ON mutations (error_count)",
];

type GuideRow = (
    String, // id
    String, // slug
    String, // status
    String, // default_language
    String, // available_languages (JSON)
    String, // details (JSON)
    f64,    // initial_lat
    f64,    // initial_lon
    i64,    // initial_zoom
    i64,    // rating_sum
    i64,    // rating_count
);

type PoiRow = (
    String,      // id
    String,      // guide_id
    Option<f64>, // lat
    Option<f64>, // lon
    String,      // texts (JSON)
    i64,         // poi_order
);

type MutationRow = (
    i64,
    String,
    String,
    String,
    DateTime<Utc>,
    i64,
    Option<String>,
    Option<DateTime<Utc>>,
);

/// Embedded transactional store mirroring the remote data source.
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: Pool<Sqlite>,
}

impl LocalStore {
    /// Opens (creating if missing) the store at the given file path.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] when the database cannot be
    /// opened or the schema cannot be created. Callers should treat
    /// this as fatal at startup.
    pub async fn open(path: &str) -> Result<Self, TourError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.create_schema().await?;
        Ok(store)
    }

    /// Opens an in-memory store (tests and ephemeral sessions).
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on connection or schema failure.
    pub async fn open_in_memory() -> Result<Self, TourError> {
        // A single connection, or each pooled connection would get its
        // own private in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.create_schema().await?;
        Ok(store)
    }

    async fn create_schema(&self) -> Result<(), TourError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mirror
    // ------------------------------------------------------------------

    /// Replaces the mirrored guide and POI tables atomically.
    ///
    /// Clear-then-bulk-insert inside one transaction: a concurrent
    /// reader either sees the previous mirror or the new one, never an
    /// empty or partial intermediate state. On any failure the
    /// transaction is rolled back and the previous mirror is intact.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on any query or commit failure.
    pub async fn replace_mirror(
        &self,
        guides: &[Guide],
        pois: &[PointOfInterest],
    ) -> Result<(), TourError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM guides").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM pois").execute(&mut *tx).await?;

        for guide in guides {
            let languages = serde_json::to_string(&guide.available_languages)
                .map_err(|e| TourError::Storage(e.to_string()))?;
            let details = serde_json::to_string(&guide.details)
                .map_err(|e| TourError::Storage(e.to_string()))?;
            sqlx::query(
                "INSERT INTO guides (id, slug, status, default_language, available_languages, \
                 details, initial_lat, initial_lon, initial_zoom, rating_sum, rating_count) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )
            .bind(guide.id.to_string())
            .bind(&guide.slug)
            .bind(guide.status.as_str())
            .bind(&guide.default_language)
            .bind(languages)
            .bind(details)
            .bind(guide.initial_view.center.latitude)
            .bind(guide.initial_view.center.longitude)
            .bind(i64::from(guide.initial_view.zoom))
            .bind(guide.rating.sum)
            .bind(guide.rating.count)
            .execute(&mut *tx)
            .await?;
        }

        for poi in pois {
            let texts = serde_json::to_string(&poi.texts)
                .map_err(|e| TourError::Storage(e.to_string()))?;
            sqlx::query(
                "INSERT INTO pois (id, guide_id, lat, lon, texts, poi_order) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(poi.id.as_str())
            .bind(poi.guide_id.to_string())
            .bind(poi.coordinate.map(|c| c.latitude))
            .bind(poi.coordinate.map(|c| c.longitude))
            .bind(texts)
            .bind(poi.order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// All mirrored guides with `published` status.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on query failure or a corrupt row.
    pub async fn published_guides(&self) -> Result<Vec<Guide>, TourError> {
        let rows = sqlx::query_as::<_, GuideRow>(
            "SELECT id, slug, status, default_language, available_languages, details, \
             initial_lat, initial_lon, initial_zoom, rating_sum, rating_count \
             FROM guides WHERE status = 'published' ORDER BY slug ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(guide_from_row).collect()
    }

    /// Looks a mirrored guide up by its slug.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on query failure or a corrupt row.
    pub async fn guide_by_slug(&self, slug: &str) -> Result<Option<Guide>, TourError> {
        let row = sqlx::query_as::<_, GuideRow>(
            "SELECT id, slug, status, default_language, available_languages, details, \
             initial_lat, initial_lon, initial_zoom, rating_sum, rating_count \
             FROM guides WHERE slug = ?1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        row.map(guide_from_row).transpose()
    }

    /// Mirrored guides offered in the given language.
    ///
    /// Languages live in a JSON text column, so this filters the
    /// published set in memory instead of through an index. The mirror
    /// holds tens of guides; revisit with a generated column + index if
    /// that ever stops being true.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on query failure or a corrupt row.
    pub async fn guides_with_language(&self, language: &str) -> Result<Vec<Guide>, TourError> {
        let guides = self.published_guides().await?;
        Ok(guides
            .into_iter()
            .filter(|g| g.available_languages.iter().any(|l| l == language))
            .collect())
    }

    /// Mirrored POIs of a guide, ordered by route position.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on query failure or a corrupt row.
    pub async fn pois_for_guide(
        &self,
        guide_id: GuideId,
    ) -> Result<Vec<PointOfInterest>, TourError> {
        let rows = sqlx::query_as::<_, PoiRow>(
            "SELECT id, guide_id, lat, lon, texts, poi_order \
             FROM pois WHERE guide_id = ?1 ORDER BY poi_order ASC, id ASC",
        )
        .bind(guide_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(poi_from_row).collect()
    }

    /// Number of mirrored guides and POIs (for sync reporting).
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on query failure.
    pub async fn mirror_counts(&self) -> Result<(usize, usize), TourError> {
        let guides = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM guides")
            .fetch_one(&self.pool)
            .await?;
        let pois = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pois")
            .fetch_one(&self.pool)
            .await?;
        #[allow(clippy::cast_sign_loss)]
        Ok((guides as usize, pois as usize))
    }

    // ------------------------------------------------------------------
    // Outbox
    // ------------------------------------------------------------------

    /// Appends a mutation to the outbox, returning its row id.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on insert failure.
    pub async fn enqueue_mutation(
        &self,
        kind: MutationKind,
        entity_key: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, TourError> {
        let payload_text =
            serde_json::to_string(payload).map_err(|e| TourError::Storage(e.to_string()))?;
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO mutations (kind, entity_key, payload, created_at, error_count) \
             VALUES (?1, ?2, ?3, ?4, 0) RETURNING id",
        )
        .bind(kind.as_str())
        .bind(entity_key)
        .bind(payload_text)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// All outbox entries, oldest first (then by row id for stable
    /// ordering of same-timestamp entries).
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on query failure or a corrupt row.
    pub async fn pending_mutations(&self) -> Result<Vec<MutationRecord>, TourError> {
        let rows = sqlx::query_as::<_, MutationRow>(
            "SELECT id, kind, entity_key, payload, created_at, error_count, \
             last_error_message, last_attempt_at \
             FROM mutations ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(mutation_from_row).collect()
    }

    /// Outbox entries eligible for replay at `now` under `policy`.
    ///
    /// Excludes dead-lettered entries and entries still inside their
    /// backoff window. Per-entity FIFO is preserved: an ineligible
    /// entry blocks every later entry with the same `entity_key`, so
    /// replay can never reorder writes against one guide or POI.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on query failure or a corrupt row.
    pub async fn due_mutations(
        &self,
        now: DateTime<Utc>,
        policy: &OutboxPolicy,
    ) -> Result<Vec<MutationRecord>, TourError> {
        let pending = self.pending_mutations().await?;
        let mut blocked: HashSet<String> = HashSet::new();
        let mut due = Vec::new();
        for record in pending {
            if blocked.contains(&record.entity_key) {
                continue;
            }
            if record.is_dead_letter(policy) || !record.is_due(now, policy) {
                blocked.insert(record.entity_key.clone());
                continue;
            }
            due.push(record);
        }
        Ok(due)
    }

    /// Removes a confirmed-replayed mutation permanently.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on delete failure.
    pub async fn mark_succeeded(&self, id: i64) -> Result<(), TourError> {
        sqlx::query("DELETE FROM mutations WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Records a failed replay attempt; the entry is retained.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on update failure.
    pub async fn mark_failed(&self, id: i64, message: &str) -> Result<(), TourError> {
        sqlx::query(
            "UPDATE mutations SET error_count = error_count + 1, \
             last_error_message = ?2, last_attempt_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Entries that exhausted their automatic attempts. Retained for
    /// inspection and manual retry, never deleted by the engine.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on query failure or a corrupt row.
    pub async fn dead_letters(
        &self,
        policy: &OutboxPolicy,
    ) -> Result<Vec<MutationRecord>, TourError> {
        let rows = sqlx::query_as::<_, MutationRow>(
            "SELECT id, kind, entity_key, payload, created_at, error_count, \
             last_error_message, last_attempt_at \
             FROM mutations WHERE error_count >= ?1 ORDER BY created_at ASC, id ASC",
        )
        .bind(i64::from(policy.max_attempts))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(mutation_from_row).collect()
    }

    /// Resets a dead-lettered entry so the next sync retries it.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on update failure.
    pub async fn retry_dead_letter(&self, id: i64) -> Result<(), TourError> {
        sqlx::query(
            "UPDATE mutations SET error_count = 0, last_error_message = NULL, \
             last_attempt_at = NULL WHERE id = ?1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of entries currently in the outbox.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Storage`] on query failure.
    pub async fn outbox_len(&self) -> Result<usize, TourError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mutations")
            .fetch_one(&self.pool)
            .await?;
        #[allow(clippy::cast_sign_loss)]
        Ok(count as usize)
    }
}

fn guide_from_row(row: GuideRow) -> Result<Guide, TourError> {
    let (
        id,
        slug,
        status,
        default_language,
        languages_json,
        details_json,
        initial_lat,
        initial_lon,
        initial_zoom,
        rating_sum,
        rating_count,
    ) = row;
    let id = uuid::Uuid::parse_str(&id)
        .map(GuideId::from_uuid)
        .map_err(|e| TourError::Storage(format!("corrupt guide id {id}: {e}")))?;
    let available_languages: Vec<String> = serde_json::from_str(&languages_json)
        .map_err(|e| TourError::Storage(format!("corrupt guide languages: {e}")))?;
    let details: std::collections::BTreeMap<String, LocalizedDetails> =
        serde_json::from_str(&details_json)
            .map_err(|e| TourError::Storage(format!("corrupt guide details: {e}")))?;
    let status = match status.as_str() {
        "published" => GuideStatus::Published,
        _ => GuideStatus::Draft,
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let zoom = initial_zoom.clamp(0, 22) as u8;
    Ok(Guide {
        id,
        slug,
        default_language,
        available_languages,
        details,
        status,
        initial_view: InitialView {
            center: Coordinate::new(initial_lat, initial_lon),
            zoom,
        },
        rating: RatingAggregate {
            sum: rating_sum,
            count: rating_count,
        },
    })
}

fn poi_from_row(row: PoiRow) -> Result<PointOfInterest, TourError> {
    let (id, guide_id, lat, lon, texts_json, order) = row;
    let guide_id = uuid::Uuid::parse_str(&guide_id)
        .map(GuideId::from_uuid)
        .map_err(|e| TourError::Storage(format!("corrupt poi guide id {guide_id}: {e}")))?;
    let texts = serde_json::from_str(&texts_json)
        .map_err(|e| TourError::Storage(format!("corrupt poi texts: {e}")))?;
    let coordinate = match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
        _ => None,
    };
    Ok(PointOfInterest {
        id: PoiId::new(id),
        guide_id,
        coordinate,
        texts,
        order,
        pending_delete: false,
    })
}

fn mutation_from_row(row: MutationRow) -> Result<MutationRecord, TourError> {
    let (id, kind, entity_key, payload_json, created_at, error_count, message, last_attempt) = row;
    let kind = MutationKind::parse(&kind)
        .ok_or_else(|| TourError::Storage(format!("unknown mutation kind {kind}")))?;
    let payload = serde_json::from_str(&payload_json)
        .map_err(|e| TourError::Storage(format!("corrupt mutation payload: {e}")))?;
    Ok(MutationRecord {
        id,
        kind,
        entity_key,
        payload,
        created_at,
        error_count,
        last_error_message: message,
        last_attempt_at: last_attempt,
    })
}
