//! Row types for the local mirror and the mutation outbox.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{GuideId, PoiId};

/// Discriminator for queued user writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Submit a rating for a guide (RPC on the remote).
    RateGuide,
    /// Create a new guide.
    GuideCreate,
    /// Delete a guide and its POIs.
    GuideDelete,
    /// Insert or update a POI by id.
    PoiUpsert,
    /// Delete a POI by id.
    PoiDelete,
}

impl MutationKind {
    /// Returns the wire/storage string for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RateGuide => "rate_guide",
            Self::GuideCreate => "guide_create",
            Self::GuideDelete => "guide_delete",
            Self::PoiUpsert => "poi_upsert",
            Self::PoiDelete => "poi_delete",
        }
    }

    /// Parses the storage string back into a kind.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rate_guide" => Some(Self::RateGuide),
            "guide_create" => Some(Self::GuideCreate),
            "guide_delete" => Some(Self::GuideDelete),
            "poi_upsert" => Some(Self::PoiUpsert),
            "poi_delete" => Some(Self::PoiDelete),
            _ => None,
        }
    }
}

/// Retry policy applied when selecting outbox entries for replay.
#[derive(Debug, Clone, Copy)]
pub struct OutboxPolicy {
    /// Attempts before an entry is dead-lettered (excluded from
    /// automatic replay but never deleted).
    pub max_attempts: u32,
    /// Base of the exponential backoff between attempts, in seconds.
    pub backoff_base_secs: u64,
}

impl OutboxPolicy {
    /// Upper bound on a single backoff interval.
    const MAX_BACKOFF_SECS: i64 = 3_600;

    /// Backoff to wait after `error_count` failed attempts.
    #[must_use]
    pub fn backoff_after(&self, error_count: i64) -> Duration {
        if error_count <= 0 {
            return Duration::zero();
        }
        // base * 2^(n-1), capped well before the shift can overflow.
        let exponent = (error_count - 1).min(10);
        #[allow(clippy::cast_possible_wrap)]
        let secs = (self.backoff_base_secs as i64)
            .saturating_mul(1_i64 << exponent)
            .min(Self::MAX_BACKOFF_SECS);
        Duration::seconds(secs)
    }
}

/// One queued user write awaiting confirmation against the remote store.
///
/// Shape mirrors the persisted row: auto-increment id, kind, an entity
/// key used for per-entity FIFO, a JSON payload, and retry bookkeeping.
/// Entries are deleted only on confirmed success; failures increment
/// `error_count` and are retained indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRecord {
    /// Auto-increment outbox row id.
    pub id: i64,
    /// What operation to replay.
    pub kind: MutationKind,
    /// FIFO grouping key (`guide:<id>` / `poi:<id>`).
    pub entity_key: String,
    /// Operation-specific data.
    pub payload: serde_json::Value,
    /// Enqueue timestamp; replay order is ascending on this.
    pub created_at: DateTime<Utc>,
    /// Number of failed replay attempts so far.
    pub error_count: i64,
    /// Message from the most recent failed attempt.
    pub last_error_message: Option<String>,
    /// Timestamp of the most recent attempt.
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl MutationRecord {
    /// `true` once the entry has exhausted its automatic attempts.
    #[must_use]
    pub fn is_dead_letter(&self, policy: &OutboxPolicy) -> bool {
        self.error_count >= i64::from(policy.max_attempts)
    }

    /// `true` when the entry's backoff window has elapsed at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>, policy: &OutboxPolicy) -> bool {
        match self.last_attempt_at {
            None => true,
            Some(last) => last + policy.backoff_after(self.error_count) <= now,
        }
    }
}

/// Payload of a `rate_guide` mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateGuidePayload {
    /// Guide being rated.
    pub guide_id: GuideId,
    /// Rating value (1–5).
    pub rating: u8,
}

/// Payload of a `guide_delete` mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideDeletePayload {
    /// Guide to delete (POIs go with it).
    pub guide_id: GuideId,
}

/// Payload of a `poi_delete` mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiDeletePayload {
    /// POI to delete.
    pub poi_id: PoiId,
}

/// Entity key for guide-scoped mutations.
#[must_use]
pub fn guide_entity_key(id: GuideId) -> String {
    format!("guide:{id}")
}

/// Entity key for POI-scoped mutations.
#[must_use]
pub fn poi_entity_key(id: &PoiId) -> String {
    format!("poi:{id}")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_record(error_count: i64, last_attempt_at: Option<DateTime<Utc>>) -> MutationRecord {
        MutationRecord {
            id: 1,
            kind: MutationKind::RateGuide,
            entity_key: "guide:g1".to_string(),
            payload: serde_json::Value::Null,
            created_at: Utc::now(),
            error_count,
            last_error_message: None,
            last_attempt_at,
        }
    }

    const POLICY: OutboxPolicy = OutboxPolicy {
        max_attempts: 8,
        backoff_base_secs: 30,
    };

    #[test]
    fn kind_round_trips_through_storage_string() {
        for kind in [
            MutationKind::RateGuide,
            MutationKind::GuideCreate,
            MutationKind::GuideDelete,
            MutationKind::PoiUpsert,
            MutationKind::PoiDelete,
        ] {
            assert_eq!(MutationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MutationKind::parse("unknown"), None);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(POLICY.backoff_after(0), Duration::zero());
        assert_eq!(POLICY.backoff_after(1), Duration::seconds(30));
        assert_eq!(POLICY.backoff_after(2), Duration::seconds(60));
        assert_eq!(POLICY.backoff_after(3), Duration::seconds(120));
        // Capped at one hour no matter how many failures.
        assert_eq!(POLICY.backoff_after(50), Duration::seconds(3_600));
    }

    #[test]
    fn never_attempted_is_always_due() {
        let record = make_record(0, None);
        assert!(record.is_due(Utc::now(), &POLICY));
    }

    #[test]
    fn backoff_window_gates_due() {
        let now = Utc::now();
        let record = make_record(1, Some(now - Duration::seconds(10)));
        assert!(!record.is_due(now, &POLICY));
        assert!(record.is_due(now + Duration::seconds(30), &POLICY));
    }

    #[test]
    fn dead_letter_threshold() {
        assert!(!make_record(7, None).is_dead_letter(&POLICY));
        assert!(make_record(8, None).is_dead_letter(&POLICY));
    }

    #[test]
    fn entity_keys_distinguish_kinds() {
        let guide_id = GuideId::new();
        let poi_id = PoiId::new("p1");
        assert_eq!(guide_entity_key(guide_id), format!("guide:{guide_id}"));
        assert_eq!(poi_entity_key(&poi_id), "poi:p1");
    }
}
