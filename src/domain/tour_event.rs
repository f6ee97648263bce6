//! Domain events reflecting tour-session and sync state changes.
//!
//! Every observable state change emits a [`TourEvent`] through the
//! [`super::EventBus`]. UI layers subscribe to drive the map, the POI
//! list, and sync notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ids::{GuideId, PoiId};

/// Domain event emitted by the engines and services.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TourEvent {
    /// A guide and its POIs became the active tour.
    GuideLoaded {
        /// Guide identifier.
        guide_id: GuideId,
        /// Guide slug.
        slug: String,
        /// Number of POIs on the route.
        poi_count: usize,
        /// Load timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Live GPS tracking started.
    TrackingStarted {
        /// Start timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Live GPS tracking stopped; the session's visited set was reset.
    TrackingStopped {
        /// Stop timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The user entered range of a POI and narration was triggered.
    PoiTriggered {
        /// Triggered POI.
        poi_id: PoiId,
        /// Owning guide.
        guide_id: GuideId,
        /// Localized POI title.
        title: String,
        /// Full narration text (intro phrase + title + description).
        narration: String,
        /// Language the narration was resolved in.
        language: String,
        /// Trigger timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Connectivity flipped between online and offline.
    ConnectivityChanged {
        /// New connectivity state.
        online: bool,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A sync run began.
    SyncStarted {
        /// What triggered the run (`"online"`, `"periodic"`, `"manual"`).
        reason: String,
        /// Start timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A sync run finished. `failed` is the aggregate count surfaced to
    /// the user ("N changes could not be synced").
    SyncCompleted {
        /// Mutations replayed successfully.
        replayed: usize,
        /// Mutations that failed and were retained for retry.
        failed: usize,
        /// Guides now in the local mirror.
        guides: usize,
        /// POIs now in the local mirror.
        pois: usize,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A sync run aborted (download phase failure or store error).
    SyncFailed {
        /// Human-readable failure message.
        message: String,
        /// Failure timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl TourEvent {
    /// Returns the event type discriminator string.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::GuideLoaded { .. } => "guide_loaded",
            Self::TrackingStarted { .. } => "tracking_started",
            Self::TrackingStopped { .. } => "tracking_stopped",
            Self::PoiTriggered { .. } => "poi_triggered",
            Self::ConnectivityChanged { .. } => "connectivity_changed",
            Self::SyncStarted { .. } => "sync_started",
            Self::SyncCompleted { .. } => "sync_completed",
            Self::SyncFailed { .. } => "sync_failed",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_type_tag() {
        let event = TourEvent::PoiTriggered {
            poi_id: PoiId::new("p1"),
            guide_id: GuideId::new(),
            title: "Cathedral".to_string(),
            narration: "You have arrived at Cathedral.".to_string(),
            language: "en".to_string(),
            timestamp: Utc::now(),
        };
        let Some(json) = serde_json::to_string(&event).ok() else {
            panic!("serialization failed");
        };
        assert!(json.contains("\"event_type\":\"poi_triggered\""));
        assert_eq!(event.event_type_str(), "poi_triggered");
    }

    #[test]
    fn sync_completed_carries_aggregate_counts() {
        let event = TourEvent::SyncCompleted {
            replayed: 3,
            failed: 1,
            guides: 5,
            pois: 40,
            timestamp: Utc::now(),
        };
        let Some(json) = serde_json::to_string(&event).ok() else {
            panic!("serialization failed");
        };
        assert!(json.contains("\"failed\":1"));
    }
}
