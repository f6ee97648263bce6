//! Type-safe guide and POI identifiers.
//!
//! [`GuideId`] is a newtype wrapper around [`uuid::Uuid`] (v4).
//! [`PoiId`] is an opaque string: POIs created client-side carry a
//! distinguishable `temp-` prefixed id until the remote store assigns a
//! permanent one on first save.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix marking a locally-generated POI id that has not yet been saved.
const TEMP_PREFIX: &str = "temp-";

/// Unique identifier for a guide.
///
/// Wraps a UUID v4. Assigned by the remote store at guide creation and
/// immutable thereafter. Used as the mirror table key and the parent key
/// of every POI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuideId(uuid::Uuid);

impl GuideId {
    /// Creates a new random `GuideId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `GuideId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for GuideId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GuideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for GuideId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<GuideId> for uuid::Uuid {
    fn from(id: GuideId) -> Self {
        id.0
    }
}

/// Opaque identifier for a point of interest.
///
/// Server-assigned ids are stored as-is. Ids minted client-side via
/// [`PoiId::temporary`] carry the `temp-` prefix so the save path can
/// tell "insert" from "upsert by id".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoiId(String);

impl PoiId {
    /// Wraps a server-assigned id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a locally-unique temporary id, pending a server assignment.
    #[must_use]
    pub fn temporary() -> Self {
        Self(format!("{TEMP_PREFIX}{}", uuid::Uuid::new_v4()))
    }

    /// Returns `true` if this id was minted locally and never saved.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_PREFIX)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PoiId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PoiId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn guide_ids_are_unique() {
        assert_ne!(GuideId::new(), GuideId::new());
    }

    #[test]
    fn guide_id_serde_round_trip() {
        let id = GuideId::new();
        let json = serde_json::to_string(&id).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        let Ok(back) = serde_json::from_str::<GuideId>(&json) else {
            panic!("deserialization failed");
        };
        assert_eq!(id, back);
    }

    #[test]
    fn temporary_ids_are_flagged_and_unique() {
        let a = PoiId::temporary();
        let b = PoiId::temporary();
        assert!(a.is_temporary());
        assert!(b.is_temporary());
        assert_ne!(a, b);
    }

    #[test]
    fn server_id_is_not_temporary() {
        let id = PoiId::new("7f3d2a10");
        assert!(!id.is_temporary());
        assert_eq!(id.as_str(), "7f3d2a10");
    }

    #[test]
    fn poi_id_serializes_transparently() {
        let id = PoiId::new("p1");
        assert_eq!(
            serde_json::to_string(&id).ok(),
            Some("\"p1\"".to_string())
        );
    }
}
