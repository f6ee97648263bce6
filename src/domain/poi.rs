//! Point of interest: a named, located, narrated stop on a guide's route.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Coordinate;
use super::ids::{GuideId, PoiId};

/// Title and narration text of a POI in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    /// POI title in this language.
    pub title: String,
    /// Narration body in this language.
    pub description: String,
}

/// A stop within a guide's route.
///
/// Owned by exactly one guide. Created client-side with a temporary id
/// (see [`PoiId::temporary`]) and becomes permanent once the remote
/// write returns a server id. `coordinate` is optional because remote
/// rows occasionally arrive without one; such POIs are skipped by the
/// proximity and route computations rather than failing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    /// Opaque identifier (temporary until first save).
    pub id: PoiId,
    /// Owning guide.
    pub guide_id: GuideId,
    /// Position, if known.
    pub coordinate: Option<Coordinate>,
    /// Localized title/description per language code.
    pub texts: BTreeMap<String, LocalizedText>,
    /// Route position. The tour route is this field, ascending.
    pub order: i64,
    /// Marked for deletion in the editor; purged on save.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending_delete: bool,
}

impl PointOfInterest {
    /// Localized text with fallback: requested language, then
    /// `default_language`, then the first available key.
    #[must_use]
    pub fn text_for(&self, language: &str, default_language: &str) -> Option<&LocalizedText> {
        self.texts
            .get(language)
            .or_else(|| self.texts.get(default_language))
            .or_else(|| self.texts.values().next())
    }
}
