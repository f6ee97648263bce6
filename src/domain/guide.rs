//! Guide aggregate: a located, multilingual tour with an ordered route.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Coordinate;
use super::ids::GuideId;

/// Publication status of a guide.
///
/// Only published guides are mirrored locally for offline browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideStatus {
    /// Visible to its editor only.
    Draft,
    /// Listed in the public catalog and mirrored by sync.
    Published,
}

impl GuideStatus {
    /// Returns the status as the wire string (`"draft"` / `"published"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

/// Title and summary of a guide in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedDetails {
    /// Guide title in this language.
    pub title: String,
    /// Short catalog summary in this language.
    pub summary: String,
}

/// Initial map viewport when a guide is opened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialView {
    /// Map center.
    pub center: Coordinate,
    /// Map widget zoom level.
    pub zoom: u8,
}

/// Aggregate rating for a guide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingAggregate {
    /// Sum of all submitted rating values.
    pub sum: i64,
    /// Number of submitted ratings.
    pub count: i64,
}

impl RatingAggregate {
    /// Mean rating, or `None` when no ratings were submitted.
    #[must_use]
    pub fn average(&self) -> Option<f64> {
        #[allow(clippy::cast_precision_loss)]
        if self.count > 0 {
            Some(self.sum as f64 / self.count as f64)
        } else {
            None
        }
    }
}

/// A location-based tour guide.
///
/// Owns an ordered sequence of POIs (not stored inline; the tour route
/// is the POIs' explicit `order` field, never array position). The
/// `available_languages` set is expected to be a superset of the keys in
/// `details` and in each POI's texts; lookups fall back rather than fail
/// when that invariant is violated by remote data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    /// Server-assigned identifier.
    pub id: GuideId,
    /// Unique human-readable key used in catalog links.
    pub slug: String,
    /// Language used when a requested localization is missing.
    pub default_language: String,
    /// Language codes this guide is offered in.
    pub available_languages: Vec<String>,
    /// Localized title/summary per language code.
    pub details: BTreeMap<String, LocalizedDetails>,
    /// Draft or published.
    pub status: GuideStatus,
    /// Initial map viewport.
    pub initial_view: InitialView,
    /// Aggregate rating.
    pub rating: RatingAggregate,
}

impl Guide {
    /// Localized details with fallback: requested language, then the
    /// guide's default language, then the first available key.
    #[must_use]
    pub fn details_for(&self, language: &str) -> Option<&LocalizedDetails> {
        self.details
            .get(language)
            .or_else(|| self.details.get(&self.default_language))
            .or_else(|| self.details.values().next())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_guide() -> Guide {
        let mut details = BTreeMap::new();
        details.insert(
            "en".to_string(),
            LocalizedDetails {
                title: "Old Town Walk".to_string(),
                summary: "A stroll through the old town".to_string(),
            },
        );
        details.insert(
            "es".to_string(),
            LocalizedDetails {
                title: "Paseo por el casco antiguo".to_string(),
                summary: "Un paseo por el casco antiguo".to_string(),
            },
        );
        Guide {
            id: GuideId::new(),
            slug: "old-town-walk".to_string(),
            default_language: "en".to_string(),
            available_languages: vec!["en".to_string(), "es".to_string()],
            details,
            status: GuideStatus::Published,
            initial_view: InitialView {
                center: Coordinate::new(40.4167, -3.7038),
                zoom: 15,
            },
            rating: RatingAggregate { sum: 9, count: 2 },
        }
    }

    #[test]
    fn details_exact_language() {
        let guide = make_guide();
        let Some(details) = guide.details_for("es") else {
            panic!("expected spanish details");
        };
        assert_eq!(details.title, "Paseo por el casco antiguo");
    }

    #[test]
    fn details_fall_back_to_default_language() {
        let guide = make_guide();
        let Some(details) = guide.details_for("fr") else {
            panic!("expected fallback details");
        };
        assert_eq!(details.title, "Old Town Walk");
    }

    #[test]
    fn details_fall_back_to_first_available() {
        let mut guide = make_guide();
        guide.default_language = "de".to_string();
        let Some(details) = guide.details_for("fr") else {
            panic!("expected fallback details");
        };
        // BTreeMap order makes "en" the first available key.
        assert_eq!(details.title, "Old Town Walk");
    }

    #[test]
    fn empty_details_yield_none() {
        let mut guide = make_guide();
        guide.details.clear();
        assert!(guide.details_for("en").is_none());
    }

    #[test]
    fn rating_average() {
        let guide = make_guide();
        assert_eq!(guide.rating.average(), Some(4.5));
        assert_eq!(RatingAggregate::default().average(), None);
    }

    #[test]
    fn status_wire_strings() {
        assert_eq!(GuideStatus::Draft.as_str(), "draft");
        assert_eq!(GuideStatus::Published.as_str(), "published");
    }
}
