//! Proximity-triggered tour progression.
//!
//! [`ProximityEngine`] consumes position samples and decides when the
//! user has "reached" a POI. A narration trigger fires only on a rising
//! edge: the nearest in-range POI changed since the last trigger.
//! Leaving range clears the edge detector without emitting, so the same
//! POI can retrigger after the user walks away and returns.

use std::collections::HashSet;

use rand::seq::SliceRandom;

use crate::domain::{Coordinate, PoiId, PointOfInterest, distance_meters};

/// Localized introductory phrase templates, one picked at random per
/// trigger. Languages without a table fall back to English.
const INTRO_PHRASES_EN: [&str; 3] = ["You have arrived at", "You are now at", "This is"];
const INTRO_PHRASES_ES: [&str; 3] = ["Has llegado a", "Te encuentras en", "Esto es"];

fn intro_phrases(language: &str) -> &'static [&'static str] {
    match language {
        "es" => &INTRO_PHRASES_ES,
        _ => &INTRO_PHRASES_EN,
    }
}

/// Emitted when the user enters range of a new POI.
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    /// The POI that was reached.
    pub poi: PointOfInterest,
    /// Localized POI title (after language fallback).
    pub title: String,
    /// Full narration text: intro phrase, title, then description.
    pub narration: String,
    /// Language the narration was resolved in.
    pub language: String,
    /// Distance to the POI at trigger time, in meters.
    pub distance_m: f64,
}

/// Edge-detecting proximity engine for a live tour session.
///
/// State is session-scoped: the visited set grows monotonically while
/// tracking runs and is reset when the session ends. Nothing here is
/// persisted.
#[derive(Debug)]
pub struct ProximityEngine {
    threshold_m: f64,
    last_triggered: Option<PoiId>,
    visited: HashSet<PoiId>,
}

impl ProximityEngine {
    /// Creates an engine with the given proximity threshold in meters.
    #[must_use]
    pub fn new(threshold_m: f64) -> Self {
        Self {
            threshold_m,
            last_triggered: None,
            visited: HashSet::new(),
        }
    }

    /// Processes one position sample against the route's POIs.
    ///
    /// Selects the nearest POI by great-circle distance. POIs without a
    /// coordinate, or whose distance comes out non-finite, are skipped.
    /// Equal distances resolve to the lowest POI id, keeping the choice
    /// deterministic across runs.
    ///
    /// Returns `Some(TriggerEvent)` only on a rising edge: the nearest
    /// in-range POI differs from the last triggered one. This covers
    /// both entering range from outside and hopping directly from one
    /// POI's range into another's. Leaving range of all POIs clears the
    /// edge detector (falling edge) without emitting. Never fails; an
    /// empty POI list is a no-op.
    pub fn on_position_sample(
        &mut self,
        position: Coordinate,
        pois: &[PointOfInterest],
        language: &str,
        default_language: &str,
    ) -> Option<TriggerEvent> {
        let mut nearest: Option<(&PointOfInterest, f64)> = None;
        for poi in pois {
            let Some(coordinate) = poi.coordinate else {
                continue;
            };
            let distance = distance_meters(position, coordinate);
            if !distance.is_finite() {
                continue;
            }
            let closer = match nearest {
                None => true,
                Some((best, best_distance)) => {
                    distance < best_distance
                        || (distance == best_distance && poi.id < best.id)
                }
            };
            if closer {
                nearest = Some((poi, distance));
            }
        }

        let in_range = nearest.filter(|(_, d)| *d < self.threshold_m);

        match in_range {
            Some((poi, distance_m)) => {
                if self.last_triggered.as_ref() == Some(&poi.id) {
                    // Lingering in range of the same POI: no re-trigger.
                    return None;
                }
                self.last_triggered = Some(poi.id.clone());
                self.visited.insert(poi.id.clone());

                let (title, description) = poi
                    .text_for(language, default_language)
                    .map_or_else(
                        || (poi.id.to_string(), String::new()),
                        |t| (t.title.clone(), t.description.clone()),
                    );
                let intro = intro_phrases(language)
                    .choose(&mut rand::thread_rng())
                    .copied()
                    .unwrap_or("You have arrived at");
                let narration = format!("{intro} {title}. {description}");

                Some(TriggerEvent {
                    poi: poi.clone(),
                    title,
                    narration,
                    language: language.to_string(),
                    distance_m,
                })
            }
            None => {
                // Falling edge: rearm so the same POI can retrigger
                // after the user leaves and re-enters range.
                self.last_triggered = None;
                None
            }
        }
    }

    /// POI ids triggered during this session.
    #[must_use]
    pub const fn visited(&self) -> &HashSet<PoiId> {
        &self.visited
    }

    /// The POI currently holding the trigger edge, if any.
    #[must_use]
    pub const fn last_triggered(&self) -> Option<&PoiId> {
        self.last_triggered.as_ref()
    }

    /// Clears session state (visited set and edge detector).
    pub fn reset_session(&mut self) {
        self.last_triggered = None;
        self.visited.clear();
    }
}
