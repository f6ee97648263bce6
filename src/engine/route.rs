//! Route visualization projection: visited vs. unvisited legs.

use std::collections::{HashMap, HashSet};

use crate::domain::{Coordinate, PoiId, PointOfInterest};

/// One leg of the tour route, drawable as a polyline segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSegment {
    /// Start coordinate.
    pub from: Coordinate,
    /// End coordinate.
    pub to: Coordinate,
    /// `true` iff the destination POI has been visited — arriving marks
    /// the leg complete, not departing.
    pub visited: bool,
}

/// Projects the route order and visited set into drawable segments.
///
/// For each adjacent pair in `ordered_ids`, a segment is emitted when
/// both ids resolve to POIs with coordinates. Unknown ids (e.g. a POI
/// mid-deletion) and coordinate-less POIs skip that pair rather than
/// failing. Pure function: no state beyond the arguments.
#[must_use]
pub fn compute_segments(
    ordered_ids: &[PoiId],
    pois: &HashMap<PoiId, PointOfInterest>,
    visited: &HashSet<PoiId>,
) -> Vec<RouteSegment> {
    ordered_ids
        .windows(2)
        .filter_map(|pair| {
            let (from_id, to_id) = match pair {
                [a, b] => (a, b),
                _ => return None,
            };
            let from = pois.get(from_id)?.coordinate?;
            let to = pois.get(to_id)?.coordinate?;
            Some(RouteSegment {
                from,
                to,
                visited: visited.contains(to_id),
            })
        })
        .collect()
}
