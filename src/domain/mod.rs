//! Domain layer: core types, guide state owner, and event system.
//!
//! This module contains the tour domain model: guide and POI identity,
//! the coordinate value type with great-circle distance, the aggregates
//! mirrored from the remote store, the single owner of the loaded guide,
//! and the event bus for broadcasting state changes.

pub mod coordinate;
pub mod event_bus;
pub mod guide;
pub mod guide_state;
pub mod ids;
pub mod poi;
pub mod tour_event;

pub use coordinate::{Coordinate, distance_meters};
pub use event_bus::EventBus;
pub use guide::{Guide, GuideStatus, InitialView, LocalizedDetails, RatingAggregate};
pub use guide_state::{GuideState, TourSnapshot};
pub use ids::{GuideId, PoiId};
pub use poi::{LocalizedText, PointOfInterest};
pub use tour_event::TourEvent;
