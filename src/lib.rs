//! # waytour
//!
//! Proximity-triggered tour narration engine with an offline-first
//! guide mirror and a durable mutation outbox.
//!
//! The engine turns a stream of GPS position samples into narration:
//! when the user comes within the configured threshold of the next
//! point of interest, a localized narration text is synthesized and a
//! `poi_triggered` event is broadcast. All guide data is mirrored into
//! an embedded SQLite database so browsing and touring work fully
//! offline; user writes (ratings, authoring edits) are queued in an
//! outbox and replayed against the remote backend by the sync
//! coordinator.
//!
//! ## Architecture
//!
//! ```text
//! Position samples (GPS)          Remote backend (REST)
//!     │                               │
//!     ├── GpsTracker (engine/)        ├── RestRemote (remote/)
//!     ├── ProximityEngine (engine/)   │
//!     ├── NarrationController         ├── SyncCoordinator (service/)
//!     │                               ├── GuideService (service/)
//!     ├── GuideState (domain/)        │
//!     ├── EventBus (domain/)          └── LocalStore (persistence/)
//!     │                                     mirror + outbox (SQLite)
//!     └── RouteSegments (engine/)
//! ```

pub mod app_state;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod remote;
pub mod service;
