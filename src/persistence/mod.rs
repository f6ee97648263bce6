//! Embedded persistence: the offline mirror and the mutation outbox,
//! both backed by a single SQLite database.

pub mod models;
pub mod store;

pub use models::{
    GuideDeletePayload, MutationKind, MutationRecord, OutboxPolicy, PoiDeletePayload,
    RateGuidePayload, guide_entity_key, poi_entity_key,
};
pub use store::LocalStore;
