//! Service layer: catalog/authoring operations and the sync engine.

pub mod guide_service;
pub mod sync;

pub use guide_service::GuideService;
pub use sync::{SyncCoordinator, SyncReport};
