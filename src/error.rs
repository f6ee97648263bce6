//! Central error type for the tour engine.
//!
//! [`TourError`] is the single error enum used across the domain, the
//! local store, the remote client, and the sync coordinator. Lower-level
//! failures (sqlx, reqwest) are flattened into the `Storage` / `Remote`
//! variants at the boundary where they occur.

use crate::domain::PoiId;

/// Engine-wide error enum.
///
/// # Error Categories
///
/// | Variant          | Source                         |
/// |------------------|--------------------------------|
/// | `GuideNotFound`  | catalog lookup by slug         |
/// | `PoiNotFound`    | POI lookup by id               |
/// | `InvalidRequest` | caller-supplied bad data       |
/// | `Storage`        | local SQLite mirror / outbox   |
/// | `Remote`         | remote BaaS read or write      |
/// | `Offline`        | direct write while offline     |
/// | `SyncInProgress` | overlapping sync run rejected  |
/// | `Internal`       | invariant violation            |
#[derive(Debug, thiserror::Error)]
pub enum TourError {
    /// No guide with the given slug exists (locally or remotely).
    #[error("guide not found: {0}")]
    GuideNotFound(String),

    /// No POI with the given id exists.
    #[error("poi not found: {0}")]
    PoiNotFound(PoiId),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Local store failure (open, query, or transaction abort).
    #[error("storage error: {0}")]
    Storage(String),

    /// Remote data source failure (network, HTTP status, decode).
    #[error("remote error: {0}")]
    Remote(String),

    /// A direct remote write was attempted while the app is offline.
    #[error("offline: remote write not attempted")]
    Offline,

    /// A sync run is already in flight; runs must not overlap.
    #[error("sync already in progress")]
    SyncInProgress,

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TourError {
    /// Returns `true` for failures the outbox records for a later retry
    /// rather than surfacing immediately to the user.
    #[must_use]
    pub const fn is_deferrable(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::Offline)
    }
}

impl From<sqlx::Error> for TourError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for TourError {
    fn from(e: reqwest::Error) -> Self {
        Self::Remote(e.to_string())
    }
}
