//! Tour engines: proximity triggering, narration, route projection,
//! and the live tracking session that wires them together.

pub mod narration;
pub mod proximity;
pub mod route;
pub mod tracking;

pub use narration::{NarrationController, NarrationState, SpeechSynthesizer, TracingSynthesizer};
pub use proximity::{ProximityEngine, TriggerEvent};
pub use route::{RouteSegment, compute_segments};
pub use tracking::{GpsTracker, PositionSample};
