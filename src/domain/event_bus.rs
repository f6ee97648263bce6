//! Fan-out of [`TourEvent`]s to any number of observers.
//!
//! The engines and the sync coordinator fire events without knowing who
//! is listening: a headless daemon, a UI layer, a test. Publishing never
//! blocks, and a subscriber that falls behind loses the oldest events
//! rather than stalling a tracking session mid-tour.

use tokio::sync::broadcast;

use super::TourEvent;

/// Sender half of the tour event stream.
///
/// Cheap to clone; every clone feeds the same underlying
/// [`tokio::sync::broadcast`] channel. The capacity bounds how far a
/// slow receiver may lag before it starts missing events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TourEvent>,
}

impl EventBus {
    /// Creates a bus whose ring buffer holds `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcasts `event`, returning how many receivers got it.
    ///
    /// Zero means nobody is listening; the event is dropped, which is
    /// the normal case for a headless engine between subscriptions.
    pub fn publish(&self, event: TourEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Opens a receiver positioned after everything already published.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TourEvent> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
