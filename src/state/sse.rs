use tokio::sync::broadcast;
use tracing::trace;

use crate::dto::sse::ServerEvent;

/// Broadcast hub fanning match events out to every SSE subscriber.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers. Having none is not an error.
    pub fn broadcast(&self, event: ServerEvent) {
        if self.sender.send(event).is_err() {
            trace!("no SSE subscriber for event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
