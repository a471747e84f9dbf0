//! Process-wide fan-out bus: every connected session subscribes once and
//! filters for the room(s) and exclusions it cares about, rather than the
//! registry tracking per-session transports directly.

use tokio::sync::broadcast;

use crate::protocol::OutboundEnvelope;

/// One fan-out event: an envelope addressed to every member of `room_id`
/// except `except_session`, if set.
#[derive(Debug, Clone)]
pub struct RoomEvent {
    pub room_id: String,
    pub except_session: Option<String>,
    pub envelope: OutboundEnvelope,
}

pub struct EventBus {
    pub sender: broadcast::Sender<RoomEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        // Generous capacity: a slow subscriber lags rather than blocks a
        // fast one, and publishing here never blocks either.
        let (sender, _) = broadcast::channel(1024);
        EventBus { sender }
    }

    /// Send failures (closed transport / no subscribers) never abort the
    /// fan-out to other recipients. A `broadcast::Sender::send` failing
    /// just means nobody is currently subscribed; that's not an error
    /// condition for the publisher.
    pub fn publish(&self, event: RoomEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.sender.subscribe()
    }
}
