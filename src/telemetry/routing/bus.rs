//! In-process event bus for completion events.

use std::sync::mpsc::{channel, Receiver, SendError, Sender};

use crate::telemetry::events::{CompletionEvent, EventEnvelope};
use crate::telemetry::sinks::EventSink;

/// Sink forwarding timestamped events to a channel receiver.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new_pair() -> (Self, Receiver<EventEnvelope>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }

    pub fn send(&self, event: CompletionEvent) -> Result<(), SendError<EventEnvelope>> {
        self.sender.send(EventEnvelope::with_now(event))
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: CompletionEvent) {
        if let Err(err) = self.send(event) {
            tracing::debug!(
                event = err.0.event.event_type(),
                "Event bus receiver dropped; event discarded"
            );
        }
    }
}
