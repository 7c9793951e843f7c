//! Event sinks. Emitting is best-effort: a sink never fails a completion.

use crate::telemetry::events::CompletionEvent;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Capability handed to the dispatcher for structured decision events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CompletionEvent);
}

/// Writes events through `tracing` under the `gencomplete::events` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: CompletionEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        let task_id = event.task_id();
        match &event {
            CompletionEvent::ShotLinkFailed { .. } | CompletionEvent::EditSourceMissing { .. } => {
                warn!(target: "gencomplete::events", event = event.event_type(), %task_id, %payload)
            }
            CompletionEvent::GenerationCreated { .. }
            | CompletionEvent::VariantCreated { .. }
            | CompletionEvent::SingleItemCollapse { .. }
            | CompletionEvent::TaskConsumed { .. } => {
                info!(target: "gencomplete::events", event = event.event_type(), %task_id, %payload)
            }
            _ => debug!(target: "gencomplete::events", event = event.event_type(), %task_id, %payload),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: CompletionEvent) {}
}

/// Keeps events in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CompletionEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CompletionEvent> {
        self.events.lock().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.event_type()).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: CompletionEvent) {
        self.events.lock().push(event);
    }
}
