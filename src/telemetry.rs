//! Telemetry domain: completion events, sinks, and the in-process bus.

pub mod events;
pub mod routing;
pub mod sinks;

pub use events::{CompletionEvent, EventEnvelope};
pub use routing::bus::EventBus;
pub use sinks::{EventSink, NullSink, RecordingSink, TracingSink};
