//! Where phase and stage transitions are reported.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{debug, info, Level};

/// Receives phase and stage transition events.
pub trait EventSink: Send + Sync + Debug {
    /// Records an event. Must not block or fail.
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// Discards every event. The default sink of a context.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn try_emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// Turns events into `tracing` records carrying `phase` and `stage` fields.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl LoggingEventSink {
    /// Logs at `level`; anything other than `DEBUG` logs at `INFO`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Logs at `DEBUG`.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        let text = |key: &str| {
            data.as_ref()
                .and_then(|d| d.get(key))
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let (phase, stage) = (text("phase"), text("stage"));

        if self.level == Level::DEBUG {
            debug!(event = event_type, phase = %phase, stage = %stage, data = ?data, "release event");
        } else {
            info!(event = event_type, phase = %phase, stage = %stage, data = ?data, "release event");
        }
    }
}

/// An event kept by [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Dotted event type such as `stage.memoized`.
    pub event_type: String,
    /// The payload, tagged with the run ID by the context.
    pub data: Option<serde_json::Value>,
}

impl RecordedEvent {
    /// Returns a payload field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.as_ref()?.get(key)
    }

    /// Returns the stage the event is about, if any.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        self.field("stage")?.as_str()
    }
}

/// Keeps every event in memory, for tests and reports.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    recorded: RwLock<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RecordedEvent> {
        self.recorded.read().clone()
    }

    /// Returns the recorded event types, oldest first.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.recorded
            .read()
            .iter()
            .map(|event| event.event_type.clone())
            .collect()
    }

    /// Returns the events whose type starts with `prefix` (`stage.`, `phase.failed`).
    #[must_use]
    pub fn matching(&self, prefix: &str) -> Vec<RecordedEvent> {
        self.recorded
            .read()
            .iter()
            .filter(|event| event.event_type.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Returns the event types recorded for one stage.
    #[must_use]
    pub fn for_stage(&self, stage: &str) -> Vec<String> {
        self.recorded
            .read()
            .iter()
            .filter(|event| event.stage() == Some(stage))
            .map(|event| event.event_type.clone())
            .collect()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recorded.read().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recorded.read().is_empty()
    }

    /// Forgets every recorded event.
    pub fn clear(&self) {
        self.recorded.write().clear();
    }
}

impl EventSink for CollectingEventSink {
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.recorded.write().push(RecordedEvent {
            event_type: event_type.to_string(),
            data,
        });
    }
}
