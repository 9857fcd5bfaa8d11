//! Event sink system for observability.
//!
//! The pipeline runner reports phase and stage transitions to the sink held
//! by the [`Context`](crate::context::Context). Event types are dotted
//! strings such as `phase.started` or `stage.memoized`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};
