//! Context fixtures.

use crate::config::Config;
use crate::context::Context;
use crate::events::CollectingEventSink;
use std::sync::Arc;

/// Creates a context for tests with the project name `shipflow`.
#[must_use]
pub fn test_context() -> Context {
    let config = Config {
        project_name: "shipflow".to_string(),
        ..Config::default()
    };
    Context::new(config)
}

/// Creates a [`test_context`] whose events are collected.
#[must_use]
pub fn context_with_events() -> (Context, Arc<CollectingEventSink>) {
    let sink = Arc::new(CollectingEventSink::new());
    let ctx = test_context().with_event_sink(sink.clone());
    (ctx, sink)
}
