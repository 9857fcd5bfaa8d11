//! Testing utilities for shipflow phases and stages.
//!
//! This module provides:
//! - Stages that record their calls or always fail
//! - Context fixtures with a collecting event sink

mod fixtures;
mod mocks;

pub use fixtures::{context_with_events, test_context};
pub use mocks::{FailingStage, Journal, RecordingStage};

#[cfg(test)]
pub(crate) mod git_repo;
