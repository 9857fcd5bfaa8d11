//! Stages for testing phases.

use crate::context::Context;
use crate::stages::Stage;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared log of stage names, in the order their actions ran.
pub type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Succeed,
    Fail,
    Skip,
}

/// A stage that counts its calls and optionally writes to a [`Journal`].
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    behaviour: Behaviour,
    error: String,
    continue_on_error: bool,
    calls: AtomicUsize,
    journal: Option<Journal>,
}

impl RecordingStage {
    fn build(name: impl Into<String>, behaviour: Behaviour, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behaviour,
            error: error.into(),
            continue_on_error: false,
            calls: AtomicUsize::new(0),
            journal: None,
        }
    }

    /// A stage that succeeds.
    #[must_use]
    pub fn ok(name: impl Into<String>) -> Self {
        Self::build(name, Behaviour::Succeed, "")
    }

    /// A fatal stage that fails with `error`.
    #[must_use]
    pub fn failing(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::build(name, Behaviour::Fail, error)
    }

    /// A continue-on-error stage that fails with `error`.
    #[must_use]
    pub fn tolerant(name: impl Into<String>, error: impl Into<String>) -> Self {
        let mut stage = Self::build(name, Behaviour::Fail, error);
        stage.continue_on_error = true;
        stage
    }

    /// A stage whose skip predicate is always true.
    #[must_use]
    pub fn skipped(name: impl Into<String>) -> Self {
        Self::build(name, Behaviour::Skip, "")
    }

    /// Writes the stage name to `journal` each time the action runs.
    #[must_use]
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Returns how many times the action ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn skip(&self, _ctx: &Context) -> anyhow::Result<bool> {
        Ok(self.behaviour == Behaviour::Skip)
    }

    async fn action(&self, _ctx: &mut Context) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(journal) = &self.journal {
            journal.lock().push(self.name.clone());
        }
        match self.behaviour {
            Behaviour::Fail => Err(anyhow::anyhow!(self.error.clone())),
            Behaviour::Succeed | Behaviour::Skip => Ok(()),
        }
    }

    fn continue_on_error(&self) -> bool {
        self.continue_on_error
    }
}

/// A stage that always fails.
#[derive(Debug)]
pub struct FailingStage {
    name: String,
    error: String,
    continue_on_error: bool,
}

impl FailingStage {
    /// Creates a fatal failing stage.
    #[must_use]
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
            continue_on_error: false,
        }
    }

    /// Creates a continue-on-error failing stage.
    #[must_use]
    pub fn continuable(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            continue_on_error: true,
            ..Self::new(name, error)
        }
    }
}

#[async_trait]
impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn action(&self, _ctx: &mut Context) -> anyhow::Result<()> {
        anyhow::bail!("{}", self.error)
    }

    fn continue_on_error(&self) -> bool {
        self.continue_on_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_stage_counts_calls() {
        let journal = Journal::default();
        let stage = RecordingStage::ok("checksums").with_journal(journal.clone());
        let mut ctx = Context::default();

        tokio_test::block_on(stage.action(&mut ctx)).unwrap();
        tokio_test::block_on(stage.action(&mut ctx)).unwrap();

        assert_eq!(stage.calls(), 2);
        assert_eq!(*journal.lock(), vec!["checksums", "checksums"]);
    }

    #[test]
    fn test_recording_stage_behaviours() {
        let ctx = Context::default();
        assert!(RecordingStage::skipped("sbom").skip(&ctx).unwrap());
        assert!(RecordingStage::tolerant("nix", "x").continue_on_error());
        assert!(!RecordingStage::failing("docker", "x").continue_on_error());

        let mut ctx = ctx;
        let err = tokio_test::block_on(RecordingStage::failing("docker", "denied").action(&mut ctx))
            .unwrap_err();
        assert_eq!(err.to_string(), "denied");
    }

    #[test]
    fn test_failing_stage() {
        let stage = FailingStage::continuable("scoop", "bucket missing");
        let err = tokio_test::block_on(stage.action(&mut Context::default())).unwrap_err();
        assert_eq!(err.to_string(), "bucket missing");
        assert!(stage.continue_on_error());
        assert!(!FailingStage::new("scoop", "x").continue_on_error());
    }
}
