//! Stage trait and implementations.
//!
//! Stages are the units of work a release phase runs in order. Every stage
//! has a name and an action over the shared [`Context`]. It may also
//! override the optional capabilities:
//!
//! - [`Stage::skip`] to bypass itself for this run
//! - [`Stage::continue_on_error`] to let the phase go on after it fails
//! - [`Stage::dependencies`] to report the external binaries it needs

mod defaults;
mod repository;
mod status;

pub use defaults::SetDefaults;
pub use repository::ResolveRepository;
pub use status::StageStatus;

use crate::context::{Context, SkipKey};
use crate::pipeline::SkipRule;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for release stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage, used in logs and errors.
    fn name(&self) -> &str;

    /// Returns true if the stage should be bypassed for this run.
    ///
    /// An error aborts the phase whatever [`Stage::continue_on_error`] says.
    fn skip(&self, _ctx: &Context) -> anyhow::Result<bool> {
        Ok(false)
    }

    /// Runs the stage.
    async fn action(&self, ctx: &mut Context) -> anyhow::Result<()>;

    /// Returns true if a failure of this stage should be recorded instead
    /// of aborting the phase. Ignored when the context is fail-fast.
    fn continue_on_error(&self) -> bool {
        false
    }

    /// Returns the external binaries this stage needs on `PATH`.
    fn dependencies(&self, _ctx: &Context) -> Vec<String> {
        Vec::new()
    }
}

/// A stage built from a closure.
pub struct FnStage<F>
where
    F: Fn(&mut Context) -> anyhow::Result<()> + Send + Sync,
{
    name: String,
    func: F,
    continue_on_error: bool,
    skip_rules: Vec<SkipRule>,
    dependencies: Vec<String>,
}

impl<F> FnStage<F>
where
    F: Fn(&mut Context) -> anyhow::Result<()> + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            continue_on_error: false,
            skip_rules: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Sets whether failures of this stage are memoized.
    #[must_use]
    pub fn with_continue_on_error(mut self, value: bool) -> Self {
        self.continue_on_error = value;
        self
    }

    /// Skips the stage when the user asked to skip `key`.
    #[must_use]
    pub fn skip_on(mut self, key: SkipKey) -> Self {
        self.skip_rules.push(SkipRule::Key(key));
        self
    }

    /// Skips the stage when the template renders `true`.
    #[must_use]
    pub fn skip_if_template(mut self, expr: impl Into<String>) -> Self {
        self.skip_rules.push(SkipRule::Template(expr.into()));
        self
    }

    /// Skips the stage when the predicate returns true.
    #[must_use]
    pub fn skip_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Context) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.skip_rules.push(SkipRule::condition(predicate));
        self
    }

    /// Declares an external binary this stage runs.
    #[must_use]
    pub fn requires(mut self, binary: impl Into<String>) -> Self {
        self.dependencies.push(binary.into());
        self
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&mut Context) -> anyhow::Result<()> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .field("continue_on_error", &self.continue_on_error)
            .field("skip_rules", &self.skip_rules)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&mut Context) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn skip(&self, ctx: &Context) -> anyhow::Result<bool> {
        for rule in &self.skip_rules {
            if rule.evaluate(ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn action(&self, ctx: &mut Context) -> anyhow::Result<()> {
        (self.func)(ctx)
    }

    fn continue_on_error(&self) -> bool {
        self.continue_on_error
    }

    fn dependencies(&self, _ctx: &Context) -> Vec<String> {
        self.dependencies.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SkipSet;
    use crate::context::{Artifact, ArtifactKind};

    #[tokio::test]
    async fn test_fn_stage_action() {
        let stage = FnStage::new("checksums", |ctx: &mut Context| {
            ctx.artifacts.add(Artifact::new(
                "checksums.txt",
                "dist/checksums.txt",
                ArtifactKind::Checksum,
            ));
            Ok(())
        });

        let mut ctx = Context::default();
        stage.action(&mut ctx).await.unwrap();

        assert_eq!(stage.name(), "checksums");
        assert_eq!(ctx.artifacts.len(), 1);
        assert!(!stage.continue_on_error());
    }

    #[tokio::test]
    async fn test_fn_stage_error() {
        let stage = FnStage::new("docker", |_: &mut Context| anyhow::bail!("daemon not running"));
        let err = stage.action(&mut Context::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "daemon not running");
    }

    #[test]
    fn test_default_capabilities() {
        let stage = FnStage::new("noop", |_: &mut Context| Ok(()));
        let ctx = Context::default();
        assert!(!stage.skip(&ctx).unwrap());
        assert!(stage.dependencies(&ctx).is_empty());
    }

    #[test]
    fn test_skip_on_key() {
        let stage = FnStage::new("docker", |_: &mut Context| Ok(())).skip_on(SkipKey::Docker);

        assert!(!stage.skip(&Context::default()).unwrap());
        let ctx = Context::default().with_skips(SkipSet::parse("docker").unwrap());
        assert!(stage.skip(&ctx).unwrap());
    }

    #[test]
    fn test_skip_if_template() {
        let stage = FnStage::new("sign", |_: &mut Context| Ok(()))
            .skip_if_template("{{ .Env.SHIPFLOW_SKIP_SIGN }}");

        let ctx = Context::default().with_env("SHIPFLOW_SKIP_SIGN", "true");
        assert!(stage.skip(&ctx).unwrap());
        let ctx = Context::default().with_env("SHIPFLOW_SKIP_SIGN", "false");
        assert!(!stage.skip(&ctx).unwrap());
    }

    #[test]
    fn test_skip_when_error_propagates() {
        let stage = FnStage::new("sbom", |_: &mut Context| Ok(()))
            .skip_when(|_| anyhow::bail!("cannot evaluate"));
        assert!(stage.skip(&Context::default()).is_err());
    }

    #[test]
    fn test_requires() {
        let stage = FnStage::new("docker", |_: &mut Context| Ok(()))
            .requires("docker")
            .with_continue_on_error(true);
        assert_eq!(stage.dependencies(&Context::default()), vec!["docker".to_string()]);
        assert!(stage.continue_on_error());
    }

    #[test]
    fn test_continue_on_error_builder_and_capability_agree() {
        let tolerant = FnStage::new("nfpm", |_: &mut Context| Ok(())).with_continue_on_error(true);
        let strict = FnStage::new("snapcraft", |_: &mut Context| Ok(()));

        assert!(tolerant.continue_on_error());
        assert!(!strict.continue_on_error());

        let stages: Vec<Box<dyn Stage>> = vec![Box::new(tolerant), Box::new(strict)];
        let flags: Vec<bool> = stages.iter().map(|s| s.continue_on_error()).collect();
        assert_eq!(flags, vec![true, false]);
    }
}
