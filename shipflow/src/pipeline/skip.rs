//! Skip evaluation for stages and phases.

use crate::config::Config;
use crate::context::{Context, SkipKey};
use crate::errors::PhaseError;
use crate::stages::Stage;
use std::fmt;
use std::sync::Arc;

type SkipPredicate = Arc<dyn Fn(&Context) -> anyhow::Result<bool> + Send + Sync>;

/// One reason a stage may be bypassed.
#[derive(Clone)]
pub enum SkipRule {
    /// The user asked to skip this key.
    Key(SkipKey),
    /// A templated boolean expression renders `true`.
    Template(String),
    /// A stage-specific condition holds.
    Condition(SkipPredicate),
}

impl SkipRule {
    /// Wraps a predicate as a rule.
    pub fn condition<P>(predicate: P) -> Self
    where
        P: Fn(&Context) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self::Condition(Arc::new(predicate))
    }

    /// Evaluates the rule against the context.
    pub fn evaluate(&self, ctx: &Context) -> anyhow::Result<bool> {
        match self {
            Self::Key(key) => Ok(ctx.skips.contains(*key)),
            Self::Template(expr) => Ok(ctx.templates().evaluate_bool(expr, ctx)?),
            Self::Condition(predicate) => predicate(ctx),
        }
    }
}

impl fmt::Debug for SkipRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Self::Template(expr) => f.debug_tuple("Template").field(expr).finish(),
            Self::Condition(_) => f.write_str("Condition(..)"),
        }
    }
}

/// Evaluates a stage's skip predicate; errors are always fatal.
pub(crate) fn should_skip(stage: &dyn Stage, ctx: &Context) -> Result<bool, PhaseError> {
    stage.skip(ctx).map_err(|error| PhaseError::SkipCondition {
        stage: stage.name().to_string(),
        error,
    })
}

/// Reads a templated skip expression out of the configuration.
pub type ConfigExpr = fn(&Config) -> &str;

/// The phase-wide skip, consulted before any stage runs.
#[derive(Clone, Copy, Default)]
pub struct PhaseSkip {
    key: Option<SkipKey>,
    condition: Option<ConfigExpr>,
}

impl PhaseSkip {
    /// A phase that is never skipped as a whole.
    #[must_use]
    pub fn never() -> Self {
        Self::default()
    }

    /// Skips the phase when the user asked to skip `key`.
    #[must_use]
    pub fn on_key(mut self, key: SkipKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Skips the phase when the configured template renders `true`.
    #[must_use]
    pub fn with_condition(mut self, condition: ConfigExpr) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Returns why the phase is skipped, or `None` when it should run.
    pub fn reason(&self, phase: &str, ctx: &Context) -> Result<Option<String>, PhaseError> {
        if let Some(key) = self.key {
            if ctx.skips.contains(key) {
                return Ok(Some(format!("{key} is in the skip list")));
            }
        }
        if let Some(condition) = self.condition {
            let expr = condition(&ctx.config);
            if expr.trim().is_empty() {
                return Ok(None);
            }
            let skipped = ctx
                .templates()
                .evaluate_bool(expr, ctx)
                .map_err(|source| PhaseError::PhaseSkipCondition {
                    phase: phase.to_string(),
                    source,
                })?;
            if skipped {
                return Ok(Some(format!("skip condition '{expr}' is true")));
            }
        }
        Ok(None)
    }
}

impl fmt::Debug for PhaseSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseSkip")
            .field("key", &self.key)
            .field("has_condition", &self.condition.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SkipSet;
    use crate::stages::FnStage;

    fn announce_skip(config: &Config) -> &str {
        &config.announce.skip
    }

    #[test]
    fn test_rule_key() {
        let ctx = Context::default().with_skips(SkipSet::parse("sign").unwrap());
        assert!(SkipRule::Key(SkipKey::Sign).evaluate(&ctx).unwrap());
        assert!(!SkipRule::Key(SkipKey::Sbom).evaluate(&ctx).unwrap());
    }

    #[test]
    fn test_rule_template_error() {
        let rule = SkipRule::Template("{{ .Unknown }}".to_string());
        let err = rule.evaluate(&Context::default()).unwrap_err();
        assert!(err.to_string().contains("unsupported reference '.Unknown'"));
    }

    #[test]
    fn test_should_skip_wraps_errors() {
        let stage = FnStage::new("nix", |_: &mut Context| Ok(()))
            .skip_when(|_| anyhow::bail!("nix-hash missing"));

        let err = should_skip(&stage, &Context::default()).unwrap_err();
        assert_eq!(err.to_string(), "nix: failed to evaluate skip condition: nix-hash missing");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_phase_skip_by_key() {
        let skip = PhaseSkip::never().on_key(SkipKey::Publish);
        assert_eq!(skip.reason("publishing", &Context::default()).unwrap(), None);

        let ctx = Context::default().with_skips(SkipSet::parse("publish").unwrap());
        assert_eq!(
            skip.reason("publishing", &ctx).unwrap().as_deref(),
            Some("publish is in the skip list")
        );
    }

    #[test]
    fn test_phase_skip_by_condition() {
        let skip = PhaseSkip::never().with_condition(announce_skip);

        let mut ctx = Context::default().with_env("QUIET", "true");
        assert_eq!(skip.reason("announcing", &ctx).unwrap(), None);

        ctx.config.announce.skip = "{{ .Env.QUIET }}".to_string();
        assert!(skip.reason("announcing", &ctx).unwrap().is_some());

        ctx.config.announce.skip = "{{ .Nope }}".to_string();
        let err = skip.reason("announcing", &ctx).unwrap_err();
        assert!(err.to_string().starts_with("announcing: failed to evaluate skip condition:"));
    }
}
