//! The phase runner.

use super::memo::ErrorMemo;
use super::skip::{should_skip, PhaseSkip};
use crate::config::Config;
use crate::context::{Context, SkipKey};
use crate::errors::{PhaseError, StageFailure};
use crate::stages::{SetDefaults, Stage, StageStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// How a phase treats stage failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Each stage decides through [`Stage::continue_on_error`].
    #[default]
    PerStage,
    /// Every stage failure is memoized.
    Tolerant,
}

/// Execution record of one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage name.
    pub name: String,
    /// How the stage ended.
    pub status: StageStatus,
    /// Time spent in the action, zero when skipped.
    pub duration_ms: f64,
    /// The rendered error for failed stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Execution report of a phase that ran its stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    /// Phase name.
    pub phase: String,
    /// One record per stage, in execution order.
    pub stages: Vec<StageRecord>,
    /// Total phase duration.
    pub duration_ms: f64,
}

impl PhaseReport {
    /// Returns the record of a stage.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|record| record.name == name)
    }

    /// Returns the names of stages with the given status.
    #[must_use]
    pub fn with_status(&self, status: StageStatus) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|record| record.status == status)
            .map(|record| record.name.as_str())
            .collect()
    }
}

/// Successful result of a phase run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PhaseOutcome {
    /// The whole phase was skipped before any stage was looked at.
    Skipped {
        /// Phase name.
        phase: String,
        /// Why the phase was skipped.
        reason: String,
    },
    /// The phase ran; individual stages may still have been skipped.
    Completed(PhaseReport),
}

impl PhaseOutcome {
    /// Returns the phase name.
    #[must_use]
    pub fn phase(&self) -> &str {
        match self {
            Self::Skipped { phase, .. } => phase,
            Self::Completed(report) => &report.phase,
        }
    }

    /// Returns true if the phase was skipped as a whole.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Returns the execution report of a completed phase.
    #[must_use]
    pub fn report(&self) -> Option<&PhaseReport> {
        match self {
            Self::Skipped { .. } => None,
            Self::Completed(report) => Some(report),
        }
    }
}

fn announce_skip(config: &Config) -> &str {
    &config.announce.skip
}

/// A named, ordered list of stages run under one error policy.
///
/// The stage list is fixed at construction. Stages run one at a time in
/// declared order against the same context.
pub struct Phase {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
    policy: ErrorPolicy,
    skip: PhaseSkip,
    failure_context: Option<String>,
    aggregate_context: Option<String>,
}

impl Phase {
    /// Creates a phase with the per-stage error policy.
    pub fn new(name: impl Into<String>, stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            name: name.into(),
            stages,
            policy: ErrorPolicy::PerStage,
            skip: PhaseSkip::never(),
            failure_context: None,
            aggregate_context: None,
        }
    }

    /// The defaults phase: [`SetDefaults`] followed by `stages`.
    #[must_use]
    pub fn defaults(stages: Vec<Arc<dyn Stage>>) -> Self {
        let mut all: Vec<Arc<dyn Stage>> = Vec::with_capacity(stages.len() + 1);
        all.push(Arc::new(SetDefaults::new()));
        all.extend(stages);
        Self::new("defaults", all)
    }

    /// The publish phase, skipped by `--skip=publish`.
    #[must_use]
    pub fn publish(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self::new("publishing", stages)
            .with_skip(PhaseSkip::never().on_key(SkipKey::Publish))
            .with_failure_context("failed to publish artifacts")
    }

    /// The announce phase, where every announcer is tolerant.
    #[must_use]
    pub fn announce(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self::new("announcing", stages)
            .with_policy(ErrorPolicy::Tolerant)
            .with_skip(
                PhaseSkip::never()
                    .on_key(SkipKey::Announce)
                    .with_condition(announce_skip),
            )
            .with_aggregate_context("failed to announce release")
    }

    /// Sets the error policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the phase-wide skip.
    #[must_use]
    pub fn with_skip(mut self, skip: PhaseSkip) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the text inserted between the stage name and a fatal error.
    #[must_use]
    pub fn with_failure_context(mut self, context: impl Into<String>) -> Self {
        self.failure_context = Some(context.into());
        self
    }

    /// Sets the text prefixed to the aggregate error.
    #[must_use]
    pub fn with_aggregate_context(mut self, context: impl Into<String>) -> Self {
        self.aggregate_context = Some(context.into());
        self
    }

    /// Returns the phase name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    /// Returns the error policy.
    #[must_use]
    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Runs the phase.
    ///
    /// # Errors
    ///
    /// - [`PhaseError::Fatal`] for the first stage failure that is not memoized
    /// - [`PhaseError::SkipCondition`] when a stage's skip predicate fails
    /// - [`PhaseError::PhaseSkipCondition`] when the phase skip expression fails
    /// - [`PhaseError::Aggregate`] when memoized failures were recorded
    pub async fn run(&self, ctx: &mut Context) -> Result<PhaseOutcome, PhaseError> {
        let span = info_span!(
            "phase",
            phase = %self.name,
            run_id = %ctx.run_id().run_id,
        );
        self.run_stages(ctx).instrument(span).await
    }

    async fn run_stages(&self, ctx: &mut Context) -> Result<PhaseOutcome, PhaseError> {
        let start = Instant::now();

        let skip_reason = match self.skip.reason(&self.name, ctx) {
            Ok(reason) => reason,
            Err(err) => return Err(self.failed(ctx, err)),
        };
        if let Some(reason) = skip_reason {
            info!(reason = %reason, "phase skipped");
            ctx.emit(
                "phase.skipped",
                serde_json::json!({"phase": self.name, "reason": reason}),
            );
            return Ok(PhaseOutcome::Skipped {
                phase: self.name.clone(),
                reason,
            });
        }

        info!(stages = self.stages.len(), "phase started");
        ctx.emit(
            "phase.started",
            serde_json::json!({"phase": self.name, "stages": self.stages.len()}),
        );

        let mut memo = ErrorMemo::new();
        let mut records = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let name = stage.name().to_string();

            match should_skip(stage.as_ref(), ctx) {
                Ok(true) => {
                    debug!(stage = %name, "stage skipped");
                    ctx.emit(
                        "stage.skipped",
                        serde_json::json!({"phase": self.name, "stage": name}),
                    );
                    records.push(StageRecord {
                        name,
                        status: StageStatus::Skipped,
                        duration_ms: 0.0,
                        error: None,
                    });
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    error!(stage = %name, error = %err, "skip condition failed");
                    ctx.emit(
                        "stage.failed",
                        serde_json::json!({"phase": self.name, "stage": name, "error": err.to_string()}),
                    );
                    return Err(self.failed(ctx, err));
                }
            }

            debug!(stage = %name, "stage started");
            ctx.emit(
                "stage.started",
                serde_json::json!({"phase": self.name, "stage": name}),
            );

            let stage_start = Instant::now();
            let result = stage.action(ctx).await;
            let duration_ms = stage_start.elapsed().as_secs_f64() * 1000.0;

            match result {
                Ok(()) => {
                    debug!(stage = %name, duration_ms, "stage completed");
                    ctx.emit(
                        "stage.completed",
                        serde_json::json!({"phase": self.name, "stage": name, "duration_ms": duration_ms}),
                    );
                    records.push(StageRecord {
                        name,
                        status: StageStatus::Completed,
                        duration_ms,
                        error: None,
                    });
                }
                Err(err) => {
                    let failure = StageFailure::new(name.clone(), err);
                    let rendered = failure.to_string();

                    if self.tolerates(stage.as_ref(), ctx) {
                        warn!(stage = %name, error = %rendered, duration_ms, "stage failed, continuing");
                        ctx.emit(
                            "stage.memoized",
                            serde_json::json!({"phase": self.name, "stage": name, "error": rendered}),
                        );
                        records.push(StageRecord {
                            name,
                            status: StageStatus::Memoized,
                            duration_ms,
                            error: Some(rendered),
                        });
                        memo.memorize(failure);
                        continue;
                    }

                    error!(stage = %name, error = %rendered, duration_ms, "stage failed");
                    ctx.emit(
                        "stage.failed",
                        serde_json::json!({"phase": self.name, "stage": name, "error": rendered}),
                    );
                    let err = PhaseError::Fatal {
                        failure,
                        context: self.failure_context.clone(),
                    };
                    return Err(self.failed(ctx, err));
                }
            }
        }

        let report = PhaseReport {
            phase: self.name.clone(),
            stages: records,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        };

        match memo.into_result() {
            Ok(()) => {
                info!(duration_ms = report.duration_ms, "phase completed");
                ctx.emit(
                    "phase.completed",
                    serde_json::json!({"phase": self.name, "duration_ms": report.duration_ms}),
                );
                Ok(PhaseOutcome::Completed(report))
            }
            Err(errors) => {
                let err = PhaseError::Aggregate {
                    errors,
                    context: self.aggregate_context.clone(),
                };
                Err(self.failed(ctx, err))
            }
        }
    }

    fn tolerates(&self, stage: &dyn Stage, ctx: &Context) -> bool {
        if ctx.fail_fast {
            return false;
        }
        self.policy == ErrorPolicy::Tolerant || stage.continue_on_error()
    }

    fn failed(&self, ctx: &Context, err: PhaseError) -> PhaseError {
        error!(error = %err, "phase failed");
        ctx.emit(
            "phase.failed",
            serde_json::json!({
                "phase": self.name,
                "stages": err.stages(),
                "error": err.to_string(),
            }),
        );
        err
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("policy", &self.policy)
            .field("skip", &self.skip)
            .finish_non_exhaustive()
    }
}
