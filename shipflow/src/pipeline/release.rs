//! The standard release: a fixed sequence of phases.

use super::phase::{Phase, PhaseOutcome};
use crate::context::Context;
use crate::errors::ShipflowError;
use crate::git::VcsClient;
use crate::health::{check_dependencies, HealthReport};
use crate::stages::{ResolveRepository, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// The integration stages of each standard phase, in declared order.
///
/// Publishers must list artifact uploaders before the release stage and
/// formula stages after it; the order is kept as given.
#[derive(Debug, Default)]
pub struct StagePhases {
    /// Integration defaulters.
    pub defaulters: Vec<Arc<dyn Stage>>,
    /// Build defaulters.
    pub build_defaulters: Vec<Arc<dyn Stage>>,
    /// Archive and package stages.
    pub packagers: Vec<Arc<dyn Stage>>,
    /// Publishers.
    pub publishers: Vec<Arc<dyn Stage>>,
    /// Announcers.
    pub announcers: Vec<Arc<dyn Stage>>,
}

/// Result of a release run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseReport {
    /// The run ID.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
    /// One outcome per phase, in execution order.
    pub phases: Vec<PhaseOutcome>,
}

impl ReleaseReport {
    /// Returns the outcome of a phase.
    #[must_use]
    pub fn phase(&self, name: &str) -> Option<&PhaseOutcome> {
        self.phases.iter().find(|outcome| outcome.phase() == name)
    }

    /// Returns the names of phases skipped as a whole.
    #[must_use]
    pub fn skipped_phases(&self) -> Vec<&str> {
        self.phases
            .iter()
            .filter(|outcome| outcome.is_skipped())
            .map(PhaseOutcome::phase)
            .collect()
    }
}

/// An ordered list of phases run against one context.
#[derive(Debug)]
pub struct Release {
    phases: Vec<Phase>,
}

impl Release {
    /// Creates a release from explicit phases.
    #[must_use]
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    /// Builds the standard phase sequence: defaults, build defaults,
    /// packaging, publishing and announcing.
    ///
    /// The defaults phase starts with the built-in defaults and repository
    /// resolution, followed by the integration defaulters.
    #[must_use]
    pub fn standard(stages: StagePhases, vcs: Arc<dyn VcsClient>) -> Self {
        let StagePhases {
            defaulters,
            build_defaulters,
            packagers,
            publishers,
            announcers,
        } = stages;

        let mut defaults: Vec<Arc<dyn Stage>> = Vec::with_capacity(defaulters.len() + 1);
        defaults.push(Arc::new(ResolveRepository::new(vcs)));
        defaults.extend(defaulters);

        Self::new(vec![
            Phase::defaults(defaults),
            Phase::new("build defaults", build_defaulters),
            Phase::new("packaging", packagers),
            Phase::publish(publishers),
            Phase::announce(announcers),
        ])
    }

    /// Returns the phases in execution order.
    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Runs every phase in order, stopping at the first phase error.
    ///
    /// # Errors
    ///
    /// Returns [`ShipflowError::Phase`] naming the phase that failed.
    pub async fn run(&self, ctx: &mut Context) -> Result<ReleaseReport, ShipflowError> {
        let identity = ctx.run_id().clone();
        let span = info_span!("release", run_id = %identity.run_id);

        async {
            let mut phases = Vec::with_capacity(self.phases.len());
            for phase in &self.phases {
                let outcome = phase
                    .run(ctx)
                    .await
                    .map_err(|source| ShipflowError::Phase {
                        phase: phase.name().to_string(),
                        source,
                    })?;
                phases.push(outcome);
            }

            let report = ReleaseReport {
                run_id: identity.run_id,
                started_at: identity.started_at,
                duration_ms: identity.elapsed_ms(),
                phases,
            };
            info!(duration_ms = report.duration_ms, "release completed");
            Ok::<_, ShipflowError>(report)
        }
        .instrument(span)
        .await
    }

    /// Reports the external binaries the stages need but `PATH` lacks.
    #[must_use]
    pub fn healthcheck(&self, ctx: &Context) -> HealthReport {
        check_dependencies(self.phases.iter().flat_map(Phase::stages), ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{MockVcsClient, RepositoryRef};
    use crate::stages::FnStage;
    use pretty_assertions::assert_eq;

    fn resolved_context() -> Context {
        Context::default().with_repo(RepositoryRef::from_url("git@github.com:shipflow/shipflow.git").unwrap())
    }

    #[test]
    fn test_standard_phase_order() {
        let release = Release::standard(StagePhases::default(), Arc::new(MockVcsClient::new()));
        let names: Vec<_> = release.phases().iter().map(Phase::name).collect();
        assert_eq!(
            names,
            vec!["defaults", "build defaults", "packaging", "publishing", "announcing"]
        );

        let defaults: Vec<_> = release.phases()[0].stages().iter().map(|s| s.name()).collect();
        assert_eq!(defaults, vec!["setting defaults", "resolving repository"]);
    }

    #[tokio::test]
    async fn test_run_reports_every_phase() {
        let release = Release::standard(StagePhases::default(), Arc::new(MockVcsClient::new()));
        let mut ctx = resolved_context();

        let report = release.run(&mut ctx).await.unwrap();
        assert_eq!(report.phases.len(), 5);
        assert_eq!(report.run_id, ctx.run_id().run_id);
        assert!(report.skipped_phases().is_empty());
        assert!(report.phase("publishing").is_some());
    }

    #[tokio::test]
    async fn test_run_stops_at_failed_phase() {
        let stages = StagePhases {
            packagers: vec![Arc::new(FnStage::new("archive", |_: &mut Context| {
                anyhow::bail!("no binaries")
            })) as Arc<dyn Stage>],
            publishers: vec![Arc::new(FnStage::new("release", |_: &mut Context| {
                panic!("publishing must not run")
            })) as Arc<dyn Stage>],
            ..StagePhases::default()
        };
        let release = Release::standard(stages, Arc::new(MockVcsClient::new()));

        let err = release.run(&mut resolved_context()).await.unwrap_err();
        assert_eq!(err.to_string(), "packaging: archive: no binaries");
    }
}
