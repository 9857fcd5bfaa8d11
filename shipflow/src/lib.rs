//! # Shipflow
//!
//! A staged release pipeline engine.
//!
//! Shipflow runs the ordered phases of a release (defaults, packaging,
//! publishing, announcing) and provides:
//!
//! - **Stage contract**: every integration is a [`Stage`](stages::Stage) with
//!   a name, an async action and optional skip / continue-on-error behaviour
//! - **Error policy**: fatal stages abort a phase, tolerant ones are
//!   collected into a single aggregate error
//! - **Repository identity**: resolves `owner/repo` from a git remote URL or
//!   from the local git configuration, following relative remotes
//! - **Observability**: structured `tracing` output and an event sink
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shipflow::prelude::*;
//!
//! let publish = Phase::publish(vec![
//!     Arc::new(BlobUpload::new()) as Arc<dyn Stage>,
//!     Arc::new(CreateRelease::new()),
//!     Arc::new(HomebrewFormula::new()),
//! ]);
//!
//! let mut ctx = Context::new(Config::load("shipflow.json")?);
//! let outcome = publish.run(&mut ctx).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod git;
pub mod health;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod template;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AnnounceConfig, Config, HostingUrls};
    pub use crate::context::{
        Artifact, ArtifactKind, ArtifactList, Context, RunIdentity, SkipKey, SkipSet,
    };
    pub use crate::errors::{
        AggregateError, ConfigError, GitError, PhaseError, ShipflowError, StageFailure,
        TemplateError, UnsupportedUrl,
    };
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent,
    };
    pub use crate::git::{
        resolve_from_local_config, GitCli, HostingKind, RepositoryRef, ScmKind, VcsClient,
    };
    pub use crate::health::{check_dependencies, HealthReport, MissingDependency};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{
        ErrorMemo, ErrorPolicy, Phase, PhaseOutcome, PhaseReport, PhaseSkip, Release,
        ReleaseReport, SkipRule, StagePhases, StageRecord,
    };
    pub use crate::stages::{FnStage, ResolveRepository, SetDefaults, Stage, StageStatus};
    pub use crate::template::{SimpleTemplates, TemplateEvaluator};
    pub use std::sync::Arc;
}
