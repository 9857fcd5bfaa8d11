//! Error types for the shipflow release engine.
//!
//! Environment and input errors from the repository resolver, stage
//! failures tagged with their stage name, and the aggregate produced by
//! tolerant phases all live here.

use crate::git::RepositoryRef;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for shipflow operations.
///
/// Resolver, template and configuration errors surface through the stage
/// or loader that hit them, so only whole-release failures live here.
#[derive(Debug, Error)]
pub enum ShipflowError {
    /// A phase of the release failed.
    #[error("{phase}: {source}")]
    Phase {
        /// The phase that failed.
        phase: String,
        /// The phase error.
        #[source]
        source: PhaseError,
    },

    /// The tracing subscriber could not be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Errors raised while resolving the repository identity.
#[derive(Debug, Error)]
pub enum GitError {
    /// The working directory is not inside a git work tree.
    #[error("current folder is not a git repository")]
    NotARepository,

    /// No usable remote is configured.
    #[error("no remote configured to list refs from")]
    NoRemote,

    /// The remote URL has an unrecognised shape.
    #[error(transparent)]
    UnsupportedUrl(#[from] UnsupportedUrl),

    /// The reference does not follow an `owner/repo` convention.
    #[error("invalid scm url: {raw_url}")]
    UnknownHosting {
        /// The raw URL of the rejected reference.
        raw_url: String,
    },

    /// A chain of relative remotes did not reach a network remote in time.
    #[error("relative remote chain starting at branch '{branch}' is deeper than {max} hops")]
    RelativeRemoteTooDeep {
        /// The branch the chain started from.
        branch: String,
        /// The hop limit.
        max: usize,
    },

    /// A git command exited unsuccessfully.
    #[error("git {args}: {stderr}")]
    Command {
        /// The arguments passed to git.
        args: String,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The git binary could not be spawned.
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    /// The process working directory could not be read.
    #[error("cannot determine the working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),
}

/// Error raised for a remote URL that matches neither the SCP-like nor the
/// URL-like family.
///
/// The unresolved reference is kept so callers still see the raw input.
#[derive(Debug, Clone, Error)]
#[error("unsupported repository URL: {}", .reference.raw_url)]
pub struct UnsupportedUrl {
    /// A reference with the raw URL set and no path segments.
    pub reference: RepositoryRef,
}

/// A stage action error tagged with the stage that produced it.
#[derive(Debug)]
pub struct StageFailure {
    /// Stage that failed.
    pub stage: String,
    /// Original error.
    pub error: anyhow::Error,
}

impl StageFailure {
    /// Creates a new stage failure.
    #[must_use]
    pub fn new(stage: impl Into<String>, error: anyhow::Error) -> Self {
        Self {
            stage: stage.into(),
            error,
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.stage, self.error)
    }
}

impl std::error::Error for StageFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// Accumulated non-fatal stage failures of one phase.
#[derive(Debug, Default)]
pub struct AggregateError {
    failures: Vec<StageFailure>,
}

impl AggregateError {
    /// Creates an aggregate from a list of failures.
    #[must_use]
    pub fn new(failures: Vec<StageFailure>) -> Self {
        Self { failures }
    }

    /// Returns the recorded failures in the order they happened.
    #[must_use]
    pub fn failures(&self) -> &[StageFailure] {
        &self.failures
    }

    /// Returns the number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the names of the stages that failed.
    #[must_use]
    pub fn stages(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.stage.as_str()).collect()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.len() {
            1 => write!(f, "1 error occurred:")?,
            n => write!(f, "{n} errors occurred:")?,
        }
        for failure in &self.failures {
            write!(f, "\n\t* {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Errors returned by a single phase run.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// A stage failed and aborted the phase.
    #[error("{}", render_fatal(.failure, .context))]
    Fatal {
        /// The failure that aborted the phase.
        failure: StageFailure,
        /// Phase-specific description inserted after the stage name.
        context: Option<String>,
    },

    /// A stage's skip predicate could not be evaluated.
    #[error("{stage}: failed to evaluate skip condition: {error:#}")]
    SkipCondition {
        /// The stage whose predicate failed.
        stage: String,
        /// The predicate error.
        error: anyhow::Error,
    },

    /// The phase-wide skip expression could not be evaluated.
    #[error("{phase}: failed to evaluate skip condition: {source}")]
    PhaseSkipCondition {
        /// The phase name.
        phase: String,
        /// The template error.
        #[source]
        source: TemplateError,
    },

    /// One or more tolerant stages failed.
    #[error("{}", render_aggregate(.errors, .context))]
    Aggregate {
        /// The recorded failures.
        errors: AggregateError,
        /// Phase-specific description prefixed to the aggregate.
        context: Option<String>,
    },
}

impl PhaseError {
    /// Returns the names of the stages that caused this error.
    #[must_use]
    pub fn stages(&self) -> Vec<&str> {
        match self {
            Self::Fatal { failure, .. } => vec![failure.stage.as_str()],
            Self::SkipCondition { stage, .. } => vec![stage.as_str()],
            Self::PhaseSkipCondition { .. } => Vec::new(),
            Self::Aggregate { errors, .. } => errors.stages(),
        }
    }

    /// Returns true if the phase was aborted by a single stage.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Aggregate { .. })
    }
}

fn render_fatal(failure: &StageFailure, context: &Option<String>) -> String {
    match context {
        Some(context) => format!("{}: {context}: {:#}", failure.stage, failure.error),
        None => failure.to_string(),
    }
}

fn render_aggregate(errors: &AggregateError, context: &Option<String>) -> String {
    match context {
        Some(context) => format!("{context}: {errors}"),
        None => errors.to_string(),
    }
}

/// Error raised when a template expression cannot be evaluated.
#[derive(Debug, Clone, Error)]
#[error("template: failed to evaluate '{expr}': {reason}")]
pub struct TemplateError {
    /// The offending expression.
    pub expr: String,
    /// Why evaluation failed.
    pub reason: String,
}

impl TemplateError {
    /// Creates a new template error.
    #[must_use]
    pub fn new(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {}: {source}", path.display())]
    Read {
        /// The file path.
        path: PathBuf,
        /// The IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON for the expected shape.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A skip key is not recognised.
    #[error("unknown skip key: {0}")]
    UnknownSkipKey(String),
}
