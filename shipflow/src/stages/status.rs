//! How a stage ended within a phase that finished.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one stage in a [`PhaseReport`](crate::pipeline::PhaseReport).
///
/// A fatal failure aborts the phase and is reported as the phase error, so
/// it never appears here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The action returned `Ok`.
    Completed,
    /// The skip predicate bypassed the action.
    Skipped,
    /// The action failed and the error went into the phase aggregate.
    Memoized,
}

impl StageStatus {
    /// Returns true unless the stage failed.
    #[must_use]
    pub fn is_clean(self) -> bool {
        !matches!(self, Self::Memoized)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Memoized => "memoized",
        })
    }
}
