//! Phase execution.
//!
//! This module provides:
//! - The [`Phase`] runner: ordered stages, skip evaluation and error policy
//! - [`ErrorMemo`], the accumulator of non-fatal stage failures
//! - [`SkipRule`] and [`PhaseSkip`], the stage and phase skip evaluators
//! - The [`Release`] orchestrating the standard phases

mod memo;
mod phase;
mod release;
mod skip;


pub use memo::ErrorMemo;
pub use phase::{ErrorPolicy, Phase, PhaseOutcome, PhaseReport, StageRecord};
pub use release::{Release, ReleaseReport, StagePhases};
pub use skip::{PhaseSkip, SkipRule};
