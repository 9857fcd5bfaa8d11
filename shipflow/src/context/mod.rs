//! Shared process context threaded through every stage.
//!
//! This module provides:
//! - The mutable [`Context`] owned by one pipeline invocation
//! - The user skip set
//! - The artifact accumulator
//! - The run identity used for correlation

mod artifacts;
mod identity;
mod skips;
mod state;

pub use artifacts::{Artifact, ArtifactKind, ArtifactList};
pub use identity::RunIdentity;
pub use skips::{SkipKey, SkipSet};
pub use state::Context;
