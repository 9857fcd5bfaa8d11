//! Repository identity resolution.
//!
//! This module provides:
//! - Parsing of SCP-like and URL-like remote URLs into a [`RepositoryRef`]
//! - The [`VcsClient`] seam over the local git configuration
//! - Resolution of the current branch's remote, including relative remotes

mod client;
mod repo;
mod resolver;

pub use client::{GitCli, VcsClient};
pub use repo::{HostingKind, RepositoryRef, ScmKind};
pub use resolver::{resolve_from_local_config, MAX_RELATIVE_REMOTE_DEPTH, RELATIVE_REMOTE};

#[cfg(test)]
pub(crate) use client::MockVcsClient;
