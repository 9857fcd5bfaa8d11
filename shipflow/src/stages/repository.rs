//! The built-in stage that resolves the repository identity.

use super::Stage;
use crate::context::Context;
use crate::git::{resolve_from_local_config, VcsClient};
use anyhow::Context as _;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Resolves the repository from the local git configuration and stores it
/// in the context.
///
/// Skipped when a repository is already set.
pub struct ResolveRepository {
    client: Arc<dyn VcsClient>,
    require_known_hosting: bool,
}

impl ResolveRepository {
    /// Creates the stage over a version-control client.
    #[must_use]
    pub fn new(client: Arc<dyn VcsClient>) -> Self {
        Self {
            client,
            require_known_hosting: false,
        }
    }

    /// Rejects references that do not follow the `owner/name` convention.
    #[must_use]
    pub fn require_known_hosting(mut self, value: bool) -> Self {
        self.require_known_hosting = value;
        self
    }
}

impl fmt::Debug for ResolveRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveRepository")
            .field("require_known_hosting", &self.require_known_hosting)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for ResolveRepository {
    fn name(&self) -> &str {
        "resolving repository"
    }

    fn skip(&self, ctx: &Context) -> anyhow::Result<bool> {
        Ok(ctx.repo().is_some())
    }

    async fn action(&self, ctx: &mut Context) -> anyhow::Result<()> {
        let repo = resolve_from_local_config(self.client.as_ref())
            .await
            .context("failed to resolve repository from git")?;
        if self.require_known_hosting {
            repo.check_known_hosting()?;
        }
        ctx.set_repo(repo);
        Ok(())
    }

    fn dependencies(&self, ctx: &Context) -> Vec<String> {
        if ctx.repo().is_some() {
            Vec::new()
        } else {
            vec!["git".to_string()]
        }
    }
}
