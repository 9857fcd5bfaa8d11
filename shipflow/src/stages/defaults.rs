//! The built-in stage that fills in configuration defaults.

use super::Stage;
use crate::config::{DEFAULT_GITHUB_DOWNLOAD_URL, DEFAULT_GITLAB_DOWNLOAD_URL};
use crate::context::Context;
use anyhow::Context as _;
use async_trait::async_trait;

/// Default output directory.
pub const DEFAULT_DIST: &str = "dist";

const GITEA_API_SUFFIX: &str = "/api/v1";

/// Sets the engine-level configuration defaults.
///
/// Runs first in the defaults phase so that integration defaulters see a
/// complete configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetDefaults;

impl SetDefaults {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for SetDefaults {
    fn name(&self) -> &str {
        "setting defaults"
    }

    async fn action(&self, ctx: &mut Context) -> anyhow::Result<()> {
        if ctx.config.dist.is_empty() {
            ctx.config.dist = DEFAULT_DIST.to_string();
        }
        if ctx.config.github_urls.download.is_empty() {
            ctx.config.github_urls.download = DEFAULT_GITHUB_DOWNLOAD_URL.to_string();
        }
        if ctx.config.gitlab_urls.download.is_empty() {
            ctx.config.gitlab_urls.download = DEFAULT_GITLAB_DOWNLOAD_URL.to_string();
        }
        if ctx.config.gitea_urls.download.is_empty() {
            let api = ctx
                .templates()
                .apply(&ctx.config.gitea_urls.api, ctx)
                .context("templating Gitea API URL")?;
            let base = api.replace(GITEA_API_SUFFIX, "");
            ctx.config.gitea_urls.download = base.strip_suffix('/').unwrap_or(&base).to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use pretty_assertions::assert_eq;

    async fn run(config: Config) -> anyhow::Result<Config> {
        let mut ctx = Context::new(config).with_env("GITEA_HOST", "gitea.example.org");
        SetDefaults.action(&mut ctx).await?;
        Ok(ctx.config)
    }

    #[tokio::test]
    async fn test_fills_empty_fields() {
        let config = run(Config::default()).await.unwrap();

        assert_eq!(config.dist, "dist");
        assert_eq!(config.github_urls.download, "https://github.com");
        assert_eq!(config.gitlab_urls.download, "https://gitlab.com");
        assert_eq!(config.gitea_urls.download, "");
    }

    #[tokio::test]
    async fn test_keeps_explicit_values() {
        let mut config = Config::default();
        config.dist = "out".to_string();
        config.github_urls.download = "https://github.example.com".to_string();
        config.gitea_urls.download = "https://dl.example.org".to_string();

        let config = run(config).await.unwrap();
        assert_eq!(config.dist, "out");
        assert_eq!(config.github_urls.download, "https://github.example.com");
        assert_eq!(config.gitea_urls.download, "https://dl.example.org");
    }

    #[tokio::test]
    async fn test_gitea_download_from_templated_api() {
        let mut config = Config::default();
        config.gitea_urls.api = "https://{{ .Env.GITEA_HOST }}/api/v1/".to_string();

        let config = run(config).await.unwrap();
        assert_eq!(config.gitea_urls.download, "https://gitea.example.org");
    }

    #[tokio::test]
    async fn test_gitea_download_strips_one_trailing_slash() {
        let mut config = Config::default();
        config.gitea_urls.api = "https://gitea.example.org/api/v1//".to_string();
        assert_eq!(run(config).await.unwrap().gitea_urls.download, "https://gitea.example.org/");

        let mut config = Config::default();
        config.gitea_urls.api = "https://gitea.example.org/git//api/v1".to_string();
        assert_eq!(run(config).await.unwrap().gitea_urls.download, "https://gitea.example.org/git/");
    }

    #[tokio::test]
    async fn test_gitea_template_error() {
        let mut config = Config::default();
        config.gitea_urls.api = "https://{{ .Env.SHIPFLOW_NOT_SET_ANYWHERE }}/api/v1".to_string();

        let err = run(config).await.unwrap_err();
        assert!(format!("{err:#}").starts_with("templating Gitea API URL: template: failed to evaluate"));
    }
}
