//! Release configuration.
//!
//! Only the parts of the configuration the engine itself reads are modelled
//! here; integrations deserialise their own sections.

use crate::context::SkipKey;
use crate::errors::ConfigError;
use crate::git::HostingKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default download base for GitHub releases.
pub const DEFAULT_GITHUB_DOWNLOAD_URL: &str = "https://github.com";

/// Default download base for GitLab releases.
pub const DEFAULT_GITLAB_DOWNLOAD_URL: &str = "https://gitlab.com";

/// The parsed release configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project name, available to templates as `.ProjectName`.
    pub project_name: String,
    /// Output directory for built artifacts.
    pub dist: String,
    /// Phases and integrations skipped by configuration.
    pub skip: Vec<SkipKey>,
    /// Announce phase settings.
    pub announce: AnnounceConfig,
    /// GitHub endpoints.
    pub github_urls: HostingUrls,
    /// GitLab endpoints.
    pub gitlab_urls: HostingUrls,
    /// Gitea endpoints.
    pub gitea_urls: HostingUrls,
}

impl Config {
    /// Parses a JSON configuration document.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&source)
    }

    /// Returns the endpoints for a hosting platform, if it has any.
    #[must_use]
    pub fn urls_for(&self, hosting: HostingKind) -> Option<&HostingUrls> {
        match hosting {
            HostingKind::GitHub => Some(&self.github_urls),
            HostingKind::GitLab => Some(&self.gitlab_urls),
            HostingKind::Gitea => Some(&self.gitea_urls),
            HostingKind::Unknown => None,
        }
    }
}

/// Announce phase settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceConfig {
    /// Templated boolean; the phase is skipped when it renders `true`.
    pub skip: String,
}

/// API and download endpoints of a hosting platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostingUrls {
    /// API base URL (templated).
    pub api: String,
    /// Base URL release downloads are served from.
    pub download: String,
    /// Upload base URL.
    pub upload: String,
    /// Whether TLS verification is disabled for this host.
    pub skip_tls_verify: bool,
}
