//! Repository references parsed from git remote URLs.

use crate::errors::{GitError, UnsupportedUrl};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

/// Whether a reference follows a recognised `owner/.../repo` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScmKind {
    /// Two or more path segments.
    Known,
    /// A single segment (gists) or nothing at all.
    #[default]
    Unknown,
}

/// The hosting platform a repository lives on, guessed from its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostingKind {
    /// github.com or a GitHub Enterprise host named `github.*`.
    GitHub,
    /// Any host with `gitlab` in its name.
    GitLab,
    /// Any host with `gitea` in its name.
    Gitea,
    /// Anything else.
    #[default]
    Unknown,
}

impl HostingKind {
    /// Guesses the hosting platform from a host name.
    #[must_use]
    pub fn from_host(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        if host == "github.com" || host.starts_with("github.") {
            Self::GitHub
        } else if host.contains("gitlab") {
            Self::GitLab
        } else if host.contains("gitea") {
            Self::Gitea
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for HostingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitHub => write!(f, "github"),
            Self::GitLab => write!(f, "gitlab"),
            Self::Gitea => write!(f, "gitea"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A remote location reduced to host-independent path segments.
///
/// Two references are equal when their canonical identifiers are equal,
/// regardless of the URL family or credentials they were parsed from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// The URL exactly as it was given.
    pub raw_url: String,
    /// The host, without userinfo or port.
    pub host: String,
    /// Path segments; the last one is the repository name.
    pub segments: Vec<String>,
    /// Whether the segments follow an `owner/repo` convention.
    pub scm_kind: ScmKind,
}

impl RepositoryRef {
    /// Parses an SCP-like (`user@host:path`) or URL-like (`scheme://host/path`)
    /// remote URL.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedUrl`] when the input matches neither family or has
    /// no path segments. The error carries a reference whose `raw_url` is the
    /// input and whose identifier is empty.
    pub fn from_url(raw_url: &str) -> Result<Self, UnsupportedUrl> {
        let trimmed = raw_url.trim();
        let parsed = if trimmed.contains("://") {
            parse_url_like(trimmed)
        } else {
            parse_scp_like(trimmed)
        };

        match parsed {
            Some((host, segments)) if !segments.is_empty() => {
                Ok(Self::new(raw_url, host, segments))
            }
            _ => Err(UnsupportedUrl {
                reference: Self::unresolved(raw_url),
            }),
        }
    }

    /// Creates a reference from already split parts.
    #[must_use]
    pub fn new(raw_url: impl Into<String>, host: impl Into<String>, segments: Vec<String>) -> Self {
        let scm_kind = if segments.len() >= 2 {
            ScmKind::Known
        } else {
            ScmKind::Unknown
        };
        Self {
            raw_url: raw_url.into(),
            host: host.into(),
            segments,
            scm_kind,
        }
    }

    /// Creates a reference that only remembers its raw URL.
    #[must_use]
    pub fn unresolved(raw_url: impl Into<String>) -> Self {
        Self {
            raw_url: raw_url.into(),
            ..Self::default()
        }
    }

    /// Returns the owner/group path, empty for single-segment references.
    #[must_use]
    pub fn owner(&self) -> String {
        match self.segments.split_last() {
            Some((_, owner)) => owner.join("/"),
            None => String::new(),
        }
    }

    /// Returns the repository short name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Returns the hosting platform guessed from the host.
    #[must_use]
    pub fn hosting(&self) -> HostingKind {
        HostingKind::from_host(&self.host)
    }

    /// Checks that the reference can target a hosting API.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::UnknownHosting`] unless the reference has a real
    /// owner/repo pair.
    pub fn check_known_hosting(&self) -> Result<(), GitError> {
        match self.scm_kind {
            ScmKind::Known => Ok(()),
            ScmKind::Unknown => Err(GitError::UnknownHosting {
                raw_url: self.raw_url.clone(),
            }),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl PartialEq for RepositoryRef {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for RepositoryRef {}

impl Hash for RepositoryRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

/// Splits `user@host:path` at the first colon after the `@`.
fn parse_scp_like(input: &str) -> Option<(String, Vec<String>)> {
    let (user, rest) = input.split_once('@')?;
    let (host, path) = rest.split_once(':')?;
    if user.is_empty() || host.is_empty() || host.contains('/') {
        return None;
    }
    Some((host.to_string(), tidy_segments(path.split('/').map(String::from))))
}

/// Takes the host from the parsed URL but the path from the input itself.
///
/// `Url::path` is percent-encoded and has `.` and `..` segments resolved,
/// so the same repository would get a different identifier than its
/// SCP-like form. Segments are percent-decoded and kept as written.
fn parse_url_like(input: &str) -> Option<(String, Vec<String>)> {
    let url = Url::parse(input).ok()?;
    let host = url.host_str()?.to_string();

    let (_, after_scheme) = input.split_once("://")?;
    let path = match after_scheme.find(&['/', '?', '#'][..]) {
        Some(start) if after_scheme[start..].starts_with('/') => {
            let path = &after_scheme[start..];
            path.find(&['?', '#'][..]).map_or(path, |end| &path[..end])
        }
        _ => "",
    };
    let decoded = path
        .split('/')
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned());
    Some((host, tidy_segments(decoded)))
}

/// Drops empty segments and strips `.git` from the last one only.
fn tidy_segments(parts: impl Iterator<Item = String>) -> Vec<String> {
    let mut segments: Vec<String> = parts.filter(|s| !s.is_empty()).collect();

    if let Some(last) = segments.last_mut() {
        if let Some(stripped) = last.strip_suffix(".git") {
            *last = stripped.to_string();
        }
        if last.is_empty() {
            segments.pop();
        }
    }
    segments
}
