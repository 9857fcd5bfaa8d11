//! User-requested skips.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Something a user can ask the release to skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipKey {
    /// The whole publish phase.
    Publish,
    /// The whole announce phase.
    Announce,
    /// Configuration validation.
    Validate,
    /// Signing of artifacts.
    Sign,
    /// SBOM generation.
    Sbom,
    /// Container images.
    Docker,
    /// Ko images.
    Ko,
    /// Homebrew formulas.
    Homebrew,
    /// Nix packages.
    Nix,
    /// Scoop manifests.
    Scoop,
    /// Winget manifests.
    Winget,
    /// AUR packages.
    Aur,
    /// Chocolatey packages.
    Chocolatey,
    /// Snapcraft packages.
    Snapcraft,
}

impl SkipKey {
    /// Every skip key, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::Publish,
        Self::Announce,
        Self::Validate,
        Self::Sign,
        Self::Sbom,
        Self::Docker,
        Self::Ko,
        Self::Homebrew,
        Self::Nix,
        Self::Scoop,
        Self::Winget,
        Self::Aur,
        Self::Chocolatey,
        Self::Snapcraft,
    ];

    /// Returns the key as written on the command line and in configuration.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Announce => "announce",
            Self::Validate => "validate",
            Self::Sign => "sign",
            Self::Sbom => "sbom",
            Self::Docker => "docker",
            Self::Ko => "ko",
            Self::Homebrew => "homebrew",
            Self::Nix => "nix",
            Self::Scoop => "scoop",
            Self::Winget => "winget",
            Self::Aur => "aur",
            Self::Chocolatey => "chocolatey",
            Self::Snapcraft => "snapcraft",
        }
    }
}

impl fmt::Display for SkipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkipKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownSkipKey(s.to_string()))
    }
}

/// The set of skips requested for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSet {
    keys: BTreeSet<SkipKey>,
}

impl SkipSet {
    /// Creates an empty skip set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma separated list such as `publish,docker`.
    pub fn parse(list: &str) -> Result<Self, ConfigError> {
        list.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(SkipKey::from_str)
            .collect()
    }

    /// Adds a key.
    pub fn insert(&mut self, key: SkipKey) {
        self.keys.insert(key);
    }

    /// Returns true if the key was requested.
    #[must_use]
    pub fn contains(&self, key: SkipKey) -> bool {
        self.keys.contains(&key)
    }

    /// Returns true if any of the keys was requested.
    #[must_use]
    pub fn any(&self, keys: &[SkipKey]) -> bool {
        keys.iter().any(|key| self.contains(*key))
    }

    /// Returns true if nothing is skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates the requested keys in order.
    pub fn iter(&self) -> impl Iterator<Item = SkipKey> + '_ {
        self.keys.iter().copied()
    }
}

impl FromIterator<SkipKey> for SkipSet {
    fn from_iter<T: IntoIterator<Item = SkipKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl Extend<SkipKey> for SkipSet {
    fn extend<T: IntoIterator<Item = SkipKey>>(&mut self, iter: T) {
        self.keys.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let skips = SkipSet::parse("publish, Docker,,sign").unwrap();
        assert!(skips.contains(SkipKey::Publish));
        assert!(skips.contains(SkipKey::Docker));
        assert!(skips.contains(SkipKey::Sign));
        assert!(!skips.contains(SkipKey::Announce));
    }

    #[test]
    fn test_parse_unknown_key() {
        let err = SkipSet::parse("publish,teleport").unwrap_err();
        assert_eq!(err.to_string(), "unknown skip key: teleport");
    }

    #[test]
    fn test_any() {
        let skips: SkipSet = [SkipKey::Sbom].into_iter().collect();
        assert!(skips.any(&[SkipKey::Sign, SkipKey::Sbom]));
        assert!(!skips.any(&[SkipKey::Sign]));
        assert!(SkipSet::new().is_empty());
    }

    #[test]
    fn test_display_matches_serde() {
        for key in SkipKey::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{key}\""));
        }
    }
}
