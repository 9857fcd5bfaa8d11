//! Artifacts produced by earlier stages for later ones.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// The kind of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A built binary.
    Binary,
    /// An archive (tar.gz, zip).
    Archive,
    /// A source archive.
    SourceArchive,
    /// A Linux package (deb, rpm, apk).
    LinuxPackage,
    /// A checksums file.
    Checksum,
    /// A detached signature.
    Signature,
    /// A software bill of materials.
    Sbom,
    /// A published container image.
    DockerImage,
    /// A package manager formula or manifest.
    Formula,
    /// Anything else uploaded as-is.
    Uploadable,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Binary => "binary",
            Self::Archive => "archive",
            Self::SourceArchive => "source_archive",
            Self::LinuxPackage => "linux_package",
            Self::Checksum => "checksum",
            Self::Signature => "signature",
            Self::Sbom => "sbom",
            Self::DockerImage => "docker_image",
            Self::Formula => "formula",
            Self::Uploadable => "uploadable",
        };
        f.write_str(name)
    }
}

/// An artifact recorded by a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// File or image name.
    pub name: String,
    /// Location on disk, or the image reference for images.
    pub path: PathBuf,
    /// What the artifact is.
    pub kind: ArtifactKind,
    /// Integration specific attributes.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Artifact {
    /// Creates a new artifact.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, kind: ArtifactKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
            extra: HashMap::new(),
        }
    }

    /// Adds an extra attribute.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Ordered accumulator of artifacts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactList {
    items: Vec<Artifact>,
}

impl ArtifactList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an artifact.
    pub fn add(&mut self, artifact: Artifact) {
        self.items.push(artifact);
    }

    /// Returns the artifacts of one kind, in insertion order.
    pub fn filter(&self, kind: ArtifactKind) -> impl Iterator<Item = &Artifact> + '_ {
        self.items.iter().filter(move |a| a.kind == kind)
    }

    /// Returns every artifact.
    #[must_use]
    pub fn list(&self) -> &[Artifact] {
        &self.items
    }

    /// Returns the number of artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
