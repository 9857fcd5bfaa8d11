//! Checks that the external binaries stages depend on are installed.

use crate::context::Context;
use crate::stages::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A binary a stage needs that is not on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingDependency {
    /// The stage that declared the dependency.
    pub stage: String,
    /// The binary name.
    pub binary: String,
}

impl fmt::Display for MissingDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} not present in PATH", self.stage, self.binary)
    }
}

/// Result of a dependency check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Number of distinct binaries looked up.
    pub checked: usize,
    /// Binaries that were not found.
    pub missing: Vec<MissingDependency>,
    /// Stages whose skip predicate failed. Their dependencies are checked
    /// as if they would run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub undecided: Vec<String>,
}

impl HealthReport {
    /// Returns true if every dependency was found.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Looks up the dependencies of every stage that would run.
///
/// Stages whose skip predicate is true are ignored, as are repeated
/// binaries. A stage whose skip predicate fails is logged, listed in
/// [`HealthReport::undecided`] and checked anyway.
pub fn check_dependencies<'a, I>(stages: I, ctx: &Context) -> HealthReport
where
    I: IntoIterator<Item = &'a Arc<dyn Stage>>,
{
    let mut report = HealthReport::default();
    let mut seen = std::collections::BTreeSet::new();

    for stage in stages {
        match stage.skip(ctx) {
            Ok(true) => continue,
            Ok(false) => {}
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(stage = stage.name(), error = %reason, "skip condition failed, checking dependencies anyway");
                report.undecided.push(stage.name().to_string());
            }
        }
        for binary in stage.dependencies(ctx) {
            if !seen.insert(binary.clone()) {
                continue;
            }
            report.checked += 1;
            match find_executable(&binary) {
                Some(path) => debug!(stage = stage.name(), binary = %binary, path = %path.display(), "dependency found"),
                None => {
                    warn!(stage = stage.name(), binary = %binary, "dependency missing");
                    report.missing.push(MissingDependency {
                        stage: stage.name().to_string(),
                        binary,
                    });
                }
            }
        }
    }

    report
}

/// Finds an executable on `PATH`, or at the given path when it has a
/// directory component.
#[must_use]
pub fn find_executable(binary: &str) -> Option<PathBuf> {
    let candidate = Path::new(binary);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|full| is_executable(full))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
