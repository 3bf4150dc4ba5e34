//! Build and staging request definitions.

use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default project directory handed to the build tool.
pub const DEFAULT_SOURCE_DIR: &str = ".";

/// Default root the build tool installs into.
pub const DEFAULT_INSTALL_ROOT: &str = ".build";

/// Default user-facing directory the artifact is moved into.
pub const DEFAULT_DESTINATION_DIR: &str = "programs";

/// Binary name the build tool produces.
pub const BUILT_BINARY_NAME: &str = "redstone_compiler";

/// Name the staged binary is given.
pub const STAGED_BINARY_NAME: &str = "redc";

/// Where to build from and where the build tool puts its output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildRequest {
    /// Project directory passed to the build tool.
    pub source_dir: PathBuf,

    /// Output root the build tool installs into.
    pub install_root: PathBuf,
}

impl BuildRequest {
    /// Create a new build request.
    pub fn new(source_dir: impl Into<PathBuf>, install_root: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            install_root: install_root.into(),
        }
    }
}

impl Default for BuildRequest {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_DIR, DEFAULT_INSTALL_ROOT)
    }
}

/// Full parameter set for one staging run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageRequest {
    /// Build inputs.
    pub build: BuildRequest,

    /// Artifact location relative to the install root.
    pub artifact_relative_path: PathBuf,

    /// Directory the artifact ends up in.
    pub destination_dir: PathBuf,

    /// File name the artifact is given in `destination_dir`.
    pub destination_name: String,
}

impl StageRequest {
    /// Create a new staging request.
    pub fn new(
        build: BuildRequest,
        artifact_relative_path: impl Into<PathBuf>,
        destination_dir: impl Into<PathBuf>,
        destination_name: impl Into<String>,
    ) -> Self {
        Self {
            build,
            artifact_relative_path: artifact_relative_path.into(),
            destination_dir: destination_dir.into(),
            destination_name: destination_name.into(),
        }
    }

    /// Where the build tool is expected to leave the artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.build.install_root.join(&self.artifact_relative_path)
    }

    /// Where the artifact is moved to.
    pub fn destination_path(&self) -> PathBuf {
        self.destination_dir.join(&self.destination_name)
    }

    /// Rebase every relative path onto `base`. Absolute paths are kept.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        self.build.source_dir = rebase(base, &self.build.source_dir);
        self.build.install_root = rebase(base, &self.build.install_root);
        self.destination_dir = rebase(base, &self.destination_dir);
        self
    }
}

impl Default for StageRequest {
    fn default() -> Self {
        Self::new(
            BuildRequest::default(),
            default_artifact_relative_path(),
            DEFAULT_DESTINATION_DIR,
            default_destination_name(),
        )
    }
}

/// `bin/redstone_compiler` with the host executable suffix.
pub fn default_artifact_relative_path() -> PathBuf {
    Path::new("bin").join(format!("{BUILT_BINARY_NAME}{EXE_SUFFIX}"))
}

/// `redc` with the host executable suffix.
pub fn default_destination_name() -> String {
    format!("{STAGED_BINARY_NAME}{EXE_SUFFIX}")
}

fn rebase(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
