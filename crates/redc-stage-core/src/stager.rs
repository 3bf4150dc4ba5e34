//! Build, check, and stage.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::build::{BuildCommand, BuildTool};
use crate::error::{Result, StageError};
use crate::relocate;
use crate::request::{BuildRequest, StageRequest};

/// Result of one staging run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageResult {
    /// Whether the build succeeded and the artifact was staged.
    pub succeeded: bool,

    /// Exit code reported by the build command.
    pub exit_code: i32,

    /// Where the artifact was moved to (present on success).
    pub moved_artifact_path: Option<PathBuf>,

    /// SHA-256 of the staged artifact (present on success).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub artifact_sha256: Option<String>,
}

impl StageResult {
    /// A run whose artifact ended up at `path`.
    pub fn staged(path: PathBuf, artifact_sha256: Option<String>) -> Self {
        Self {
            succeeded: true,
            exit_code: 0,
            moved_artifact_path: Some(path),
            artifact_sha256,
        }
    }

    /// A run whose build exited with `exit_code`.
    pub fn build_failed(exit_code: i32) -> Self {
        Self {
            succeeded: false,
            exit_code,
            moved_artifact_path: None,
            artifact_sha256: None,
        }
    }

    /// Convert a failed build into [`StageError::BuildFailed`].
    pub fn into_result(self) -> Result<Self> {
        if self.succeeded {
            Ok(self)
        } else {
            Err(StageError::BuildFailed {
                exit_code: self.exit_code,
            })
        }
    }
}

/// Runs a [`BuildTool`] and stages what it produced.
pub struct Stager {
    tool: Arc<dyn BuildTool>,
}

impl Stager {
    /// Create a stager around `tool`.
    pub fn new(tool: Arc<dyn BuildTool>) -> Self {
        Self { tool }
    }

    /// The build tool this stager runs.
    pub fn tool(&self) -> &dyn BuildTool {
        self.tool.as_ref()
    }

    /// Build, then move the artifact into place.
    ///
    /// A build that exits nonzero is not an error: it yields a failed
    /// [`StageResult`] and leaves the filesystem untouched. Errors are
    /// reserved for a successful build whose output cannot be staged, or a
    /// build that could not be run at all.
    pub async fn stage(&self, request: &StageRequest) -> Result<StageResult> {
        if request.destination_name.trim().is_empty() {
            return Err(StageError::InvalidConfig(
                "destination name is empty".to_string(),
            ));
        }

        let outcome = self.tool.run(&request.build).await?;

        if !outcome.succeeded() {
            warn!(
                tool = self.tool.name(),
                exit_code = outcome.exit_code,
                "Build failed, nothing staged"
            );
            return Ok(StageResult::build_failed(outcome.exit_code));
        }

        let artifact = request.artifact_path();
        if !artifact.is_file() {
            return Err(StageError::ArtifactMissing { path: artifact });
        }

        relocate::ensure_dir(&request.destination_dir)?;

        let destination = request.destination_path();
        relocate::move_artifact(&artifact, &destination)?;

        let digest = relocate::file_digest(&destination)?;
        info!(
            from = %artifact.display(),
            to = %destination.display(),
            sha256 = &digest[..12],
            duration_ms = outcome.duration_ms,
            "Staged artifact"
        );

        Ok(StageResult::staged(destination, Some(digest)))
    }
}

impl Default for Stager {
    fn default() -> Self {
        Self::new(Arc::new(BuildCommand::cargo_install()))
    }
}

/// Stage with the default `cargo install` build command.
pub async fn stage(
    source_dir: impl Into<PathBuf>,
    install_root: impl Into<PathBuf>,
    artifact_relative_path: impl Into<PathBuf>,
    destination_dir: impl Into<PathBuf>,
    destination_name: impl Into<String>,
) -> Result<StageResult> {
    let request = StageRequest::new(
        BuildRequest::new(source_dir, install_root),
        artifact_relative_path,
        destination_dir,
        destination_name,
    );
    Stager::default().stage(&request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedBuildTool;

    fn request_in(dir: &std::path::Path) -> StageRequest {
        StageRequest::new(
            BuildRequest::new(dir.join("proj"), dir.join(".build")),
            "bin/redc",
            dir.join("programs"),
            "redc",
        )
    }

    #[test]
    fn test_stage_result_into_result() {
        let ok = StageResult::staged(PathBuf::from("programs/redc"), None);
        assert!(ok.clone().into_result().is_ok());

        let failed = StageResult::build_failed(2);
        match failed.into_result() {
            Err(StageError::BuildFailed { exit_code }) => assert_eq!(exit_code, 2),
            other => panic!("expected BuildFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_stage_result_json_shape() {
        let json = serde_json::to_value(StageResult::build_failed(1)).unwrap();
        assert_eq!(json["succeeded"], false);
        assert_eq!(json["exit_code"], 1);
        assert!(json["moved_artifact_path"].is_null());
        assert!(json.get("artifact_sha256").is_none());
    }

    #[tokio::test]
    async fn test_successful_build_stages_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let request = request_in(dir.path());
        let tool = Arc::new(ScriptedBuildTool::succeeding("bin/redc", b"redc v1"));

        let result = Stager::new(tool.clone()).stage(&request).await.unwrap();

        assert!(result.succeeded);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.moved_artifact_path, Some(request.destination_path()));
        assert_eq!(std::fs::read(request.destination_path()).unwrap(), b"redc v1");
        assert!(!request.artifact_path().exists());
        assert_eq!(result.artifact_sha256.as_ref().map(String::len), Some(64));
        assert_eq!(tool.invocations(), 1);
    }

    #[tokio::test]
    async fn test_failed_build_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let request = request_in(dir.path());
        let tool = Arc::new(ScriptedBuildTool::failing(101));

        let result = Stager::new(tool).stage(&request).await.unwrap();

        assert_eq!(result, StageResult::build_failed(101));
        assert!(!request.destination_dir.exists());
    }

    #[tokio::test]
    async fn test_empty_destination_name_rejected_before_build() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = request_in(dir.path());
        request.destination_name = String::new();
        let tool = Arc::new(ScriptedBuildTool::succeeding("bin/redc", b"x"));

        let result = Stager::new(tool.clone()).stage(&request).await;

        assert!(matches!(result, Err(StageError::InvalidConfig(_))));
        assert_eq!(tool.invocations(), 0);
    }
}
