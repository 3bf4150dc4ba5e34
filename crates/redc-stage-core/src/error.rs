//! Error types for redc-stage

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can end a staging run
#[derive(Error, Debug)]
pub enum StageError {
    /// Build command exited with a nonzero status
    #[error("build command failed with exit code {exit_code}")]
    BuildFailed { exit_code: i32 },

    /// Build reported success but the expected artifact is not there
    #[error("build succeeded but no artifact was found at {}", .path.display())]
    ArtifactMissing { path: PathBuf },

    /// Destination directory could not be created
    #[error("could not create destination directory {}", .path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact could not be moved into place
    #[error("could not move {} to {}", .from.display(), .to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Build program could not be started (usually not in PATH)
    #[error("could not start build program `{program}`")]
    BuildSpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Build did not finish within the configured limit
    #[error("build timed out after {timeout_secs} seconds")]
    BuildTimedOut { timeout_secs: u64 },

    /// Request or build command is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error while waiting on the build or hashing the artifact
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StageError {
    /// Process exit code the CLI should terminate with.
    ///
    /// A failed build propagates its own code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            StageError::BuildFailed { exit_code } if *exit_code > 0 => *exit_code,
            _ => 1,
        }
    }
}

/// Result type for staging operations.
pub type Result<T> = std::result::Result<T, StageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_failed_propagates_exit_code() {
        let err = StageError::BuildFailed { exit_code: 101 };
        assert_eq!(err.exit_code(), 101);
    }

    #[test]
    fn build_failed_without_real_code_maps_to_one() {
        let err = StageError::BuildFailed { exit_code: -1 };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn staging_errors_map_to_one() {
        let err = StageError::ArtifactMissing {
            path: PathBuf::from(".build/bin/redc"),
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains(".build/bin/redc"));

        let err = StageError::BuildTimedOut { timeout_secs: 5 };
        assert_eq!(err.exit_code(), 1);
    }
}
