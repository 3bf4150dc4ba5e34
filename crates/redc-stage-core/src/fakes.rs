//! Scripted build tool (testing only)
//!
//! Provides `ScriptedBuildTool`, a [`BuildTool`] that returns a fixed exit
//! code and can drop an artifact into the install root as if a real build
//! had produced it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::build::{BuildOutcome, BuildTool};
use crate::error::Result;
use crate::request::BuildRequest;

/// Build tool with a scripted exit code and output.
#[derive(Debug)]
pub struct ScriptedBuildTool {
    exit_code: i32,
    artifact: Option<(PathBuf, Vec<u8>)>,
    invocations: AtomicU32,
}

impl ScriptedBuildTool {
    /// Exits 0 and writes `contents` to `install_root/relative_path`.
    pub fn succeeding(relative_path: impl Into<PathBuf>, contents: &[u8]) -> Self {
        Self {
            exit_code: 0,
            artifact: Some((relative_path.into(), contents.to_vec())),
            invocations: AtomicU32::new(0),
        }
    }

    /// Exits 0 without producing anything.
    pub fn succeeding_without_artifact() -> Self {
        Self {
            exit_code: 0,
            artifact: None,
            invocations: AtomicU32::new(0),
        }
    }

    /// Exits with `exit_code` without producing anything.
    pub fn failing(exit_code: i32) -> Self {
        Self {
            exit_code,
            artifact: None,
            invocations: AtomicU32::new(0),
        }
    }

    /// How many times `run` was called.
    pub fn invocations(&self) -> u32 {
        self.invocations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BuildTool for ScriptedBuildTool {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, request: &BuildRequest) -> Result<BuildOutcome> {
        self.invocations.fetch_add(1, Ordering::Relaxed);

        if let Some((relative_path, contents)) = &self.artifact {
            let path = request.install_root.join(relative_path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, contents)?;
        }

        Ok(BuildOutcome {
            exit_code: self.exit_code,
            duration_ms: 0,
        })
    }
}
