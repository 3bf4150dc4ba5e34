//! External build command definition and execution.

use std::ffi::{OsStr, OsString};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, StageError};
use crate::hint;
use crate::request::BuildRequest;

/// Placeholder replaced with the request's source directory.
pub const SOURCE_PLACEHOLDER: &str = "{source}";

/// Placeholder replaced with the request's install root.
pub const ROOT_PLACEHOLDER: &str = "{root}";

/// Outcome of one build invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Exit code (0 = success, -1 = terminated without a code).
    pub exit_code: i32,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl BuildOutcome {
    /// Whether the build reported success.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Something that can turn a [`BuildRequest`] into an installed artifact.
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Run the build to completion.
    async fn run(&self, request: &BuildRequest) -> Result<BuildOutcome>;

    /// One-line remediation printed when the build fails.
    fn failure_hint(&self) -> &'static str {
        hint::GENERIC_HINT
    }
}

/// Build/install command run as a child process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildCommand {
    /// Executable to run.
    pub program: String,

    /// Arguments; may contain `{source}` and `{root}`.
    pub args: Vec<String>,

    /// Timeout in seconds (0 = wait until the build exits).
    pub timeout_secs: u64,
}

impl BuildCommand {
    /// `cargo install --path {source} --root {root}`
    pub fn cargo_install() -> Self {
        Self {
            program: "cargo".to_string(),
            args: vec![
                "install".to_string(),
                "--path".to_string(),
                SOURCE_PLACEHOLDER.to_string(),
                "--root".to_string(),
                ROOT_PLACEHOLDER.to_string(),
            ],
            timeout_secs: 0,
        }
    }

    /// Create a custom build command (first element is the executable).
    pub fn custom(argv: Vec<String>) -> Result<Self> {
        let mut argv = argv.into_iter();
        let program = argv
            .next()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| StageError::InvalidConfig("build command is empty".to_string()))?;

        Ok(Self {
            program,
            args: argv.collect(),
            timeout_secs: 0,
        })
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Arguments with placeholders expanded for `request`.
    ///
    /// Each argument is scanned once, so a path that itself contains a
    /// placeholder is passed through verbatim.
    pub fn resolved_args(&self, request: &BuildRequest) -> Vec<OsString> {
        let source = request.source_dir.as_os_str();
        let root = request.install_root.as_os_str();
        self.args
            .iter()
            .map(|arg| expand_placeholders(arg, source, root))
            .collect()
    }
}

fn expand_placeholders(arg: &str, source: &OsStr, root: &OsStr) -> OsString {
    let mut expanded = OsString::new();
    let mut rest = arg;

    loop {
        let next = [(SOURCE_PLACEHOLDER, source), (ROOT_PLACEHOLDER, root)]
            .into_iter()
            .filter_map(|(placeholder, value)| {
                rest.find(placeholder).map(|at| (at, placeholder, value))
            })
            .min_by_key(|(at, _, _)| *at);

        match next {
            Some((at, placeholder, value)) => {
                expanded.push(&rest[..at]);
                expanded.push(value);
                rest = &rest[at + placeholder.len()..];
            }
            None => {
                expanded.push(rest);
                return expanded;
            }
        }
    }
}

impl Default for BuildCommand {
    fn default() -> Self {
        Self::cargo_install()
    }
}

#[async_trait]
impl BuildTool for BuildCommand {
    fn name(&self) -> &str {
        &self.program
    }

    fn failure_hint(&self) -> &'static str {
        if self.program == "cargo" {
            hint::toolchain_hint()
        } else {
            hint::GENERIC_HINT
        }
    }

    async fn run(&self, request: &BuildRequest) -> Result<BuildOutcome> {
        let start = Instant::now();
        let args = self.resolved_args(request);

        info!(program = %self.program, args = ?args, "Running build command");

        // Build output goes straight to the terminal
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| StageError::BuildSpawnFailed {
                program: self.program.clone(),
                source,
            })?;

        let status = if self.timeout_secs > 0 {
            let waited =
                tokio::time::timeout(Duration::from_secs(self.timeout_secs), child.wait()).await;
            match waited {
                Ok(status) => status?,
                Err(_) => {
                    warn!(
                        timeout_secs = self.timeout_secs,
                        "Build timed out, killing child process"
                    );
                    child.kill().await?;
                    return Err(StageError::BuildTimedOut {
                        timeout_secs: self.timeout_secs,
                    });
                }
            }
        } else {
            child.wait().await?
        };

        let outcome = BuildOutcome {
            exit_code: status.code().unwrap_or(-1),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        debug!(
            exit_code = outcome.exit_code,
            duration_ms = outcome.duration_ms,
            "Build command finished"
        );

        Ok(outcome)
    }
}
