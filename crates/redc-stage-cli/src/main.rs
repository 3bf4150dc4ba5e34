//! redc-stage - build the compiler and stage its executable
//!
//! Runs `cargo install --path . --root .build` (or a custom build command),
//! then moves the produced binary to `programs/redc`. With no arguments it
//! does exactly that; every path can be overridden by flag or environment
//! variable.
//!
//! The process exits with the build's own exit code when the build fails,
//! 0 when the artifact was staged, and 1 for any other error.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use redc_stage_core::request::{
    default_artifact_relative_path, default_destination_name, DEFAULT_DESTINATION_DIR,
    DEFAULT_INSTALL_ROOT, DEFAULT_SOURCE_DIR,
};
use redc_stage_core::{
    init_tracing, BuildCommand, BuildRequest, BuildTool, StageError, StageRequest, StageResult,
    Stager,
};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "redc-stage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build the redc compiler and stage it into programs/", long_about = None)]
struct Cli {
    /// Project directory to build
    #[arg(long, env = "REDC_STAGE_SOURCE_DIR", default_value = DEFAULT_SOURCE_DIR)]
    source_dir: PathBuf,

    /// Root the build tool installs into
    #[arg(long, env = "REDC_STAGE_INSTALL_ROOT", default_value = DEFAULT_INSTALL_ROOT)]
    install_root: PathBuf,

    /// Built artifact, relative to the install root (default: bin/redstone_compiler)
    #[arg(long, env = "REDC_STAGE_ARTIFACT")]
    artifact: Option<PathBuf>,

    /// Directory the artifact is moved into
    #[arg(long, env = "REDC_STAGE_DEST_DIR", default_value = DEFAULT_DESTINATION_DIR)]
    dest_dir: PathBuf,

    /// File name of the staged artifact (default: redc)
    #[arg(long, env = "REDC_STAGE_DEST_NAME")]
    dest_name: Option<String>,

    /// Kill the build after this many seconds (0 = no limit)
    #[arg(long, env = "REDC_STAGE_TIMEOUT_SECS", default_value = "0")]
    timeout_secs: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Print the stage result as JSON on stdout
    #[arg(long)]
    summary: bool,

    /// Build command replacing `cargo install` ({source} and {root} are expanded)
    #[arg(last = true)]
    build_command: Vec<String>,
}

impl Cli {
    fn build_command(&self) -> Result<BuildCommand> {
        let command = if self.build_command.is_empty() {
            BuildCommand::cargo_install()
        } else {
            BuildCommand::custom(self.build_command.clone())?
        };
        Ok(command.with_timeout(self.timeout_secs))
    }

    fn stage_request(&self) -> StageRequest {
        StageRequest::new(
            BuildRequest::new(&self.source_dir, &self.install_root),
            self.artifact
                .clone()
                .unwrap_or_else(default_artifact_relative_path),
            &self.dest_dir,
            self.dest_name.clone().unwrap_or_else(default_destination_name),
        )
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let code = match execute(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            err.downcast_ref::<StageError>()
                .map(StageError::exit_code)
                .unwrap_or(1)
        }
    };

    std::process::exit(code);
}

/// Run one staging pass and return the process exit code.
fn execute(cli: &Cli) -> Result<i32> {
    let stager = Stager::new(Arc::new(cli.build_command()?));
    let request = cli.stage_request();

    info!(
        source = %request.build.source_dir.display(),
        artifact = %request.artifact_path().display(),
        destination = %request.destination_path().display(),
        "Building and staging"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(stager.stage(&request))?;

    if let Some(hint) = failure_output(&result, stager.tool()) {
        println!("{hint}");
    }
    if cli.summary {
        let json = serde_json::to_string(&result).context("failed to encode stage result")?;
        println!("{json}");
    }

    Ok(exit_code_for(result))
}

/// The single stdout line for a failed build, if any.
fn failure_output(result: &StageResult, tool: &dyn BuildTool) -> Option<&'static str> {
    (!result.succeeded).then(|| tool.failure_hint())
}

fn exit_code_for(result: StageResult) -> i32 {
    match result.into_result() {
        Ok(_) => 0,
        Err(err) => err.exit_code(),
    }
}
