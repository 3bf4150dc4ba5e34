//! redc-stage core library
//!
//! Runs the build/install command for the redc compiler, then moves the
//! produced executable into a user-facing directory:
//!
//! 1. run the build tool against the source directory and wait for it
//! 2. on exit code 0, create the destination directory and move the artifact
//! 3. on any other exit code, touch nothing and report the code

pub mod build;
pub mod error;
pub mod fakes;
pub mod hint;
pub mod relocate;
pub mod request;
pub mod stager;
pub mod telemetry;

pub use build::{BuildCommand, BuildOutcome, BuildTool};
pub use error::{Result, StageError};
pub use request::{BuildRequest, StageRequest};
pub use stager::{stage, StageResult, Stager};
pub use telemetry::init_tracing;
