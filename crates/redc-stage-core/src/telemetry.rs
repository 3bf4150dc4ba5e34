//! Tracing initialisation for the redc-stage binary.
//!
//! Log lines go to stderr so stdout carries only the failure hint and the
//! optional JSON summary.

use std::io;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide subscriber for a staging run.
///
/// `level` applies only when `RUST_LOG` is unset. With `json` every line is
/// a JSON object, which keeps stderr machine-readable while the build's own
/// output and the failure hint share the terminal. A subscriber installed
/// earlier wins and this call does nothing.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let text_layer = (!json).then(|| fmt::layer().with_target(false).with_writer(io::stderr));
    let json_layer = json.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(io::stderr)
            .json()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
