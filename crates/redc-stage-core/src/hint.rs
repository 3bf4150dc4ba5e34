//! Remediation hints printed when the build fails.

/// Hint for build commands other than cargo.
pub const GENERIC_HINT: &str = "hint: the build command failed, check its output above";

/// Toolchain hint for the host platform.
///
/// A failing `cargo install` is most often a missing or wrong default
/// toolchain.
pub fn toolchain_hint() -> &'static str {
    if cfg!(windows) {
        "hint: try `rustup default stable-x86_64-pc-windows-gnu` and run again"
    } else {
        "hint: try `rustup default stable` and run again"
    }
}
