//! Subscriber setup shared by the binaries.
//!
//! Logs go to stderr so stdout carries only the tools' own output. `RUST_LOG`
//! takes precedence over the level picked from `--verbose`.

use tracing_subscriber::{fmt, EnvFilter};

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
