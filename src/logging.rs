//! Structured logging bootstrap.
//!
//! The library itself only emits `tracing` events; hosts that want them on
//! stderr call [`init_tracing`] once at startup. The `CREDEVAL_LOG`
//! environment variable (or `RUST_LOG`) overrides the requested level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize structured logging for embedding applications.
///
/// `level` is a plain level name (`"debug"`) or a full filter directive
/// (`"credeval=trace"`). Safe to call once per process; a second call
/// returns an error from the subscriber registry.
pub fn init_tracing(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("CREDEVAL_LOG"))
        .unwrap_or_else(|_| {
            EnvFilter::new(if level.contains('=') {
                level.to_string()
            } else {
                format!("credeval={}", level)
            })
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .try_init()?;

    Ok(())
}
