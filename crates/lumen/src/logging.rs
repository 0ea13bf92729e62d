//! Logging initialization.
//!
//! Log output goes to stderr; stdout is reserved for result JSON.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// `level` is the default filter directive; `RUST_LOG` overrides it when set.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section with CLI overrides.
pub fn init_from_config(config: &lumen_core::Config, verbose: bool, json_logs: bool) {
    let level = resolve_level(&config.logging.level, verbose);
    let json_format = json_logs || config.logging.format == "json";
    init(level, json_format);
}

/// `--verbose` raises anything quieter than debug to debug.
fn resolve_level(configured: &str, verbose: bool) -> &str {
    match (configured, verbose) {
        ("trace", _) => "trace",
        (_, true) => "debug",
        (level, false) => level,
    }
}
