use crate::config::LoggingConfig;
use std::io;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Install the global subscriber. Always writes to stderr: stdout carries the
/// stdio transport.
pub fn init_logging(config: &LoggingConfig) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    // Use Layer::boxed() to unify the types of the if/else branches
    let fmt_layer = if config.json {
        fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
