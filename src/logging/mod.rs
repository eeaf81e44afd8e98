//! Logging setup and the log-backed progress sink
//!
//! Output goes through the `log` facade. The binary installs `env_logger`,
//! and `RUST_LOG` overrides the verbosity chosen on the command line.

use crate::stream::{ProgressEvent, ProgressSink};
use log::info;

/// Install the process logger
pub fn init(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Writes sampled stream progress and completion at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn progress(&self, event: &ProgressEvent<'_>) {
        info!("[{}] {} ({})", event.command, event.image, event.message());
    }

    fn complete(&self, command: &str, image: &str) {
        info!("[{}] {} complete.", command, image);
    }
}
