//! Logging initialization

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

/// Initialize logging based on debug flag
///
/// With `debug`, everything at debug level goes to a temp file whose path is
/// returned, keeping stdout clean for command output. Otherwise warnings go
/// to stderr. `RUST_LOG` overrides the level either way.
pub fn init_logging(debug: bool) -> Option<PathBuf> {
    if debug {
        if let Some((path, file)) = open_log_file() {
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
                )
                .with_ansi(false) // No ANSI codes in log file
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .init();
            return Some(path);
        }
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(if debug { "debug" } else { "warn" })
            }),
        )
        .with_target(false)
        .init();
    None
}

/// Create a log file that outlives the process
fn open_log_file() -> Option<(PathBuf, std::fs::File)> {
    let temp = tempfile::Builder::new()
        .prefix("cloudpath-")
        .suffix(".log")
        .tempfile()
        .ok()?;
    let (file, path) = temp.keep().ok()?;
    Some((path, file))
}
