//! Tracing setup: INFO to the console (journald picks it up under systemd),
//! full DEBUG detail for this crate in `{log_dir}/lounge-relay.log`,
//! rotated at 5 MB with 3 backups (`.1` newest … `.3` oldest).

use anyhow::{Context, Result};
use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{filter::Targets, fmt, prelude::*, EnvFilter};

pub const LOG_FILE_NAME: &str = "lounge-relay.log";
pub const LOG_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const LOG_BACKUPS: usize = 3;

/// Open `{log_dir}/lounge-relay.log` behind a size-rotating writer.
/// The directory is created and the file opened once up front so an
/// unusable location is reported here rather than on the first write.
pub fn rotating_log_file(
    log_dir: &Path,
    max_bytes: usize,
    backups: usize,
) -> Result<(PathBuf, FileRotate<AppendCount>)> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log dir {}", log_dir.display()))?;
    let path = log_dir.join(LOG_FILE_NAME);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let writer = FileRotate::new(
        &path,
        AppendCount::new(backups),
        ContentLimit::Bytes(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok((path, writer))
}

/// Install the global subscriber. A log file that cannot be opened is
/// reported once and the relay keeps logging to the console.
pub fn init(log_dir: &Path) -> Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_filter(console_filter);

    let (file_layer, file_err) = match rotating_log_file(log_dir, LOG_MAX_BYTES, LOG_BACKUPS) {
        Ok((_, writer)) => {
            let filter = Targets::new()
                .with_target("lounge_relay", Level::DEBUG)
                .with_default(Level::INFO);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(writer))
                .with_filter(filter);
            (Some(layer), None)
        }
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    if let Some(e) = file_err {
        tracing::warn!("file logging disabled: {e:#}");
    }
    Ok(())
}
