//! Tracing setup for the `mercury` binary.
//!
//! Two layers share one `EnvFilter`: a compact layer on stderr and, when a
//! log directory is given, a timestamped file layer. `latest.log` in the same
//! directory points at the newest file.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides `default_filter`.
///
/// Returns the path of the log file when one was opened. Calling this a
/// second time leaves the first subscriber in place.
pub fn init_tracing(log_dir: Option<&Path>, default_filter: &str) -> Option<PathBuf> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time()
        .compact();

    let log_file = log_dir.and_then(|dir| match open_log_file(dir) {
        Ok(opened) => Some(opened),
        Err(e) => {
            eprintln!("Could not open log file in {}: {e}", dir.display());
            None
        }
    });
    let (file_layer, log_path) = match log_file {
        Some((file, path)) => {
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_timer(LocalTime::rfc_3339());
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        if let Some(path) = &log_path {
            tracing::debug!(target: "logging", "Logging to {}", path.display());
        }
    }
    log_path
}

fn open_log_file(log_dir: &Path) -> std::io::Result<(File, PathBuf)> {
    fs::create_dir_all(log_dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("mercury_{timestamp}.log"));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    point_latest_at(log_dir, &log_path);
    Ok((file, log_path))
}

#[cfg(unix)]
fn point_latest_at(log_dir: &Path, log_path: &Path) {
    let latest_path = log_dir.join("latest.log");
    let _ = fs::remove_file(&latest_path);
    let _ = std::os::unix::fs::symlink(log_path, &latest_path);
}

#[cfg(not(unix))]
fn point_latest_at(log_dir: &Path, log_path: &Path) {
    // No symlink without elevated rights; leave a pointer file instead.
    let _ = fs::write(
        log_dir.join("latest.log"),
        format!("Current log file: {}\n", log_path.display()),
    );
}
