use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use action_flow::SiteProfile;
use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::telemetry::TaggedFormat;

/// Install tagged logging on stdout and the appended log file.
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the whole run.
pub fn init_logging(level: &str, debug: bool, log_path: &Path) -> Result<WorkerGuard> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let file = open_log_file(log_path)?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("{level},chromiumoxide=warn,tungstenite=warn"))
            }),
        )
        .with(fmt::layer().event_format(TaggedFormat))
        .with(
            fmt::layer()
                .event_format(TaggedFormat)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}

/// Open the log file for appending, creating it and its parent directories.
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Load `.env` variables without overriding ones already set.
///
/// An explicit path that exists wins; otherwise the usual `.env` lookup runs
/// and a missing file is not an error.
pub fn load_env(path: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = path {
        if path.exists() {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
            info!("Loaded environment from: {}", path.display());
            return Ok(Some(path.to_path_buf()));
        }
        warn!("Env file not found, falling back to .env: {}", path.display());
    }

    match dotenvy::dotenv() {
        Ok(found) => {
            info!("Loaded environment from: {}", found.display());
            Ok(Some(found))
        }
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err).context("Failed to parse .env file"),
    }
}

/// Site profile from YAML, or the built-in one when no path is given.
pub fn load_profile(path: Option<&Path>) -> Result<SiteProfile> {
    match path {
        Some(path) => {
            let profile = SiteProfile::load(path)
                .with_context(|| format!("Failed to load site profile {}", path.display()))?;
            info!("Loaded site profile from: {}", path.display());
            Ok(profile)
        }
        None => Ok(SiteProfile::default()),
    }
}
