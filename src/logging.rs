use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::config::ensure_parent_dir;

pub const LOG_ENV: &str = "MINE_DASHBOARD_LOG";

/// Sends tracing output to `path`; the terminal belongs to the UI.
///
/// `MINE_DASHBOARD_LOG` takes precedence over `level`.
pub fn init(path: &Path, level: &str) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Logging setup failed: {e}"))
}
