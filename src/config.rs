use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::gate::Secret;
use crate::medium::{atomic_write, restrict_dir, restrict_file};

pub const BASE_DIR: &str = ".mine-dashboard";
pub const CONFIG_FILE: &str = "config.json";
pub const LOG_FILE: &str = "dashboard.log";
pub const DATA_DIR: &str = "data";
pub const SESSION_ENV: &str = "MINE_DASHBOARD_SESSION";
const SESSION_DIR_PREFIX: &str = "mine-dashboard-session-";
const DEFAULT_SECRET: &str = "Switzerland";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Relative paths are taken from the home directory.
    pub data_dir: Option<String>,
    pub persistence_enabled: bool,
    pub gate_enabled: bool,
    pub secret: String,
    /// Argon2 PHC string; wins over `secret` when set.
    pub secret_hash: Option<String>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            persistence_enabled: true,
            gate_enabled: true,
            secret: DEFAULT_SECRET.to_string(),
            secret_hash: None,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn gate_secret(&self) -> Result<Secret> {
        match &self.secret_hash {
            Some(phc) => Secret::argon2(phc),
            None => Ok(Secret::Plain(self.secret.clone())),
        }
    }
}

pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))
}

pub fn default_base_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(BASE_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(default_base_dir()?.join(CONFIG_FILE))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(default_base_dir()?.join(LOG_FILE))
}

/// Defaults when the file does not exist; an unparseable file is an error.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| anyhow!("Invalid config at {}: {e}", path.display()))
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&config_path()?)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    ensure_parent_dir(path)?;
    let data = serde_json::to_string_pretty(settings)?;
    atomic_write(path, data.as_bytes())?;
    restrict_file(path)?;
    Ok(())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&config_path()?, settings)
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    let parent = path.parent().ok_or_else(|| anyhow!("Invalid path: {}", path.display()))?;
    ensure_dir(parent)
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    restrict_dir(dir)?;
    Ok(())
}

/// Where the tab collections live for these settings.
pub fn data_dir(settings: &Settings) -> Result<PathBuf> {
    let home = home_dir()?;
    match &settings.data_dir {
        Some(raw) => resolve_under_home(Path::new(raw), &home),
        None => Ok(home.join(BASE_DIR).join(DATA_DIR)),
    }
}

/// Directory scoped to the launching shell session.
pub fn session_dir() -> PathBuf {
    let id = std::env::var(SESSION_ENV)
        .ok()
        .map(|v| sanitize_session_id(&v))
        .filter(|v| !v.is_empty())
        .unwrap_or_else(parent_session_id);
    std::env::temp_dir().join(format!("{SESSION_DIR_PREFIX}{id}"))
}

fn parent_session_id() -> String {
    #[cfg(unix)]
    {
        std::os::unix::process::parent_id().to_string()
    }
    #[cfg(not(unix))]
    {
        std::process::id().to_string()
    }
}

fn sanitize_session_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

pub fn resolve_under_home(raw: &Path, home: &Path) -> Result<PathBuf> {
    let candidate = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        home.join(raw)
    };

    if candidate
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(anyhow!("Data path cannot contain '..' traversal components"));
    }
    if !candidate.starts_with(home) {
        return Err(anyhow!("Data path must be inside {}", home.display()));
    }

    // Resolve symlinks when possible so the data cannot escape home.
    let home_real = fs::canonicalize(home).unwrap_or_else(|_| home.to_path_buf());
    if candidate.exists() {
        let real = fs::canonicalize(&candidate)?;
        if !real.starts_with(&home_real) {
            return Err(anyhow!("Data path resolves outside {}", home.display()));
        }
    } else if let Some(parent) = candidate.parent() {
        if parent.exists() {
            let real_parent = fs::canonicalize(parent)?;
            if !real_parent.starts_with(&home_real) {
                return Err(anyhow!("Data path parent resolves outside {}", home.display()));
            }
        }
    }
    Ok(candidate)
}
