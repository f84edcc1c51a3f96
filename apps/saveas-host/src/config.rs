//! Host configuration.
//!
//! Stored as TOML:
//! - Linux: `~/.config/saveas/host.toml`
//! - Windows: `%APPDATA%/saveas/host.toml`

use std::path::{Path, PathBuf};

use saveas_flow::{SaveConfig, Strategy};
use serde::{Deserialize, Serialize};

/// Host configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Folder chooser first, or straight to the save dialog.
    #[serde(default)]
    pub strategy: Strategy,

    /// Folder the dialogs open in (empty = platform default).
    #[serde(default)]
    pub default_dir: String,

    /// Scratch directory (empty = `<temp>/saveas`).
    #[serde(default)]
    pub scratch_dir: String,

    /// Transfer chunk size in KiB.
    #[serde(default = "default_chunk_kib")]
    pub chunk_size_kib: u32,

    /// `name (n).ext` attempts before falling back to a timestamp.
    #[serde(default = "default_max_name_attempts")]
    pub max_name_attempts: u32,

    /// Fail when folder access cannot be persisted.
    #[serde(default)]
    pub require_persisted_grant: bool,

    /// Label for progress reporting.
    #[serde(default = "default_progress_label")]
    pub progress_label: String,
}

fn default_chunk_kib() -> u32 {
    32
}

fn default_max_name_attempts() -> u32 {
    100
}

fn default_progress_label() -> String {
    "Saving file".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            default_dir: String::new(),
            scratch_dir: String::new(),
            chunk_size_kib: default_chunk_kib(),
            max_name_attempts: default_max_name_attempts(),
            require_persisted_grant: false,
            progress_label: default_progress_label(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads configuration from `path`, writing a default there if missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Writes the configuration to `path`, readable by the owner only.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn default_dir(&self) -> Option<PathBuf> {
        non_empty_path(&self.default_dir)
    }

    /// Builds the pipeline configuration.
    pub fn save_config(&self) -> SaveConfig {
        let defaults = SaveConfig::default();
        SaveConfig {
            scratch_dir: non_empty_path(&self.scratch_dir).unwrap_or(defaults.scratch_dir),
            chunk_size: self.chunk_size_kib as usize * 1024,
            max_name_attempts: self.max_name_attempts,
            require_persisted_grant: self.require_persisted_grant,
            progress_label: self.progress_label.clone(),
        }
    }
}

fn non_empty_path(s: &str) -> Option<PathBuf> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else if let Some(rest) = s.strip_prefix("~/") {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(rest))
    } else {
        Some(PathBuf::from(s))
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("saveas")
            .join("host.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("saveas").join("host.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/saveas/host.toml"))
    }
}
