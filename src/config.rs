//! Configuration for the setup wizard.
//!
//! All settings are passed into the wizard explicitly. The library never reads
//! environment variables by itself; the binary resolves them once through
//! [`SetupConfig::resolve_config_dir`] and hands the result over.

use crate::error::{Result, SetupError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "ICINGAWEB_CONFIGDIR";

/// Configuration directory used when nothing else is given
pub const DEFAULT_CONFIG_DIR: &str = "/etc/icingaweb";

/// Name of the setup token file inside the configuration directory
pub const TOKEN_FILE: &str = "setup.token";

/// Subdirectories the installer creates below the configuration directory
pub const REQUIRED_SUBDIRECTORIES: &[&str] = &["modules", "preferences", "enabledModules"];

const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Wizard settings that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Directory the web frontend reads its configuration from
    pub config_dir: PathBuf,
    /// Upper bound for each connection attempt of the database probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_probe_timeout() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }
}

impl SetupConfig {
    /// Create a configuration for the given directory with default settings
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Self::default()
        }
    }

    /// Pick the configuration directory: explicit value, then the environment
    /// value, then the default. Existing directories are canonicalized.
    pub fn resolve_config_dir(explicit: Option<PathBuf>, from_env: Option<String>) -> PathBuf {
        let dir = explicit
            .or_else(|| from_env.filter(|v| !v.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));
        fs::canonicalize(&dir).unwrap_or(dir)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.config_dir.as_os_str().is_empty() {
            return Err(SetupError::config("Configuration directory must be specified"));
        }
        if !self.config_dir.is_absolute() {
            return Err(SetupError::config(format!(
                "Configuration directory must be an absolute path: {}",
                self.config_dir.display()
            )));
        }
        if self.probe_timeout_secs == 0 {
            return Err(SetupError::config("Probe timeout must be at least one second"));
        }
        Ok(())
    }

    /// Timeout for each probe connection attempt
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Location of the setup token
    pub fn token_path(&self) -> PathBuf {
        self.config_dir.join(TOKEN_FILE)
    }

    /// Directories the installer must create, in creation order
    pub fn required_directories(&self) -> Vec<PathBuf> {
        REQUIRED_SUBDIRECTORIES
            .iter()
            .map(|sub| self.config_dir.join(sub))
            .collect()
    }
}
