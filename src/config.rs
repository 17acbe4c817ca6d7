use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};
use crate::target::AddressFamily;

pub const DEFAULT_COUNT: u64 = 5;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const CONFIG_DIR_NAME: &str = "ting";
const CONFIG_FILE_NAME: &str = "config.json";

/// Settings for one probing session.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    /// `None` probes until stopped.
    pub count: Option<u64>,
    /// Measured from the start of one attempt to the start of the next.
    pub interval: Duration,
    /// Zero selects [`DEFAULT_TIMEOUT`].
    pub timeout: Duration,
    pub family: AddressFamily,
    /// How long a resolved address is reused. Zero resolves on every attempt.
    pub dns_ttl: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            count: Some(DEFAULT_COUNT),
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            family: AddressFamily::Any,
            dns_ttl: Duration::ZERO,
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(ProbeError::InvalidConfig(
                "interval must be greater than zero".to_string(),
            ));
        }
        if self.count == Some(0) {
            return Err(ProbeError::InvalidConfig(
                "count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }
}

/// Converts a user-supplied number of seconds, rejecting negative and non-finite values.
pub fn duration_from_secs(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ProbeError::InvalidConfig(format!(
            "{name} must be a non-negative number of seconds, got {secs}"
        ))
    })
}

/// Defaults persisted between runs. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub count: u64,
    pub interval_secs: f64,
    pub timeout_secs: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            interval_secs: DEFAULT_INTERVAL.as_secs_f64(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs_f64(),
        }
    }
}

impl Settings {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ProbeError::NoConfigDir)?
            .join(CONFIG_DIR_NAME);
        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Loads the user's defaults, falling back to built-in values on any problem.
    pub fn load() -> Self {
        match Self::get_config_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                warn!("{e}; using built-in defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Settings>(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("failed to parse {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                warn!("failed to read {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::get_config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let io_err = |source: std::io::Error| ProbeError::SettingsIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)?;
        Ok(())
    }
}
