// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub pool_size: usize,
    pub max_outstanding_merges: usize,
    pub poll_interval_ms: u64,
    pub log_summary: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pool_size: num_cpus::get(),
            max_outstanding_merges: 50,
            poll_interval_ms: 50,
            log_summary: true,
        }
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_max_outstanding_merges(mut self, cap: usize) -> Self {
        self.max_outstanding_merges = cap;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_log_summary(mut self, enabled: bool) -> Self {
        self.log_summary = enabled;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::Validation("pool_size must be greater than 0".to_string()));
        }
        if self.max_outstanding_merges == 0 {
            return Err(ConfigError::Validation(
                "max_outstanding_merges must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation("poll_interval_ms must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Using default scheduler config: {}", e);
                Self::default()
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Validation(String),
}
