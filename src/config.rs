use crate::monitor::Monitor;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration loaded from `cos.toml`.
///
/// Built once at startup and passed by reference to whatever needs it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub monitor: MonitorConfig,
    pub paths: PathsConfig,
    pub launch: LaunchConfig,
    pub render_node: RenderNodeConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub check_in_interval_secs: u64,
    pub output_buffer_length: usize,
    pub timeout_mins: Option<u64>,
    pub poll_interval_ms: u64,
    pub reader_grace_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub temp_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
#[derive(Default)]
pub struct LaunchConfig {
    /// Extra variables overlaid on the inherited environment of every launch.
    pub env: BTreeMap<String, String>,
    pub use_shell: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderNodeConfig {
    /// Host names containing this marker are treated as render nodes.
    pub name_marker: String,
    /// Process name fragments terminated by `kill_job_processes`.
    pub kill_patterns: Vec<String>,
}

// --- Default implementations ---

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_in_interval_secs: 10,
            output_buffer_length: 10_000,
            timeout_mins: None,
            poll_interval_ms: 100,
            reader_grace_ms: 1_000,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join("cos"),
        }
    }
}

impl Default for RenderNodeConfig {
    fn default() -> Self {
        Self {
            name_marker: "RENDER".to_string(),
            kill_patterns: vec![
                "3dsmax".to_string(),
                "Nuke".to_string(),
                "ffmpeg".to_string(),
                "maxwell".to_string(),
                "cmd.exe".to_string(),
                "python.exe".to_string(),
            ],
        }
    }
}

impl MonitorConfig {
    /// Build a monitor with these settings and no callbacks.
    pub fn build_monitor<'a>(&self) -> Monitor<'a> {
        let mut monitor = Monitor::new()
            .check_in_interval(Duration::from_secs(self.check_in_interval_secs))
            .output_buffer_length(self.output_buffer_length)
            .poll_interval(Duration::from_millis(self.poll_interval_ms))
            .reader_grace(Duration::from_millis(self.reader_grace_ms));
        if let Some(timeout) = self.timeout() {
            monitor = monitor.timeout(timeout);
        }
        monitor
    }

    /// The configured timeout, saturating for absurdly large minute counts.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_mins
            .map(|mins| Duration::from_secs(mins.saturating_mul(60)))
    }
}

/// Errors raised while loading settings.
#[derive(Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The config file is not valid TOML for `Settings`.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "invalid config {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Settings, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Settings::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Parse settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Settings, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Create the configured temp directory if it doesn't exist yet.
    pub fn ensure_temp_dir(&self) -> std::io::Result<&Path> {
        std::fs::create_dir_all(&self.paths.temp_dir)?;
        Ok(&self.paths.temp_dir)
    }
}
