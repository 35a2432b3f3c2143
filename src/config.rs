//! Session configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::print::PrintSpec;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default = "default_generation_delay_ms")]
    pub generation_delay_ms: u64,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub print: PrintConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

fn default_generation_delay_ms() -> u64 { 1500 }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            generation_delay_ms: default_generation_delay_ms(),
            capture: CaptureConfig::default(),
            print: PrintConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    #[serde(default = "default_capture_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_scale")]
    pub scale: u32,
    #[serde(default = "default_background")]
    pub background: String,
}

fn default_capture_timeout_ms() -> u64 { 10_000 }
fn default_scale() -> u32 { 3 }
fn default_background() -> String { "#FFFFFF".to_string() }

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_capture_timeout_ms(),
            scale: default_scale(),
            background: default_background(),
        }
    }
}

/// Surface overrides; unset values fall back to the system print spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintConfig {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub print_delay_ms: Option<u64>,
    #[serde(default)]
    pub close_delay_ms: Option<u64>,
}

impl PrintConfig {
    fn is_overridden(&self) -> bool {
        self.width.is_some()
            || self.height.is_some()
            || self.print_delay_ms.is_some()
            || self.close_delay_ms.is_some()
    }

    fn user_spec(&self) -> Result<PrintSpec, &'static str> {
        let system = PrintSpec::default();
        PrintSpec::from_user(
            self.width.unwrap_or(system.width),
            self.height.unwrap_or(system.height),
            self.print_delay_ms.unwrap_or(system.print_delay_ms),
            self.close_delay_ms.unwrap_or(system.close_delay_ms),
        )
    }

    /// Resolved spec. Call `SessionConfig::validate` first; invalid
    /// overrides fall back to the system `PrintSpec` here.
    pub fn to_spec(&self) -> PrintSpec {
        if !self.is_overridden() {
            return PrintSpec::default();
        }
        self.user_spec().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    #[serde(default = "default_long_ms")]
    pub success_ms: u64,
    #[serde(default = "default_long_ms")]
    pub warning_ms: u64,
    #[serde(default = "default_long_ms")]
    pub error_ms: u64,
    #[serde(default = "default_info_ms")]
    pub info_ms: u64,
    #[serde(default = "default_exit_ms")]
    pub exit_ms: u64,
}

fn default_long_ms() -> u64 { 5000 }
fn default_info_ms() -> u64 { 3000 }
fn default_exit_ms() -> u64 { 400 }

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            success_ms: default_long_ms(),
            warning_ms: default_long_ms(),
            error_ms: default_long_ms(),
            info_ms: default_info_ms(),
            exit_ms: default_exit_ms(),
        }
    }
}

impl SessionConfig {
    /// Loads configuration from a JSON file.
    ///
    /// - A missing file yields `SessionConfig::default()`.
    /// - A present file is parsed and validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: SessionConfig = serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "capture.timeoutMs must be greater than zero".to_string(),
            });
        }
        if self.capture.scale == 0 || self.capture.scale > 8 {
            return Err(ConfigError::ValidationError {
                message: "capture.scale must be between 1 and 8".to_string(),
            });
        }
        let n = &self.notifications;
        if [n.success_ms, n.warning_ms, n.error_ms, n.info_ms].contains(&0) {
            return Err(ConfigError::ValidationError {
                message: "notification durations must be greater than zero".to_string(),
            });
        }
        if self.print.is_overridden() {
            self.print.user_spec().map_err(|m| ConfigError::ValidationError {
                message: m.to_string(),
            })?;
        }
        Ok(())
    }
}
