//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Countdown alert preferences
//! - The quick-start routine template
//! - Session display options
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::routine::{BreathingSpeed, Round, Routine};
use crate::session::AlertTier;

/// Countdown alert configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Alerts at 30 and 15 seconds left.
    #[serde(default = "default_true")]
    pub early_warning: bool,
    /// Alerts during the last five seconds.
    #[serde(default = "default_true")]
    pub final_countdown: bool,
    /// Ring the terminal bell in the CLI.
    #[serde(default = "default_true")]
    pub bell: bool,
}

/// Template for the quick-start session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickStartConfig {
    #[serde(default = "default_quick_rounds")]
    pub rounds: u32,
    #[serde(default = "default_quick_breaths")]
    pub breath_count: u32,
    #[serde(default = "default_quick_speed")]
    pub breath_speed: BreathingSpeed,
    #[serde(default = "default_quick_exhale")]
    pub exhale_hold_secs: u32,
    #[serde(default = "default_quick_inhale")]
    pub inhale_hold_secs: u32,
}

/// Session display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Print a line for every breath, not only phase changes.
    #[serde(default = "default_true")]
    pub show_breath_ticks: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub quick_start: QuickStartConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_quick_rounds() -> u32 {
    3
}
fn default_quick_breaths() -> u32 {
    30
}
fn default_quick_speed() -> BreathingSpeed {
    BreathingSpeed::Medium
}
fn default_quick_exhale() -> u32 {
    60
}
fn default_quick_inhale() -> u32 {
    15
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            early_warning: true,
            final_countdown: true,
            bell: true,
        }
    }
}

impl Default for QuickStartConfig {
    fn default() -> Self {
        Self {
            rounds: default_quick_rounds(),
            breath_count: default_quick_breaths(),
            breath_speed: default_quick_speed(),
            exhale_hold_secs: default_quick_exhale(),
            inhale_hold_secs: default_quick_inhale(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            show_breath_ticks: true,
        }
    }
}

impl NotificationsConfig {
    /// Whether an alert of `tier` should reach the user.
    pub fn allows(&self, tier: AlertTier) -> bool {
        self.enabled
            && match tier {
                AlertTier::Early => self.early_warning,
                AlertTier::Final => self.final_countdown,
            }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, writing defaults if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let save_err = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_err(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_err(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the field.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Build the quick-start routine from the template.
    pub fn quick_start_routine(&self) -> Routine {
        let q = &self.quick_start;
        let rounds = (0..q.rounds)
            .map(|_| {
                Round::new(
                    q.breath_count,
                    q.breath_speed,
                    q.exhale_hold_secs,
                    q.inhale_hold_secs,
                )
            })
            .collect();
        Routine::custom("quick-start", "Quick Start", rounds)
            .with_description("Built from the quick_start configuration")
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
