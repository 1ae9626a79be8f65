//! Application settings loaded from a TOML file.
//!
//! Every key is optional; a missing file yields the defaults so the service
//! can start with nothing but a database URL.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_SETTINGS_PATH: &str = "config.toml";

/// Top-level settings file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Reminder scheduler settings
    pub reminders: ReminderSettings,
}

/// Settings for the hourly reminder job
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ReminderSettings {
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
    /// Path opened when the notification is clicked
    pub path: String,
    /// Per-subscription delivery timeout in seconds
    pub delivery_timeout_secs: u64,
    /// Seconds between scheduler runs
    pub check_interval_secs: u64,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            title: "Habit Reminder".to_string(),
            body: "Time to log your habits!".to_string(),
            path: "/".to_string(),
            delivery_timeout_secs: 10,
            check_interval_secs: 3600,
        }
    }
}

impl ReminderSettings {
    /// Delivery timeout as a `Duration`.
    #[must_use]
    pub const fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    /// Scheduler interval as a `Duration`.
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

/// Parses settings from TOML text and checks the numeric bounds.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse settings: {e}"),
    })?;

    if settings.reminders.delivery_timeout_secs == 0 {
        return Err(Error::Config {
            message: "reminders.delivery_timeout_secs must be greater than zero".to_string(),
        });
    }
    if settings.reminders.check_interval_secs == 0 {
        return Err(Error::Config {
            message: "reminders.check_interval_secs must be greater than zero".to_string(),
        });
    }

    Ok(settings)
}

/// Loads settings from `path`, falling back to defaults when the file is absent.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        info!("No settings file at {:?}, using defaults", path_ref);
        return Ok(Settings::default());
    }

    debug!("Loading settings from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read settings file {path_ref:?}: {e}"),
    })?;
    parse_settings(&contents)
}

/// Loads settings from `HABIT_WRAP_CONFIG`, or `./config.toml` when unset.
pub fn load_default_settings() -> Result<Settings> {
    let path =
        std::env::var("HABIT_WRAP_CONFIG").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
    load_settings(path)
}
