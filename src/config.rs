use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::notify::Trigger;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub latest_path: String,
    pub history_path: String,
    pub alerts_path: String,
    pub settings_path: String,
    pub telemetry_interval_secs: u64,
    pub alert_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub display_tz: String,
    pub threshold_alert_trigger: String,
    pub feed_alert_trigger: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend_url: "http://127.0.0.1:5000".to_string(),
            latest_path: "/latest".to_string(),
            history_path: "/history".to_string(),
            alerts_path: "/alerts".to_string(),
            settings_path: "/notification-settings".to_string(),
            telemetry_interval_secs: 5,
            alert_interval_secs: 10,
            request_timeout_secs: 4,
            display_tz: "Australia/Perth".to_string(),
            threshold_alert_trigger: "edge".to_string(),
            feed_alert_trigger: "level".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();
        let config = Config {
            backend_url: env::var("BACKEND_URL").unwrap_or(defaults.backend_url),
            latest_path: env::var("LATEST_PATH").unwrap_or(defaults.latest_path),
            history_path: env::var("HISTORY_PATH").unwrap_or(defaults.history_path),
            alerts_path: env::var("ALERTS_PATH").unwrap_or(defaults.alerts_path),
            settings_path: env::var("SETTINGS_PATH").unwrap_or(defaults.settings_path),
            telemetry_interval_secs: get_env_var_u64("TELEMETRY_INTERVAL_SECS", defaults.telemetry_interval_secs),
            alert_interval_secs: get_env_var_u64("ALERT_INTERVAL_SECS", defaults.alert_interval_secs),
            request_timeout_secs: get_env_var_u64("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            display_tz: env::var("DISPLAY_TZ").unwrap_or(defaults.display_tz),
            threshold_alert_trigger: env::var("THRESHOLD_ALERT_TRIGGER")
                .unwrap_or(defaults.threshold_alert_trigger),
            feed_alert_trigger: env::var("FEED_ALERT_TRIGGER").unwrap_or(defaults.feed_alert_trigger),
        };
        config.validate()?;
        Ok(config)
    }

    fn get_config_file_path() -> PathBuf {
        let config_dir = env::var("CONFIG_DIR").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(config_dir).join("dashboard_config.json")
    }

    /// Returns `Ok(None)` when no config file exists.
    pub fn load_from_file() -> Result<Option<Self>> {
        let config_file_path = Self::get_config_file_path();
        if !config_file_path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&config_file_path)
            .with_context(|| format!("reading {}", config_file_path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", config_file_path.display()))?;
        config.validate()?;
        Ok(Some(config))
    }

    pub fn validate(&self) -> Result<()> {
        if self.telemetry_interval_secs == 0 || self.alert_interval_secs == 0 {
            bail!("polling intervals must be at least one second");
        }
        if self.request_timeout_secs == 0 {
            bail!("request timeout must be at least one second");
        }
        self.time_zone()?;
        self.threshold_trigger()?;
        self.trigger()?;
        Ok(())
    }

    pub fn time_zone(&self) -> Result<Tz> {
        self.display_tz
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid DISPLAY_TZ {:?}: {}", self.display_tz, e))
    }

    /// Policy for the `/alerts` feed.
    pub fn trigger(&self) -> Result<Trigger> {
        self.feed_alert_trigger.parse::<Trigger>().map_err(|e| anyhow!(e))
    }

    /// Policy for threshold alerts raised by the alert engine.
    pub fn threshold_trigger(&self) -> Result<Trigger> {
        self.threshold_alert_trigger.parse::<Trigger>().map_err(|e| anyhow!(e))
    }
}

fn get_env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}
