//! Settings surface: threshold bands plus channel toggles.
//!
//! The surface owns the values; the alert engine only ever reads the
//! current snapshot through a [`watch::Receiver`], so a toggle made between
//! two ticks is seen by the very next evaluation.

use std::collections::BTreeMap;
use tokio::sync::watch;
use tracing::info;

use crate::channels::AlertChannelRegistry;
use crate::error::Result;
use crate::threshold::{AlertDirection, ThresholdConfig};
use crate::types::{Metric, RemoteThresholds};

#[derive(Debug, Clone, PartialEq)]
pub struct AlertSettings {
    thresholds: BTreeMap<Metric, ThresholdConfig>,
    pub channels: AlertChannelRegistry,
}

impl AlertSettings {
    /// Builds settings from bands, rejecting any with `min > max`.
    pub fn new(thresholds: impl IntoIterator<Item = (Metric, ThresholdConfig)>) -> Result<Self> {
        let thresholds: BTreeMap<_, _> = thresholds.into_iter().collect();
        for (metric, config) in &thresholds {
            config.validate(metric)?;
        }
        Ok(AlertSettings {
            thresholds,
            channels: AlertChannelRegistry::default(),
        })
    }

    pub fn thresholds(&self) -> impl Iterator<Item = (&Metric, &ThresholdConfig)> {
        self.thresholds.iter()
    }

    pub fn threshold(&self, metric: &Metric) -> Option<&ThresholdConfig> {
        self.thresholds.get(metric)
    }

    /// The band for `metric` with each direction enabled only if both the
    /// band and its channel toggle allow it.
    pub fn effective(&self, metric: &Metric) -> Option<ThresholdConfig> {
        let config = self.thresholds.get(metric)?;
        Some(ThresholdConfig {
            below_enabled: config.below_enabled
                && self.channels.is_enabled(metric, AlertDirection::Below),
            above_enabled: config.above_enabled
                && self.channels.is_enabled(metric, AlertDirection::Above),
            ..*config
        })
    }

    /// Bypasses validation so tests can feed the engine a degenerate band.
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&mut self, metric: Metric, config: ThresholdConfig) {
        self.thresholds.insert(metric, config);
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        AlertSettings {
            thresholds: BTreeMap::from([
                (Metric::Soil, ThresholdConfig::new(20.0, 80.0)),
                (Metric::Temp, ThresholdConfig::new(10.0, 35.0)),
                (Metric::Humidity, ThresholdConfig::new(30.0, 80.0)),
                (Metric::Pressure, ThresholdConfig::new(980.0, 1030.0)),
            ]),
            channels: AlertChannelRegistry::default(),
        }
    }
}

impl TryFrom<RemoteThresholds> for AlertSettings {
    type Error = crate::error::TelemetryError;

    fn try_from(remote: RemoteThresholds) -> Result<Self> {
        AlertSettings::new([
            (Metric::Temp, ThresholdConfig::new(remote.min_temp, remote.max_temp)),
            (Metric::Humidity, ThresholdConfig::new(remote.min_humid, remote.max_humid)),
            (Metric::Pressure, ThresholdConfig::new(remote.min_press, remote.max_press)),
        ])
    }
}

/// Write side of the settings surface.
#[derive(Debug)]
pub struct SettingsHandle {
    tx: watch::Sender<AlertSettings>,
}

impl SettingsHandle {
    pub fn new(settings: AlertSettings) -> Self {
        let (tx, _rx) = watch::channel(settings);
        SettingsHandle { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<AlertSettings> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> AlertSettings {
        self.tx.borrow().clone()
    }

    pub fn set_threshold(&self, metric: Metric, config: ThresholdConfig) -> Result<()> {
        config.validate(&metric)?;
        info!(%metric, min = config.min, max = config.max, "Threshold updated");
        self.tx.send_modify(|settings| {
            settings.thresholds.insert(metric, config);
        });
        Ok(())
    }

    pub fn set_channel_enabled(&self, metric: &Metric, direction: AlertDirection, enabled: bool) {
        info!(%metric, %direction, enabled, "Alert channel toggled");
        self.tx.send_modify(|settings| {
            settings.channels.set_enabled(metric, direction, enabled);
        });
    }

    pub fn replace(&self, settings: AlertSettings) {
        self.tx.send_replace(settings);
    }
}
