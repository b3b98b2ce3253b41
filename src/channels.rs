use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::threshold::AlertDirection;
use crate::types::Metric;

/// One independently toggleable (metric, direction) alert.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Channel {
    pub metric: Metric,
    pub direction: AlertDirection,
}

impl Channel {
    pub fn new(metric: Metric, direction: AlertDirection) -> Self {
        Channel { metric, direction }
    }

    /// Name shown next to the toggle, e.g. "cold" or "high-pressure".
    pub fn name(&self) -> String {
        use AlertDirection::*;
        let name = match (&self.metric, self.direction) {
            (Metric::Temp, Below) => "cold",
            (Metric::Temp, Above) => "heat",
            (Metric::Humidity, Below) => "dry",
            (Metric::Humidity, Above) => "humid",
            (Metric::Pressure, Below) => "low-pressure",
            (Metric::Pressure, Above) => "high-pressure",
            (Metric::Soil, Below) => "dry-soil",
            (Metric::Soil, Above) => "wet-soil",
            (Metric::Light, Below) => "dark",
            (Metric::Light, Above) => "bright",
            (Metric::Other(name), Below) => return format!("low-{}", name),
            (Metric::Other(name), Above) => return format!("high-{}", name),
        };
        name.to_string()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Enabled state of every alert channel. Channels start enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertChannelRegistry {
    disabled: BTreeSet<Channel>,
}

impl AlertChannelRegistry {
    pub fn is_enabled(&self, metric: &Metric, direction: AlertDirection) -> bool {
        !self.disabled.contains(&Channel::new(metric.clone(), direction))
    }

    pub fn set_enabled(&mut self, metric: &Metric, direction: AlertDirection, enabled: bool) {
        let channel = Channel::new(metric.clone(), direction);
        if enabled {
            self.disabled.remove(&channel);
        } else {
            self.disabled.insert(channel);
        }
    }

    pub fn disabled(&self) -> impl Iterator<Item = &Channel> {
        self.disabled.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_default_to_enabled() {
        let registry = AlertChannelRegistry::default();
        assert!(registry.is_enabled(&Metric::Temp, AlertDirection::Above));
        assert!(registry.is_enabled(&Metric::Other("co2".into()), AlertDirection::Below));
    }

    #[test]
    fn toggling_is_per_direction() {
        let mut registry = AlertChannelRegistry::default();
        registry.set_enabled(&Metric::Humidity, AlertDirection::Below, false);
        assert!(!registry.is_enabled(&Metric::Humidity, AlertDirection::Below));
        assert!(registry.is_enabled(&Metric::Humidity, AlertDirection::Above));
        assert!(registry.is_enabled(&Metric::Temp, AlertDirection::Below));

        registry.set_enabled(&Metric::Humidity, AlertDirection::Below, true);
        assert!(registry.is_enabled(&Metric::Humidity, AlertDirection::Below));
        assert_eq!(registry.disabled().count(), 0);
    }

    #[test]
    fn channel_names() {
        assert_eq!(Channel::new(Metric::Temp, AlertDirection::Below).name(), "cold");
        assert_eq!(
            Channel::new(Metric::Pressure, AlertDirection::Above).to_string(),
            "high-pressure"
        );
    }
}
