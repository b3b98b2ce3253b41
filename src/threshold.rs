use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TelemetryError};
use crate::types::{Metric, MetricValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertDirection {
    Below,
    Above,
}

impl AlertDirection {
    pub fn opposite(self) -> Self {
        match self {
            AlertDirection::Below => AlertDirection::Above,
            AlertDirection::Above => AlertDirection::Below,
        }
    }
}

impl fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertDirection::Below => f.write_str("below"),
            AlertDirection::Above => f.write_str("above"),
        }
    }
}

/// Inclusive `[min, max]` band for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub min: f64,
    pub max: f64,
    pub below_enabled: bool,
    pub above_enabled: bool,
}

impl ThresholdConfig {
    pub fn new(min: f64, max: f64) -> Self {
        ThresholdConfig {
            min,
            max,
            below_enabled: true,
            above_enabled: true,
        }
    }

    pub fn validate(&self, metric: &Metric) -> Result<()> {
        // NaN bounds fail this comparison too.
        if self.min <= self.max {
            Ok(())
        } else {
            Err(TelemetryError::ConfigInvalid {
                metric: metric.clone(),
                min: self.min,
                max: self.max,
            })
        }
    }

    pub fn is_enabled(&self, direction: AlertDirection) -> bool {
        match direction {
            AlertDirection::Below => self.below_enabled,
            AlertDirection::Above => self.above_enabled,
        }
    }

    pub fn bound(&self, direction: AlertDirection) -> f64 {
        match direction {
            AlertDirection::Below => self.min,
            AlertDirection::Above => self.max,
        }
    }
}

/// Outcome of checking one value against its band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// No value to judge; alert state must stay as it is.
    Unavailable,
    /// Inside the band, or the breached direction is disabled.
    InBand,
    OutOfBand(AlertDirection),
}

impl Evaluation {
    pub fn direction(self) -> Option<AlertDirection> {
        match self {
            Evaluation::OutOfBand(direction) => Some(direction),
            _ => None,
        }
    }
}

/// `Below` wins when a degenerate band (min > max) makes both directions hold.
pub fn evaluate(value: MetricValue, config: &ThresholdConfig) -> Evaluation {
    let value = match value {
        MetricValue::Value(v) => v,
        MetricValue::Unavailable => return Evaluation::Unavailable,
    };
    if value < config.min && config.below_enabled {
        Evaluation::OutOfBand(AlertDirection::Below)
    } else if value > config.max && config.above_enabled {
        Evaluation::OutOfBand(AlertDirection::Above)
    } else {
        Evaluation::InBand
    }
}
