//! Threshold alerting.
//!
//! Each (metric, direction) channel is either inactive or active. A channel
//! fires when its metric leaves the band in that direction and clears
//! silently once the metric is back in band or the channel is switched off.
//! While the breach persists it stays silent under [`Trigger::Edge`] and
//! notifies again on every evaluation under [`Trigger::Level`]. An
//! unavailable value leaves every channel of that metric untouched.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::channels::Channel;
use crate::notify::{Notification, NotificationSource, Notifier, Trigger};
use crate::settings::AlertSettings;
use crate::threshold::{self, AlertDirection, Evaluation, ThresholdConfig};
use crate::types::{Metric, Reading};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertState {
    #[default]
    Inactive,
    Active,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertTransition {
    Fired {
        channel: Channel,
        value: f64,
        message: String,
    },
    Cleared {
        channel: Channel,
    },
}

pub struct AlertEngine {
    states: HashMap<Channel, AlertState>,
    notifier: Arc<dyn Notifier>,
    trigger: Trigger,
}

impl AlertEngine {
    pub fn new(notifier: Arc<dyn Notifier>, trigger: Trigger) -> Self {
        AlertEngine {
            states: HashMap::new(),
            notifier,
            trigger,
        }
    }

    pub fn state(&self, channel: &Channel) -> AlertState {
        self.states.get(channel).copied().unwrap_or_default()
    }

    pub fn active_channels(&self) -> impl Iterator<Item = &Channel> {
        self.states
            .iter()
            .filter(|(_, state)| **state == AlertState::Active)
            .map(|(channel, _)| channel)
    }

    /// Evaluates `reading` against every configured band and notifies once
    /// per fired transition, in the order returned.
    pub fn evaluate(&mut self, reading: &Reading, settings: &AlertSettings) -> Vec<AlertTransition> {
        let mut transitions = Vec::new();
        if reading.is_placeholder() {
            return transitions;
        }

        for (metric, _) in settings.thresholds() {
            let Some(config) = settings.effective(metric) else {
                continue;
            };
            let value = reading.value(metric);
            match threshold::evaluate(value, &config) {
                Evaluation::Unavailable => {
                    debug!(%metric, "Value unavailable, alert state kept");
                }
                Evaluation::InBand => {
                    for direction in [AlertDirection::Below, AlertDirection::Above] {
                        self.clear(Channel::new(metric.clone(), direction), &mut transitions);
                    }
                }
                Evaluation::OutOfBand(direction) => {
                    // A flip to the opposite side clears before it fires.
                    self.clear(Channel::new(metric.clone(), direction.opposite()), &mut transitions);
                    if let Some(v) = value.as_f64() {
                        self.fire(Channel::new(metric.clone(), direction), v, &config, &mut transitions);
                    }
                }
            }
        }
        transitions
    }

    fn clear(&mut self, channel: Channel, transitions: &mut Vec<AlertTransition>) {
        if self.state(&channel) == AlertState::Active {
            info!(channel = %channel, "Alert cleared");
            self.states.insert(channel.clone(), AlertState::Inactive);
            transitions.push(AlertTransition::Cleared { channel });
        }
    }

    fn fire(
        &mut self,
        channel: Channel,
        value: f64,
        config: &ThresholdConfig,
        transitions: &mut Vec<AlertTransition>,
    ) {
        if self.state(&channel) == AlertState::Active && self.trigger == Trigger::Edge {
            return;
        }
        let message = alert_message(&channel.metric, channel.direction, value, config);
        info!(channel = %channel, value, "Alert fired");
        self.states.insert(channel.clone(), AlertState::Active);
        self.notifier.notify(&Notification {
            source: NotificationSource::Threshold(channel.clone()),
            message: message.clone(),
        });
        transitions.push(AlertTransition::Fired {
            channel,
            value,
            message,
        });
    }
}

fn alert_message(metric: &Metric, direction: AlertDirection, value: f64, config: &ThresholdConfig) -> String {
    let channel = Channel::new(metric.clone(), direction);
    let bound = config.bound(direction);
    match direction {
        AlertDirection::Below => format!(
            "{} too low ({}): {}{} is below min {}",
            metric.label(),
            channel,
            value,
            metric.unit(),
            bound
        ),
        AlertDirection::Above => format!(
            "{} too high ({}): {}{} exceeds max {}",
            metric.label(),
            channel,
            value,
            metric.unit(),
            bound
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingNotifier;
    use crate::types::MetricValue;
    use chrono::NaiveDate;

    fn reading(metric: Metric, value: f64) -> Reading {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        Reading::new(ts, [(metric, MetricValue::Value(value))])
    }

    fn temp_only(config: ThresholdConfig) -> AlertSettings {
        AlertSettings::new([(Metric::Temp, config)]).unwrap()
    }

    fn engine() -> (AlertEngine, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        (AlertEngine::new(Arc::new(notifier.clone()), Trigger::Edge), notifier)
    }

    fn heat() -> Channel {
        Channel::new(Metric::Temp, AlertDirection::Above)
    }

    #[test]
    fn fires_once_while_breach_persists() {
        let (mut engine, notifier) = engine();
        let settings = temp_only(ThresholdConfig::new(10.0, 35.0));

        let first = engine.evaluate(&reading(Metric::Temp, 40.0), &settings);
        assert!(matches!(&first[..], [AlertTransition::Fired { value, .. }] if *value == 40.0));
        assert!(engine.evaluate(&reading(Metric::Temp, 40.0), &settings).is_empty());
        assert!(engine.evaluate(&reading(Metric::Temp, 41.0), &settings).is_empty());

        assert_eq!(
            notifier.messages(),
            vec!["Temperature too high (heat): 40 °C exceeds max 35".to_string()]
        );
        assert_eq!(engine.state(&heat()), AlertState::Active);
    }

    #[test]
    fn level_trigger_renotifies_while_breach_persists() {
        let notifier = RecordingNotifier::default();
        let mut engine = AlertEngine::new(Arc::new(notifier.clone()), Trigger::Level);
        let settings = temp_only(ThresholdConfig::new(10.0, 35.0));

        for _ in 0..3 {
            let out = engine.evaluate(&reading(Metric::Temp, 40.0), &settings);
            assert!(matches!(&out[..], [AlertTransition::Fired { .. }]));
        }
        assert_eq!(notifier.notifications().len(), 3);

        let cleared = engine.evaluate(&reading(Metric::Temp, 20.0), &settings);
        assert_eq!(cleared, vec![AlertTransition::Cleared { channel: heat() }]);
        assert!(engine.evaluate(&reading(Metric::Temp, 20.0), &settings).is_empty());
        assert_eq!(notifier.notifications().len(), 3);
    }

    #[test]
    fn clears_silently_then_refires() {
        let (mut engine, notifier) = engine();
        let settings = temp_only(ThresholdConfig::new(10.0, 35.0));

        engine.evaluate(&reading(Metric::Temp, 40.0), &settings);
        let cleared = engine.evaluate(&reading(Metric::Temp, 20.0), &settings);
        assert_eq!(cleared, vec![AlertTransition::Cleared { channel: heat() }]);
        assert!(engine.evaluate(&reading(Metric::Temp, 20.0), &settings).is_empty());
        assert_eq!(notifier.notifications().len(), 1);

        engine.evaluate(&reading(Metric::Temp, 36.0), &settings);
        assert_eq!(notifier.notifications().len(), 2);
    }

    #[test]
    fn unavailable_value_keeps_state() {
        let (mut engine, notifier) = engine();
        let settings = temp_only(ThresholdConfig::new(10.0, 35.0));

        engine.evaluate(&reading(Metric::Temp, 40.0), &settings);
        let gap = reading(Metric::Humidity, 50.0);
        assert!(engine.evaluate(&gap, &settings).is_empty());
        assert!(engine.evaluate(&Reading::placeholder(), &settings).is_empty());
        assert_eq!(engine.state(&heat()), AlertState::Active);

        engine.evaluate(&reading(Metric::Temp, 40.0), &settings);
        assert_eq!(notifier.notifications().len(), 1);
    }

    #[test]
    fn disabling_active_channel_clears_and_reenabling_refires() {
        let (mut engine, notifier) = engine();
        let mut settings = temp_only(ThresholdConfig::new(10.0, 35.0));
        let hot = reading(Metric::Temp, 40.0);

        engine.evaluate(&hot, &settings);
        settings.channels.set_enabled(&Metric::Temp, AlertDirection::Above, false);
        assert_eq!(
            engine.evaluate(&hot, &settings),
            vec![AlertTransition::Cleared { channel: heat() }]
        );
        assert_eq!(notifier.notifications().len(), 1);

        settings.channels.set_enabled(&Metric::Temp, AlertDirection::Above, true);
        let refired = engine.evaluate(&hot, &settings);
        assert!(matches!(&refired[..], [AlertTransition::Fired { .. }]));
        assert_eq!(notifier.notifications().len(), 2);
    }

    #[test]
    fn direction_flip_clears_then_fires() {
        let (mut engine, notifier) = engine();
        let mut settings = temp_only(ThresholdConfig::new(10.0, 35.0));

        engine.evaluate(&reading(Metric::Temp, 5.0), &settings);
        settings.insert_unchecked(Metric::Temp, ThresholdConfig::new(0.0, 2.0));
        let flipped = engine.evaluate(&reading(Metric::Temp, 5.0), &settings);

        let cold = Channel::new(Metric::Temp, AlertDirection::Below);
        assert_eq!(flipped.len(), 2);
        assert_eq!(flipped[0], AlertTransition::Cleared { channel: cold.clone() });
        assert!(matches!(&flipped[1], AlertTransition::Fired { channel, .. } if *channel == heat()));
        assert_eq!(engine.state(&cold), AlertState::Inactive);
        assert_eq!(notifier.notifications().len(), 2);
    }

    #[test]
    fn degenerate_band_does_not_break_evaluation() {
        let (mut engine, notifier) = engine();
        let mut settings = temp_only(ThresholdConfig::new(10.0, 35.0));
        settings.insert_unchecked(Metric::Temp, ThresholdConfig::new(30.0, 10.0));

        let out = engine.evaluate(&reading(Metric::Temp, 20.0), &settings);
        assert!(matches!(
            &out[..],
            [AlertTransition::Fired { channel, .. }] if channel.direction == AlertDirection::Below
        ));
        assert_eq!(notifier.notifications().len(), 1);
    }

    #[test]
    fn metrics_without_a_band_are_ignored() {
        let (mut engine, notifier) = engine();
        let settings = temp_only(ThresholdConfig::new(10.0, 35.0));
        assert!(engine.evaluate(&reading(Metric::Light, 1e6), &settings).is_empty());
        assert_eq!(engine.active_channels().count(), 0);
        assert!(notifier.notifications().is_empty());
    }
}
