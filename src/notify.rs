//! User-visible notifications and the feed alert channel.

use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::channels::Channel;
use crate::types::FeedAlert;

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationSource {
    Threshold(Channel),
    Feed { kind: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub source: NotificationSource,
    pub message: String,
}

/// The pop-up side effect. Called exactly once per notification.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Surfaces notifications as warn-level log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        match &notification.source {
            NotificationSource::Threshold(channel) => {
                warn!(channel = %channel, metric = %channel.metric, "ALERT: {}", notification.message)
            }
            NotificationSource::Feed { kind } => {
                warn!(kind = %kind, "ALERT: {}", notification.message)
            }
        }
    }
}

/// When a persisting condition is announced again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trigger {
    /// Once on entry; silent while it persists.
    Edge,
    /// On every observation.
    #[default]
    Level,
}

impl FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edge" => Ok(Trigger::Edge),
            "level" => Ok(Trigger::Level),
            other => Err(format!("unknown trigger policy {:?}", other)),
        }
    }
}

/// Turns `/alerts` responses into notifications according to a [`Trigger`].
#[derive(Debug)]
pub struct FeedAlertChannel {
    trigger: Trigger,
    last_seen: HashSet<FeedAlert>,
}

impl FeedAlertChannel {
    pub fn new(trigger: Trigger) -> Self {
        FeedAlertChannel {
            trigger,
            last_seen: HashSet::new(),
        }
    }

    /// Returns the notifications this response produces and remembers it
    /// as the previous response.
    pub fn process(&mut self, alerts: Vec<FeedAlert>) -> Vec<Notification> {
        let fresh: Vec<Notification> = alerts
            .iter()
            .filter(|alert| self.trigger == Trigger::Level || !self.last_seen.contains(*alert))
            .map(|alert| Notification {
                source: NotificationSource::Feed {
                    kind: alert.kind.clone(),
                },
                message: alert.message.clone(),
            })
            .collect();
        debug!(
            received = alerts.len(),
            notifying = fresh.len(),
            trigger = ?self.trigger,
            "Processed alert feed"
        );
        self.last_seen = alerts.into_iter().collect();
        fresh
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Keeps every notification for later inspection.
    #[derive(Debug, Default, Clone)]
    pub struct RecordingNotifier {
        seen: Arc<Mutex<Vec<Notification>>>,
    }

    impl RecordingNotifier {
        pub fn notifications(&self) -> Vec<Notification> {
            self.seen.lock().unwrap().clone()
        }

        pub fn messages(&self) -> Vec<String> {
            self.notifications().into_iter().map(|n| n.message).collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: &Notification) {
            self.seen.lock().unwrap().push(notification.clone());
        }
    }
}
