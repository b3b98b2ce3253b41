//! Telemetry synchronization and threshold alerting for the garden dashboard.

pub mod alert_engine;
pub mod channels;
pub mod config;
pub mod error;
pub mod history;
pub mod net;
pub mod notify;
pub mod poller;
pub mod settings;
pub mod threshold;
pub mod types;
pub mod view;

pub use alert_engine::{AlertEngine, AlertState, AlertTransition};
pub use channels::{AlertChannelRegistry, Channel};
pub use config::Config;
pub use error::{Result, TelemetryError};
pub use history::HistoryBuffer;
pub use net::{HttpSource, TelemetrySource};
pub use notify::{FeedAlertChannel, LogNotifier, Notification, Notifier, Trigger};
pub use poller::{DashboardState, PollerConfig, PollerHandle, TelemetryPoller};
pub use settings::{AlertSettings, SettingsHandle};
pub use threshold::{AlertDirection, Evaluation, ThresholdConfig};
pub use types::{FeedAlert, HistoryWindow, Metric, MetricValue, Reading, ReadingTime};
