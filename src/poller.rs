//! The polling loop behind the dashboard.
//!
//! Two cadences share one task: telemetry refresh (latest reading plus
//! history window) and alert-feed refresh. Both are driven from a single
//! `tokio::select!`, so their handlers never overlap. Every fetch is raced
//! against the poller's [`CancellationToken`]; once stopped, no fetch result
//! is applied and no notification is raised.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alert_engine::{AlertEngine, AlertTransition};
use crate::config::Config;
use crate::history::HistoryBuffer;
use crate::net::TelemetrySource;
use crate::notify::{FeedAlertChannel, Notifier, Trigger};
use crate::settings::AlertSettings;
use crate::types::Reading;

/// What the dashboard renders. Published whole, once per tick.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub latest: Reading,
    pub history: Arc<[Reading]>,
    /// Client clock at the last tick that applied anything.
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for DashboardState {
    fn default() -> Self {
        DashboardState {
            latest: Reading::placeholder(),
            history: Arc::from(Vec::new()),
            last_updated: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub telemetry_interval: Duration,
    pub alert_interval: Duration,
    pub threshold_trigger: Trigger,
    pub feed_trigger: Trigger,
}

impl PollerConfig {
    /// Replaces zero intervals with the defaults; a zero period would
    /// stop the loop for good.
    pub fn sanitized(self) -> Self {
        let defaults = PollerConfig::default();
        let fix = |interval: Duration, fallback: Duration, cadence: &str| {
            if interval.is_zero() {
                warn!(cadence, fallback_secs = fallback.as_secs(), "Zero polling interval, using default");
                fallback
            } else {
                interval
            }
        };
        PollerConfig {
            telemetry_interval: fix(self.telemetry_interval, defaults.telemetry_interval, "telemetry"),
            alert_interval: fix(self.alert_interval, defaults.alert_interval, "alerts"),
            ..self
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            telemetry_interval: Duration::from_secs(5),
            alert_interval: Duration::from_secs(10),
            threshold_trigger: Trigger::Edge,
            feed_trigger: Trigger::Level,
        }
    }
}

impl TryFrom<&Config> for PollerConfig {
    type Error = anyhow::Error;

    fn try_from(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(PollerConfig {
            telemetry_interval: Duration::from_secs(config.telemetry_interval_secs),
            alert_interval: Duration::from_secs(config.alert_interval_secs),
            threshold_trigger: config.threshold_trigger()?,
            feed_trigger: config.trigger()?,
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub latest_updated: bool,
    pub history_updated: bool,
    pub transitions: Vec<AlertTransition>,
    pub notifications: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Applied(TickReport),
    /// The poller was stopped before the fetch finished; nothing was applied.
    Cancelled,
}

pub struct TelemetryPoller {
    source: Arc<dyn TelemetrySource>,
    notifier: Arc<dyn Notifier>,
    history: HistoryBuffer,
    engine: AlertEngine,
    feed: FeedAlertChannel,
    settings: watch::Receiver<AlertSettings>,
    state: watch::Sender<DashboardState>,
    cancel: CancellationToken,
    config: PollerConfig,
}

impl TelemetryPoller {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        notifier: Arc<dyn Notifier>,
        settings: watch::Receiver<AlertSettings>,
        config: PollerConfig,
    ) -> Self {
        let config = config.sanitized();
        let (state, _) = watch::channel(DashboardState::default());
        TelemetryPoller {
            source,
            engine: AlertEngine::new(Arc::clone(&notifier), config.threshold_trigger),
            notifier,
            history: HistoryBuffer::new(),
            feed: FeedAlertChannel::new(config.feed_trigger),
            settings,
            state,
            cancel: CancellationToken::new(),
            config,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    /// Spawns the polling loop. The poller cannot be restarted once its
    /// handle is stopped.
    pub fn start(self) -> PollerHandle {
        let cancel = self.cancel.clone();
        let state = self.subscribe();
        let task = tokio::spawn(self.run());
        PollerHandle {
            cancel,
            state,
            task,
        }
    }

    async fn run(mut self) {
        let cancel = self.cancel.clone();
        let mut telemetry = time::interval(self.config.telemetry_interval);
        telemetry.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut alerts = time::interval(self.config.alert_interval);
        alerts.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            telemetry_interval_secs = self.config.telemetry_interval.as_secs(),
            alert_interval_secs = self.config.alert_interval.as_secs(),
            "Telemetry poller started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = telemetry.tick() => {
                    self.poll_telemetry().await;
                }
                _ = alerts.tick() => {
                    self.poll_alerts().await;
                }
            }
        }
        info!("Telemetry poller stopped");
    }

    /// One telemetry refresh: fetch latest and history together, evaluate
    /// alerts on a fresh reading, then publish the combined state.
    pub async fn poll_telemetry(&mut self) -> TickOutcome {
        let source = Arc::clone(&self.source);
        let fetch = async { tokio::join!(source.fetch_latest(), source.fetch_history()) };
        let (latest, history) = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return TickOutcome::Cancelled,
            fetched = fetch => fetched,
        };
        if self.cancel.is_cancelled() {
            return TickOutcome::Cancelled;
        }

        let mut report = TickReport::default();
        let mut new_latest = None;
        match latest {
            Ok(reading) if reading.is_placeholder() => {
                debug!("Source has no reading yet, keeping last snapshot");
            }
            Ok(reading) => {
                let settings = self.settings.borrow().clone();
                report.transitions = self.engine.evaluate(&reading, &settings);
                report.notifications = report
                    .transitions
                    .iter()
                    .filter(|t| matches!(t, AlertTransition::Fired { .. }))
                    .count();
                report.latest_updated = true;
                new_latest = Some(reading);
            }
            Err(e) => {
                report.failures += 1;
                warn!(error = %e, "Failed to fetch latest reading, keeping last snapshot");
            }
        }
        match history {
            Ok(window) => {
                self.history.reconcile(window);
                report.history_updated = true;
            }
            Err(e) => {
                report.failures += 1;
                warn!(error = %e, "Failed to fetch history, keeping last snapshot");
            }
        }

        if report.latest_updated || report.history_updated {
            let history = report.history_updated.then(|| self.history.snapshot());
            let now = Utc::now();
            self.state.send_modify(|state| {
                state.last_updated = Some(now);
                if let Some(reading) = new_latest {
                    state.latest = reading;
                }
                if let Some(history) = history {
                    state.history = history;
                }
            });
            debug!(
                latest = report.latest_updated,
                history_len = self.history.len(),
                transitions = report.transitions.len(),
                "Dashboard state published"
            );
        }
        TickOutcome::Applied(report)
    }

    /// One alert-feed refresh.
    pub async fn poll_alerts(&mut self) -> TickOutcome {
        let source = Arc::clone(&self.source);
        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return TickOutcome::Cancelled,
            fetched = source.fetch_alerts() => fetched,
        };
        if self.cancel.is_cancelled() {
            return TickOutcome::Cancelled;
        }

        let mut report = TickReport::default();
        match fetched {
            Ok(alerts) => {
                for notification in self.feed.process(alerts) {
                    self.notifier.notify(&notification);
                    report.notifications += 1;
                }
            }
            Err(e) => {
                report.failures += 1;
                warn!(error = %e, "Failed to fetch alert feed");
            }
        }
        TickOutcome::Applied(report)
    }
}

/// Running poller. Dropping the handle leaves the task running; call
/// [`PollerHandle::stop`] for teardown.
pub struct PollerHandle {
    cancel: CancellationToken,
    state: watch::Receiver<DashboardState>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn state(&self) -> watch::Receiver<DashboardState> {
        self.state.clone()
    }

    /// Cancels the loop and waits for it to exit. Once this returns no
    /// further state change or notification can happen.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Telemetry poller task ended abnormally");
        }
    }
}
