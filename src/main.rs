use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use garden_telemetry::view::{summary_cards, TrendSeries};
use garden_telemetry::{
    AlertSettings, Config, HttpSource, LogNotifier, PollerConfig, SettingsHandle, TelemetryPoller,
    TelemetrySource,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = match Config::load_from_file()? {
        Some(config) => config,
        None => Config::from_env()?,
    };
    tracing::info!(?config, "Dashboard starting");
    let tz = config.time_zone()?;

    let source = Arc::new(HttpSource::new(&config)?);

    let settings = match source.fetch_thresholds().await.map(AlertSettings::try_from) {
        Ok(Ok(settings)) => {
            tracing::info!("Loaded thresholds from backend");
            settings
        }
        Ok(Err(e)) | Err(e) => {
            tracing::warn!(error = %e, "Using default thresholds");
            AlertSettings::default()
        }
    };
    let settings = SettingsHandle::new(settings);

    let poller = TelemetryPoller::new(
        source,
        Arc::new(LogNotifier),
        settings.subscribe(),
        PollerConfig::try_from(&config)?,
    );
    let handle = poller.start();
    let mut state = handle.state();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                let cards: Vec<String> = summary_cards(&snapshot.latest)
                    .into_iter()
                    .map(|card| format!("{}: {}", card.label, card.value))
                    .collect();
                let trend = TrendSeries::from_history(&snapshot.history, tz);
                tracing::info!(
                    last_updated = %snapshot.latest.display_time(tz),
                    history_points = trend.labels.len(),
                    "{}",
                    cards.join(" | ")
                );
            }
        }
    }

    tracing::info!("Shutting down");
    handle.stop().await;
    Ok(())
}
