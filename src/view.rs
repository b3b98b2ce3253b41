//! Display-ready projections of [`DashboardState`](crate::poller::DashboardState).

use chrono_tz::Tz;

use crate::types::{Metric, MetricValue, Reading};

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryCard {
    pub label: String,
    pub value: String,
}

/// Cards in display order; unavailable values render as `--`.
pub fn summary_cards(reading: &Reading) -> Vec<SummaryCard> {
    Metric::KNOWN
        .iter()
        .map(|metric| SummaryCard {
            label: metric.label().to_string(),
            value: format!("{}{}", reading.value(metric), metric.unit()),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub metric: Metric,
    pub points: Vec<Option<f64>>,
}

/// Chart data: one label per history reading plus aligned series.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSeries {
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

impl TrendSeries {
    pub const CHARTED: [Metric; 2] = [Metric::Temp, Metric::Humidity];

    pub fn from_history(history: &[Reading], tz: Tz) -> Self {
        let labels = history.iter().map(|r| r.display_time(tz)).collect();
        let series = Self::CHARTED
            .iter()
            .map(|metric| Series {
                metric: metric.clone(),
                points: history.iter().map(|r| r.value(metric).as_f64()).collect(),
            })
            .collect();
        TrendSeries { labels, series }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn cards_show_placeholders_before_first_fetch() {
        let cards = summary_cards(&Reading::placeholder());
        assert_eq!(cards.len(), 5);
        assert_eq!(cards[0].label, "Soil Moisture");
        assert_eq!(cards[0].value, "-- %");
        assert_eq!(cards[3].value, "--");
    }

    #[test]
    fn trend_aligns_labels_and_gaps() {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap();
        let history = vec![Reading::new(
            ts,
            [(Metric::Temp, MetricValue::Value(21.5)), (Metric::Humidity, MetricValue::Unavailable)],
        )];
        let trend = TrendSeries::from_history(&history, chrono_tz::Australia::Perth);

        assert_eq!(trend.labels, vec!["02/05/2024, 00:00:00".to_string()]);
        assert_eq!(trend.series[0].points, vec![Some(21.5)]);
        assert_eq!(trend.series[1].metric, Metric::Humidity);
        assert_eq!(trend.series[1].points, vec![None]);
    }
}
