use std::sync::Arc;
use tracing::debug;

use crate::types::{HistoryWindow, Reading};

/// The chronologically ascending readings behind the trend chart.
///
/// Every fetched window wholly replaces what was held before.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    readings: Arc<[Reading]>,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        HistoryBuffer {
            readings: Arc::from(Vec::new()),
        }
    }

    pub fn reconcile(&mut self, window: HistoryWindow) {
        let received = window.0.len();
        let readings = normalize(window);
        debug!(received, kept = readings.len(), "History window reconciled");
        self.readings = readings.into();
    }

    /// Shared read-only view of the held sequence.
    pub fn snapshot(&self) -> Arc<[Reading]> {
        Arc::clone(&self.readings)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        HistoryBuffer::new()
    }
}

/// Ascending by timestamp, one reading per timestamp, no placeholders.
/// Of readings sharing a timestamp, the last after ordering is kept.
fn normalize(window: HistoryWindow) -> Vec<Reading> {
    let mut readings: Vec<Reading> = window
        .0
        .into_iter()
        .filter(|r| !r.is_placeholder())
        .collect();

    let descending = matches!(
        (readings.first(), readings.last()),
        (Some(first), Some(last)) if first.timestamp() > last.timestamp()
    );
    if descending {
        readings.reverse();
    }
    // Stable sort: ties keep their relative order.
    readings.sort_by_key(|r| r.timestamp());

    let mut deduped: Vec<Reading> = Vec::with_capacity(readings.len());
    for reading in readings {
        match deduped.last_mut() {
            Some(prev) if prev.timestamp() == reading.timestamp() => *prev = reading,
            _ => deduped.push(reading),
        }
    }
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Metric, MetricValue, ReadingTime};
    use chrono::{NaiveDate, NaiveDateTime};

    fn t(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(6, minute, 0)
            .unwrap()
    }

    fn r(minute: u32, temp: f64) -> Reading {
        Reading::new(t(minute), [(Metric::Temp, MetricValue::Value(temp))])
    }

    fn minutes(buffer: &HistoryBuffer) -> Vec<ReadingTime> {
        buffer.snapshot().iter().map(|r| r.timestamp()).collect()
    }

    #[test]
    fn reverses_newest_first_window() {
        let mut buffer = HistoryBuffer::new();
        buffer.reconcile(HistoryWindow(vec![r(3, 3.0), r(2, 2.0), r(1, 1.0)]));
        assert_eq!(
            minutes(&buffer),
            vec![ReadingTime::At(t(1)), ReadingTime::At(t(2)), ReadingTime::At(t(3))]
        );
        assert_eq!(buffer.snapshot()[0].value(&Metric::Temp), MetricValue::Value(1.0));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let window = HistoryWindow(vec![r(3, 3.0), r(2, 2.0), r(1, 1.0)]);
        let mut buffer = HistoryBuffer::new();
        buffer.reconcile(window.clone());
        let first = buffer.snapshot();
        buffer.reconcile(window);
        assert_eq!(&*first, &*buffer.snapshot());
    }

    #[test]
    fn new_window_replaces_old() {
        let mut buffer = HistoryBuffer::new();
        buffer.reconcile(HistoryWindow(vec![r(2, 2.0), r(1, 1.0)]));
        let held = buffer.snapshot();
        buffer.reconcile(HistoryWindow(vec![r(5, 5.0), r(4, 4.0)]));

        assert_eq!(minutes(&buffer), vec![ReadingTime::At(t(4)), ReadingTime::At(t(5))]);
        // Earlier snapshots are unaffected.
        assert_eq!(held.len(), 2);
    }

    #[test]
    fn dedups_and_orders_unsorted_input() {
        let mut buffer = HistoryBuffer::new();
        buffer.reconcile(HistoryWindow(vec![
            r(2, 2.0),
            r(4, 4.0),
            Reading::placeholder(),
            r(1, 1.0),
            r(2, 2.5),
        ]));
        assert_eq!(
            minutes(&buffer),
            vec![ReadingTime::At(t(1)), ReadingTime::At(t(2)), ReadingTime::At(t(4))]
        );
        let snapshot = buffer.snapshot();
        assert_eq!(snapshot[1].value(&Metric::Temp), MetricValue::Value(2.5));
    }

    #[test]
    fn empty_window_empties_buffer() {
        let mut buffer = HistoryBuffer::new();
        buffer.reconcile(HistoryWindow(vec![r(1, 1.0)]));
        buffer.reconcile(HistoryWindow::default());
        assert!(buffer.is_empty());
    }
}
