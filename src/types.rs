use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder the source (and the dashboard) uses before any data exists.
pub const NO_DATA: &str = "--";

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DISPLAY_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Metric {
    Soil,
    Temp,
    Humidity,
    Light,
    Pressure,
    Other(String),
}

impl Metric {
    pub const KNOWN: [Metric; 5] = [
        Metric::Soil,
        Metric::Temp,
        Metric::Humidity,
        Metric::Light,
        Metric::Pressure,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Metric::Soil => "soil",
            Metric::Temp => "temp",
            Metric::Humidity => "humidity",
            Metric::Light => "light",
            Metric::Pressure => "pressure",
            Metric::Other(name) => name,
        }
    }

    /// Human label used on summary cards and in notifications.
    pub fn label(&self) -> &str {
        match self {
            Metric::Soil => "Soil Moisture",
            Metric::Temp => "Temperature",
            Metric::Humidity => "Humidity",
            Metric::Light => "Light",
            Metric::Pressure => "Pressure",
            Metric::Other(name) => name,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Soil | Metric::Humidity => " %",
            Metric::Temp => " °C",
            Metric::Pressure => " hPa",
            Metric::Light | Metric::Other(_) => "",
        }
    }
}

impl From<&str> for Metric {
    fn from(name: &str) -> Self {
        match name {
            "soil" => Metric::Soil,
            "temp" => Metric::Temp,
            "humidity" => Metric::Humidity,
            "light" => Metric::Light,
            "pressure" => Metric::Pressure,
            other => Metric::Other(other.to_string()),
        }
    }
}

impl From<String> for Metric {
    fn from(name: String) -> Self {
        Metric::from(name.as_str())
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.as_str().to_string()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Value(f64),
    Unavailable,
}

impl MetricValue {
    pub fn as_f64(self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(v),
            MetricValue::Unavailable => None,
        }
    }
}

impl From<&Value> for MetricValue {
    fn from(value: &Value) -> Self {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(v) if v.is_finite() => MetricValue::Value(v),
            _ => MetricValue::Unavailable,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Value(v) => write!(f, "{}", v),
            MetricValue::Unavailable => f.write_str(NO_DATA),
        }
    }
}

/// Source-reported sample time. `Pending` sorts before every real instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadingTime {
    Pending,
    At(NaiveDateTime),
}

impl ReadingTime {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw == NO_DATA {
            return Ok(ReadingTime::Pending);
        }
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(ReadingTime::At)
            .ok_or_else(|| format!("unparseable timestamp {:?}", raw))
    }

    /// Interprets the naive wire time as UTC and renders it in `tz`.
    pub fn display(&self, tz: Tz) -> String {
        match self {
            ReadingTime::Pending => NO_DATA.to_string(),
            ReadingTime::At(naive) => Utc
                .from_utc_datetime(naive)
                .with_timezone(&tz)
                .format(DISPLAY_FORMAT)
                .to_string(),
        }
    }
}

/// One telemetry sample.
///
/// A pending reading never carries metric values, whatever the wire body held.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Reading {
    timestamp: ReadingTime,
    metrics: BTreeMap<Metric, MetricValue>,
}

impl Reading {
    pub fn placeholder() -> Self {
        Reading {
            timestamp: ReadingTime::Pending,
            metrics: BTreeMap::new(),
        }
    }

    pub fn new(timestamp: NaiveDateTime, metrics: impl IntoIterator<Item = (Metric, MetricValue)>) -> Self {
        Reading {
            timestamp: ReadingTime::At(timestamp),
            metrics: metrics.into_iter().collect(),
        }
    }

    pub fn timestamp(&self) -> ReadingTime {
        self.timestamp
    }

    pub fn is_placeholder(&self) -> bool {
        self.timestamp == ReadingTime::Pending
    }

    pub fn value(&self, metric: &Metric) -> MetricValue {
        self.metrics
            .get(metric)
            .copied()
            .unwrap_or(MetricValue::Unavailable)
    }

    pub fn metrics(&self) -> impl Iterator<Item = (&Metric, &MetricValue)> {
        self.metrics.iter()
    }

    pub fn display_time(&self, tz: Tz) -> String {
        self.timestamp.display(tz)
    }
}

impl Default for Reading {
    fn default() -> Self {
        Reading::placeholder()
    }
}

impl TryFrom<Map<String, Value>> for Reading {
    type Error = String;

    fn try_from(mut body: Map<String, Value>) -> Result<Self, Self::Error> {
        let timestamp = match body.remove("timestamp") {
            Some(Value::String(raw)) => ReadingTime::parse(&raw)?,
            Some(other) => return Err(format!("timestamp is not a string: {}", other)),
            None => {
                return Err(match body.get("error") {
                    Some(reason) => format!("missing timestamp (source says {})", reason),
                    None => "missing timestamp".to_string(),
                })
            }
        };
        if timestamp == ReadingTime::Pending {
            return Ok(Reading::placeholder());
        }

        let metrics = body
            .iter()
            .filter(|(key, _)| key.as_str() != "error")
            .map(|(key, value)| (Metric::from(key.as_str()), MetricValue::from(value)))
            .collect();
        Ok(Reading { timestamp, metrics })
    }
}

/// Readings exactly as one history fetch delivered them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct HistoryWindow(pub Vec<Reading>);

/// One element of the `/alerts` feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedAlert {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Body of `/notification-settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteThresholds {
    pub min_temp: f64,
    pub max_temp: f64,
    pub min_humid: f64,
    pub max_humid: f64,
    pub min_press: f64,
    pub max_press: f64,
}
