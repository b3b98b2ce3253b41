use thiserror::Error;

use crate::types::Metric;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The request was rejected, timed out or returned an error status.
    #[error("network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    /// The body was not JSON or lacked an expected field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid threshold for {metric}: min {min} > max {max}")]
    ConfigInvalid { metric: Metric, min: f64, max: f64 },
}

impl From<serde_json::Error> for TelemetryError {
    fn from(e: serde_json::Error) -> Self {
        TelemetryError::MalformedResponse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
