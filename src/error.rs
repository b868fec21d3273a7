// Domain errors for the SPC core

use thiserror::Error;

use crate::models::MetricKey;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpcError {
    #[error("insufficient data for baseline: need at least {needed} values, got {got}")]
    InsufficientData { needed: usize, got: usize },
    #[error("out-of-order sample for {key}: timestamp {timestamp} <= last accepted {last}")]
    OutOfOrderSample {
        key: MetricKey,
        timestamp: u64,
        last: u64,
    },
    #[error("invalid sample value for {key}: {value}")]
    InvalidSample { key: MetricKey, value: f64 },
    #[error("unknown stream {0}")]
    UnknownKey(MetricKey),
}

impl SpcError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "SPC_INSUFFICIENT_DATA",
            Self::OutOfOrderSample { .. } => "SPC_OUT_OF_ORDER",
            Self::InvalidSample { .. } => "SPC_INVALID_SAMPLE",
            Self::UnknownKey(_) => "SPC_UNKNOWN_KEY",
        }
    }
}
