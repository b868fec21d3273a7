// Output records: per-sample evaluation, per-group composite, engine notifications

use serde::Serialize;

use super::{Baseline, MetricKey, MetricName, PauseState, Status};

/// One evaluated sample as exposed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub timestamp: u64,
    pub machine_id: String,
    pub metric_name: MetricName,
    pub value: f64,
    /// |value - previous accepted value|; absent for the first point of a stream.
    pub moving_range: Option<f64>,
    pub status: Status,
    /// Absent while the stream is collecting or warming up.
    pub score: Option<f64>,
    pub is_critical: bool,
    pub test_name: Option<&'static str>,
    pub involved_offsets: Vec<i32>,
    pub pause_state: PauseState,
}

/// All metrics of one machine at one timestamp plus the weighted P-Score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeRecord {
    pub timestamp: u64,
    pub machine_id: String,
    pub metrics: Vec<EvaluationRecord>,
    /// Absent when no metric in the group produced a score.
    pub p_score: Option<f64>,
}

/// Everything the monitor publishes on its broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MonitorEvent {
    Composite(CompositeRecord),
    /// Metric paused for recalculation after a shift detection.
    #[serde(rename_all = "camelCase")]
    Paused { key: MetricKey, timestamp: u64 },
    /// Metric baseline recalculated; the stream is live again.
    #[serde(rename_all = "camelCase")]
    Recalculated {
        key: MetricKey,
        timestamp: u64,
        baseline: Baseline,
    },
    /// Stream returned to live without recalculation.
    #[serde(rename_all = "camelCase")]
    Resumed { key: MetricKey, forced: bool },
}
