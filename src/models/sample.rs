// Samples and the (machine, metric) stream key

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monitored metric; serializes to snake_case JSON (e.g. "io_wait").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Cpu,
    Ram,
    IoWait,
}

impl MetricName {
    pub const ALL: [MetricName; 3] = [MetricName::Cpu, MetricName::Ram, MetricName::IoWait];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Cpu => "cpu",
            MetricName::Ram => "ram",
            MetricName::IoWait => "io_wait",
        }
    }

    /// Parse from the stored/wire name (e.g. "cpu", "io_wait").
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cpu" => Some(MetricName::Cpu),
            "ram" => Some(MetricName::Ram),
            "io_wait" => Some(MetricName::IoWait),
            _ => None,
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One telemetry reading. Produced by a sample source, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub machine_id: String,
    pub metric_name: MetricName,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: u64, machine_id: impl Into<String>, metric_name: MetricName, value: f64) -> Self {
        Self {
            timestamp,
            machine_id: machine_id.into(),
            metric_name,
            value,
        }
    }

    pub fn key(&self) -> MetricKey {
        MetricKey::new(self.machine_id.clone(), self.metric_name)
    }
}

/// Identity of one evaluation stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricKey {
    pub machine_id: String,
    pub metric_name: MetricName,
}

impl MetricKey {
    pub fn new(machine_id: impl Into<String>, metric_name: MetricName) -> Self {
        Self {
            machine_id: machine_id.into(),
            metric_name,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.machine_id, self.metric_name)
    }
}
