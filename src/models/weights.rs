// Per-metric weights for the composite P-Score

use serde::{Deserialize, Serialize};

use super::MetricName;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub cpu: f64,
    pub ram: f64,
    pub io_wait: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            cpu: 0.40,
            ram: 0.35,
            io_wait: 0.25,
        }
    }
}

impl Weights {
    pub fn get(&self, metric: MetricName) -> f64 {
        match metric {
            MetricName::Cpu => self.cpu,
            MetricName::Ram => self.ram,
            MetricName::IoWait => self.io_wait,
        }
    }

    /// Every weight finite and within [0, 1].
    pub fn is_valid(&self) -> bool {
        MetricName::ALL
            .iter()
            .map(|m| self.get(*m))
            .all(|w| w.is_finite() && (0.0..=1.0).contains(&w))
    }
}
