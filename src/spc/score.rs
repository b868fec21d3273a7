// Weighted composite (P-Score) over per-metric scores

use crate::models::{MetricName, Weights};

/// Per-metric scores for one machine at one timestamp. A metric without a score
/// (collecting, warming up, or not sampled) is left out of the composite.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricScores {
    pub cpu: Option<f64>,
    pub ram: Option<f64>,
    pub io_wait: Option<f64>,
}

impl MetricScores {
    pub fn get(&self, metric: MetricName) -> Option<f64> {
        match metric {
            MetricName::Cpu => self.cpu,
            MetricName::Ram => self.ram,
            MetricName::IoWait => self.io_wait,
        }
    }

    pub fn set(&mut self, metric: MetricName, score: Option<f64>) {
        match metric {
            MetricName::Cpu => self.cpu = score,
            MetricName::Ram => self.ram = score,
            MetricName::IoWait => self.io_wait = score,
        }
    }

    fn present(&self) -> Vec<(MetricName, f64)> {
        MetricName::ALL
            .iter()
            .filter_map(|m| self.get(*m).map(|s| (*m, s)))
            .collect()
    }
}

/// Weighted mean over scored metrics with weight > 0; equal-weight mean when
/// weights are absent, invalid, or all zero for the scored metrics. Rounded to
/// 3 decimals. `None` when no metric has a score.
pub fn aggregate(scores: &MetricScores, weights: Option<&Weights>) -> Option<f64> {
    let present = scores.present();
    if present.is_empty() {
        return None;
    }

    if let Some(w) = weights {
        if w.is_valid() {
            let weighted: Vec<(f64, f64)> = present
                .iter()
                .map(|(m, s)| (*s, w.get(*m)))
                .filter(|(_, weight)| *weight > 0.0)
                .collect();
            let total_weight: f64 = weighted.iter().map(|(_, weight)| weight).sum();
            if total_weight > 0.0 {
                let sum: f64 = weighted.iter().map(|(s, weight)| s * weight).sum();
                return Some(round3(sum / total_weight));
            }
        } else {
            tracing::warn!(
                operation = "aggregate",
                cpu = w.cpu,
                ram = w.ram,
                io_wait = w.io_wait,
                "invalid weights; using equal weighting"
            );
        }
    }

    let mean = present.iter().map(|(_, s)| s).sum::<f64>() / (present.len() as f64);
    Some(round3(mean))
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
