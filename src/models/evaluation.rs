// Classification of one sample against the active baseline

use serde::{Deserialize, Serialize};

/// Which test matched. Exactly one per evaluated sample, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detection {
    /// Value at or above 100%.
    Saturation,
    /// Test 1: value outside [lcl_x, ucl_x].
    LimitViolation,
    /// Test mR: moving range above ucl_mr.
    ExcessiveVariability,
    /// Test 4: `length` consecutive points on one side of the center line.
    Run { length: usize },
    /// Test 7: 14 points alternating up and down.
    Oscillation,
    /// Test 8: 6 points strictly increasing or decreasing.
    Trend,
    /// Test 2: 2 of 3 points beyond 2 sigma on one side.
    ZoneA,
    /// Test 3: 4 of 5 points beyond 1 sigma on one side.
    ZoneB,
    InControl,
}

impl Detection {
    pub fn score(&self) -> f64 {
        match self {
            Detection::Saturation => 0.0,
            Detection::LimitViolation => 0.1,
            Detection::ExcessiveVariability => 0.2,
            Detection::Run { .. } | Detection::Oscillation | Detection::Trend => 0.4,
            Detection::ZoneA => 0.6,
            Detection::ZoneB => 0.7,
            Detection::InControl => 1.0,
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Detection::Saturation | Detection::LimitViolation | Detection::ExcessiveVariability
        )
    }

    /// Sustained shift: the baseline no longer describes the process.
    pub fn requires_recalc(&self) -> bool {
        matches!(
            self,
            Detection::Run { .. } | Detection::Oscillation | Detection::Trend
        )
    }

    pub fn test_name(&self) -> Option<&'static str> {
        match self {
            Detection::Saturation => Some("Saturation"),
            Detection::LimitViolation => Some("Test 1"),
            Detection::ExcessiveVariability => Some("Test mR"),
            Detection::Run { .. } => Some("Test 4"),
            Detection::Oscillation => Some("Test 7"),
            Detection::Trend => Some("Test 8"),
            Detection::ZoneA => Some("Test 2"),
            Detection::ZoneB => Some("Test 3"),
            Detection::InControl => None,
        }
    }

    pub fn status(&self) -> Status {
        if self.is_critical() {
            Status::Critical
        } else if self.requires_recalc() {
            Status::Shift
        } else if matches!(self, Detection::InControl) {
            Status::InControl
        } else {
            Status::Warning
        }
    }
}

/// Reported status of a sample; serializes to snake_case (e.g. "in_control").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    InControl,
    Warning,
    Shift,
    Critical,
    /// Stream is paused; the point is kept for the next baseline but not scored.
    Collecting,
    /// No baseline installed yet for the stream.
    Warmup,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub detection: Detection,
    pub status: Status,
    pub score: f64,
    pub is_critical: bool,
    pub test_name: Option<&'static str>,
    /// Negative indices from the end of the evaluated window; -1 is the current sample.
    pub involved_offsets: Vec<i32>,
    pub requires_recalc: bool,
}

impl EvaluationResult {
    pub fn new(detection: Detection, involved_offsets: Vec<i32>) -> Self {
        Self {
            detection,
            status: detection.status(),
            score: detection.score(),
            is_critical: detection.is_critical(),
            test_name: detection.test_name(),
            involved_offsets,
            requires_recalc: detection.requires_recalc(),
        }
    }
}

/// Offsets for the last `n` points of a window: [-n, ..., -1].
pub fn trailing_offsets(n: usize) -> Vec<i32> {
    (1..=n as i32).rev().map(|i| -i).collect()
}
