// Per-stream state and the LIVE/PAUSED recalculation state machine.
//
// Every mutation of a stream's baseline, history and pause state goes through
// PauseRecalcStateMachine; the engine only locates the stream and holds its lock.

use crate::error::SpcError;
use crate::models::{Baseline, EvaluationRecord, EvaluationResult, PauseState, Sample, Status};

use super::baseline;
use super::history::{History, LONGEST_TEST_WINDOW};
use super::rules;

/// Points collected (the triggering point included) before a new baseline is derived.
pub const DEFAULT_RECALC_AFTER_POINTS: u32 = 20;

/// Everything the engine remembers about one (machine, metric) stream.
#[derive(Debug, Clone)]
pub struct StreamState {
    pub baseline: Option<Baseline>,
    pub history: History,
    pub pause: PauseState,
    pub last_timestamp: Option<u64>,
}

impl StreamState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            baseline: None,
            history: History::with_capacity(history_capacity),
            pause: PauseState::live(),
            last_timestamp: None,
        }
    }
}

/// State change caused by one accepted sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    /// LIVE -> PAUSED after a shift detection.
    Paused,
    /// Enough points collected; the caller should fetch a window and recalculate.
    RecalcDue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub record: EvaluationRecord,
    pub transition: Transition,
}

#[derive(Debug, Clone, Copy)]
pub struct PauseRecalcStateMachine {
    recalc_after_points: u32,
}

impl Default for PauseRecalcStateMachine {
    fn default() -> Self {
        Self::new(DEFAULT_RECALC_AFTER_POINTS)
    }
}

impl PauseRecalcStateMachine {
    /// The triggering point is the first collected one, so at least 2 are required.
    pub fn new(recalc_after_points: u32) -> Self {
        Self {
            recalc_after_points: recalc_after_points.max(2),
        }
    }

    pub fn recalc_after_points(&self) -> u32 {
        self.recalc_after_points
    }

    pub fn is_recalc_due(&self, pause: &PauseState) -> bool {
        pause.paused && pause.points_collected_since_pause >= self.recalc_after_points
    }

    /// Accepts one sample into `stream`: scores it when LIVE, counts it when PAUSED,
    /// and keeps it as warmup when no baseline exists (saturated values are still
    /// scored). Rejected samples leave the stream untouched.
    pub fn step(&self, stream: &mut StreamState, sample: &Sample) -> Result<StepOutcome, SpcError> {
        let value = sample.value;
        if !value.is_finite() || value < 0.0 {
            return Err(SpcError::InvalidSample {
                key: sample.key(),
                value,
            });
        }
        if let Some(last) = stream.last_timestamp
            && sample.timestamp <= last
        {
            return Err(SpcError::OutOfOrderSample {
                key: sample.key(),
                timestamp: sample.timestamp,
                last,
            });
        }

        let previous = stream.history.last();
        let moving_range = previous.map(|p| (value - p).abs());
        let mut transition = Transition::None;

        let mut record = EvaluationRecord {
            timestamp: sample.timestamp,
            machine_id: sample.machine_id.clone(),
            metric_name: sample.metric_name,
            value,
            moving_range,
            status: Status::Warmup,
            score: None,
            is_critical: false,
            test_name: None,
            involved_offsets: Vec::new(),
            pause_state: stream.pause,
        };

        match stream.baseline {
            None => {
                if let Some(result) = rules::saturation(value) {
                    apply(&mut record, result);
                }
            }
            Some(_) if stream.pause.paused => {
                stream.pause.points_collected_since_pause += 1;
                record.status = Status::Collecting;
                if self.is_recalc_due(&stream.pause) {
                    transition = Transition::RecalcDue;
                }
            }
            Some(baseline) => {
                let trailing = stream.history.tail(LONGEST_TEST_WINDOW - 1);
                let result = rules::evaluate(value, previous, &trailing, &baseline);
                if result.requires_recalc {
                    stream.pause = PauseState {
                        paused: true,
                        points_collected_since_pause: 1,
                    };
                    transition = Transition::Paused;
                }
                apply(&mut record, result);
            }
        }

        stream.history.push(value);
        stream.last_timestamp = Some(sample.timestamp);
        record.pause_state = stream.pause;

        Ok(StepOutcome { record, transition })
    }

    /// Installs the first baseline for a stream. An existing baseline is kept.
    pub fn seed(&self, stream: &mut StreamState, values: &[f64]) -> Result<Baseline, SpcError> {
        if let Some(existing) = stream.baseline {
            return Ok(existing);
        }
        let computed = baseline::compute(values)?;
        stream.baseline = Some(computed);
        Ok(computed)
    }

    /// Installs a previously persisted baseline without touching history or pause state.
    pub fn install(&self, stream: &mut StreamState, baseline: Baseline) {
        stream.baseline = Some(baseline);
    }

    /// Rebuilds a stream after a restart: persisted baseline and pause state, the
    /// latest accepted values (oldest first) and the newest accepted timestamp.
    /// Without a baseline the stream is restored LIVE.
    pub fn restore(
        &self,
        stream: &mut StreamState,
        baseline: Option<Baseline>,
        pause: PauseState,
        values: &[f64],
        last_timestamp: Option<u64>,
    ) {
        stream.baseline = baseline;
        stream.pause = if baseline.is_some() {
            pause
        } else {
            PauseState::live()
        };
        for value in values {
            stream.history.push(*value);
        }
        stream.last_timestamp = stream.last_timestamp.max(last_timestamp);
    }

    /// Replaces the baseline from `window` and returns the stream to LIVE. On failure
    /// the stream stays as it was (PAUSED streams keep collecting).
    pub fn recalculate(
        &self,
        stream: &mut StreamState,
        window: &[f64],
    ) -> Result<Baseline, SpcError> {
        let computed = baseline::compute(window)?;
        stream.baseline = Some(computed);
        stream.pause = PauseState::live();
        Ok(computed)
    }

    /// Returns to LIVE without recalculating. Returns whether the stream was paused.
    pub fn force_resume(&self, stream: &mut StreamState) -> bool {
        let was_paused = stream.pause.paused;
        stream.pause = PauseState::live();
        was_paused
    }
}

fn apply(record: &mut EvaluationRecord, result: EvaluationResult) {
    record.status = result.status;
    record.score = Some(result.score);
    record.is_critical = result.is_critical;
    record.test_name = result.test_name;
    record.involved_offsets = result.involved_offsets;
}
