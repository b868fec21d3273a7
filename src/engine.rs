// Keyed state store for the SPC core.
// One StreamState per (machine, metric), each behind its own lock so distinct
// streams can be processed concurrently; samples of one stream are serialized.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::error::SpcError;
use crate::models::{Baseline, MetricKey, PauseState, Sample};
use crate::spc::{PauseRecalcStateMachine, StepOutcome, StreamState, Transition};

type StreamHandle = Arc<Mutex<StreamState>>;

pub struct SpcEngine {
    streams: RwLock<HashMap<MetricKey, StreamHandle>>,
    machine: PauseRecalcStateMachine,
    history_capacity: usize,
}

impl SpcEngine {
    pub fn new(history_capacity: usize, recalc_after_points: u32) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            machine: PauseRecalcStateMachine::new(recalc_after_points),
            history_capacity,
        }
    }

    /// Stream for `key`, created LIVE with an empty history on first use.
    fn stream(&self, key: &MetricKey) -> StreamHandle {
        if let Some(handle) = self
            .streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return handle.clone();
        }
        let mut streams = self.streams.write().unwrap_or_else(PoisonError::into_inner);
        streams
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(StreamState::new(self.history_capacity))))
            .clone()
    }

    fn existing(&self, key: &MetricKey) -> Result<StreamHandle, SpcError> {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| SpcError::UnknownKey(key.clone()))
    }

    fn lock(handle: &StreamHandle) -> MutexGuard<'_, StreamState> {
        handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one sample through its stream. Out-of-order and invalid samples are
    /// rejected and not merged into history.
    pub fn ingest(&self, sample: &Sample) -> Result<StepOutcome, SpcError> {
        let key = sample.key();
        let handle = self.stream(&key);
        let mut stream = Self::lock(&handle);
        let outcome = self.machine.step(&mut stream, sample)?;

        match outcome.transition {
            Transition::Paused => tracing::info!(
                stream = %key,
                test = outcome.record.test_name.unwrap_or_default(),
                "metric paused for recalculation"
            ),
            Transition::RecalcDue => tracing::debug!(
                stream = %key,
                collected = stream.pause.points_collected_since_pause,
                "recalculation due"
            ),
            Transition::None => {}
        }
        Ok(outcome)
    }

    /// Installs the initial baseline for `key` from the baseline-phase values.
    pub fn seed_baseline(&self, key: &MetricKey, values: &[f64]) -> Result<Baseline, SpcError> {
        let handle = self.stream(key);
        let mut stream = Self::lock(&handle);
        let baseline = self.machine.seed(&mut stream, values)?;
        tracing::debug!(stream = %key, cl_x = baseline.cl_x, ucl_x = baseline.ucl_x, lcl_x = baseline.lcl_x, "baseline seeded");
        Ok(baseline)
    }

    /// Reinstalls a persisted baseline, e.g. after a restart.
    pub fn restore_baseline(&self, key: &MetricKey, baseline: Baseline) {
        let handle = self.stream(key);
        let mut stream = Self::lock(&handle);
        self.machine.install(&mut stream, baseline);
    }

    /// Rebuilds `key` from persisted state after a restart. A stream that was PAUSED
    /// comes back PAUSED with its collected-point counter.
    pub fn restore_stream(
        &self,
        key: &MetricKey,
        baseline: Option<Baseline>,
        pause: PauseState,
        values: &[f64],
        last_timestamp: Option<u64>,
    ) {
        let handle = self.stream(key);
        let mut stream = Self::lock(&handle);
        self.machine
            .restore(&mut stream, baseline, pause, values, last_timestamp);
        tracing::debug!(
            stream = %key,
            has_baseline = stream.baseline.is_some(),
            paused = stream.pause.paused,
            collected = stream.pause.points_collected_since_pause,
            history = stream.history.len(),
            "stream restored"
        );
    }

    /// Replaces the baseline of `key` from the latest accepted values and resumes scoring.
    pub fn complete_recalculation(
        &self,
        key: &MetricKey,
        window: &[f64],
    ) -> Result<Baseline, SpcError> {
        let handle = self.existing(key)?;
        let mut stream = Self::lock(&handle);
        let baseline = self.machine.recalculate(&mut stream, window)?;
        tracing::info!(
            stream = %key,
            window = window.len(),
            cl_x = baseline.cl_x,
            ucl_x = baseline.ucl_x,
            lcl_x = baseline.lcl_x,
            "metric baseline recalculated"
        );
        Ok(baseline)
    }

    /// Returns `key` to LIVE without recalculating. `Ok(true)` if it was paused.
    pub fn force_resume(&self, key: &MetricKey) -> Result<bool, SpcError> {
        let handle = self.existing(key)?;
        let mut stream = Self::lock(&handle);
        let was_paused = self.machine.force_resume(&mut stream);
        if was_paused {
            tracing::warn!(stream = %key, "metric force-resumed against previous baseline");
        }
        Ok(was_paused)
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    pub fn has_baseline(&self, key: &MetricKey) -> bool {
        self.baseline(key).is_some()
    }

    pub fn baseline(&self, key: &MetricKey) -> Option<Baseline> {
        let handle = self.existing(key).ok()?;
        let stream = Self::lock(&handle);
        stream.baseline
    }

    pub fn pause_state(&self, key: &MetricKey) -> Option<PauseState> {
        let handle = self.existing(key).ok()?;
        let stream = Self::lock(&handle);
        Some(stream.pause)
    }

    pub fn is_recalc_due(&self, key: &MetricKey) -> bool {
        self.pause_state(key)
            .is_some_and(|p| self.machine.is_recalc_due(&p))
    }

    /// Retained history of `key`, oldest first.
    pub fn history(&self, key: &MetricKey) -> Option<Vec<f64>> {
        let handle = self.existing(key).ok()?;
        let stream = Self::lock(&handle);
        Some(stream.history.to_vec())
    }

    pub fn keys(&self) -> Vec<MetricKey> {
        let mut keys: Vec<MetricKey> = self
            .streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}
