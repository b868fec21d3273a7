// Monitor worker: sample source -> sample store -> SPC engine -> broadcast.
// The worker task is the single owner of the Monitor, so stream state is only
// mutated from one in-flight evaluation at a time.

use crate::config::WeightsConfig;
use crate::engine::SpcEngine;
use crate::models::{CompositeRecord, MetricKey, MonitorEvent, PauseState, Sample};
use crate::sample_store::SampleStore;
use crate::sampler::{ActiveSource, SampleSource};
use crate::spc::{MetricScores, Transition, aggregate};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{Duration, Instant, interval};

/// Rate limit for "no receivers" warning (avoid logging every tick when no one is subscribed)
const NO_RECEIVERS_WARN_INTERVAL: Duration = Duration::from_secs(60);

const MS_PER_HOUR: i64 = 3600 * 1000;

/// Windows and recalculation policy used while processing groups.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub recalc_window: u32,
    pub baseline_window_hours: u32,
    pub baseline_min_points: u32,
    pub force_resume_after_secs: Option<u64>,
}

/// Processes sample groups against the engine and the store.
pub struct Monitor {
    engine: Arc<SpcEngine>,
    store: Arc<SampleStore>,
    weights: WeightsConfig,
    config: MonitorConfig,
    /// When each stream's recalculation first became due and failed.
    stalled_since: HashMap<MetricKey, Instant>,
    samples_accepted: u64,
    samples_rejected: u64,
}

impl Monitor {
    pub fn new(
        engine: Arc<SpcEngine>,
        store: Arc<SampleStore>,
        weights: WeightsConfig,
        config: MonitorConfig,
    ) -> Self {
        Self {
            engine,
            store,
            weights,
            config,
            stalled_since: HashMap::new(),
            samples_accepted: 0,
            samples_rejected: 0,
        }
    }

    pub fn engine(&self) -> &Arc<SpcEngine> {
        &self.engine
    }

    pub fn samples_accepted(&self) -> u64 {
        self.samples_accepted
    }

    pub fn samples_rejected(&self) -> u64 {
        self.samples_rejected
    }

    /// Rebuilds every stream the store knows about: baseline, pause state, recent
    /// history and last accepted timestamp. Returns how many streams got a baseline.
    pub async fn restore_streams(&self) -> anyhow::Result<usize> {
        let capacity = u32::try_from(self.engine.history_capacity()).unwrap_or(u32::MAX);
        let mut restored = 0;
        for key in self.store.stream_keys().await? {
            let baseline = self.store.load_baseline(&key).await?;
            let pause = self
                .store
                .load_pause_state(&key)
                .await?
                .unwrap_or_default();
            let values = self.store.recent_values(&key, capacity).await?;
            let last_timestamp = self.store.last_timestamp(&key).await?;
            if pause.paused {
                tracing::info!(
                    stream = %key,
                    collected = pause.points_collected_since_pause,
                    "stream restored paused"
                );
            }
            self.engine
                .restore_stream(&key, baseline, pause, &values, last_timestamp);
            restored += usize::from(baseline.is_some());
        }
        Ok(restored)
    }

    /// Evaluates one group (one machine, one timestamp). Returns the events to publish:
    /// the composite first, then any pause/recalculation notifications.
    pub async fn process_group(&mut self, group: Vec<Sample>) -> Vec<MonitorEvent> {
        let Some(first) = group.first() else {
            return Vec::new();
        };
        let timestamp = first.timestamp;
        let machine_id = first.machine_id.clone();

        let mut records = Vec::with_capacity(group.len());
        let mut notifications = Vec::new();
        let mut accepted: Vec<Sample> = Vec::with_capacity(group.len());
        let mut due: Vec<MetricKey> = Vec::new();
        let mut paused: Vec<(MetricKey, PauseState)> = Vec::new();

        for sample in group {
            let key = sample.key();
            if !self.engine.has_baseline(&key) {
                self.try_seed(&key, sample.timestamp).await;
            }
            match self.engine.ingest(&sample) {
                Ok(outcome) => {
                    match outcome.transition {
                        Transition::Paused => notifications.push(MonitorEvent::Paused {
                            key: key.clone(),
                            timestamp: sample.timestamp,
                        }),
                        Transition::RecalcDue => due.push(key.clone()),
                        Transition::None => {}
                    }
                    if outcome.record.pause_state.paused {
                        paused.push((key, outcome.record.pause_state));
                    }
                    records.push(outcome.record);
                    accepted.push(sample);
                }
                Err(e) => {
                    self.samples_rejected += 1;
                    tracing::warn!(
                        error = %e,
                        code = e.code(),
                        operation = "ingest",
                        "sample rejected"
                    );
                }
            }
        }

        self.samples_accepted += accepted.len() as u64;
        if let Err(e) = self.store.save_samples(&accepted).await {
            tracing::warn!(error = %e, operation = "save_samples", "failed to persist samples");
        }
        if let Err(e) = self.store.save_pause_states(&paused).await {
            tracing::warn!(error = %e, operation = "save_pause_states", "failed to persist pause state");
        }

        for key in due {
            if let Some(event) = self.recalculate(&key, timestamp).await {
                notifications.push(event);
            }
        }

        let mut scores = MetricScores::default();
        for r in &records {
            scores.set(r.metric_name, r.score);
        }
        let p_score = aggregate(&scores, Some(self.weights.for_machine(&machine_id)));

        let mut events = Vec::with_capacity(1 + notifications.len());
        if !records.is_empty() {
            events.push(MonitorEvent::Composite(CompositeRecord {
                timestamp,
                machine_id,
                metrics: records,
                p_score,
            }));
        }
        events.extend(notifications);
        events
    }

    /// Seeds `key` from the baseline-phase window when enough values are stored.
    /// Too few values is not an error: the stream stays in warmup and is retried.
    async fn try_seed(&self, key: &MetricKey, now_ms: u64) {
        let since = now_ms as i64 - (self.config.baseline_window_hours as i64) * MS_PER_HOUR;
        let values = match self.store.values_since(key, since).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, stream = %key, operation = "values_since", "baseline window unavailable");
                return;
            }
        };
        if values.len() < self.config.baseline_min_points as usize {
            tracing::debug!(stream = %key, stored = values.len(), "warming up");
            return;
        }
        match self.engine.seed_baseline(key, &values) {
            Ok(baseline) => {
                tracing::info!(stream = %key, points = values.len(), cl_x = baseline.cl_x, "baseline installed");
                if let Err(e) = self.store.save_baseline(key, &baseline, now_ms).await {
                    tracing::warn!(error = %e, stream = %key, operation = "save_baseline", "failed to persist baseline");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, stream = %key, operation = "seed_baseline", "baseline not installed")
            }
        }
    }

    /// Fetches the latest accepted values and recalculates. On failure the stream stays
    /// paused; it is force-resumed only when `force_resume_after_secs` is configured.
    async fn recalculate(&mut self, key: &MetricKey, timestamp: u64) -> Option<MonitorEvent> {
        let result = match self.store.recent_values(key, self.config.recalc_window).await {
            Ok(window) => self
                .engine
                .complete_recalculation(key, &window)
                .map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(baseline) => {
                self.stalled_since.remove(key);
                if let Err(e) = self.store.save_baseline(key, &baseline, timestamp).await {
                    tracing::warn!(error = %e, stream = %key, operation = "save_baseline", "failed to persist baseline");
                }
                Some(MonitorEvent::Recalculated {
                    key: key.clone(),
                    timestamp,
                    baseline,
                })
            }
            Err(e) => {
                let since = *self.stalled_since.entry(key.clone()).or_insert_with(Instant::now);
                let stalled_for = since.elapsed();
                let limit = self.config.force_resume_after_secs.map(Duration::from_secs);
                if limit.is_some_and(|limit| stalled_for >= limit) {
                    return self.force_resume(key).await.ok().flatten();
                }
                tracing::warn!(
                    error = %e,
                    stream = %key,
                    stalled_secs = stalled_for.as_secs(),
                    operation = "recalculate",
                    "recalculation failed; metric stays paused"
                );
                None
            }
        }
    }

    /// Operator escape hatch: returns `key` to LIVE against its previous baseline.
    pub async fn force_resume(&mut self, key: &MetricKey) -> anyhow::Result<Option<MonitorEvent>> {
        self.stalled_since.remove(key);
        let was_paused = self.engine.force_resume(key)?;
        if !was_paused {
            return Ok(None);
        }
        self.store
            .save_pause_states(&[(key.clone(), PauseState::live())])
            .await?;
        Ok(Some(MonitorEvent::Resumed {
            key: key.clone(),
            forced: true,
        }))
    }
}

/// Source, monitor, channel, and shutdown for the worker.
pub struct WorkerDeps {
    pub source: ActiveSource,
    pub monitor: Monitor,
    pub tx: broadcast::Sender<MonitorEvent>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing config. Stats logging and pruning use real-time intervals,
/// independent of sample_interval_ms.
pub struct WorkerConfig {
    pub sample_interval_ms: u64,
    /// How often to log engine stats (real seconds).
    pub stats_log_interval_secs: u64,
    /// How often to prune old samples (real seconds).
    pub prune_interval_secs: u64,
}

/// Spawns the monitor loop. It ends on shutdown or when the source is exhausted.
pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        mut source,
        mut monitor,
        tx,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        sample_interval_ms,
        stats_log_interval_secs,
        prune_interval_secs,
    } = config;

    let stats_log_interval = Duration::from_secs(stats_log_interval_secs);
    let prune_interval = Duration::from_secs(prune_interval_secs);

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_millis(sample_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(stats_log_interval);
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut prune_tick = interval(prune_interval);
        prune_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut samples_pruned_total: u64 = 0;
        let mut last_no_receivers_warn: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let group = match source.next_group().await {
                        Ok(Some(group)) => group,
                        Ok(None) => {
                            tracing::info!("Sample source exhausted");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "next_group", "sampling failed");
                            continue;
                        }
                    };

                    for event in monitor.process_group(group).await {
                        if tx.send(event).is_err() {
                            let should_warn = last_no_receivers_warn
                                .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_WARN_INTERVAL);
                            if should_warn {
                                tracing::debug!(
                                    operation = "broadcast_event",
                                    "No active subscribers; broadcast channel has no receivers"
                                );
                                last_no_receivers_warn = Some(Instant::now());
                            }
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    let keys = monitor.engine().keys();
                    let paused = keys
                        .iter()
                        .filter(|k| monitor.engine().pause_state(k).is_some_and(|p| !p.is_live()))
                        .count();
                    tracing::info!(
                        streams = keys.len(),
                        paused_streams = paused,
                        samples_accepted = monitor.samples_accepted(),
                        samples_rejected = monitor.samples_rejected(),
                        samples_pruned_total,
                        "engine stats"
                    );
                }
                _ = prune_tick.tick() => {
                    match monitor.store.prune_old_data().await {
                        Ok(n) => {
                            tracing::debug!(operation = "prune_old_data", pruned = n, "Old samples pruned");
                            samples_pruned_total += n;
                        }
                        Err(e) => tracing::warn!(
                            error = %e,
                            operation = "prune_old_data",
                            "Failed to prune old samples"
                        ),
                    }
                }
            }
        }
    })
}
