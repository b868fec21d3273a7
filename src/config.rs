use serde::Deserialize;
use std::collections::HashMap;

use crate::models::Weights;
use crate::spc::history::MIN_HISTORY_CAPACITY;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub weights: WeightsConfig,
    pub database: DatabaseConfig,
    pub monitoring: MonitoringConfig,
    pub publishing: PublishingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Accepted values kept per stream; must cover the longest test (>= 20).
    pub history_capacity: usize,
    /// Points collected while paused (trigger included) before recalculation.
    pub recalc_after_points: u32,
    /// Latest accepted values used for a recalculated baseline.
    pub recalc_window: u32,
    /// Force-resume a stream whose recalculation has been due this long. Unset: stay paused.
    pub force_resume_after_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 200,
            recalc_after_points: 20,
            recalc_window: 200,
            force_resume_after_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Baseline phase: how far back the initial window reaches.
    pub window_hours: u32,
    /// Fewest stored values before a stream is seeded (never below 2).
    pub min_points: u32,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            window_hours: 72,
            min_points: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WeightsConfig {
    pub default: Weights,
    /// Per-machine overrides keyed by machine_id.
    pub machines: HashMap<String, Weights>,
}

impl WeightsConfig {
    pub fn for_machine(&self, machine_id: &str) -> &Weights {
        self.machines.get(machine_id).unwrap_or(&self.default)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    7
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Local,
    Replay,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub source: SourceKind,
    /// JSON-lines sample file; required when source = "replay".
    pub replay_path: Option<String>,
    /// Machine id for the local sampler; defaults to the host name.
    pub machine_id: Option<String>,
    pub sample_interval_ms: u64,
    /// How often to log engine stats (streams, paused streams, samples) at INFO level.
    pub stats_log_interval_secs: u64,
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

fn default_prune_interval_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of events kept in the broadcast channel (slow subscribers may lag).
    pub broadcast_capacity: usize,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.engine.history_capacity >= MIN_HISTORY_CAPACITY,
            "engine.history_capacity must be >= {}, got {}",
            MIN_HISTORY_CAPACITY,
            self.engine.history_capacity
        );
        anyhow::ensure!(
            self.engine.recalc_after_points >= 2,
            "engine.recalc_after_points must be >= 2, got {}",
            self.engine.recalc_after_points
        );
        anyhow::ensure!(
            self.engine.recalc_window >= 2,
            "engine.recalc_window must be >= 2, got {}",
            self.engine.recalc_window
        );
        anyhow::ensure!(
            self.engine.force_resume_after_secs != Some(0),
            "engine.force_resume_after_secs must be > 0 when set"
        );
        anyhow::ensure!(
            self.baseline.window_hours > 0,
            "baseline.window_hours must be > 0, got {}",
            self.baseline.window_hours
        );
        anyhow::ensure!(
            self.baseline.min_points >= 2,
            "baseline.min_points must be >= 2, got {}",
            self.baseline.min_points
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        if self.monitoring.source == SourceKind::Replay {
            anyhow::ensure!(
                self.monitoring
                    .replay_path
                    .as_deref()
                    .is_some_and(|p| !p.is_empty()),
                "monitoring.replay_path is required when monitoring.source = \"replay\""
            );
        }
        anyhow::ensure!(
            self.monitoring.sample_interval_ms > 0,
            "monitoring.sample_interval_ms must be > 0, got {}",
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.prune_interval_secs > 0,
            "monitoring.prune_interval_secs must be > 0, got {}",
            self.monitoring.prune_interval_secs
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        // Invalid weights are not fatal; aggregation falls back to equal weighting.
        for (machine, w) in std::iter::once(("default", &self.weights.default)).chain(
            self.weights
                .machines
                .iter()
                .map(|(k, v)| (k.as_str(), v)),
        ) {
            if !w.is_valid() {
                tracing::warn!(
                    machine,
                    cpu = w.cpu,
                    ram = w.ram,
                    io_wait = w.io_wait,
                    "weights outside [0, 1]; equal weighting will be used"
                );
            }
        }
        Ok(())
    }
}
