// Sample sources: live local host (sysinfo + /proc) or a JSON-lines replay file.

mod linux;
mod replay;

pub use replay::ReplaySource;

use crate::models::{MetricName, Sample};
use std::sync::{Arc, Mutex};
use sysinfo::System;
use tracing::instrument;

/// Produces groups of samples: all metrics of one machine at one timestamp.
pub trait SampleSource {
    /// Next group, or `None` when the source is exhausted.
    async fn next_group(&mut self) -> anyhow::Result<Option<Vec<Sample>>>;
}

/// Samples CPU, RAM and I/O-wait percentages of the local machine.
pub struct LocalSampler {
    machine_id: String,
    sys: Arc<Mutex<System>>,
    last_cpu_times: Arc<Mutex<Option<linux::CpuTimes>>>,
    last_timestamp: u64,
}

impl LocalSampler {
    pub fn new(machine_id: Option<String>) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        let machine_id = machine_id
            .filter(|m| !m.is_empty())
            .or_else(System::host_name)
            .unwrap_or_else(|| "localhost".into());
        Self {
            machine_id,
            sys: Arc::new(Mutex::new(sys)),
            last_cpu_times: Arc::new(Mutex::new(linux::read_cpu_times_linux())),
            last_timestamp: 0,
        }
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    #[instrument(skip(self), fields(source = "local", operation = "sample"))]
    async fn sample(&mut self) -> anyhow::Result<Vec<Sample>> {
        let sys = self.sys.clone();
        let last_cpu_times = self.last_cpu_times.clone();
        let (cpu, ram, io_wait) = tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_cpu_usage();
            sys.refresh_memory();
            let cpu = (sys.global_cpu_usage() as f64).clamp(0.0, 100.0);

            let total = sys.total_memory();
            let used = total.saturating_sub(sys.available_memory());
            let ram = if total > 0 {
                (used as f64 / total as f64) * 100.0
            } else {
                0.0
            };

            let io_wait = {
                let mut last = last_cpu_times
                    .lock()
                    .map_err(|e| anyhow::anyhow!("cpu times lock poisoned: {}", e))?;
                let now = linux::read_cpu_times_linux();
                let pct = match (*last, now) {
                    (Some(prev), Some(now)) => linux::iowait_percent(prev, now),
                    _ => 0.0,
                };
                *last = now;
                pct
            };
            anyhow::Ok((cpu, ram, io_wait))
        })
        .await
        .map_err(|e| anyhow::anyhow!("sampler task join: {}", e))??;

        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_millis() as u64;
        // Streams require strictly increasing timestamps.
        let timestamp = now_ms.max(self.last_timestamp + 1);
        self.last_timestamp = timestamp;

        Ok(vec![
            Sample::new(timestamp, self.machine_id.clone(), MetricName::Cpu, cpu),
            Sample::new(timestamp, self.machine_id.clone(), MetricName::Ram, ram),
            Sample::new(timestamp, self.machine_id.clone(), MetricName::IoWait, io_wait),
        ])
    }
}

impl SampleSource for LocalSampler {
    async fn next_group(&mut self) -> anyhow::Result<Option<Vec<Sample>>> {
        self.sample().await.map(Some)
    }
}

/// Source selected by config.
pub enum ActiveSource {
    Local(Box<LocalSampler>),
    Replay(ReplaySource),
}

impl SampleSource for ActiveSource {
    async fn next_group(&mut self) -> anyhow::Result<Option<Vec<Sample>>> {
        match self {
            ActiveSource::Local(sampler) => sampler.next_group().await,
            ActiveSource::Replay(replay) => replay.next_group().await,
        }
    }
}
