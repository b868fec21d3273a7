use anyhow::Result;
use spcmon::config::SourceKind;
use spcmon::*;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the JSON-lines event stream; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!("Starting {}", version::banner());

    let store = Arc::new(
        sample_store::SampleStore::connect(
            &app_config.database.path,
            app_config.database.retention_days,
        )
        .await?,
    );
    store.init().await?;

    let engine = Arc::new(engine::SpcEngine::new(
        app_config.engine.history_capacity,
        app_config.engine.recalc_after_points,
    ));
    let monitor = worker::Monitor::new(
        engine,
        store,
        app_config.weights.clone(),
        worker::MonitorConfig {
            recalc_window: app_config.engine.recalc_window,
            baseline_window_hours: app_config.baseline.window_hours,
            baseline_min_points: app_config.baseline.min_points,
            force_resume_after_secs: app_config.engine.force_resume_after_secs,
        },
    );
    let restored = monitor.restore_streams().await?;
    tracing::info!(restored, "Streams restored from store");

    let source = match app_config.monitoring.source {
        SourceKind::Local => {
            let sampler = sampler::LocalSampler::new(app_config.monitoring.machine_id.clone());
            tracing::info!(machine_id = sampler.machine_id(), "Sampling local machine");
            sampler::ActiveSource::Local(Box::new(sampler))
        }
        SourceKind::Replay => {
            let path = app_config
                .monitoring
                .replay_path
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("monitoring.replay_path missing"))?;
            sampler::ActiveSource::Replay(sampler::ReplaySource::open(path).await?)
        }
    };

    let (tx, rx) =
        broadcast::channel::<models::MonitorEvent>(app_config.publishing.broadcast_capacity);
    let reporter_handle = reporter::spawn(rx, tokio::io::stdout());

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let mut worker_handle = worker::spawn(
        worker::WorkerDeps {
            source,
            monitor,
            tx,
            shutdown_rx,
        },
        worker::WorkerConfig {
            sample_interval_ms: app_config.monitoring.sample_interval_ms,
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
            prune_interval_secs: app_config.monitoring.prune_interval_secs,
        },
    );

    tokio::select! {
        result = &mut worker_handle => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = (&mut worker_handle).await;
        }
    }

    // The worker owned the only sender; the reporter drains and exits.
    let _ = reporter_handle.await;
    Ok(())
}
