// Writes monitor events as JSON lines (one event per line).

use crate::models::MonitorEvent;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;

/// Serializes one event to a single JSON line, without the trailing newline.
pub fn to_json_line(event: &MonitorEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

/// Spawns the task that relays events to `out` until the channel closes.
pub fn spawn<W>(mut rx: broadcast::Receiver<MonitorEvent>, mut out: W) -> tokio::task::JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    match &event {
                        MonitorEvent::Paused { key, .. } => {
                            tracing::info!(stream = %key, "notify: metric paused for recalculation")
                        }
                        MonitorEvent::Recalculated { key, baseline, .. } => tracing::info!(
                            stream = %key,
                            cl_x = baseline.cl_x,
                            "notify: metric baseline recalculated"
                        ),
                        MonitorEvent::Resumed { key, forced } => {
                            tracing::warn!(stream = %key, forced, "notify: metric resumed")
                        }
                        MonitorEvent::Composite(_) => {}
                    }
                    let mut line = match to_json_line(&event) {
                        Ok(line) => line,
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "serialize_event", "event dropped");
                            continue;
                        }
                    };
                    line.push('\n');
                    let written = match out.write_all(line.as_bytes()).await {
                        Ok(()) => out.flush().await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = written {
                        tracing::warn!(error = %e, operation = "write_event", "event output failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event reporter lagged, skipped {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("Event reporter shutting down");
    })
}
