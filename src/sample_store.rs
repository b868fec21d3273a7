// SQLite store for accepted samples and installed baselines.
// Serves the baseline-phase window and the recalculation window.

use crate::models::{Baseline, MetricKey, MetricName, PauseState, Sample};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

pub struct SampleStore {
    pool: SqlitePool,
    retention_ms: i64,
}

impl SampleStore {
    pub async fn connect(path: &str, retention_days: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        let retention_ms = (retention_days as i64) * 24 * 60 * 60 * 1000;
        Ok(Self { pool, retention_ms })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at INTEGER NOT NULL,
                machine_id TEXT NOT NULL,
                metric TEXT NOT NULL,
                value REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_samples_stream_created_at ON samples(machine_id, metric, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS baselines (
                machine_id TEXT NOT NULL,
                metric TEXT NOT NULL,
                cl_x REAL NOT NULL,
                ucl_x REAL NOT NULL,
                lcl_x REAL NOT NULL,
                cl_mr REAL NOT NULL,
                ucl_mr REAL NOT NULL,
                paused INTEGER NOT NULL DEFAULT 0,
                points_collected INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (machine_id, metric)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, samples), fields(repo = "samples", operation = "save_samples", samples_count = samples.len()))]
    pub async fn save_samples(&self, samples: &[Sample]) -> anyhow::Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for s in samples {
            sqlx::query(
                "INSERT INTO samples (created_at, machine_id, metric, value) VALUES ($1, $2, $3, $4)",
            )
            .bind(s.timestamp as i64)
            .bind(&s.machine_id)
            .bind(s.metric_name.as_str())
            .bind(s.value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Newest `limit` values for the stream, returned oldest first.
    #[instrument(skip(self), fields(repo = "samples", operation = "recent_values", stream = %key))]
    pub async fn recent_values(&self, key: &MetricKey, limit: u32) -> anyhow::Result<Vec<f64>> {
        let mut values: Vec<f64> = sqlx::query_scalar(
            "SELECT value FROM samples WHERE machine_id = $1 AND metric = $2
             ORDER BY created_at DESC, id DESC LIMIT $3",
        )
        .bind(&key.machine_id)
        .bind(key.metric_name.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        values.reverse();
        Ok(values)
    }

    /// Values with created_at >= since_ms for the stream. Order: ascending by created_at.
    #[instrument(skip(self), fields(repo = "samples", operation = "values_since", stream = %key))]
    pub async fn values_since(&self, key: &MetricKey, since_ms: i64) -> anyhow::Result<Vec<f64>> {
        let values: Vec<f64> = sqlx::query_scalar(
            "SELECT value FROM samples WHERE machine_id = $1 AND metric = $2 AND created_at >= $3
             ORDER BY created_at ASC, id ASC",
        )
        .bind(&key.machine_id)
        .bind(key.metric_name.as_str())
        .bind(since_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }

    /// Stores a freshly installed baseline; the stream is LIVE again.
    #[instrument(skip(self, baseline), fields(repo = "samples", operation = "save_baseline", stream = %key))]
    pub async fn save_baseline(
        &self,
        key: &MetricKey,
        baseline: &Baseline,
        updated_at: u64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO baselines
            (machine_id, metric, cl_x, ucl_x, lcl_x, cl_mr, ucl_mr, paused, points_collected, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0, $8)
            "#,
        )
        .bind(&key.machine_id)
        .bind(key.metric_name.as_str())
        .bind(baseline.cl_x)
        .bind(baseline.ucl_x)
        .bind(baseline.lcl_x)
        .bind(baseline.cl_mr)
        .bind(baseline.ucl_mr)
        .bind(updated_at as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_baseline(&self, key: &MetricKey) -> anyhow::Result<Option<Baseline>> {
        let row = sqlx::query(
            "SELECT cl_x, ucl_x, lcl_x, cl_mr, ucl_mr FROM baselines WHERE machine_id = $1 AND metric = $2",
        )
        .bind(&key.machine_id)
        .bind(key.metric_name.as_str())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Baseline {
            cl_x: row.try_get("cl_x")?,
            ucl_x: row.try_get("ucl_x")?,
            lcl_x: row.try_get("lcl_x")?,
            cl_mr: row.try_get("cl_mr")?,
            ucl_mr: row.try_get("ucl_mr")?,
        }))
    }

    /// Records the pause state of streams that have a stored baseline.
    #[instrument(skip(self, states), fields(repo = "samples", operation = "save_pause_states", streams_count = states.len()))]
    pub async fn save_pause_states(&self, states: &[(MetricKey, PauseState)]) -> anyhow::Result<()> {
        if states.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for (key, pause) in states {
            sqlx::query(
                "UPDATE baselines SET paused = $1, points_collected = $2 WHERE machine_id = $3 AND metric = $4",
            )
            .bind(pause.paused)
            .bind(pause.points_collected_since_pause as i64)
            .bind(&key.machine_id)
            .bind(key.metric_name.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Pause state stored with the baseline; `None` when the stream has no baseline.
    pub async fn load_pause_state(&self, key: &MetricKey) -> anyhow::Result<Option<PauseState>> {
        let row = sqlx::query(
            "SELECT paused, points_collected FROM baselines WHERE machine_id = $1 AND metric = $2",
        )
        .bind(&key.machine_id)
        .bind(key.metric_name.as_str())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let paused: bool = row.try_get("paused")?;
        let points: i64 = row.try_get("points_collected")?;
        Ok(Some(PauseState {
            paused,
            points_collected_since_pause: u32::try_from(points).unwrap_or(u32::MAX),
        }))
    }

    /// Timestamp of the newest stored sample of the stream.
    pub async fn last_timestamp(&self, key: &MetricKey) -> anyhow::Result<Option<u64>> {
        let ts: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(created_at) FROM samples WHERE machine_id = $1 AND metric = $2",
        )
        .bind(&key.machine_id)
        .bind(key.metric_name.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(ts.map(|t| t as u64))
    }

    /// Streams that have at least one stored sample.
    pub async fn stream_keys(&self) -> anyhow::Result<Vec<MetricKey>> {
        let rows = sqlx::query(
            "SELECT DISTINCT machine_id, metric FROM samples ORDER BY machine_id, metric",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let machine_id: String = row.try_get("machine_id")?;
            let metric: String = row.try_get("metric")?;
            let Some(metric_name) = MetricName::parse(&metric) else {
                tracing::warn!(metric = %metric, "unknown metric in sample store; skipped");
                continue;
            };
            out.push(MetricKey::new(machine_id, metric_name));
        }
        Ok(out)
    }

    /// Deletes samples older than the retention period, measured back from the newest
    /// stored sample (sample time, not wall-clock time).
    #[instrument(skip(self), fields(repo = "samples", operation = "prune_old_data"))]
    pub async fn prune_old_data(&self) -> anyhow::Result<u64> {
        let r = sqlx::query(
            "DELETE FROM samples WHERE created_at < (SELECT MAX(created_at) FROM samples) - $1",
        )
        .bind(self.retention_ms)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }
}
