/// Run persistence operations
///
/// A run is written once, after the orchestrator returns: the run row and
/// every step row go in a single transaction, so a stored run always
/// reflects a finished `ResultSet` and a failed write leaves nothing behind.
use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::agent::interpreter::{truncate_chars, MAX_EXCERPT_CHARS};
use crate::conductor::types::{ResultSet, StepReport};

/// Stored run
#[derive(Debug, Clone, Serialize)]
pub struct Run {
    pub id: String,
    pub transcript_excerpt: String,
    pub state: String,
    pub partial_failure: bool,
    pub duration_ms: Option<i64>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

/// Stored step of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunStep {
    pub id: Option<i64>,
    pub run_id: String,
    pub step_order: i64,
    pub step: String,
    pub output_key: String,
    pub success: bool,
    pub plan_calls: i64,
    pub payload: Value,
    pub created_at: i64,
}

pub struct RunRepository {
    pool: SqlitePool,
}

fn now_secs() -> Result<i64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64)
}

fn run_from_row(r: &SqliteRow) -> Run {
    Run {
        id: r.get("id"),
        transcript_excerpt: r.get("transcript_excerpt"),
        state: r.get("state"),
        partial_failure: r.get::<i64, _>("partial_failure") != 0,
        duration_ms: r.get("duration_ms"),
        created_at: r.get("created_at"),
        completed_at: r.get("completed_at"),
    }
}

async fn insert_step(
    conn: &mut SqliteConnection,
    run_id: &str,
    step_order: i64,
    report: &StepReport,
    now: i64,
) -> Result<()> {
    let payload = serde_json::to_string(&report.payload.to_value())
        .context("Failed to serialize step payload")?;

    sqlx::query(
        "INSERT INTO run_steps (run_id, step_order, step, output_key, success, plan_calls, payload, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(run_id)
    .bind(step_order)
    .bind(&report.step)
    .bind(&report.output_key)
    .bind(report.success)
    .bind(i64::from(report.plan_calls))
    .bind(&payload)
    .bind(now)
    .execute(conn)
    .await
    .with_context(|| format!("Failed to add run step {}", report.step))?;

    Ok(())
}

impl RunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a finished run and all of its steps
    ///
    /// Either everything is written or nothing is.
    pub async fn save_result_set(
        &self,
        run_id: &str,
        transcript: &str,
        results: &ResultSet,
        duration_ms: i64,
    ) -> Result<Run> {
        if !results.state.is_terminal() {
            bail!("Run {} is still {}; only finished runs are stored", run_id, results.state);
        }

        let now = now_secs()?;
        let excerpt = truncate_chars(transcript, MAX_EXCERPT_CHARS);
        let started_at = now - duration_ms / 1000;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            "INSERT INTO runs (id, transcript_excerpt, state, partial_failure, duration_ms, created_at, completed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(&excerpt)
        .bind(results.state.as_str())
        .bind(results.partial_failure)
        .bind(duration_ms)
        .bind(started_at)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create run")?;

        for (order, report) in results.steps.iter().enumerate() {
            insert_step(&mut *tx, run_id, order as i64, report, now).await?;
        }

        tx.commit().await.context("Failed to commit run")?;

        Ok(Run {
            id: run_id.to_string(),
            transcript_excerpt: excerpt,
            state: results.state.as_str().to_string(),
            partial_failure: results.partial_failure,
            duration_ms: Some(duration_ms),
            created_at: started_at,
            completed_at: Some(now),
        })
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Option<Run>> {
        let row = sqlx::query(
            "SELECT id, transcript_excerpt, state, partial_failure, duration_ms, created_at, completed_at FROM runs WHERE id = ?",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch run")?;

        Ok(row.as_ref().map(run_from_row))
    }

    /// Most recent runs first
    pub async fn get_recent_runs(&self, limit: i64) -> Result<Vec<Run>> {
        let rows = sqlx::query(
            "SELECT id, transcript_excerpt, state, partial_failure, duration_ms, created_at, completed_at \
             FROM runs ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent runs")?;

        Ok(rows.iter().map(run_from_row).collect())
    }

    pub async fn get_run_steps(&self, run_id: &str) -> Result<Vec<RunStep>> {
        let rows = sqlx::query(
            "SELECT id, run_id, step_order, step, output_key, success, plan_calls, payload, created_at \
             FROM run_steps WHERE run_id = ? ORDER BY step_order ASC",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch run steps")?;

        rows.into_iter()
            .map(|r| {
                let payload_text: String = r.get("payload");
                Ok(RunStep {
                    id: Some(r.get("id")),
                    run_id: r.get("run_id"),
                    step_order: r.get("step_order"),
                    step: r.get("step"),
                    output_key: r.get("output_key"),
                    success: r.get::<i64, _>("success") != 0,
                    plan_calls: r.get("plan_calls"),
                    payload: serde_json::from_str(&payload_text)
                        .context("Stored step payload is not valid JSON")?,
                    created_at: r.get("created_at"),
                })
            })
            .collect()
    }

    /// Delete runs older than the given number of days, steps included
    pub async fn delete_old_runs(&self, older_than_days: i64) -> Result<u64> {
        let cutoff = now_secs()? - (older_than_days * 24 * 60 * 60);

        let result = sqlx::query("DELETE FROM runs WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("Failed to delete old runs")?;

        Ok(result.rows_affected())
    }
}
