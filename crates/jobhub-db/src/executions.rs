//! Append-only execution telemetry.
//!
//! One row per platform per run, plus a `system` row when a run fails
//! outside any platform. Rows are never updated; retention deletes by age.

use crate::error::Result;
use crate::timestamps;
use chrono::{DateTime, Duration, Utc};
use jobhub_core::{ExecutionStatus, PlatformName, SearchId};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

/// A record to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExecution {
    /// Search the run belongs to
    pub search_id: SearchId,
    /// Platform, or `system` for run-level faults
    pub platform: PlatformName,
    /// Listings returned by the scrape
    pub jobs_found: u32,
    /// Listings that were not stored before
    pub new_jobs_found: u32,
    /// Time spent on this platform
    pub duration: std::time::Duration,
    /// Outcome
    pub status: ExecutionStatus,
    /// Error or truncation reason
    pub error_message: Option<String>,
}

/// A stored execution record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Row identifier
    pub id: i64,
    /// Search the run belongs to
    pub search_id: SearchId,
    /// Platform name or `system`
    pub platform: String,
    /// Listings returned by the scrape
    pub jobs_found: i64,
    /// Listings that were not stored before
    pub new_jobs_found: i64,
    /// Seconds spent
    pub duration_secs: f64,
    /// Outcome
    pub status: ExecutionStatus,
    /// Error or truncation reason
    pub error_message: Option<String>,
    /// When the record was written
    pub executed_at: DateTime<Utc>,
}

/// Per-platform aggregate over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStats {
    /// Platform name
    pub platform: String,
    /// Number of records
    pub runs: i64,
    /// Records with status `error`
    pub errors: i64,
    /// Sum of listings found
    pub jobs_found: i64,
    /// Sum of new listings
    pub new_jobs_found: i64,
    /// Mean duration in seconds
    pub average_duration_secs: f64,
}

const COLUMNS: &str = "id, search_id, platform, jobs_found, new_jobs_found, duration_secs,
                       status, error_message, executed_at";

/// Append a record stamped with the current time.
pub async fn record(pool: &Pool<Sqlite>, execution: &NewExecution) -> Result<ExecutionRecord> {
    let executed_at = Utc::now();
    let duration_secs = execution.duration.as_secs_f64();

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO execution_logs (search_id, platform, jobs_found, new_jobs_found,
                                     duration_secs, status, error_message, executed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(execution.search_id.get())
    .bind(execution.platform.as_str())
    .bind(i64::from(execution.jobs_found))
    .bind(i64::from(execution.new_jobs_found))
    .bind(duration_secs)
    .bind(execution.status.as_str())
    .bind(&execution.error_message)
    .bind(timestamps::encode(executed_at))
    .fetch_one(pool)
    .await?;

    Ok(ExecutionRecord {
        id,
        search_id: execution.search_id,
        platform: execution.platform.to_string(),
        jobs_found: i64::from(execution.jobs_found),
        new_jobs_found: i64::from(execution.new_jobs_found),
        duration_secs,
        status: execution.status,
        error_message: execution.error_message.clone(),
        executed_at,
    })
}

/// Time of the latest record for a search, any platform.
pub async fn last_executed_at(
    pool: &Pool<Sqlite>,
    search_id: SearchId,
) -> Result<Option<DateTime<Utc>>> {
    let latest: Option<String> =
        sqlx::query_scalar("SELECT MAX(executed_at) FROM execution_logs WHERE search_id = ?")
            .bind(search_id.get())
            .fetch_one(pool)
            .await?;

    timestamps::decode_opt(latest)
}

/// Most recent record of each platform for a search, ordered by platform.
pub async fn latest_per_platform(
    pool: &Pool<Sqlite>,
    search_id: SearchId,
) -> Result<Vec<ExecutionRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM execution_logs e
         WHERE search_id = ?
           AND id = (SELECT MAX(id) FROM execution_logs
                     WHERE search_id = e.search_id AND platform = e.platform)
         ORDER BY platform"
    ))
    .bind(search_id.get())
    .fetch_all(pool)
    .await?;

    rows.iter().map(parse_record).collect()
}

/// Latest records across all searches, newest first.
pub async fn recent(pool: &Pool<Sqlite>, limit: u32) -> Result<Vec<ExecutionRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM execution_logs ORDER BY executed_at DESC, id DESC LIMIT ?"
    ))
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.iter().map(parse_record).collect()
}

/// Share of records since `since` whose status is not `error`, in `0.0..=1.0`.
/// `None` when there are no records.
pub async fn success_rate(pool: &Pool<Sqlite>, since: DateTime<Utc>) -> Result<Option<f64>> {
    let (total, errors): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END), 0)
         FROM execution_logs WHERE executed_at >= ?",
    )
    .bind(timestamps::encode(since))
    .fetch_one(pool)
    .await?;

    if total == 0 {
        return Ok(None);
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = (total - errors) as f64 / total as f64;
    Ok(Some(rate))
}

/// Mean duration in seconds of records since `since`.
pub async fn average_duration(pool: &Pool<Sqlite>, since: DateTime<Utc>) -> Result<Option<f64>> {
    let average: Option<f64> =
        sqlx::query_scalar("SELECT AVG(duration_secs) FROM execution_logs WHERE executed_at >= ?")
            .bind(timestamps::encode(since))
            .fetch_one(pool)
            .await?;

    Ok(average)
}

/// Aggregates per platform since `since`, ordered by platform.
pub async fn platform_stats(
    pool: &Pool<Sqlite>,
    since: DateTime<Utc>,
) -> Result<Vec<PlatformStats>> {
    let rows = sqlx::query(
        "SELECT platform,
                COUNT(*) AS runs,
                COALESCE(SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END), 0) AS errors,
                COALESCE(SUM(jobs_found), 0) AS jobs_found,
                COALESCE(SUM(new_jobs_found), 0) AS new_jobs_found,
                COALESCE(AVG(duration_secs), 0.0) AS average_duration_secs
         FROM execution_logs
         WHERE executed_at >= ?
         GROUP BY platform
         ORDER BY platform",
    )
    .bind(timestamps::encode(since))
    .fetch_all(pool)
    .await?;

    let mut stats = Vec::with_capacity(rows.len());
    for row in rows {
        stats.push(PlatformStats {
            platform: row.try_get("platform")?,
            runs: row.try_get("runs")?,
            errors: row.try_get("errors")?,
            jobs_found: row.try_get("jobs_found")?,
            new_jobs_found: row.try_get("new_jobs_found")?,
            average_duration_secs: row.try_get("average_duration_secs")?,
        });
    }
    Ok(stats)
}

/// Delete records older than `days`. Returns the number removed.
pub async fn delete_older_than(pool: &Pool<Sqlite>, days: u32) -> Result<u64> {
    let cutoff = Utc::now() - Duration::days(i64::from(days));
    let result = sqlx::query("DELETE FROM execution_logs WHERE executed_at < ?")
        .bind(timestamps::encode(cutoff))
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        tracing::info!(
            removed = result.rows_affected(),
            days,
            "pruned old execution records"
        );
    }
    Ok(result.rows_affected())
}

fn parse_record(row: &SqliteRow) -> Result<ExecutionRecord> {
    let search_id: i64 = row.try_get("search_id")?;
    let status: String = row.try_get("status")?;
    let executed_at: String = row.try_get("executed_at")?;

    Ok(ExecutionRecord {
        id: row.try_get("id")?,
        search_id: SearchId::new(search_id),
        platform: row.try_get("platform")?,
        jobs_found: row.try_get("jobs_found")?,
        new_jobs_found: row.try_get("new_jobs_found")?,
        duration_secs: row.try_get("duration_secs")?,
        status: ExecutionStatus::parse(&status),
        error_message: row.try_get("error_message")?,
        executed_at: timestamps::decode(&executed_at)?,
    })
}
