//! Deduplicated job listings.
//!
//! The `url` column is the canonical key. The first sighting of a URL wins;
//! later sightings, from any search, are discarded without refreshing fields.

use crate::error::Result;
use crate::timestamps;
use chrono::{Duration, Utc};
use jobhub_core::{JobListing, ParsedListing, SearchId};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::collections::BTreeMap;

/// Aggregate counts for dashboards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// All stored listings
    pub total_jobs: i64,
    /// Listings not yet marked seen
    pub new_jobs: i64,
    /// Listings found in the last 24 hours
    pub jobs_last_24h: i64,
    /// Listing count per platform
    pub by_platform: BTreeMap<String, i64>,
}

const COLUMNS: &str = "id, search_id, title, company, url, platform, location, snippet, salary,
                       job_type, date_posted, date_found, is_new, external_id";

/// Insert listings whose URL is not stored yet and return how many were new.
///
/// The whole batch runs in one transaction. Any storage failure rolls it back
/// and is returned; a duplicate URL, within the batch or against stored
/// rows, is skipped.
pub async fn save_listings(
    pool: &Pool<Sqlite>,
    search_id: SearchId,
    listings: &[ParsedListing],
) -> Result<u64> {
    if listings.is_empty() {
        return Ok(0);
    }

    let date_found = timestamps::encode(Utc::now());
    let mut tx = pool.begin().await?;
    let mut new_count = 0;

    for listing in listings {
        let result = sqlx::query(
            "INSERT INTO jobs (search_id, title, company, url, platform, location, snippet,
                               salary, job_type, date_posted, date_found, is_new, external_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
             ON CONFLICT(url) DO NOTHING",
        )
        .bind(search_id.get())
        .bind(&listing.title)
        .bind(&listing.company)
        .bind(&listing.url)
        .bind(listing.platform.as_str())
        .bind(&listing.location)
        .bind(&listing.snippet)
        .bind(&listing.salary)
        .bind(&listing.job_type)
        .bind(listing.date_posted.map(timestamps::encode))
        .bind(&date_found)
        .bind(&listing.external_id)
        .execute(&mut *tx)
        .await?;

        new_count += result.rows_affected();
    }

    tx.commit().await?;

    tracing::debug!(
        search_id = %search_id,
        candidates = listings.len(),
        new = new_count,
        "saved listings"
    );
    Ok(new_count)
}

/// Look up a listing by canonical URL.
pub async fn get_by_url(pool: &Pool<Sqlite>, url: &str) -> Result<Option<JobListing>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM jobs WHERE url = ?"))
        .bind(url)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(parse_listing).transpose()
}

/// Listings first found by a search, newest first.
pub async fn list_for_search(
    pool: &Pool<Sqlite>,
    search_id: SearchId,
    limit: u32,
    new_only: bool,
) -> Result<Vec<JobListing>> {
    let filter = if new_only { "AND is_new = 1" } else { "" };
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM jobs
         WHERE search_id = ? {filter}
         ORDER BY date_found DESC, id DESC
         LIMIT ?"
    ))
    .bind(search_id.get())
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.iter().map(parse_listing).collect()
}

/// Listings found in the last `hours`, newest first.
pub async fn recent(pool: &Pool<Sqlite>, hours: u32, limit: u32) -> Result<Vec<JobListing>> {
    let cutoff = Utc::now() - Duration::hours(i64::from(hours));
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM jobs
         WHERE date_found >= ?
         ORDER BY date_found DESC, id DESC
         LIMIT ?"
    ))
    .bind(timestamps::encode(cutoff))
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.iter().map(parse_listing).collect()
}

/// Clear the new flag on every listing of a search. Returns the number of
/// listings changed.
pub async fn mark_seen(pool: &Pool<Sqlite>, search_id: SearchId) -> Result<u64> {
    let result = sqlx::query("UPDATE jobs SET is_new = 0 WHERE search_id = ? AND is_new = 1")
        .bind(search_id.get())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Totals for dashboards.
pub async fn dashboard_stats(pool: &Pool<Sqlite>) -> Result<DashboardStats> {
    let cutoff = timestamps::encode(Utc::now() - Duration::hours(24));

    let (total_jobs, new_jobs, jobs_last_24h): (i64, i64, i64) = sqlx::query_as(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN is_new = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN date_found >= ? THEN 1 ELSE 0 END), 0)
         FROM jobs",
    )
    .bind(cutoff)
    .fetch_one(pool)
    .await?;

    let by_platform: Vec<(String, i64)> =
        sqlx::query_as("SELECT platform, COUNT(*) FROM jobs GROUP BY platform")
            .fetch_all(pool)
            .await?;

    Ok(DashboardStats {
        total_jobs,
        new_jobs,
        jobs_last_24h,
        by_platform: by_platform.into_iter().collect(),
    })
}

fn parse_listing(row: &SqliteRow) -> Result<JobListing> {
    let date_posted: Option<String> = row.try_get("date_posted")?;
    let date_found: String = row.try_get("date_found")?;
    let search_id: i64 = row.try_get("search_id")?;

    Ok(JobListing {
        id: row.try_get("id")?,
        search_id: SearchId::new(search_id),
        title: row.try_get("title")?,
        company: row.try_get("company")?,
        url: row.try_get("url")?,
        platform: row.try_get("platform")?,
        location: row.try_get("location")?,
        snippet: row.try_get("snippet")?,
        salary: row.try_get("salary")?,
        job_type: row.try_get("job_type")?,
        date_posted: timestamps::decode_opt(date_posted)?,
        date_found: timestamps::decode(&date_found)?,
        is_new: row.try_get("is_new")?,
        external_id: row.try_get("external_id")?,
    })
}
