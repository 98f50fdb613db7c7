//! Read access to saved searches.
//!
//! Searches are owned by the external CRUD layer. The engine reads them and
//! reacts to `is_active` and cadence changes; `create`, `set_active` and
//! `set_cadence` exist for that layer and for tests.

use crate::error::{DatabaseError, Result};
use crate::timestamps;
use chrono::Utc;
use jobhub_core::{Cadence, PlatformName, SearchCriteria, SearchId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

/// Fields for a new search.
#[derive(Debug, Clone)]
pub struct NewSearch {
    /// Free-text keywords
    pub keywords: String,
    /// Abstract job-type tags
    pub job_types: Vec<String>,
    /// Platforms to scrape, in order
    pub platforms: Vec<PlatformName>,
    /// Recurrence interval
    pub cadence: Cadence,
    /// Whether the search should be scheduled
    pub is_active: bool,
}

const COLUMNS: &str =
    "id, keywords, job_types, platforms, cadence_minutes, is_active, created_at, updated_at";

/// Insert a search.
pub async fn create(pool: &Pool<Sqlite>, search: &NewSearch) -> Result<SearchCriteria> {
    let now = Utc::now();
    let job_types = serde_json::to_string(&search.job_types)?;
    let platforms = serde_json::to_string(&search.platforms)?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO searches (keywords, job_types, platforms, cadence_minutes, is_active,
                               created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(&search.keywords)
    .bind(job_types)
    .bind(platforms)
    .bind(i64::from(search.cadence))
    .bind(search.is_active)
    .bind(timestamps::encode(now))
    .bind(timestamps::encode(now))
    .fetch_one(pool)
    .await?;

    Ok(SearchCriteria {
        id: SearchId::new(id),
        keywords: search.keywords.clone(),
        job_types: search.job_types.clone(),
        platforms: search.platforms.clone(),
        cadence: search.cadence,
        is_active: search.is_active,
        created_at: now,
        updated_at: now,
    })
}

/// Get a search by id.
pub async fn get(pool: &Pool<Sqlite>, search_id: SearchId) -> Result<Option<SearchCriteria>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM searches WHERE id = ?"))
        .bind(search_id.get())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(parse_search).transpose()
}

/// All active searches, ordered by id.
pub async fn list_active(pool: &Pool<Sqlite>) -> Result<Vec<SearchCriteria>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM searches WHERE is_active = 1 ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(parse_search).collect()
}

/// Ids of all active searches.
pub async fn active_ids(pool: &Pool<Sqlite>) -> Result<Vec<SearchId>> {
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM searches WHERE is_active = 1 ORDER BY id")
            .fetch_all(pool)
            .await?;

    Ok(ids.into_iter().map(SearchId::new).collect())
}

/// Activate or deactivate a search.
pub async fn set_active(pool: &Pool<Sqlite>, search_id: SearchId, active: bool) -> Result<()> {
    let result = sqlx::query("UPDATE searches SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(active)
        .bind(timestamps::encode(Utc::now()))
        .bind(search_id.get())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::SearchNotFound(search_id));
    }

    Ok(())
}

/// Change how often a search runs. Out-of-range values are clamped by
/// [`Cadence`] before they reach this point.
pub async fn set_cadence(
    pool: &Pool<Sqlite>,
    search_id: SearchId,
    cadence: Cadence,
) -> Result<()> {
    let result =
        sqlx::query("UPDATE searches SET cadence_minutes = ?, updated_at = ? WHERE id = ?")
            .bind(i64::from(cadence))
            .bind(timestamps::encode(Utc::now()))
            .bind(search_id.get())
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::SearchNotFound(search_id));
    }

    Ok(())
}

fn parse_search(row: &SqliteRow) -> Result<SearchCriteria> {
    let id: i64 = row.try_get("id")?;

    let job_types: String = row.try_get("job_types")?;
    let job_types: Vec<String> = serde_json::from_str(&job_types)
        .map_err(|e| DatabaseError::Decode(format!("invalid job_types for search {id}: {e}")))?;

    let platforms: String = row.try_get("platforms")?;
    let platforms: Vec<String> = serde_json::from_str(&platforms)
        .map_err(|e| DatabaseError::Decode(format!("invalid platforms for search {id}: {e}")))?;
    let platforms = platforms
        .into_iter()
        .filter_map(|name| match PlatformName::new(&name) {
            Ok(platform) => Some(platform),
            Err(e) => {
                tracing::warn!(search_id = id, platform = %name, error = %e, "ignoring invalid platform name");
                None
            }
        })
        .collect();

    let cadence: i64 = row.try_get("cadence_minutes")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(SearchCriteria {
        id: SearchId::new(id),
        keywords: row.try_get("keywords")?,
        job_types,
        platforms,
        cadence: Cadence::new(cadence),
        is_active: row.try_get("is_active")?,
        created_at: timestamps::decode(&created_at)?,
        updated_at: timestamps::decode(&updated_at)?,
    })
}
