//! Durable scheduler state.

use crate::error::Result;
use crate::timestamps;
use crate::{searches, Database};
use async_trait::async_trait;
use jobhub_core::{Cadence, SearchCriteria, SearchId};
use jobhub_scheduler::{ScheduleEntry, ScheduleStore, SchedulerError};
use sqlx::{Pool, Row, Sqlite};

/// Insert or replace the entry for a search.
pub async fn upsert(pool: &Pool<Sqlite>, entry: &ScheduleEntry) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO schedule_entries (search_id, cadence_minutes, next_run_at, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(search_id) DO UPDATE SET
            cadence_minutes = excluded.cadence_minutes,
            next_run_at = excluded.next_run_at,
            updated_at = excluded.updated_at
        ",
    )
    .bind(entry.search_id.get())
    .bind(i64::from(entry.cadence))
    .bind(timestamps::encode(entry.next_run_at))
    .bind(timestamps::encode(entry.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// All entries, ordered by search id.
pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<ScheduleEntry>> {
    let rows = sqlx::query(
        "SELECT search_id, cadence_minutes, next_run_at, updated_at
         FROM schedule_entries ORDER BY search_id",
    )
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let search_id: i64 = row.try_get("search_id")?;
        let cadence: i64 = row.try_get("cadence_minutes")?;
        let next_run_at: String = row.try_get("next_run_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        entries.push(ScheduleEntry {
            search_id: SearchId::new(search_id),
            cadence: Cadence::new(cadence),
            next_run_at: timestamps::decode(&next_run_at)?,
            updated_at: timestamps::decode(&updated_at)?,
        });
    }
    Ok(entries)
}

/// Delete the entry for a search. Returns `true` if one existed.
pub async fn delete(pool: &Pool<Sqlite>, search_id: SearchId) -> Result<bool> {
    let result = sqlx::query("DELETE FROM schedule_entries WHERE search_id = ?")
        .bind(search_id.get())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl ScheduleStore for Database {
    async fn load_criteria(
        &self,
        search_id: SearchId,
    ) -> jobhub_scheduler::Result<Option<SearchCriteria>> {
        searches::get(self.pool(), search_id)
            .await
            .map_err(SchedulerError::store)
    }

    async fn active_search_ids(&self) -> jobhub_scheduler::Result<Vec<SearchId>> {
        searches::active_ids(self.pool())
            .await
            .map_err(SchedulerError::store)
    }

    async fn load_entries(&self) -> jobhub_scheduler::Result<Vec<ScheduleEntry>> {
        list(self.pool()).await.map_err(SchedulerError::store)
    }

    async fn upsert_entry(&self, entry: &ScheduleEntry) -> jobhub_scheduler::Result<()> {
        upsert(self.pool(), entry).await.map_err(SchedulerError::store)
    }

    async fn remove_entry(&self, search_id: SearchId) -> jobhub_scheduler::Result<bool> {
        delete(self.pool(), search_id)
            .await
            .map_err(SchedulerError::store)
    }
}
