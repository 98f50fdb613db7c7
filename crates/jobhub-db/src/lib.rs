//! JobHub Database Layer
//!
//! Provides `SQLite` access for saved searches, deduplicated job listings,
//! execution telemetry and durable scheduler state. Uses `SQLx` with
//! embedded migrations.
//!
//! # Architecture
//!
//! - **Migrations**: SQL migrations are embedded and versioned using `SQLx`
//! - **Connection Pooling**: Configurable pool size (default: 5 connections)
//! - **Deduplication**: `jobs.url` is unique; inserts of known URLs are no-ops
//! - **Telemetry**: `execution_logs` is append-only
//!
//! # Example
//!
//! ```ignore
//! use jobhub_db::Database;
//!
//! let db = Database::new("jobhub.db").await?;
//! db.run_migrations().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod executions;
pub mod jobs;
pub mod migrations;
pub mod schedules;
pub mod searches;
mod timestamps;

// Re-export commonly used types
pub use error::{DatabaseError, Result};
pub use executions::{ExecutionRecord, NewExecution, PlatformStats};
pub use jobs::DashboardStats;
pub use searches::NewSearch;

use jobhub_core::DatabaseConfig;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// High-level database handle.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open the database at `path` (or `:memory:`) with the default pool size.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::open_pool(path, DatabaseConfig::default().max_connections).await?;
        Ok(Self { pool })
    }

    /// Open the database described by `config`, creating its directory.
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        let path = config
            .resolved_path()
            .map_err(|e| DatabaseError::Open(format!("cannot resolve database path: {e}")))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = connection::open_pool(&path, config.max_connections).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
