//! Extraction step: one windowed query against the purchases database.
//!
//! The `Extract` trait abstracts the source so the pipeline can be tested
//! without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;

use crate::error::{EtlError, Result};
use crate::types::PurchaseRecord;

/// Trait for extracting purchase records newer than a given instant.
#[async_trait]
pub trait Extract: Send + Sync {
    /// Fetch all purchases with `timestamp >= since`, in whatever order the
    /// source returns them.
    ///
    /// # Errors
    /// Returns `SourceUnavailable` if the connection cannot be established,
    /// or `QueryFailed` if the query errors after connecting.
    async fn extract(&self, since: DateTime<Utc>) -> Result<Vec<PurchaseRecord>>;
}

/// Production extractor backed by PostgreSQL.
///
/// Connects lazily inside [`extract`](Extract::extract) so the connection is
/// scoped to the extraction step and released on every exit path. The query
/// is a single attempt; there is no retry at this layer.
#[derive(Debug, Clone)]
pub struct PgExtractor {
    database_url: String,
}

impl PgExtractor {
    /// Create an extractor for the given connection string.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

#[async_trait]
impl Extract for PgExtractor {
    #[tracing::instrument(skip(self), fields(since = %since))]
    async fn extract(&self, since: DateTime<Utc>) -> Result<Vec<PurchaseRecord>> {
        tracing::info!("retrieving purchases since window start");

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.database_url)
            .await
            .map_err(EtlError::SourceUnavailable)?;

        let rows = sqlx::query_as::<_, PurchaseRecord>(
            r#"
            SELECT id, user_id, item, quantity, price, category_id, timestamp
            FROM purchases
            WHERE timestamp >= $1
            "#,
        )
        .bind(since)
        .fetch_all(&pool)
        .await;

        // The pool is scoped to this one query; close it before inspecting
        // the outcome so the connection is released even on failure.
        pool.close().await;

        let records = rows.map_err(EtlError::QueryFailed)?;
        tracing::info!(rows = records.len(), "retrieved purchase rows");
        Ok(records)
    }
}
