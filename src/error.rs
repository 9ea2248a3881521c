use thiserror::Error;

/// Result type for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Errors that can occur during an ETL run.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Could not establish a connection to the purchases database
    #[error("database unavailable: {0}")]
    SourceUnavailable(#[source] sqlx::Error),

    /// The extraction query failed after the connection was established
    #[error("purchase query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    /// The ingestion endpoint answered with a non-retryable status
    #[error("delivery rejected for category {category_id}: status {status}")]
    DeliveryRejected { category_id: i32, status: u16 },

    /// Transient delivery failures exhausted the retry budget
    #[error("delivery failed for category {category_id} after {attempts} attempts: {reason}")]
    DeliveryTransient {
        category_id: i32,
        attempts: u32,
        reason: String,
    },

    /// HTTP client could not be constructed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}
