//! Hourly purchase ETL: extract recent rows from PostgreSQL, group them per
//! category, and deliver one JSON payload per category to the ingestion API.
//!
//! The pipeline is strictly sequential:
//! - Extracts purchases from the last hour in a single windowed query
//! - Groups them by category id, deriving the wire representation per row
//! - POSTs one batch per category, retrying transient failures with capped
//!   exponential backoff
//! - Folds every outcome into an aggregate run result; one category's
//!   failure never blocks another's delivery
//!
//! # Example
//! ```ignore
//! use purchase_etl::{DeliveryClient, PgExtractor, Pipeline, RetryPolicy};
//!
//! let extractor = PgExtractor::new(database_url);
//! let client = DeliveryClient::new(endpoint, api_token, RetryPolicy::default())?;
//!
//! let result = Pipeline::new(extractor, client).run().await;
//! assert!(result.is_success());
//! ```

pub mod config;
pub mod deliver;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod transform;
pub mod types;

// Re-export commonly used types
pub use config::Args;
pub use deliver::{DeliveryClient, RetryPolicy};
pub use error::{EtlError, Result};
pub use extract::{Extract, PgExtractor};
pub use pipeline::Pipeline;
pub use transform::transform;
pub use types::{CategoryBatch, OutboundRecord, PurchaseRecord, RunId, RunResult};
