use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for one ETL run, used to correlate log lines.
///
/// Rendered in a short, readable format like "run_abc123xy" instead of a
/// full UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Convert to a short, readable string format.
    ///
    /// Takes the first 8 hex characters of the UUID and formats as "run_xxxxxxxx".
    pub fn to_short_string(&self) -> String {
        let hex = format!("{:032x}", self.0.as_u128());
        format!("run_{}", &hex[..8])
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_short_string())
    }
}

/// A purchase row as extracted from the database.
///
/// Immutable once decoded; lives only for the duration of a single run.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PurchaseRecord {
    pub id: i64,
    pub user_id: i64,
    pub item: String,
    pub quantity: i32,
    pub price: Decimal,
    pub category_id: i32,
    pub timestamp: Option<DateTime<Utc>>,
}

impl PurchaseRecord {
    /// Total amount spent on this purchase, exactly `quantity * price`.
    pub fn total_spent(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}

/// A single record in the wire payload sent to the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRecord {
    pub user_id: i64,
    pub item_name: String,
    /// Serialized as a JSON number; the decimal type keeps the product exact
    /// internally.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_spent: Decimal,
    pub timestamp: Option<String>,
}

impl From<&PurchaseRecord> for OutboundRecord {
    fn from(purchase: &PurchaseRecord) -> Self {
        Self {
            user_id: purchase.user_id,
            item_name: purchase.item.to_uppercase(),
            total_spent: purchase.total_spent(),
            timestamp: purchase.timestamp.map(|t| t.to_rfc3339()),
        }
    }
}

/// All outbound records sharing one category id — the unit of delivery.
///
/// Wire form: `{"categoryId": <int>, "data": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBatch {
    pub category_id: i32,
    pub data: Vec<OutboundRecord>,
}

impl CategoryBatch {
    /// Create an empty batch for a category.
    pub fn new(category_id: i32) -> Self {
        Self {
            category_id,
            data: Vec::new(),
        }
    }
}

/// Aggregated outcome of one run: how many category batches were delivered
/// and how many failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    pub success_count: usize,
    pub failure_count: usize,
}

impl RunResult {
    /// Record one successfully delivered batch.
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    /// Record one failed batch (or an aborted extraction).
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }

    /// True when nothing failed. A run that extracted zero rows is a success.
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed",
            self.success_count, self.failure_count
        )
    }
}
