//! Transformation step: group purchases by category and derive the wire
//! representation for each row.
//!
//! Pure — no I/O, no side effects. Safe to test with literal fixtures.

use std::collections::BTreeMap;

use crate::types::{CategoryBatch, OutboundRecord, PurchaseRecord};

/// Group purchase records into one [`CategoryBatch`] per distinct category id.
///
/// Records keep their extraction order within each batch. Every input record
/// lands in exactly one batch. The `BTreeMap` keys give callers a stable
/// iteration order across runs.
pub fn transform(records: &[PurchaseRecord]) -> BTreeMap<i32, CategoryBatch> {
    let mut batches: BTreeMap<i32, CategoryBatch> = BTreeMap::new();

    for record in records {
        batches
            .entry(record.category_id)
            .or_insert_with(|| CategoryBatch::new(record.category_id))
            .data
            .push(OutboundRecord::from(record));
    }

    batches
}
