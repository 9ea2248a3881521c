//! Orchestration: extract, transform, and deliver, folding every fault into
//! an aggregate [`RunResult`].

use chrono::{Duration, Utc};
use tracing::{error, info, Instrument};

use crate::deliver::DeliveryClient;
use crate::error::Result;
use crate::extract::Extract;
use crate::transform::transform;
use crate::types::{RunId, RunResult};

/// Fixed lookback window: each run covers the last hour of purchases.
const LOOKBACK_HOURS: i64 = 1;

/// One ETL run: extract the window, group by category, deliver each batch.
///
/// The pipeline owns nothing beyond the extractor and the delivery client,
/// and is discarded after a single run.
pub struct Pipeline<E: Extract> {
    extractor: E,
    client: DeliveryClient,
}

impl<E: Extract> Pipeline<E> {
    /// Create a pipeline from an extractor and a delivery client.
    pub fn new(extractor: E, client: DeliveryClient) -> Self {
        Self { extractor, client }
    }

    /// Run the pipeline once.
    ///
    /// Never returns an error: extraction failures are logged and folded into
    /// the result as one recorded failure, and each batch's delivery outcome
    /// is accumulated independently — one category failing never stops the
    /// others from being attempted.
    pub async fn run(&self) -> RunResult {
        let run_id = RunId::new();
        let span = tracing::info_span!("etl_run", run_id = %run_id);

        async {
            match self.try_run().await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "run aborted before any delivery");
                    let mut result = RunResult::default();
                    result.record_failure();
                    result
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run the pipeline, propagating extraction errors only. Delivery errors
    /// are handled per batch and never escape this function.
    async fn try_run(&self) -> Result<RunResult> {
        let since = Utc::now() - Duration::hours(LOOKBACK_HOURS);
        info!(since = %since, "starting ETL run");

        let records = self.extractor.extract(since).await?;
        if records.is_empty() {
            info!("no purchases in window, nothing to deliver");
            return Ok(RunResult::default());
        }

        let batches = transform(&records);
        info!(
            rows = records.len(),
            categories = batches.len(),
            "grouped purchases into category batches"
        );

        let mut result = RunResult::default();
        for batch in batches.values() {
            match self.client.deliver(batch).await {
                Ok(()) => {
                    info!(
                        category_id = batch.category_id,
                        records = batch.data.len(),
                        "batch delivered"
                    );
                    result.record_success();
                }
                Err(e) => {
                    error!(
                        category_id = batch.category_id,
                        records = batch.data.len(),
                        error = %e,
                        "batch delivery failed"
                    );
                    result.record_failure();
                }
            }
        }

        info!(%result, "ETL run complete");
        Ok(result)
    }
}
