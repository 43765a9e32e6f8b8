//! End-to-end `run` pipeline: listing feed → assemble rows → deliver batches.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{info, instrument, warn};

use tenderfeed_crawler::PageFetcher;
use tenderfeed_feed::ListingFeed;
use tenderfeed_shared::{Result, RunId, Tender};

use crate::assembler::TenderAssembler;
use crate::delivery::{DeliveryBatcher, QueueSink};

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    /// Rows the feed returned.
    pub rows: usize,
    /// Rows assembled into tenders.
    pub processed: usize,
    /// Rows rejected as malformed.
    pub skipped: usize,
    /// Messages the sink accepted.
    pub sent: usize,
    /// Messages lost to sink failures.
    pub failed: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each feed row, assembled or skipped.
    fn row_processed(&self, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn row_processed(&self, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

/// Assemble feed rows in order. Returns the tenders and the skipped count.
pub async fn assemble_rows<F: PageFetcher>(
    assembler: &TenderAssembler<F>,
    rows: &[Value],
    progress: &dyn ProgressReporter,
) -> (Vec<Tender>, usize) {
    let total = rows.len();
    let mut tenders = Vec::with_capacity(total);
    let mut skipped = 0;

    for (i, row) in rows.iter().enumerate() {
        match assembler.try_assemble(row).await {
            Ok(tender) => tenders.push(tender),
            Err(reason) => {
                skipped += 1;
                warn!(%reason, raw = %row, "skipping malformed row");
            }
        }
        progress.row_processed(i + 1, total);
    }

    (tenders, skipped)
}

/// Run the full pipeline once.
///
/// 1. Fetch the listing feed (failure aborts the run)
/// 2. Open the sink, only once the feed is known good
/// 3. Assemble each row, enriching from its detail page
/// 4. Deliver the tenders in batches
#[instrument(skip_all, fields(listing_url = %feed.listing_url()))]
pub async fn run<F, S, O>(
    feed: &ListingFeed,
    assembler: &TenderAssembler<F>,
    batcher: &DeliveryBatcher,
    open_sink: O,
    progress: &dyn ProgressReporter,
) -> Result<RunReport>
where
    F: PageFetcher,
    S: QueueSink,
    O: FnOnce() -> Result<S>,
{
    let start = Instant::now();
    let run_id = RunId::new();
    info!(%run_id, "starting run");

    // --- Phase 1: Feed ---
    progress.phase("Fetching open tenders");
    let page = feed.fetch().await?;
    let mut sink = open_sink()?;

    // --- Phase 2: Assemble ---
    progress.phase("Assembling tenders");
    let (tenders, skipped) = assemble_rows(assembler, &page.rows, progress).await;
    info!(processed = tenders.len(), "assembled tenders");
    if skipped > 0 {
        warn!(skipped, "skipped malformed rows");
    }

    // --- Phase 3: Deliver ---
    progress.phase("Delivering messages");
    let delivery = batcher.deliver(&tenders, &mut sink).await;

    let report = RunReport {
        run_id,
        rows: page.rows.len(),
        processed: tenders.len(),
        skipped,
        sent: delivery.sent,
        failed: delivery.failed,
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        run_id = %report.run_id,
        rows = report.rows,
        processed = report.processed,
        skipped = report.skipped,
        sent = report.sent,
        failed = report.failed,
        elapsed_ms = report.elapsed.as_millis(),
        "run complete"
    );

    Ok(report)
}
