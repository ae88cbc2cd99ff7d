//! Table-level batch driver with checkpoints and interruption.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::annotate::{AnnotationPipeline, VariantOutcome};
use crate::error::VepError;
use crate::gateway::Transport;
use crate::table::{VariantTable, WriteOptions};

/// Progress information for a running batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchProgress {
    /// Total rows in the table
    pub total: usize,
    /// Rows processed so far
    pub processed: usize,
    /// Rows annotated from the cache
    pub cache_hits: usize,
    /// Rows annotated from a fresh request
    pub fetched: usize,
    /// Rows left without annotation
    pub skipped: usize,
    /// Time elapsed since start
    pub elapsed: Duration,
}

impl BatchProgress {
    /// Completion percentage.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.processed as f64 / self.total as f64) * 100.0
        }
    }

    /// Rows per second; 0.0 before any time has elapsed.
    pub fn items_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs < f64::EPSILON {
            0.0
        } else {
            self.processed as f64 / secs
        }
    }

    /// Estimate remaining time based on current rate.
    pub fn estimated_remaining(&self) -> Option<Duration> {
        let rate = self.items_per_second();
        if rate == 0.0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.processed);
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }
}

/// Batch output settings
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Rows between partial snapshots; 0 disables snapshots
    pub checkpoint_interval: usize,
    /// Output table; `None` keeps results in memory only
    pub output: Option<PathBuf>,
    pub write_options: WriteOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            checkpoint_interval: 1000,
            output: None,
            write_options: WriteOptions::default(),
        }
    }
}

/// How a batch ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed,
    /// Stopped by the interrupt flag
    Interrupted,
    /// Stopped by an unrecoverable error
    Failed(VepError),
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Interrupted => "interrupted",
            RunOutcome::Failed(_) => "failed",
        }
    }
}

/// Summary of a finished batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    pub cache_hits: usize,
    pub fetched: usize,
    /// Skipped rows by error code
    pub skipped: BTreeMap<String, usize>,
    pub elapsed: Duration,
    pub outcome: RunOutcome,
}

impl BatchSummary {
    /// Total skipped rows
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}

/// Annotate every row of `table` in order.
///
/// The interrupt flag is checked before each row. Every
/// `checkpoint_interval` rows the processed prefix is written to the output;
/// a failed snapshot is logged and the run continues. When the run ends for
/// any reason the processed prefix is written once more. Only a cache write
/// failure stops the run early with [`RunOutcome::Failed`].
pub fn run_batch<T, F>(
    pipeline: &mut AnnotationPipeline<'_, T>,
    table: &mut VariantTable,
    options: &BatchOptions,
    interrupt: &AtomicBool,
    mut progress_fn: F,
) -> BatchSummary
where
    T: Transport,
    F: FnMut(BatchProgress),
{
    let start = Instant::now();
    let total = table.len();
    table.set_annotation_columns(pipeline.extractor().columns());

    let mut progress = BatchProgress {
        total,
        processed: 0,
        cache_hits: 0,
        fetched: 0,
        skipped: 0,
        elapsed: Duration::ZERO,
    };
    let mut skipped: BTreeMap<String, usize> = BTreeMap::new();
    let mut outcome = RunOutcome::Completed;

    info!("Annotating {} variants", total);
    for row in 0..total {
        if interrupt.load(Ordering::SeqCst) {
            warn!("Interrupted after {} of {} variants", row, total);
            outcome = RunOutcome::Interrupted;
            break;
        }

        let result = table.key(row).and_then(|key| pipeline.annotate(&key));
        match result {
            Ok(VariantOutcome::CacheHit(record)) => {
                progress.cache_hits += 1;
                table.merge(row, record);
            }
            Ok(VariantOutcome::Fetched(record)) => {
                progress.fetched += 1;
                table.merge(row, record);
            }
            Ok(VariantOutcome::Skipped(e)) => {
                progress.skipped += 1;
                *skipped.entry(e.code().to_string()).or_default() += 1;
            }
            Err(e) if e.is_variant_local() => {
                error!("Skipping row {}: {}", row + 1, e.detailed_message());
                progress.skipped += 1;
                *skipped.entry(e.code().to_string()).or_default() += 1;
            }
            Err(e) => {
                error!("Stopping at row {}: {}", row + 1, e.detailed_message());
                outcome = RunOutcome::Failed(e);
                break;
            }
        }

        progress.processed = row + 1;
        progress.elapsed = start.elapsed();
        progress_fn(progress);

        if options.checkpoint_interval > 0 && progress.processed % options.checkpoint_interval == 0
        {
            checkpoint(table, options, progress.processed);
        }
    }

    if let Some(path) = &options.output {
        match table.write(path, &options.write_options, Some(progress.processed)) {
            Ok(()) => info!("Wrote {} rows to {}", progress.processed, path.display()),
            Err(e) => {
                error!("Failed to write {}: {}", path.display(), e);
                if outcome == RunOutcome::Completed {
                    outcome = RunOutcome::Failed(e);
                }
            }
        }
    }

    let summary = BatchSummary {
        total,
        processed: progress.processed,
        cache_hits: progress.cache_hits,
        fetched: progress.fetched,
        skipped,
        elapsed: start.elapsed(),
        outcome,
    };
    log_summary(pipeline, &summary);
    summary
}

/// Write the processed prefix, logging instead of failing.
fn checkpoint(table: &VariantTable, options: &BatchOptions, processed: usize) {
    let Some(path) = &options.output else {
        return;
    };
    match table.write(path, &options.write_options, Some(processed)) {
        Ok(()) => info!("Checkpoint: {} rows written to {}", processed, path.display()),
        Err(e) => warn!("Checkpoint at row {} failed: {}", processed, e),
    }
}

fn log_summary<T: Transport>(pipeline: &AnnotationPipeline<'_, T>, summary: &BatchSummary) {
    let secs = summary.elapsed.as_secs_f64();
    let message = format!(
        "Batch {} after {:.1}s: {} of {} variants ({} cached, {} fetched, {} skipped)",
        summary.outcome.as_str(),
        secs,
        summary.processed,
        summary.total,
        summary.cache_hits,
        summary.fetched,
        summary.skipped_total()
    );
    match &summary.outcome {
        RunOutcome::Completed => info!("{}", message),
        RunOutcome::Interrupted => warn!("{}", message),
        RunOutcome::Failed(e) => error!("{}: {}", message, e),
    }

    for (code, count) in &summary.skipped {
        info!("  {} skipped: {}", code, count);
    }

    let cache = pipeline.cache().stats();
    info!(
        "Cache: {} entries, {} added, {:.1}% hit rate",
        cache.size,
        cache.inserts,
        cache.hit_rate()
    );
    let (vep, liftover) = pipeline.gateway_stats();
    info!(
        "Requests: annotation {} ({} retries), liftover {} ({} retries)",
        vep.requests, vep.retries, liftover.requests, liftover.retries
    );
}
