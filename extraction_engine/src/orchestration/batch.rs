// @file: extraction_engine/src/orchestration/batch.rs
// @description: Splits large symbol sets into batches, runs a batch as one retriable unit, and reduces batch outputs.
// @author: LAS.

use std::sync::Arc;
use log::{info, warn};
use crate::core::interfaces::ExchangeHistoryClient;
use crate::core::merge::{merge_outcomes, MergeOutcome};
use crate::core::models::{BatchOutput, JobTemplate, RecordKind, SymbolBatch, SymbolOutcome};
use crate::core::scheduler::fan_out;


//
// PARTITIONING
//

/// Fixed-size, order-preserving batches. The last batch may be shorter.
pub fn partition_symbols(symbols: &[String], batch_size: usize) -> Vec<SymbolBatch> {
    symbols
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, chunk)| SymbolBatch { index, symbols: chunk.to_vec() })
        .collect()
}


/// Split one symbol-fetch budget across concurrently running batches.
///
/// Returns `(concurrent_batches, workers_per_batch)`; their product never
/// exceeds `max_workers`.
pub fn split_worker_budget(max_workers: usize, batch_workers: usize) -> (usize, usize) {
    let max_workers: usize = max_workers.max(1);
    let concurrent_batches: usize = batch_workers.clamp(1, max_workers);
    (concurrent_batches, max_workers / concurrent_batches)
}


//
// BATCH EXECUTION
//

/// Run one batch through the fan-out scheduler.
///
/// A batch in which every symbol failed is treated as a failed unit and
/// re-run on its own, up to `max_attempts` times in total.
pub async fn run_batch(
    client: Arc<dyn ExchangeHistoryClient>,
    batch: &SymbolBatch,
    template: &JobTemplate,
    max_workers: usize,
    max_attempts: u32,
) -> BatchOutput {
    let max_attempts: u32 = max_attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let jobs = template.jobs_for(&batch.symbols);
        let outcomes: Vec<SymbolOutcome> = fan_out(Arc::clone(&client), jobs, max_workers).await;

        let all_failed: bool = !outcomes.is_empty() && outcomes.iter().all(|o| o.is_err());
        if all_failed && attempt < max_attempts {
            warn!(
                "Batch {} failed for all {} symbol(s) on attempt {}/{}; retrying",
                batch.index, batch.symbols.len(), attempt, max_attempts
            );
            continue;
        }

        let mut output = BatchOutput { batch_index: batch.index, attempts: attempt, ..Default::default() };
        for outcome in outcomes {
            match outcome {
                Ok(records) => output.results.push(records),
                Err(failure) => output.failures.push(failure),
            }
        }

        info!(
            "Batch {} done: {} ok, {} failed, {} attempt(s)",
            batch.index, output.results.len(), output.failures.len(), attempt
        );
        return output;
    }
}


//
// REDUCTION
//

/// Same merge as the single-run path, applied across batch outputs.
///
/// Outputs are ordered by batch index first so first-wins dedup does not
/// depend on which batch finished first.
pub fn reduce_batches(mut outputs: Vec<BatchOutput>, kind: RecordKind) -> MergeOutcome {
    outputs.sort_by_key(|output| output.batch_index);
    let batch_count: usize = outputs.len();

    let outcomes = outputs.into_iter().flat_map(|output| {
        let successes = output.results.into_iter().map(Ok);
        let failures = output.failures.into_iter().map(Err);
        successes.chain(failures).collect::<Vec<SymbolOutcome>>()
    });

    let mut merged = merge_outcomes(outcomes, kind);
    merged.stats.batches = batch_count;
    merged
}
