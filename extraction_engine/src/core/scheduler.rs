// @file: extraction_engine/src/core/scheduler.rs
// @description: Runs the paginator for many symbols concurrently under a worker cap.
// @author: LAS.

use std::sync::Arc;
use futures_util::stream::{self, StreamExt};
use log::{error, info};
use crate::core::errors::FetchError;
use crate::core::interfaces::ExchangeHistoryClient;
use crate::core::models::{FetchJob, SymbolFailure, SymbolOutcome};
use crate::core::paginator::paginate_symbol;


//
// PUBLIC INTERFACE
//

/// Worker count actually used: never above the number of symbols, never zero.
pub fn effective_workers(max_workers: usize, symbol_count: usize) -> usize {
    max_workers.min(symbol_count).max(1)
}

/// Paginate every job with at most `max_workers` symbol tasks in flight.
///
/// Outcomes arrive in completion order. Each symbol runs in its own tokio
/// task, so a panic or failure in one never cancels its siblings.
pub async fn fan_out(
    client: Arc<dyn ExchangeHistoryClient>,
    jobs: Vec<FetchJob>,
    max_workers: usize,
) -> Vec<SymbolOutcome> {
    if jobs.is_empty() {
        return Vec::new();
    }

    let workers: usize = effective_workers(max_workers, jobs.len());
    info!("Fanning out {} symbol(s) across {} worker(s)", jobs.len(), workers);

    stream::iter(jobs.into_iter().map(|job| {
        let client = Arc::clone(&client);
        async move { run_job(client, job).await }
    }))
    .buffer_unordered(workers)
    .collect::<Vec<SymbolOutcome>>()
    .await
}


//
// INTERNAL HELPERS
//

async fn run_job(client: Arc<dyn ExchangeHistoryClient>, job: FetchJob) -> SymbolOutcome {
    let symbol: String = job.symbol.clone();

    // Spawned lazily so the buffer above is what bounds in-flight tasks.
    let handle = tokio::spawn(async move { paginate_symbol(client.as_ref(), &job).await });

    let failure: FetchError = match handle.await {
        Ok(Ok(records)) => return Ok(records),
        Ok(Err(e)) => e,
        Err(join_error) => FetchError::TaskFailed(join_error.to_string()),
    };

    error!("Fetch failed for {}: {}", symbol, failure);
    Err(SymbolFailure { symbol, error: failure.to_string() })
}
