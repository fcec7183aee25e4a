// @file: extraction_engine/src/core/merge.rs
// @description: Concatenates per-symbol results, removes duplicates (first wins) and sorts newest first.
// @author: LAS.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Instant;
use crate::core::models::{
    ExtractionResult, ProcessingStats, Record, RecordKey, RecordKind, SymbolFailure, SymbolOutcome,
};


//
// TYPE DEFINITIONS
//

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub records: Vec<Record>,
    pub failures: Vec<SymbolFailure>,
    pub processed_symbols: Vec<String>,
    pub stats: ProcessingStats,
}


//
// PIPELINE STEPS
//

/// Keep the first record seen for each identity of `kind`. Returns the kept
/// records and how many were dropped.
pub fn dedup_first_wins(records: Vec<Record>, kind: RecordKind) -> (Vec<Record>, usize) {
    let total: usize = records.len();
    let mut seen: HashSet<RecordKey> = HashSet::with_capacity(total);

    let kept: Vec<Record> = records
        .into_iter()
        .filter(|record| seen.insert(record.key(kind)))
        .collect();

    let removed = total - kept.len();
    (kept, removed)
}

/// Stable descending sort on the logical timestamp.
pub fn sort_newest_first(records: &mut [Record]) {
    records.sort_by_cached_key(|record| Reverse(record.timestamp()));
}

/// Fold symbol outcomes (in the order given) into one deduplicated, sorted list.
pub fn merge_outcomes<I>(outcomes: I, kind: RecordKind) -> MergeOutcome
where
    I: IntoIterator<Item = SymbolOutcome>,
{
    let mut concatenated: Vec<Record> = Vec::new();
    let mut failures: Vec<SymbolFailure> = Vec::new();
    let mut processed_symbols: Vec<String> = Vec::new();
    let mut stats = ProcessingStats::default();

    // #1. Concatenate successes; keep failures aside for diagnostics
    for outcome in outcomes {
        match outcome {
            Ok(symbol_records) => {
                stats.pages_fetched += u64::from(symbol_records.pages_fetched);
                if symbol_records.truncated.is_some() {
                    stats.symbols_truncated += 1;
                }
                processed_symbols.push(symbol_records.symbol);
                concatenated.extend(symbol_records.records);
            }
            Err(failure) => failures.push(failure),
        }
    }

    // #2. Deduplicate, then #3. order
    let (mut records, removed) = dedup_first_wins(concatenated, kind);
    sort_newest_first(&mut records);

    stats.symbols_succeeded = processed_symbols.len();
    stats.symbols_failed = failures.len();
    stats.symbols_requested = processed_symbols.len() + failures.len();
    stats.duplicates_removed = removed;

    MergeOutcome { records, failures, processed_symbols, stats }
}

/// Shape a merge into the caller-visible result.
pub fn into_result(merged: MergeOutcome, started: Instant) -> ExtractionResult {
    let duration: f64 = started.elapsed().as_secs_f64();
    let total_orders: usize = merged.records.len();

    ExtractionResult {
        success: !merged.processed_symbols.is_empty(),
        data: merged.records,
        duration_seconds: (duration * 100.0).round() / 100.0,
        total_orders,
        processed_symbols: merged.processed_symbols,
        failed_symbols: merged.failures,
        processing_stats: Some(merged.stats),
        storage_location: None,
    }
}
