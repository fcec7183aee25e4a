// @file: extraction_engine/src/tests/batch_tests.rs
// @description: Symbol partitioning, whole-batch retry and deterministic reduction of batch outputs.
// @author: LAS.

#[cfg(test)]
mod batch_tests {
    use crate::core::interfaces::ExchangeHistoryClient;
    use crate::core::models::{BatchOutput, JobTemplate, Record, RecordKind, SymbolBatch, SymbolRecords};
    use crate::orchestration::batch::{partition_symbols, reduce_batches, run_batch, split_worker_budget};
    use crate::tests::mock_exchange::{array_page, fast_pagination, order, symbols, MockExchange};
    use serde_json::json;
    use std::sync::Arc;

    fn template() -> JobTemplate {
        JobTemplate { pagination: fast_pagination(10), ..Default::default() }
    }

    //
    // PARTITIONING
    //

    #[test]
    fn test_partition_preserves_order_and_sizes() {
        let batches = partition_symbols(&symbols(&["A", "B", "C", "D", "E"]), 2);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], SymbolBatch { index: 0, symbols: symbols(&["A", "B"]) });
        assert_eq!(batches[2], SymbolBatch { index: 2, symbols: symbols(&["E"]) });
    }

    #[test]
    fn test_partition_zero_size_is_one_per_batch() {
        assert_eq!(partition_symbols(&symbols(&["A", "B"]), 0).len(), 2);
        assert!(partition_symbols(&[], 5).is_empty());
    }

    #[test]
    fn test_worker_budget_is_shared_across_batches() {
        for (max_workers, batch_workers) in [(10, 4), (10, 1), (2, 4), (1, 1), (0, 0), (7, 7)] {
            let (batches, per_batch) = split_worker_budget(max_workers, batch_workers);
            assert!(batches >= 1 && per_batch >= 1);
            assert!(batches * per_batch <= max_workers.max(1), "{}x{} for cap {}", batches, per_batch, max_workers);
        }
        assert_eq!(split_worker_budget(10, 4), (4, 2));
        assert_eq!(split_worker_budget(2, 4), (2, 1));
    }

    //
    // BATCH EXECUTION
    //

    #[tokio::test]
    async fn test_fully_failed_batch_is_retried_as_a_unit() {
        let exchange = Arc::new(MockExchange::new().with_failing("A").with_failing("B"));
        let client: Arc<dyn ExchangeHistoryClient> = exchange.clone();
        let batch = SymbolBatch { index: 3, symbols: symbols(&["A", "B"]) };

        let output = run_batch(client, &batch, &template(), 4, 2).await;

        assert_eq!(output.batch_index, 3);
        assert_eq!(output.attempts, 2);
        assert_eq!(output.failures.len(), 2);
        assert_eq!(exchange.fetch_count(), 4);
    }

    #[tokio::test]
    async fn test_partially_failed_batch_is_not_retried() {
        let exchange = Arc::new(
            MockExchange::new()
                .with_failing("A")
                .with_pages("B", vec![array_page(vec![order("b1", 10)])]),
        );
        let client: Arc<dyn ExchangeHistoryClient> = exchange.clone();
        let batch = SymbolBatch { index: 0, symbols: symbols(&["A", "B"]) };

        let output = run_batch(client, &batch, &template(), 4, 3).await;

        assert_eq!(output.attempts, 1);
        assert_eq!(output.results.len(), 1);
        assert_eq!(output.failures.len(), 1);
    }

    //
    // REDUCTION
    //

    #[test]
    fn test_reduce_orders_by_batch_index_before_dedup() {
        let shared = |version: &str| {
            Record::from_value(json!({ "symbol": "BTCUSDT", "orderId": "1", "cTime": "100", "v": version })).unwrap()
        };
        let output = |index: usize, version: &str| BatchOutput {
            batch_index: index,
            results: vec![SymbolRecords {
                symbol: format!("S{}", index),
                records: vec![shared(version)],
                pages_fetched: 1,
                truncated: None,
            }],
            failures: Vec::new(),
            attempts: 1,
        };

        // Completion order is reversed on purpose.
        let merged = reduce_batches(
            vec![output(2, "late"), output(0, "early"), output(1, "middle")],
            RecordKind::Orders,
        );

        assert_eq!(merged.stats.batches, 3);
        assert_eq!(merged.stats.duplicates_removed, 2);
        assert_eq!(merged.records.len(), 1);
        assert_eq!(merged.records[0].get("v"), Some(&json!("early")));
        assert_eq!(merged.processed_symbols, vec!["S0", "S1", "S2"]);
    }
}
