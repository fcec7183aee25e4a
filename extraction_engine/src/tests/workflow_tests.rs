// @file: extraction_engine/src/tests/workflow_tests.rs
// @description: Bounded polling of executions and the in-process orchestrator lifecycle.
// @author: LAS.

#[cfg(test)]
mod workflow_tests {
    use crate::core::errors::OrchestratorError;
    use crate::core::interfaces::{ExchangeHistoryClient, WorkflowOrchestrator};
    use crate::core::models::{
        BatchOutput, ExecutionHandle, ExecutionStatus, RecordKind, TimeWindow, WorkflowInput,
    };
    use crate::orchestration::workflow::{poll_until_terminal, InProcessOrchestrator};
    use crate::tests::mock_exchange::{
        array_page, fast_pagination, finished, order, running, symbols, MockExchange,
        ScriptedOrchestrator,
    };
    use crate::utils::config::BatchSettings;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    //
    // CONSTANTS
    //

    const POLL: Duration = Duration::from_millis(2);
    const BUDGET: Duration = Duration::from_secs(5);

    fn handle() -> ExecutionHandle {
        ExecutionHandle("scripted-1".to_string())
    }

    fn input(names: &[&str]) -> WorkflowInput {
        WorkflowInput { symbols: symbols(names), window: TimeWindow::default(), kind: RecordKind::Orders }
    }

    //
    // POLLING
    //

    #[tokio::test]
    async fn test_poll_returns_output_on_success() {
        let orchestrator = ScriptedOrchestrator::new(vec![
            running(),
            running(),
            finished(ExecutionStatus::Succeeded, Some(json!([])), None),
        ]);

        let output = poll_until_terminal(&orchestrator, &handle(), POLL, BUDGET).await.unwrap();

        assert_eq!(output, json!([]));
        assert_eq!(orchestrator.poll_count(), 3);
    }

    #[tokio::test]
    async fn test_poll_reports_terminal_failure() {
        let orchestrator = ScriptedOrchestrator::new(vec![
            finished(ExecutionStatus::TimedOut, None, Some("states.Timeout")),
        ]);

        let error = poll_until_terminal(&orchestrator, &handle(), POLL, BUDGET).await.unwrap_err();

        assert_eq!(error, OrchestratorError::Terminal {
            status: ExecutionStatus::TimedOut,
            reason: "states.Timeout".to_string(),
        });
    }

    #[tokio::test]
    async fn test_success_without_output_is_malformed() {
        let orchestrator = ScriptedOrchestrator::new(vec![finished(ExecutionStatus::Succeeded, None, None)]);

        let error = poll_until_terminal(&orchestrator, &handle(), POLL, BUDGET).await.unwrap_err();

        assert!(matches!(error, OrchestratorError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn test_exhausted_budget_aborts_execution() {
        let orchestrator = ScriptedOrchestrator::new(vec![running()]);
        let budget = Duration::from_millis(20);

        let error = poll_until_terminal(&orchestrator, &handle(), Duration::from_millis(5), budget)
            .await
            .unwrap_err();

        assert_eq!(error, OrchestratorError::BudgetExhausted(budget));
        assert_eq!(orchestrator.abort_count(), 1);
        assert!(orchestrator.poll_count() >= 1);
    }

    #[tokio::test]
    async fn test_failed_poll_aborts_execution() {
        // An empty script makes every poll fail.
        let orchestrator = ScriptedOrchestrator::new(Vec::new());

        let error = poll_until_terminal(&orchestrator, &handle(), POLL, BUDGET).await.unwrap_err();

        assert!(matches!(error, OrchestratorError::Poll(_)));
        assert_eq!(orchestrator.poll_count(), 1);
        assert_eq!(orchestrator.abort_count(), 1);
    }

    //
    // IN-PROCESS ORCHESTRATOR
    //

    fn in_process(exchange: Arc<MockExchange>) -> InProcessOrchestrator {
        let client: Arc<dyn ExchangeHistoryClient> = exchange;
        let batch = BatchSettings { batch_size: 2, batch_workers: 2, ..Default::default() };
        InProcessOrchestrator::new(client, fast_pagination(10), batch, 4)
    }

    #[tokio::test]
    async fn test_in_process_execution_runs_every_batch() {
        let mut exchange = MockExchange::new();
        for (i, name) in ["A", "B", "C", "D", "E"].iter().enumerate() {
            exchange = exchange.with_pages(name, vec![array_page(vec![order(&format!("{}-1", name), i as i64)])]);
        }
        let orchestrator = in_process(Arc::new(exchange));

        let handle = orchestrator.start(input(&["A", "B", "C", "D", "E"])).await.unwrap();
        let output = poll_until_terminal(&orchestrator, &handle, POLL, BUDGET).await.unwrap();
        let mut batches: Vec<BatchOutput> = serde_json::from_value(output).unwrap();
        batches.sort_by_key(|b| b.batch_index);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches.iter().map(|b| b.results.len()).sum::<usize>(), 5);
        assert_eq!(batches[2].results[0].symbol, "E");

        // Terminal status was reported; the execution is released.
        assert_eq!(
            orchestrator.poll(&handle).await,
            Err(OrchestratorError::UnknownExecution(handle.to_string()))
        );
    }

    #[tokio::test]
    async fn test_concurrent_batches_share_one_worker_cap() {
        // #1. Forty slow symbols, four batches of ten running side by side
        let names: Vec<String> = (0..40).map(|i| format!("SYM{}USDT", i)).collect();
        let mut exchange = MockExchange::new().with_latency(Duration::from_millis(10));
        for name in &names {
            exchange = exchange.with_pages(name, vec![array_page(vec![order(name, 100)])]);
        }
        let exchange = Arc::new(exchange);
        let client: Arc<dyn ExchangeHistoryClient> = exchange.clone();
        let batch = BatchSettings { batch_size: 10, batch_workers: 4, ..Default::default() };
        let orchestrator = InProcessOrchestrator::new(client, fast_pagination(10), batch, 10);

        // #2. Run to completion
        let input = WorkflowInput { symbols: names, window: TimeWindow::default(), kind: RecordKind::Orders };
        let handle = orchestrator.start(input).await.unwrap();
        let output = poll_until_terminal(&orchestrator, &handle, POLL, BUDGET).await.unwrap();
        let batches: Vec<BatchOutput> = serde_json::from_value(output).unwrap();

        assert_eq!(batches.iter().map(|b| b.results.len()).sum::<usize>(), 40);
        assert!(exchange.max_in_flight() <= 10, "max in flight was {}", exchange.max_in_flight());
    }

    #[tokio::test]
    async fn test_in_process_rejects_empty_input_and_unknown_handles() {
        let orchestrator = in_process(Arc::new(MockExchange::new()));

        assert!(matches!(orchestrator.start(input(&[])).await, Err(OrchestratorError::Start(_))));
        assert_eq!(
            orchestrator.poll(&ExecutionHandle("exec-404".to_string())).await,
            Err(OrchestratorError::UnknownExecution("exec-404".to_string()))
        );
    }

    #[tokio::test]
    async fn test_abort_marks_running_execution_aborted() {
        let exchange = MockExchange::new().with_latency(Duration::from_secs(30));
        let orchestrator = in_process(Arc::new(exchange));

        let handle = orchestrator.start(input(&["A"])).await.unwrap();
        orchestrator.abort(&handle).await.unwrap();
        let poll = orchestrator.poll(&handle).await.unwrap();

        assert_eq!(poll.status, ExecutionStatus::Aborted);
        assert!(poll.output.is_none());
        assert!(orchestrator.poll(&handle).await.is_err());
    }
}
