// @file: extraction_engine/src/orchestration/workflow.rs
// @description: Bounded polling of workflow executions and an in-process orchestrator running batches on tokio tasks.
// @author: LAS.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use log::{error, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use crate::core::errors::OrchestratorError;
use crate::core::interfaces::{ExchangeHistoryClient, WorkflowOrchestrator};
use crate::core::models::{
    BatchOutput, ExecutionHandle, ExecutionPoll, ExecutionStatus, JobTemplate,
    PaginationSettings, WorkflowInput,
};
use crate::orchestration::batch::{partition_symbols, run_batch, split_worker_budget};
use crate::utils::config::BatchSettings;


//
// POLLING
//

/// Poll `handle` every `poll_interval` until it reaches a terminal status.
///
/// `SUCCEEDED` yields the execution output. `FAILED`, `TIMED_OUT` and
/// `ABORTED` are errors. When `max_wait` runs out, or a poll itself fails,
/// the execution is aborted explicitly before the error is returned.
pub async fn poll_until_terminal(
    orchestrator: &dyn WorkflowOrchestrator,
    handle: &ExecutionHandle,
    poll_interval: Duration,
    max_wait: Duration,
) -> Result<Value, OrchestratorError> {
    let deadline: Instant = Instant::now() + max_wait;

    loop {
        let poll: ExecutionPoll = match orchestrator.poll(handle).await {
            Ok(poll) => poll,
            Err(e) => {
                // The caller falls back to a local run; the execution must not keep fetching.
                warn!("Polling {} failed ({}); aborting", handle, e);
                abort_quietly(orchestrator, handle).await;
                return Err(e);
            }
        };

        match poll.status {
            ExecutionStatus::Running => {}
            ExecutionStatus::Succeeded => {
                return poll
                    .output
                    .ok_or_else(|| OrchestratorError::MalformedOutput("execution succeeded without output".to_string()));
            }
            status => {
                return Err(OrchestratorError::Terminal {
                    status,
                    reason: poll.error.unwrap_or_else(|| "no reason given".to_string()),
                });
            }
        }

        if Instant::now() + poll_interval > deadline {
            warn!("Execution {} exceeded its {:?} budget; aborting", handle, max_wait);
            abort_quietly(orchestrator, handle).await;
            return Err(OrchestratorError::BudgetExhausted(max_wait));
        }

        sleep(poll_interval).await;
    }
}

async fn abort_quietly(orchestrator: &dyn WorkflowOrchestrator, handle: &ExecutionHandle) {
    if let Err(e) = orchestrator.abort(handle).await {
        error!("Abort of {} failed: {}", handle, e);
    }
}


//
// IN-PROCESS ORCHESTRATOR
//

struct ExecutionState {
    poll: ExecutionPoll,
    task: Option<JoinHandle<()>>,
}

type ExecutionRegistry = Arc<RwLock<HashMap<ExecutionHandle, ExecutionState>>>;

/// Runs every batch of an execution as its own unit on a bounded fleet of
/// tokio tasks. Output is a JSON array of [`BatchOutput`].
pub struct InProcessOrchestrator {
    client: Arc<dyn ExchangeHistoryClient>,
    pagination: PaginationSettings,
    batch: BatchSettings,
    max_workers: usize,
    executions: ExecutionRegistry,
    next_id: AtomicU64,
}

impl InProcessOrchestrator {
    pub fn new(
        client: Arc<dyn ExchangeHistoryClient>,
        pagination: PaginationSettings,
        batch: BatchSettings,
        max_workers: usize,
    ) -> Self {
        Self {
            client,
            pagination,
            batch,
            max_workers,
            executions: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl WorkflowOrchestrator for InProcessOrchestrator {
    async fn start(&self, input: WorkflowInput) -> Result<ExecutionHandle, OrchestratorError> {
        if input.symbols.is_empty() {
            return Err(OrchestratorError::Start("no symbols provided".to_string()));
        }

        let handle = ExecutionHandle(format!("exec-{}", self.next_id.fetch_add(1, Ordering::Relaxed)));

        // #1. Register before spawning so an early poll never sees an unknown handle
        {
            let mut executions = self.executions.write().await;
            executions.insert(handle.clone(), ExecutionState {
                poll: ExecutionPoll { status: ExecutionStatus::Running, output: None, error: None },
                task: None,
            });
        }

        // #2. Spawn the execution
        let template = JobTemplate {
            window: input.window,
            kind: input.kind,
            pagination: self.pagination.clone(),
        };
        let task = tokio::spawn(run_execution(
            Arc::clone(&self.client),
            input.symbols,
            template,
            self.batch.clone(),
            self.max_workers,
            Arc::clone(&self.executions),
            handle.clone(),
        ));

        {
            let mut executions = self.executions.write().await;
            if let Some(state) = executions.get_mut(&handle) {
                state.task = Some(task);
            }
        }

        info!("Started execution {}", handle);
        Ok(handle)
    }

    /// A terminal status is reported once; the execution is forgotten afterwards.
    async fn poll(&self, handle: &ExecutionHandle) -> Result<ExecutionPoll, OrchestratorError> {
        let mut executions = self.executions.write().await;
        let poll: ExecutionPoll = executions
            .get(handle)
            .map(|state| state.poll.clone())
            .ok_or_else(|| OrchestratorError::UnknownExecution(handle.to_string()))?;

        if poll.status.is_terminal() {
            executions.remove(handle);
        }
        Ok(poll)
    }

    async fn abort(&self, handle: &ExecutionHandle) -> Result<(), OrchestratorError> {
        let mut executions = self.executions.write().await;
        let state = executions
            .get_mut(handle)
            .ok_or_else(|| OrchestratorError::UnknownExecution(handle.to_string()))?;

        if state.poll.status == ExecutionStatus::Running {
            if let Some(task) = state.task.take() {
                task.abort();
            }
            state.poll.status = ExecutionStatus::Aborted;
            state.poll.error = Some("aborted by caller".to_string());
        }
        Ok(())
    }
}

async fn run_execution(
    client: Arc<dyn ExchangeHistoryClient>,
    symbols: Vec<String>,
    template: JobTemplate,
    settings: BatchSettings,
    max_workers: usize,
    executions: ExecutionRegistry,
    handle: ExecutionHandle,
) {
    let batches = partition_symbols(&symbols, settings.batch_size);

    // #1. One credential set, one worker budget shared by all batches
    let (concurrent_batches, per_batch_workers) = split_worker_budget(max_workers, settings.batch_workers);
    info!(
        "Execution {}: {} symbol(s) in {} batch(es), {} at a time with {} worker(s) each",
        handle, symbols.len(), batches.len(), concurrent_batches, per_batch_workers
    );

    // #2. Run the batches
    let template: Arc<JobTemplate> = Arc::new(template);
    let max_attempts: u32 = settings.max_attempts;
    let outputs: Vec<BatchOutput> = stream::iter(batches.into_iter().map(|batch| {
        let client = Arc::clone(&client);
        let template = Arc::clone(&template);
        async move { run_batch(client, &batch, &template, per_batch_workers, max_attempts).await }
    }))
    .buffer_unordered(concurrent_batches)
    .collect()
    .await;

    // #3. Publish the outcome
    let poll = match serde_json::to_value(&outputs) {
        Ok(output) => ExecutionPoll { status: ExecutionStatus::Succeeded, output: Some(output), error: None },
        Err(e) => ExecutionPoll { status: ExecutionStatus::Failed, output: None, error: Some(e.to_string()) },
    };

    let mut executions = executions.write().await;
    if let Some(state) = executions.get_mut(&handle) {
        // An abort that landed first wins.
        if state.poll.status == ExecutionStatus::Running {
            state.poll = poll;
        }
        state.task = None;
    }
}
