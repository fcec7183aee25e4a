// @file: extraction_engine/src/core/engine.rs
// @description: Extraction engine: validates requests, runs the local or batch path, merges and persists results.
// @author: LAS.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use log::{info, warn};
use serde_json::Value;
use crate::core::errors::{ExtractionError, OrchestratorError};
use crate::core::interfaces::{ExchangeHistoryClient, ObjectStore, WorkflowOrchestrator};
use crate::core::merge::{into_result, merge_outcomes};
use crate::core::models::{
    ApiEnvelope, BatchOutput, ExecutionMode, ExtractionRequest, ExtractionResult, JobTemplate,
    PaginationSettings, WorkflowInput,
};
use crate::core::scheduler::fan_out;
use crate::orchestration::batch::reduce_batches;
use crate::orchestration::storage::persist_result;
use crate::orchestration::workflow::poll_until_terminal;
use crate::utils::config::{AppConfig, BatchSettings};


//
// ENGINE STRUCT
//

#[derive(Clone)]
pub struct ExtractionEngine {
    client: Arc<dyn ExchangeHistoryClient>,
    pagination: PaginationSettings,
    max_workers: usize,
    batch: BatchSettings,
    orchestrator: Option<Arc<dyn WorkflowOrchestrator>>,
    store: Option<(Arc<dyn ObjectStore>, String)>,
}

impl ExtractionEngine {
    //
    // INITIALIZATION
    //

    pub fn new(client: Arc<dyn ExchangeHistoryClient>, config: &AppConfig) -> Self {
        Self::with_settings(
            client,
            config.pagination_settings(),
            config.max_workers,
            config.batch_settings(),
        )
    }

    pub fn with_settings(
        client: Arc<dyn ExchangeHistoryClient>,
        pagination: PaginationSettings,
        max_workers: usize,
        batch: BatchSettings,
    ) -> Self {
        Self {
            client,
            pagination,
            max_workers: max_workers.max(1),
            batch,
            orchestrator: None,
            store: None,
        }
    }

    pub fn with_orchestrator(mut self, orchestrator: Arc<dyn WorkflowOrchestrator>) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        self.store = Some((store, bucket.into()));
        self
    }


    //
    // SYMBOL DISCOVERY
    //

    pub async fn list_symbols(&self) -> Result<Vec<String>, ExtractionError> {
        let envelope = self.client.list_symbols().await;
        parse_symbol_listing(&envelope)
    }


    //
    // ENTRY POINT
    //

    /// Run the requested mode, then persist when a store is attached.
    pub async fn run(
        &self,
        request: &ExtractionRequest,
        mode: ExecutionMode,
    ) -> Result<ExtractionResult, ExtractionError> {
        let mut result = match mode {
            ExecutionMode::Local => self.extract(request).await?,
            ExecutionMode::Batch => self.extract_batched(request).await?,
        };

        if let Some((store, bucket)) = &self.store {
            let location = persist_result(store.as_ref(), bucket, request.kind, &result).await?;
            result.storage_location = Some(location);
        }

        Ok(result)
    }


    //
    // LOCAL PATH
    //

    /// Fan out over every requested symbol in this process.
    pub async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, ExtractionError> {
        let started = Instant::now();
        let symbols = normalize_symbols(&request.symbols)?;
        info!("Extracting {} for {} symbol(s) locally", request.kind, symbols.len());

        Ok(self.extract_subset(request, &symbols, started).await)
    }

    async fn extract_subset(
        &self,
        request: &ExtractionRequest,
        symbols: &[String],
        started: Instant,
    ) -> ExtractionResult {
        let jobs = self.template_for(request).jobs_for(symbols);
        let outcomes = fan_out(Arc::clone(&self.client), jobs, self.max_workers).await;
        let result = into_result(merge_outcomes(outcomes, request.kind), started);

        info!(
            "Extraction finished: {} record(s), {} failed symbol(s), {:.2}s",
            result.total_orders, result.failed_symbols.len(), result.duration_seconds
        );
        result
    }


    //
    // BATCH PATH
    //

    /// Hand batches to the orchestrator, reduce their outputs, and fall back to
    /// a bounded local run if the orchestrator is missing or fails.
    pub async fn extract_batched(&self, request: &ExtractionRequest) -> Result<ExtractionResult, ExtractionError> {
        let started = Instant::now();
        let symbols = normalize_symbols(&request.symbols)?;

        let workflow_result = match &self.orchestrator {
            Some(orchestrator) => self.run_workflow(orchestrator.as_ref(), request, &symbols).await,
            None => Err(OrchestratorError::Start("no orchestrator configured".to_string())),
        };

        match workflow_result {
            Ok(outputs) => {
                let mut result = into_result(reduce_batches(outputs, request.kind), started);
                if let Some(stats) = result.processing_stats.as_mut() {
                    stats.symbols_requested = symbols.len();
                }
                info!(
                    "Batch extraction finished: {} record(s) from {} symbol(s)",
                    result.total_orders, result.processed_symbols.len()
                );
                Ok(result)
            }
            Err(e) => {
                let limit: usize = self.batch.fallback_symbol_limit.min(symbols.len());
                warn!(
                    "Batch path unavailable ({}); falling back to local fan-out over {} of {} symbol(s)",
                    e, limit, symbols.len()
                );

                let mut result = self.extract_subset(request, &symbols[..limit], started).await;
                if let Some(stats) = result.processing_stats.as_mut() {
                    stats.symbols_requested = symbols.len();
                    stats.fallback_used = true;
                }
                Ok(result)
            }
        }
    }

    async fn run_workflow(
        &self,
        orchestrator: &dyn WorkflowOrchestrator,
        request: &ExtractionRequest,
        symbols: &[String],
    ) -> Result<Vec<BatchOutput>, OrchestratorError> {
        let input = WorkflowInput {
            symbols: symbols.to_vec(),
            window: request.window,
            kind: request.kind,
        };

        let handle = orchestrator.start(input).await?;
        let output: Value = poll_until_terminal(
            orchestrator,
            &handle,
            self.batch.poll_interval,
            self.batch.max_wait,
        )
        .await?;

        serde_json::from_value::<Vec<BatchOutput>>(output)
            .map_err(|e| OrchestratorError::MalformedOutput(e.to_string()))
    }


    //
    // INTERNAL HELPER
    //

    fn template_for(&self, request: &ExtractionRequest) -> JobTemplate {
        JobTemplate {
            window: request.window,
            kind: request.kind,
            pagination: self.pagination.clone(),
        }
    }
}


//
// VALIDATION & PARSING
//

/// Trim, drop blanks and drop repeats (first occurrence kept).
pub fn normalize_symbols(symbols: &[String]) -> Result<Vec<String>, ExtractionError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let normalized: Vec<String> = symbols
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && seen.insert(*s))
        .map(str::to_string)
        .collect();

    if normalized.is_empty() {
        return Err(ExtractionError::EmptySymbols);
    }
    Ok(normalized)
}

/// Symbol names from the public symbols listing; entries that carry a
/// `status` must be `online`.
pub fn parse_symbol_listing(envelope: &ApiEnvelope) -> Result<Vec<String>, ExtractionError> {
    if !envelope.is_success() {
        return Err(ExtractionError::SymbolListing {
            code: envelope.code.clone(),
            msg: envelope.msg.clone(),
        });
    }

    let entries = envelope.data.as_array().map(Vec::as_slice).unwrap_or_default();
    let symbols = entries
        .iter()
        .filter(|entry| match entry.get("status").and_then(Value::as_str) {
            Some(status) => status.eq_ignore_ascii_case("online"),
            None => true,
        })
        .filter_map(|entry| entry.get("symbol").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    Ok(symbols)
}
