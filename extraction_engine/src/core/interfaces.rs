// @file: extraction_engine/src/core/interfaces.rs
// @description: Traits for the exchange client, the workflow orchestrator and the object store.
// @author: LAS.

use async_trait::async_trait;
use crate::core::errors::{OrchestratorError, StoreError};
use crate::core::models::{
    ApiEnvelope, ExecutionHandle, ExecutionPoll, RecordKind, TimeWindow, WorkflowInput,
};


//
// EXCHANGE CLIENT
//

/// Narrow, signed access to the exchange's history endpoints.
///
/// Every operation hands back the decoded envelope unmodified. Transport
/// errors and non-2xx statuses come back as synthetic envelopes, never as
/// `Err`, so callers branch on `code` alone.
#[async_trait]
pub trait ExchangeHistoryClient: Send + Sync {
    async fn list_symbols(&self) -> ApiEnvelope;

    async fn fetch_history_page(
        &self,
        symbol: &str,
        window: &TimeWindow,
        cursor: Option<&str>,
        page_size: u32,
    ) -> ApiEnvelope;

    async fn fetch_fills_page(
        &self,
        symbol: &str,
        window: &TimeWindow,
        cursor: Option<&str>,
        page_size: u32,
    ) -> ApiEnvelope;

    /// Dispatch on record kind so the paginator stays endpoint-agnostic.
    async fn fetch_page(
        &self,
        kind: RecordKind,
        symbol: &str,
        window: &TimeWindow,
        cursor: Option<&str>,
        page_size: u32,
    ) -> ApiEnvelope {
        match kind {
            RecordKind::Orders => self.fetch_history_page(symbol, window, cursor, page_size).await,
            RecordKind::Fills => self.fetch_fills_page(symbol, window, cursor, page_size).await,
        }
    }
}


//
// WORKFLOW ORCHESTRATOR
//

#[async_trait]
pub trait WorkflowOrchestrator: Send + Sync {
    async fn start(&self, input: WorkflowInput) -> Result<ExecutionHandle, OrchestratorError>;

    async fn poll(&self, handle: &ExecutionHandle) -> Result<ExecutionPoll, OrchestratorError>;

    async fn abort(&self, handle: &ExecutionHandle) -> Result<(), OrchestratorError>;
}


//
// OBJECT STORE
//

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn ensure_bucket_exists(&self, bucket: &str) -> Result<(), StoreError>;

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    async fn list(&self, bucket: &str) -> Result<Vec<String>, StoreError>;
}
