// @file: extraction_engine/src/tests/mock_exchange.rs
// @description: Scripted in-memory doubles for the exchange client, object store and workflow orchestrator.
// @author: LAS.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;
use crate::core::errors::{OrchestratorError, StoreError};
use crate::core::interfaces::{ExchangeHistoryClient, ObjectStore, WorkflowOrchestrator};
use crate::core::models::{
    ApiEnvelope, ExecutionHandle, ExecutionPoll, ExecutionStatus, PaginationSettings, RecordKind,
    TimeWindow, WorkflowInput,
};
use crate::core::retry::RetryPolicy;


//
// FIXTURES
//

pub fn order(id: &str, timestamp: i64) -> Value {
    json!({ "orderId": id, "cTime": timestamp.to_string(), "side": "buy" })
}

/// Bare-array page, the shape Bitget v2 history endpoints answer with.
pub fn array_page(items: Vec<Value>) -> ApiEnvelope {
    ApiEnvelope::success(Value::Array(items))
}

pub fn flagged_page(items: Vec<Value>, next_flag: bool) -> ApiEnvelope {
    ApiEnvelope::success(json!({ "orderList": items, "nextFlag": next_flag }))
}

pub fn cursor_page(items: Vec<Value>, cursor: &str) -> ApiEnvelope {
    ApiEnvelope::success(json!({ "data": items, "cursor": cursor }))
}

/// Small pages, near-zero delays.
pub fn fast_pagination(page_size: u32) -> PaginationSettings {
    PaginationSettings {
        page_size,
        inter_page_delay: Duration::from_millis(1),
        max_pages: None,
        retry: RetryPolicy { backoff: Duration::from_millis(1), max_retries: 1 },
    }
}

pub fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}


//
// MOCK EXCHANGE
//

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: RecordKind,
    pub symbol: String,
    pub cursor: Option<String>,
    pub page_size: u32,
}

/// Serves each symbol's scripted envelopes in order, then empty pages.
#[derive(Default)]
pub struct MockExchange {
    scripts: Mutex<HashMap<String, VecDeque<ApiEnvelope>>>,
    failing: HashSet<String>,
    listing: Option<ApiEnvelope>,
    latency: Duration,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(self, symbol: &str, pages: Vec<ApiEnvelope>) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.entry(symbol.to_string()).or_default().extend(pages);
        }
        self
    }

    /// Every request for `symbol` is rejected with a non-retriable code.
    pub fn with_failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    pub fn with_listing(mut self, listing: ApiEnvelope) -> Self {
        self.listing = Some(listing);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn calls_for(&self, symbol: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.symbol == symbol).collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn serve(
        &self,
        kind: RecordKind,
        symbol: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> ApiEnvelope {
        let now: usize = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                kind,
                symbol: symbol.to_string(),
                cursor: cursor.map(str::to_string),
                page_size,
            });
        }

        let envelope = if self.failing.contains(symbol) {
            ApiEnvelope::rejection("40034", "Parameter symbol does not exist")
        } else {
            self.scripts
                .lock()
                .ok()
                .and_then(|mut scripts| scripts.get_mut(symbol).and_then(VecDeque::pop_front))
                .unwrap_or_else(|| array_page(Vec::new()))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        envelope
    }
}

#[async_trait]
impl ExchangeHistoryClient for MockExchange {
    async fn list_symbols(&self) -> ApiEnvelope {
        self.listing.clone().unwrap_or_else(|| ApiEnvelope::success(json!([])))
    }

    async fn fetch_history_page(
        &self,
        symbol: &str,
        _window: &TimeWindow,
        cursor: Option<&str>,
        page_size: u32,
    ) -> ApiEnvelope {
        self.serve(RecordKind::Orders, symbol, cursor, page_size).await
    }

    async fn fetch_fills_page(
        &self,
        symbol: &str,
        _window: &TimeWindow,
        cursor: Option<&str>,
        page_size: u32,
    ) -> ApiEnvelope {
        self.serve(RecordKind::Fills, symbol, cursor, page_size).await
    }
}


//
// IN-MEMORY OBJECT STORE
//

#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.buckets
            .lock()
            .ok()
            .and_then(|buckets| buckets.get(bucket).and_then(|objects| objects.get(key).cloned()))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn ensure_bucket_exists(&self, bucket: &str) -> Result<(), StoreError> {
        if let Ok(mut buckets) = self.buckets.lock() {
            buckets.entry(bucket.to_string()).or_default();
        }
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| StoreError::InvalidName(bucket.to_string()))?;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::InvalidName(bucket.to_string()))?;
        objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn list(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .buckets
            .lock()
            .ok()
            .and_then(|buckets| buckets.get(bucket).map(|objects| objects.keys().cloned().collect()))
            .unwrap_or_default())
    }
}


//
// SCRIPTED ORCHESTRATOR
//

/// Answers polls from a script; the last entry repeats forever.
pub struct ScriptedOrchestrator {
    start_error: Option<OrchestratorError>,
    polls: Mutex<VecDeque<ExecutionPoll>>,
    started: Mutex<Vec<WorkflowInput>>,
    poll_count: AtomicUsize,
    abort_count: AtomicUsize,
}

impl ScriptedOrchestrator {
    pub fn new(polls: Vec<ExecutionPoll>) -> Self {
        Self {
            start_error: None,
            polls: Mutex::new(polls.into()),
            started: Mutex::new(Vec::new()),
            poll_count: AtomicUsize::new(0),
            abort_count: AtomicUsize::new(0),
        }
    }

    pub fn failing_to_start(reason: &str) -> Self {
        let mut orchestrator = Self::new(Vec::new());
        orchestrator.start_error = Some(OrchestratorError::Start(reason.to_string()));
        orchestrator
    }

    pub fn started(&self) -> Vec<WorkflowInput> {
        self.started.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn poll_count(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub fn abort_count(&self) -> usize {
        self.abort_count.load(Ordering::SeqCst)
    }
}

pub fn running() -> ExecutionPoll {
    ExecutionPoll { status: ExecutionStatus::Running, output: None, error: None }
}

pub fn finished(status: ExecutionStatus, output: Option<Value>, error: Option<&str>) -> ExecutionPoll {
    ExecutionPoll { status, output, error: error.map(str::to_string) }
}

#[async_trait]
impl WorkflowOrchestrator for ScriptedOrchestrator {
    async fn start(&self, input: WorkflowInput) -> Result<ExecutionHandle, OrchestratorError> {
        if let Some(error) = &self.start_error {
            return Err(error.clone());
        }
        if let Ok(mut started) = self.started.lock() {
            started.push(input);
        }
        Ok(ExecutionHandle("scripted-1".to_string()))
    }

    async fn poll(&self, _handle: &ExecutionHandle) -> Result<ExecutionPoll, OrchestratorError> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        let mut polls = self
            .polls
            .lock()
            .map_err(|e| OrchestratorError::Poll(e.to_string()))?;

        match polls.len() {
            0 => Err(OrchestratorError::Poll("script exhausted".to_string())),
            1 => Ok(polls[0].clone()),
            _ => polls
                .pop_front()
                .ok_or_else(|| OrchestratorError::Poll("script exhausted".to_string())),
        }
    }

    async fn abort(&self, _handle: &ExecutionHandle) -> Result<(), OrchestratorError> {
        self.abort_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
