// @file: extraction_engine/src/core/models.rs
// @description: Centralized data structures for records, envelopes, jobs, results and batch executions.
// @author: LAS.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use crate::core::retry::RetryPolicy;


//
// EXCHANGE ENVELOPE
//

/// Literal success code of the Bitget REST contract.
pub const SUCCESS_CODE: &str = "00000";

/// Synthetic codes produced locally when no real envelope came back.
pub const TRANSPORT_ERROR_CODE: &str = "transport_error";
pub const DECODE_ERROR_CODE: &str = "decode_error";
pub const HTTP_ERROR_PREFIX: &str = "http_";

/// Outer `{code, msg, data}` structure wrapping every exchange response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiEnvelope {
    #[serde(deserialize_with = "de_code")]
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Value,
}

impl ApiEnvelope {
    pub fn success(data: Value) -> Self {
        Self { code: SUCCESS_CODE.to_string(), msg: "success".to_string(), data }
    }

    pub fn rejection(code: &str, msg: &str) -> Self {
        Self { code: code.to_string(), msg: msg.to_string(), data: Value::Null }
    }

    pub fn transport_failure(msg: impl Into<String>) -> Self {
        Self { code: TRANSPORT_ERROR_CODE.to_string(), msg: msg.into(), data: Value::Null }
    }

    pub fn http_failure(status: u16, body: impl Into<String>) -> Self {
        Self {
            code: format!("{}{}", HTTP_ERROR_PREFIX, status),
            msg: body.into(),
            data: Value::Null,
        }
    }

    pub fn decode_failure(msg: impl Into<String>) -> Self {
        Self { code: DECODE_ERROR_CODE.to_string(), msg: msg.into(), data: Value::Null }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Network failures, rate limiting and server errors may succeed on a later attempt.
    pub fn is_retriable(&self) -> bool {
        if self.code == TRANSPORT_ERROR_CODE {
            return true;
        }
        match self.code.strip_prefix(HTTP_ERROR_PREFIX).and_then(|s| s.parse::<u16>().ok()) {
            Some(status) => status == 429 || (500..=599).contains(&status),
            None => false,
        }
    }
}

// Bitget sends the code as a string, but some gateways answer with a bare number.
fn de_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected envelope code: {}", other))),
    }
}


//
// RECORDS
//

/// Id fields checked, in priority order, for orders.
pub const ORDER_ID_FIELDS: [&str; 4] = ["orderId", "id", "tradeId", "fillId"];

/// Id fields checked, in priority order, for fills. A fill also carries the
/// `orderId` of its parent order, shared by every partial fill of it.
pub const FILL_ID_FIELDS: [&str; 4] = ["tradeId", "fillId", "id", "orderId"];

/// Fields checked, in priority order, for a record's logical timestamp.
pub const TIMESTAMP_FIELDS: [&str; 5] = ["timestamp", "cTime", "ctime", "createTime", "lastUpdateTime"];

/// An order or a fill exactly as the exchange returned it, plus the `symbol` tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Only JSON objects are records.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Record(map)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn symbol(&self) -> Option<&str> {
        match self.0.get("symbol") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Writes the fetched-for symbol unless the payload already names one.
    pub fn stamp_symbol(&mut self, symbol: &str) {
        if self.symbol().is_none() {
            self.0.insert("symbol".to_string(), Value::String(symbol.to_string()));
        }
    }

    /// Identity of the record within its kind; also the `idLessThan` cursor value.
    pub fn logical_id(&self, kind: RecordKind) -> Option<String> {
        kind.id_fields()
            .iter()
            .find_map(|field| self.0.get(*field).and_then(value_as_id))
    }

    /// First timestamp field that parses as an integer, else 0.
    pub fn timestamp(&self) -> i64 {
        TIMESTAMP_FIELDS
            .iter()
            .find_map(|field| self.0.get(*field).and_then(value_as_i64))
            .unwrap_or(0)
    }

    pub fn key(&self, kind: RecordKind) -> RecordKey {
        let identity = match self.logical_id(kind) {
            Some(id) => RecordIdentity::Id(id),
            None => RecordIdentity::Timestamp(self.timestamp()),
        };
        RecordKey {
            symbol: self.symbol().unwrap_or_default().to_string(),
            identity,
        }
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record(map)
    }
}

/// Canonical identity used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub symbol: String,
    pub identity: RecordIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordIdentity {
    Id(String),
    // Used only when the payload carries none of the id fields.
    Timestamp(i64),
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}


//
// CONFIGURATION
//

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: String,
    pub timeout: Duration,
}


//
// FETCH JOBS
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    #[default]
    Orders,
    Fills,
}

impl RecordKind {
    pub fn id_fields(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Orders => &ORDER_ID_FIELDS,
            RecordKind::Fills => &FILL_ID_FIELDS,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordKind::Orders => write!(f, "orders"),
            RecordKind::Fills => write!(f, "fills"),
        }
    }
}

/// Shared time window in milliseconds since epoch; both ends optional.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct PaginationSettings {
    pub page_size: u32,
    pub inter_page_delay: Duration,
    pub max_pages: Option<u32>,
    pub retry: RetryPolicy,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            inter_page_delay: Duration::from_millis(150),
            max_pages: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// Unit of fan-out work: one symbol over the shared window.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub symbol: String,
    pub window: TimeWindow,
    pub kind: RecordKind,
    pub pagination: PaginationSettings,
}

/// Settings shared by every job of one run; stamps out per-symbol jobs.
#[derive(Debug, Clone, Default)]
pub struct JobTemplate {
    pub window: TimeWindow,
    pub kind: RecordKind,
    pub pagination: PaginationSettings,
}

impl JobTemplate {
    pub fn job_for(&self, symbol: &str) -> FetchJob {
        FetchJob {
            symbol: symbol.to_string(),
            window: self.window,
            kind: self.kind,
            pagination: self.pagination.clone(),
        }
    }

    pub fn jobs_for(&self, symbols: &[String]) -> Vec<FetchJob> {
        symbols.iter().map(|symbol| self.job_for(symbol)).collect()
    }
}

/// Everything one symbol's pagination produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolRecords {
    pub symbol: String,
    pub records: Vec<Record>,
    pub pages_fetched: u32,
    /// Set when pagination stopped early on an error after some pages succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: String,
}

pub type SymbolOutcome = Result<SymbolRecords, SymbolFailure>;


//
// REQUESTS & RESULTS
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Local,
    Batch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub symbols: Vec<String>,
    #[serde(default)]
    pub window: TimeWindow,
    #[serde(default)]
    pub kind: RecordKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessingStats {
    pub symbols_requested: usize,
    pub symbols_succeeded: usize,
    pub symbols_failed: usize,
    pub symbols_truncated: usize,
    pub pages_fetched: u64,
    pub duplicates_removed: usize,
    pub batches: usize,
    pub fallback_used: bool,
}

/// Externally visible output of one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub success: bool,
    pub data: Vec<Record>,
    pub duration_seconds: f64,
    pub total_orders: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processed_symbols: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_symbols: Vec<SymbolFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_stats: Option<ProcessingStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
}


//
// BATCH ORCHESTRATION
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolBatch {
    pub index: usize,
    pub symbols: Vec<String>,
}

/// Output of one independently executed batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchOutput {
    pub batch_index: usize,
    #[serde(default)]
    pub results: Vec<SymbolRecords>,
    #[serde(default)]
    pub failures: Vec<SymbolFailure>,
    #[serde(default)]
    pub attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInput {
    pub symbols: Vec<String>,
    pub window: TimeWindow,
    pub kind: RecordKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionHandle(pub String);

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Succeeded => "SUCCEEDED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::TimedOut => "TIMED_OUT",
            ExecutionStatus::Aborted => "ABORTED",
        };
        write!(f, "{}", label)
    }
}

/// One answer from `WorkflowOrchestrator::poll`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionPoll {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}
