// @file: extraction_engine/src/utils/config.rs
// @description: Layered configuration (defaults, optional config file, APP_ environment) for extraction runs.
// @author: LAS.

use serde::Deserialize;
use config::{Config, ConfigError, File, Environment};
use std::path::PathBuf;
use std::time::Duration;
use crate::connectors::bitget::bitget_rest::{BITGET_REST_BASE_URL, MAX_PAGE_SIZE};
use crate::core::models::{ExecutionMode, HttpSettings, PaginationSettings, RecordKind};
use crate::core::retry::RetryPolicy;

//
// TYPE DEFINITIONS
//

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,

    // Exchange
    pub exchange_base_url: String,
    pub request_timeout_secs: u64,
    pub record_kind: RecordKind,

    // Pagination
    pub page_size: u32,
    pub inter_page_delay_ms: u64,
    pub max_pages: Option<u32>,
    pub page_retry_attempts: u32,
    pub page_retry_backoff_ms: u64,

    // Fan-out
    pub max_workers: usize,

    // Batch path
    pub execution_mode: ExecutionMode,
    pub batch_size: usize,
    pub batch_workers: usize,
    pub batch_max_attempts: u32,
    pub workflow_poll_interval_ms: u64,
    pub workflow_max_wait_secs: u64,
    pub fallback_symbol_limit: usize,

    // Persistence
    pub storage_root: String,
    pub storage_bucket: String,
    pub persist_results: bool,
}

/// Tuning for the batch orchestration path.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub batch_workers: usize,
    pub max_attempts: u32,
    pub poll_interval: Duration,
    pub max_wait: Duration,
    pub fallback_symbol_limit: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 25,
            batch_workers: 4,
            max_attempts: 2,
            poll_interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(900),
            fallback_symbol_limit: 50,
        }
    }
}

impl AppConfig {
    //
    // PUBLIC INTERFACE
    //

    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("log_level", "info")?

            // Exchange
            .set_default("exchange_base_url", BITGET_REST_BASE_URL)?
            .set_default("request_timeout_secs", 30)?
            .set_default("record_kind", "orders")?

            // Pagination
            .set_default("page_size", 100)?
            .set_default("inter_page_delay_ms", 150)?
            .set_default("page_retry_attempts", 1)?
            .set_default("page_retry_backoff_ms", 1000)?

            // Fan-out
            .set_default("max_workers", 10)?

            // Batch path
            .set_default("execution_mode", "local")?
            .set_default("batch_size", 25)?
            .set_default("batch_workers", 4)?
            .set_default("batch_max_attempts", 2)?
            .set_default("workflow_poll_interval_ms", 2000)?
            .set_default("workflow_max_wait_secs", 900)?
            .set_default("fallback_symbol_limit", 50)?

            // Persistence
            .set_default("storage_root", "./extractions")?
            .set_default("storage_bucket", "order-extracts")?
            .set_default("persist_results", false)?

            // File & Env Overrides
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("APP"));

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            base_url: self.exchange_base_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }

    pub fn pagination_settings(&self) -> PaginationSettings {
        PaginationSettings {
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
            inter_page_delay: Duration::from_millis(self.inter_page_delay_ms),
            max_pages: self.max_pages.filter(|pages| *pages > 0),
            retry: RetryPolicy {
                backoff: Duration::from_millis(self.page_retry_backoff_ms),
                max_retries: self.page_retry_attempts,
            },
        }
    }

    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            batch_size: self.batch_size.max(1),
            batch_workers: self.batch_workers.max(1),
            max_attempts: self.batch_max_attempts.max(1),
            poll_interval: Duration::from_millis(self.workflow_poll_interval_ms.max(1)),
            max_wait: Duration::from_secs(self.workflow_max_wait_secs),
            fallback_symbol_limit: self.fallback_symbol_limit.max(1),
        }
    }

    pub fn storage_root(&self) -> PathBuf {
        PathBuf::from(&self.storage_root)
    }
}
