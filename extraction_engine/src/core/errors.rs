// @file: extraction_engine/src/core/errors.rs
// @description: Typed error enums for fetching, orchestration, storage and credentials.
// @author: LAS.

use std::time::Duration;
use thiserror::Error;
use crate::core::models::ExecutionStatus;


//
// PER-SYMBOL FETCH
//

/// Total failure of one symbol's pagination (nothing could be gathered).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("API rejected request (code {code}): {msg}")]
    Api { code: String, msg: String },

    #[error("transport failure after {attempts} attempt(s): {msg}")]
    Transport { attempts: u32, msg: String },

    #[error("fetch task did not complete: {0}")]
    TaskFailed(String),
}


//
// CALLER-VISIBLE EXTRACTION
//

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Symbols list cannot be empty")]
    EmptySymbols,

    #[error("Symbol listing failed (code {code}): {msg}")]
    SymbolListing { code: String, msg: String },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}


//
// WORKFLOW ORCHESTRATOR
//

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("failed to start execution: {0}")]
    Start(String),

    #[error("failed to poll execution: {0}")]
    Poll(String),

    #[error("unknown execution: {0}")]
    UnknownExecution(String),

    #[error("execution ended with status {status}: {reason}")]
    Terminal { status: ExecutionStatus, reason: String },

    #[error("execution did not finish within {0:?}")]
    BudgetExhausted(Duration),

    #[error("execution output could not be decoded: {0}")]
    MalformedOutput(String),
}


//
// OBJECT STORE
//

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid bucket or key name: {0}")]
    InvalidName(String),
}


//
// CREDENTIALS
//

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredentialsError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("secret key cannot be used as an HMAC key")]
    InvalidSecret,
}


//
// CONNECTOR CONSTRUCTION
//

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
