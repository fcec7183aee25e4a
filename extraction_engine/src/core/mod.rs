// @file: extraction_engine/src/core/mod.rs
// @description: Exports domain types, pipeline stages and the extraction engine.
// @author: LAS.

pub mod errors;
pub mod models;
pub mod interfaces;
pub mod retry;
pub mod page_shape;
pub mod paginator;
pub mod scheduler;
pub mod merge;
pub mod engine;
