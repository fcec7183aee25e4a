// @file: extraction_engine/src/orchestration/mod.rs
// @description: Batch path: partitioning, workflow execution and result storage.
// @author: LAS.

pub mod batch;
pub mod storage;
pub mod workflow;
