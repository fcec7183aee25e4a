// @file: extraction_engine/src/tests/mod.rs
// @description: Unit and pipeline tests run against scripted exchange doubles.
// @author: LAS.

mod mock_exchange;

mod batch_tests;
mod workflow_tests;
