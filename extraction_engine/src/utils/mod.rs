// @file: extraction_engine/src/utils/mod.rs
// @description: Configuration helpers.
// @author: LAS.

pub mod config;
