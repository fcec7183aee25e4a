// @file: extraction_engine/src/connectors/mod.rs
// @description: Exchange REST connectors and the factory that builds them.
// @author: LAS.

pub mod bitget;
pub mod rest_dispatch;
