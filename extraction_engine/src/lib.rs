// @file: extraction_engine\src\lib.rs
// @description: Library root: extraction pipeline, exchange connectors, batch orchestration and configuration.
// @author: LAS.


pub mod core;
pub mod connectors;
pub mod orchestration;
pub mod utils;

#[cfg(test)]
mod tests;
