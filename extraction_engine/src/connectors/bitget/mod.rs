// @file: extraction_engine/src/connectors/bitget/mod.rs
// @description: Bitget spot REST connector.
// @author: LAS.

pub mod bitget_rest;
pub mod signer;

pub use bitget_rest::BitgetRestClient;
pub use signer::{ApiCredentials, RequestSigner};
