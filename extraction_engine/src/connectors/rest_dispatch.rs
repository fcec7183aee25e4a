// @file: extraction_engine/src/connectors/rest_dispatch.rs
// @description: Builds the shared exchange client handed to every fetch task.
// @author: LAS.

use std::sync::Arc;
use log::info;
use crate::connectors::bitget::{ApiCredentials, BitgetRestClient};
use crate::core::errors::ConnectorError;
use crate::core::interfaces::ExchangeHistoryClient;
use crate::utils::config::AppConfig;

//
// FACTORY FUNCTIONS
//

/// Client built from explicit credentials. The returned handle is shared
/// read-only by all symbol tasks.
pub fn build_client(
    credentials: &ApiCredentials,
    config: &AppConfig,
) -> Result<Arc<dyn ExchangeHistoryClient>, ConnectorError> {
    let settings = config.http_settings();
    info!("Using exchange REST endpoint {}", settings.base_url);

    let client = BitgetRestClient::new(credentials, &settings)?;
    Ok(Arc::new(client))
}

/// Client built from credentials found in the environment (or `.env`).
pub fn build_client_from_env(config: &AppConfig) -> Result<Arc<dyn ExchangeHistoryClient>, ConnectorError> {
    let credentials = ApiCredentials::from_env()?;
    build_client(&credentials, config)
}
