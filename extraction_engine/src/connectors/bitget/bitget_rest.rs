// @file: extraction_engine/src/connectors/bitget/bitget_rest.rs
// @description: Signed HTTP client for Bitget spot order history, fills and symbol listing.
// @author: LAS.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use url::form_urlencoded;
use crate::connectors::bitget::signer::{ApiCredentials, RequestSigner};
use crate::core::errors::ConnectorError;
use crate::core::interfaces::ExchangeHistoryClient;
use crate::core::models::{ApiEnvelope, HttpSettings, TimeWindow};

//
// ENDPOINTS
//

pub const BITGET_REST_BASE_URL: &str = "https://api.bitget.com";
pub const HISTORY_ORDERS_PATH: &str = "/api/v2/spot/trade/history-orders";
pub const FILLS_PATH: &str = "/api/v2/spot/trade/fills";
pub const SYMBOLS_PATH: &str = "/api/v2/spot/public/symbols";

/// Largest `limit` the history endpoints accept.
pub const MAX_PAGE_SIZE: u32 = 100;


//
// CLIENT
//

#[derive(Debug, Clone)]
pub struct BitgetRestClient {
    http: Client,
    base_url: String,
    signer: Arc<RequestSigner>,
}

impl BitgetRestClient {
    pub fn new(credentials: &ApiCredentials, settings: &HttpSettings) -> Result<Self, ConnectorError> {
        let http: Client = Client::builder().timeout(settings.timeout).build()?;
        let signer: RequestSigner = RequestSigner::new(credentials)?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            signer: Arc::new(signer),
        })
    }

    //
    // REQUEST EXECUTION
    //

    async fn signed_get(&self, request_path: &str) -> ApiEnvelope {
        let mut request: RequestBuilder = self.http.get(format!("{}{}", self.base_url, request_path));
        for (name, value) in self.signer.build_headers("GET", request_path, "") {
            request = request.header(name, value);
        }
        execute(request, request_path).await
    }

    async fn public_get(&self, request_path: &str) -> ApiEnvelope {
        let request: RequestBuilder = self.http.get(format!("{}{}", self.base_url, request_path));
        execute(request, request_path).await
    }
}

#[async_trait]
impl ExchangeHistoryClient for BitgetRestClient {
    async fn list_symbols(&self) -> ApiEnvelope {
        self.public_get(SYMBOLS_PATH).await
    }

    async fn fetch_history_page(
        &self,
        symbol: &str,
        window: &TimeWindow,
        cursor: Option<&str>,
        page_size: u32,
    ) -> ApiEnvelope {
        let path: String = history_request_path(HISTORY_ORDERS_PATH, symbol, window, cursor, page_size);
        self.signed_get(&path).await
    }

    async fn fetch_fills_page(
        &self,
        symbol: &str,
        window: &TimeWindow,
        cursor: Option<&str>,
        page_size: u32,
    ) -> ApiEnvelope {
        let path: String = history_request_path(FILLS_PATH, symbol, window, cursor, page_size);
        self.signed_get(&path).await
    }
}


//
// INTERNAL HELPERS
//

/// Path plus query string, exactly as it is signed and sent.
pub fn history_request_path(
    path: &str,
    symbol: &str,
    window: &TimeWindow,
    cursor: Option<&str>,
    page_size: u32,
) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("symbol", symbol);

    if let Some(start) = window.start_time {
        query.append_pair("startTime", &start.to_string());
    }
    if let Some(end) = window.end_time {
        query.append_pair("endTime", &end.to_string());
    }
    if let Some(cursor) = cursor {
        query.append_pair("idLessThan", cursor);
    }
    query.append_pair("limit", &page_size.clamp(1, MAX_PAGE_SIZE).to_string());

    format!("{}?{}", path, query.finish())
}

async fn execute(request: RequestBuilder, request_path: &str) -> ApiEnvelope {
    debug!("GET {}", request_path);

    // #1. Transport
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Request to {} failed: {}", request_path, e);
            return ApiEnvelope::transport_failure(e.to_string());
        }
    };

    // #2. HTTP status
    let status = response.status();
    if !status.is_success() {
        let body: String = response.text().await.unwrap_or_default();
        warn!("{} answered HTTP {}", request_path, status);
        return ApiEnvelope::http_failure(status.as_u16(), body);
    }

    // #3. Envelope decoding
    match response.json::<ApiEnvelope>().await {
        Ok(envelope) => envelope,
        Err(e) if e.is_timeout() => ApiEnvelope::transport_failure(e.to_string()),
        Err(e) => ApiEnvelope::decode_failure(e.to_string()),
    }
}
