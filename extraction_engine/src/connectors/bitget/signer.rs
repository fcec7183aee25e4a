// @file: extraction_engine/src/connectors/bitget/signer.rs
// @description: Bitget API credentials and HMAC-SHA256 request signing.
// @author: LAS.

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::env;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use crate::core::errors::CredentialsError;

type HmacSha256 = Hmac<Sha256>;

//
// HEADER NAMES
//

pub const HEADER_ACCESS_KEY: &str = "ACCESS-KEY";
pub const HEADER_ACCESS_SIGN: &str = "ACCESS-SIGN";
pub const HEADER_ACCESS_TIMESTAMP: &str = "ACCESS-TIMESTAMP";
pub const HEADER_ACCESS_PASSPHRASE: &str = "ACCESS-PASSPHRASE";


//
// CREDENTIALS
//

#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: String,
}

impl ApiCredentials {
    /// Read `BITGET_API_KEY`, `BITGET_SECRET_KEY` (or `BITGET_API_SECRET`) and
    /// `BITGET_PASSPHRASE`. Call `dotenv` beforehand to pick up a `.env` file.
    pub fn from_env() -> Result<Self, CredentialsError> {
        let api_key = read_var("BITGET_API_KEY")?;
        let secret_key = read_var("BITGET_SECRET_KEY").or_else(|_| read_var("BITGET_API_SECRET"))?;
        let passphrase = read_var("BITGET_PASSPHRASE")?;

        Ok(Self { api_key, secret_key, passphrase })
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

fn read_var(name: &'static str) -> Result<String, CredentialsError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CredentialsError::Missing(name)),
    }
}


//
// SIGNER
//

/// Holds the keyed MAC so every signature reuses the same key schedule.
#[derive(Clone)]
pub struct RequestSigner {
    api_key: String,
    passphrase: String,
    mac: HmacSha256,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner").field("api_key", &self.api_key).finish()
    }
}

impl RequestSigner {
    pub fn new(credentials: &ApiCredentials) -> Result<Self, CredentialsError> {
        let mac = HmacSha256::new_from_slice(credentials.secret_key.as_bytes())
            .map_err(|_| CredentialsError::InvalidSecret)?;

        Ok(Self {
            api_key: credentials.api_key.clone(),
            passphrase: credentials.passphrase.clone(),
            mac,
        })
    }

    /// base64(HMAC-SHA256(secret, timestamp + method + path + body)).
    ///
    /// `path` is the request path including its query string.
    pub fn sign(&self, timestamp: &str, method: &str, path: &str, body: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(timestamp.as_bytes());
        mac.update(method.as_bytes());
        mac.update(path.as_bytes());
        mac.update(body.as_bytes());
        general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    pub fn build_headers(&self, method: &str, path: &str, body: &str) -> Vec<(&'static str, String)> {
        self.build_headers_at(now_millis(), method, path, body)
    }

    pub fn build_headers_at(
        &self,
        timestamp_ms: u64,
        method: &str,
        path: &str,
        body: &str,
    ) -> Vec<(&'static str, String)> {
        let timestamp: String = timestamp_ms.to_string();
        let signature: String = self.sign(&timestamp, method, path, body);

        vec![
            (HEADER_ACCESS_KEY, self.api_key.clone()),
            (HEADER_ACCESS_SIGN, signature),
            (HEADER_ACCESS_TIMESTAMP, timestamp),
            (HEADER_ACCESS_PASSPHRASE, self.passphrase.clone()),
        ]
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
