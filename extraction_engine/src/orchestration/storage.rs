// @file: extraction_engine/src/orchestration/storage.rs
// @description: Filesystem-backed object store and result persistence.
// @author: LAS.

use async_trait::async_trait;
use log::info;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use crate::core::errors::{ExtractionError, StoreError};
use crate::core::interfaces::ObjectStore;
use crate::core::models::{ExtractionResult, RecordKind};


//
// LOCAL OBJECT STORE
//

/// Buckets are directories under `root`; keys are flat file names.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf, StoreError> {
        validate_name(bucket)?;
        Ok(self.root.join(bucket))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn ensure_bucket_exists(&self, bucket: &str) -> Result<(), StoreError> {
        let path = self.bucket_path(bucket)?;
        fs::create_dir_all(&path).await?;
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        validate_name(key)?;
        let path = self.bucket_path(bucket)?.join(key);
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn list(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        let path = self.bucket_path(bucket)?;
        let mut entries = match fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys: Vec<String> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || Path::new(name).is_absolute();

    if invalid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}


//
// RESULT PERSISTENCE
//

pub fn result_key(kind: RecordKind, timestamp_ms: u128) -> String {
    format!("{}_{}.json", kind, timestamp_ms)
}

/// Write `result` as JSON and return its `<bucket>/<key>` location.
pub async fn persist_result(
    store: &dyn ObjectStore,
    bucket: &str,
    kind: RecordKind,
    result: &ExtractionResult,
) -> Result<String, ExtractionError> {
    let timestamp_ms: u128 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let key: String = result_key(kind, timestamp_ms);
    let bytes: Vec<u8> = serde_json::to_vec_pretty(result)?;

    store.ensure_bucket_exists(bucket).await?;
    store.put(bucket, &key, bytes).await?;

    let location = format!("{}/{}", bucket, key);
    info!("Stored {} record(s) at {}", result.total_orders, location);
    Ok(location)
}
