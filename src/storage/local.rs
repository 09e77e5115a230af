//! Local filesystem storage implementation.
//!
//! One JSON catalog file per record scope, rewritten atomically on every
//! append. Writes are serialized by an in-process lock so concurrent
//! appends never lose each other's records.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{NaturalKey, ProductRecord, RecordScope, RunReport};
use crate::storage::{CatalogData, RecordSink, fresh_records};

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn catalog_key(scope: RecordScope) -> String {
        format!("catalog/{}.json", scope.as_str())
    }

    fn run_key(scope: RecordScope) -> String {
        format!("runs/{}-latest.json", scope.as_str())
    }

    async fn read_catalog(&self, scope: RecordScope) -> Result<Vec<ProductRecord>> {
        Ok(self
            .read_json::<CatalogData>(&Self::catalog_key(scope))
            .await?
            .map(|data| data.records)
            .unwrap_or_default())
    }

    /// Report of the most recent run of a scope, if any.
    pub async fn load_run_report(&self, scope: RecordScope) -> Result<Option<RunReport>> {
        self.read_json(&Self::run_key(scope)).await
    }
}

#[async_trait]
impl RecordSink for LocalStorage {
    async fn list_known_keys(&self, scope: RecordScope) -> Result<HashSet<NaturalKey>> {
        let records = self.read_catalog(scope).await?;
        Ok(records.iter().map(ProductRecord::natural_key).collect())
    }

    async fn append_if_absent(&self, records: &[ProductRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_lock.lock().await;
        let mut inserted = 0;

        for scope in RecordScope::ALL {
            let batch: Vec<ProductRecord> = records
                .iter()
                .filter(|r| r.scope() == scope)
                .cloned()
                .collect();
            if batch.is_empty() {
                continue;
            }

            let mut existing = self.read_catalog(scope).await?;
            let mut stored: HashSet<NaturalKey> =
                existing.iter().map(ProductRecord::natural_key).collect();
            let fresh: Vec<ProductRecord> = fresh_records(&mut stored, &batch)
                .into_iter()
                .cloned()
                .collect();
            if fresh.is_empty() {
                log::debug!("{scope}: nothing new among {} records", batch.len());
                continue;
            }

            inserted += fresh.len();
            existing.extend(fresh);

            let key = Self::catalog_key(scope);
            let data = CatalogData::new(scope, existing);
            self.write_json(&key, &data).await?;
            log::info!("{} records written to {}", data.count, key);
        }

        Ok(inserted)
    }

    async fn load_records(&self, scope: RecordScope) -> Result<Vec<ProductRecord>> {
        let records = self.read_catalog(scope).await?;
        if records.is_empty() {
            log::warn!("No catalog found for {scope}");
        }
        Ok(records)
    }

    async fn save_run_report(&self, report: &RunReport) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_json(&Self::run_key(report.source), report).await
    }
}
