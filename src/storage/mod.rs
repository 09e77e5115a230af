//! Storage abstractions for harvested catalog records.
//!
//! The sink is append-only by natural key: a record whose key is already
//! stored is never inserted again, so a retried append is harmless.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml               # Harvester configuration
//! ├── workItems.toml            # Shops and brands to crawl
//! ├── catalog/
//! │   ├── shopee_products.json
//! │   ├── shopee_models.json
//! │   └── momo_products.json
//! └── runs/
//!     └── {scope}-latest.json   # Report of the most recent run
//! ```

pub mod local;
pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{NaturalKey, ProductRecord, RecordScope, RunReport};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemorySink;

/// On-disk layout of one catalog scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogData {
    /// ISO 8601 timestamp of last update
    pub updated_at: DateTime<Utc>,
    pub scope: RecordScope,
    pub count: usize,
    pub records: Vec<ProductRecord>,
}

impl CatalogData {
    pub fn new(scope: RecordScope, records: Vec<ProductRecord>) -> Self {
        Self {
            updated_at: Utc::now(),
            scope,
            count: records.len(),
            records,
        }
    }
}

/// Durable record store the ingestion pipeline writes into.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Natural keys already persisted for a scope.
    async fn list_known_keys(&self, scope: RecordScope) -> Result<HashSet<NaturalKey>>;

    /// Insert the records whose natural key is not stored yet.
    ///
    /// Returns the number actually inserted.
    async fn append_if_absent(&self, records: &[ProductRecord]) -> Result<usize>;

    /// Every persisted record of a scope, in insertion order.
    async fn load_records(&self, scope: RecordScope) -> Result<Vec<ProductRecord>>;

    /// Keep the report of a finished run. Sinks without report storage ignore it.
    async fn save_run_report(&self, _report: &RunReport) -> Result<()> {
        Ok(())
    }
}

/// Split the records whose key is absent from `stored` and not repeated earlier in `records`.
pub(crate) fn fresh_records<'a>(
    stored: &mut HashSet<NaturalKey>,
    records: &'a [ProductRecord],
) -> Vec<&'a ProductRecord> {
    records
        .iter()
        .filter(|record| stored.insert(record.natural_key()))
        .collect()
}
