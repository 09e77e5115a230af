//! In-process sink for dry runs and tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{NaturalKey, ProductRecord, RecordScope, RunReport};
use crate::storage::{RecordSink, fresh_records};

#[derive(Default)]
pub struct MemorySink {
    records: Mutex<HashMap<RecordScope, Vec<ProductRecord>>>,
    reports: Mutex<Vec<RunReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink pre-populated with already persisted records.
    pub fn with_records(records: Vec<ProductRecord>) -> Self {
        let mut by_scope: HashMap<RecordScope, Vec<ProductRecord>> = HashMap::new();
        for record in records {
            by_scope.entry(record.scope()).or_default().push(record);
        }
        Self {
            records: Mutex::new(by_scope),
            reports: Mutex::new(Vec::new()),
        }
    }

    pub async fn reports(&self) -> Vec<RunReport> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn list_known_keys(&self, scope: RecordScope) -> Result<HashSet<NaturalKey>> {
        let records = self.records.lock().await;
        Ok(records
            .get(&scope)
            .map(|list| list.iter().map(ProductRecord::natural_key).collect())
            .unwrap_or_default())
    }

    async fn append_if_absent(&self, records: &[ProductRecord]) -> Result<usize> {
        let mut store = self.records.lock().await;
        let mut stored: HashSet<NaturalKey> = store
            .values()
            .flatten()
            .map(ProductRecord::natural_key)
            .collect();

        let fresh: Vec<ProductRecord> = fresh_records(&mut stored, records)
            .into_iter()
            .cloned()
            .collect();
        let inserted = fresh.len();
        for record in fresh {
            store.entry(record.scope()).or_default().push(record);
        }
        Ok(inserted)
    }

    async fn load_records(&self, scope: RecordScope) -> Result<Vec<ProductRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .get(&scope)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_run_report(&self, report: &RunReport) -> Result<()> {
        self.reports.lock().await.push(report.clone());
        Ok(())
    }
}
