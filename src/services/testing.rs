//! Scripted in-memory adapter for driver, orchestrator and ingest tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::{
    Cursor, MissingFieldPolicy, MomoProductDetail, Platform, Price, ProductRecord, RecordDetail,
    RecordScope,
};
use crate::services::{FetchedPage, SourceAdapter};

#[derive(Debug, Clone)]
pub(crate) struct TestEntry {
    pub id: u32,
    pub name: Option<String>,
    pub price: f64,
}

impl TestEntry {
    pub fn new(id: u32, price: f64) -> Self {
        Self {
            id,
            name: Some(format!("item {id}")),
            price,
        }
    }

    pub fn nameless(id: u32) -> Self {
        Self {
            id,
            name: None,
            price: 1.0,
        }
    }
}

/// Response to one fetch call.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Page {
        entries: Vec<TestEntry>,
        terminal: bool,
    },
    Transient,
    Shape,
}

impl Step {
    pub fn ids(ids: &[u32]) -> Self {
        Step::Page {
            entries: ids.iter().map(|&id| TestEntry::new(id, id as f64 * 10.0)).collect(),
            terminal: false,
        }
    }

    pub fn last(ids: &[u32]) -> Self {
        Step::Page {
            entries: ids.iter().map(|&id| TestEntry::new(id, id as f64 * 10.0)).collect(),
            terminal: true,
        }
    }

    pub fn entries(entries: Vec<TestEntry>) -> Self {
        Step::Page {
            entries,
            terminal: false,
        }
    }
}

/// Replays a fixed list of steps per work item; each fetch consumes one step.
#[derive(Default)]
pub(crate) struct ScriptedAdapter {
    scripts: HashMap<String, Vec<Step>>,
    seen: Mutex<HashMap<String, Vec<u32>>>,
    fetched_at: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    policy: MissingFieldPolicy,
    min_latency_ms: u64,
    max_latency_ms: u64,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, item: &str, steps: Vec<Step>) -> Self {
        self.scripts.insert(item.to_string(), steps);
        self
    }

    pub fn policy(mut self, policy: MissingFieldPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sleep a random 0..=max ms before every response.
    pub fn jitter(mut self, max_latency_ms: u64) -> Self {
        self.min_latency_ms = 0;
        self.max_latency_ms = max_latency_ms;
        self
    }

    /// Sleep exactly `ms` before every response.
    pub fn latency(mut self, ms: u64) -> Self {
        self.min_latency_ms = ms;
        self.max_latency_ms = ms;
        self
    }

    /// Most fetches that were ever pending at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Start instants of every fetch, across all items.
    pub fn fetch_instants(&self) -> Vec<Instant> {
        self.fetched_at.lock().unwrap().clone()
    }

    pub fn calls(&self, item: &str) -> usize {
        self.cursors(item).len()
    }

    /// Page numbers requested for an item, in call order.
    pub fn cursors(&self, item: &str) -> Vec<u32> {
        self.seen
            .lock()
            .unwrap()
            .get(item)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    type WorkItem = String;
    type RawItem = TestEntry;

    fn scope(&self) -> RecordScope {
        RecordScope::MomoProducts
    }

    fn first_cursor(&self) -> Cursor {
        Cursor::first_page()
    }

    fn missing_field_policy(&self) -> MissingFieldPolicy {
        self.policy
    }

    async fn fetch_page(&self, item: &String, cursor: Cursor) -> Result<FetchedPage<TestEntry>> {
        let page = match cursor {
            Cursor::Page(n) => n,
            Cursor::Offset { .. } => return Err(AppError::crawl(item.as_str(), "offset cursor")),
        };

        self.fetched_at.lock().unwrap().push(Instant::now());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let step = {
            let mut seen = self.seen.lock().unwrap();
            let calls = seen.entry(item.clone()).or_default();
            let index = calls.len();
            calls.push(page);
            self.scripts.get(item).and_then(|s| s.get(index)).cloned()
        };

        if self.max_latency_ms > 0 {
            let ms = fastrand::u64(self.min_latency_ms..=self.max_latency_ms);
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match step {
            Some(Step::Page { entries, terminal }) => {
                let terminal = terminal || entries.is_empty();
                Ok(FetchedPage::new(entries, terminal))
            }
            Some(Step::Transient) => Err(AppError::transient(item.as_str(), "null response body")),
            Some(Step::Shape) => Err(AppError::shape(item.as_str(), "2 sections")),
            None => Ok(FetchedPage::terminal_empty()),
        }
    }

    fn normalize(
        &self,
        raw: &TestEntry,
        item: &String,
        crawled_at: DateTime<Utc>,
    ) -> Result<ProductRecord> {
        let name = raw
            .name
            .clone()
            .ok_or_else(|| AppError::missing_field("name", format!("entry {}", raw.id)))?;
        let price = Price::new(raw.price)
            .ok_or_else(|| AppError::missing_field("price", format!("entry {}", raw.id)))?;

        Ok(ProductRecord {
            platform: Platform::Momo,
            item_id: raw.id.to_string(),
            name,
            price,
            price_text: price.format_grouped(),
            currency: "TWD".to_string(),
            url_path: format!("/goods.momo?i_code={}", raw.id),
            crawled_at,
            detail: RecordDetail::MomoProduct(MomoProductDetail {
                category_code: item.clone(),
                category_name: item.to_uppercase(),
                promotion: String::new(),
                display_price: "$".to_string(),
            }),
        })
    }
}
