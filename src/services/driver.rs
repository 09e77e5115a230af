// src/services/driver.rs

//! Drives one adapter through every page of one work item.

use std::time::Duration;

use crate::error::AppError;
use crate::models::Config;
use crate::services::retry::{FetchLog, FetchSite, RetryPolicy};
use crate::services::SourceAdapter;

/// Everything one work item yielded.
#[derive(Debug)]
pub struct Harvest<T> {
    pub items: Vec<T>,
    /// Pages that produced a result (retries not counted)
    pub pages: u32,
    pub log: FetchLog,
    /// Stopped by the page cap before the source signalled the end
    pub truncated: bool,
    /// Fatal failure; `items` is empty when set
    pub fault: Option<AppError>,
}

impl<T> Default for Harvest<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pages: 0,
            log: FetchLog::default(),
            truncated: false,
            fault: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaginationDriver {
    retry: RetryPolicy,
    request_delay: Duration,
    max_pages: u32,
}

impl PaginationDriver {
    pub fn new(retry: RetryPolicy, request_delay: Duration, max_pages: u32) -> Self {
        Self {
            retry,
            request_delay,
            max_pages: max_pages.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RetryPolicy::from_config(&config.retry),
            config.crawler.request_delay(),
            config.crawler.max_pages,
        )
    }

    /// Fetch pages from the first cursor until the source signals the end.
    ///
    /// A page counts as the end when the adapter marks it terminal or it
    /// carries no entries. Entries of the terminal page are kept. The cursor
    /// only moves forward.
    pub async fn drive<A: SourceAdapter>(
        &self,
        adapter: &A,
        item: &A::WorkItem,
    ) -> Harvest<A::RawItem> {
        let label = item.to_string();
        let source = adapter.scope();
        let mut harvest = Harvest::default();
        let mut cursor = adapter.first_cursor();

        loop {
            if harvest.pages >= self.max_pages {
                log::warn!(
                    "[{source}] {label}: stopping at page cap {} before {cursor}",
                    self.max_pages
                );
                harvest.truncated = true;
                break;
            }
            if harvest.log.fetches > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let site = FetchSite {
                source,
                work_item: &label,
                cursor,
            };
            let page = match self
                .retry
                .run(site, move || adapter.fetch_page(item, cursor), &mut harvest.log)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    log::error!("[{source}] {label} at {cursor}: {e}");
                    harvest.items.clear();
                    harvest.fault = Some(e);
                    break;
                }
            };

            harvest.pages += 1;
            let count = page.items.len();
            let done = page.terminal || page.items.is_empty();
            harvest.items.extend(page.items);
            log::debug!(
                "[{source}] {label} {cursor}: {count} entries{}",
                if done { ", done" } else { "" }
            );

            if done {
                break;
            }
            cursor = cursor.advance();
        }

        harvest
    }
}
