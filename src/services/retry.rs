// src/services/retry.rs

//! Bounded retry of a single page fetch.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::models::{Anomaly, Cursor, RecordScope, RetryConfig};
use crate::services::FetchedPage;

/// Where a fetch happened, for anomaly records.
#[derive(Debug, Clone, Copy)]
pub struct FetchSite<'a> {
    pub source: RecordScope,
    pub work_item: &'a str,
    pub cursor: Cursor,
}

/// Fetch accounting of one work item.
#[derive(Debug, Default)]
pub struct FetchLog {
    /// Fetch calls including retries
    pub fetches: u32,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.backoff_ms))
    }

    /// Run `fetch` until it succeeds, fails fatally or runs out of attempts.
    ///
    /// Every transient failure is recorded in `fetch_log`. Once all attempts are
    /// spent the page degrades to a terminal empty page. Non-transient errors
    /// are returned at once.
    pub async fn run<T, F, Fut>(
        &self,
        site: FetchSite<'_>,
        mut fetch: F,
        fetch_log: &mut FetchLog,
    ) -> Result<FetchedPage<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<FetchedPage<T>>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            fetch_log.fetches += 1;

            match fetch().await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() => {
                    log::warn!(
                        "[{}] {} at {}: attempt {}/{} failed: {}",
                        site.source,
                        site.work_item,
                        site.cursor,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    fetch_log.anomalies.push(Anomaly {
                        source: site.source,
                        work_item: site.work_item.to_string(),
                        cursor: site.cursor,
                        attempt,
                        message: e.to_string(),
                    });

                    if attempt >= self.max_attempts {
                        log::warn!(
                            "[{}] {} at {}: giving up, treating page as terminal",
                            site.source,
                            site.work_item,
                            site.cursor
                        );
                        return Ok(FetchedPage::terminal_empty());
                    }
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::error::AppError;

    fn site() -> FetchSite<'static> {
        FetchSite {
            source: RecordScope::ShopeeProducts,
            work_item: "shop 1",
            cursor: Cursor::first_window(30),
        }
    }

    async fn scripted(failures: u32, calls: &Cell<u32>) -> Result<FetchedPage<u32>> {
        calls.set(calls.get() + 1);
        if calls.get() <= failures {
            Err(AppError::transient("shop 1", "null body"))
        } else {
            Ok(FetchedPage::new(vec![7, 8], false))
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut log = FetchLog::default();
        let calls = Cell::new(0);

        let page = policy
            .run(site(), || scripted(2, &calls), &mut log)
            .await
            .unwrap();

        assert_eq!(page.items, vec![7, 8]);
        assert!(!page.terminal);
        assert_eq!(log.anomalies.len(), 2);
        assert_eq!(log.fetches, 3);
        assert_eq!(log.anomalies[1].attempt, 2);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_degrade_to_terminal() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut log = FetchLog::default();
        let calls = Cell::new(0);

        let page = policy
            .run(site(), || scripted(u32::MAX, &calls), &mut log)
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert!(page.terminal);
        assert_eq!(log.anomalies.len(), 3);
        assert_eq!(log.fetches, 3);
        assert_eq!(log.anomalies[0].work_item, "shop 1");
    }

    #[tokio::test]
    async fn test_shape_error_is_not_retried() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut log = FetchLog::default();
        let mut calls = 0u32;

        let result: Result<FetchedPage<u32>> = policy
            .run(
                site(),
                || {
                    calls += 1;
                    async { Err(AppError::shape("shop 1", "2 sections")) }
                },
                &mut log,
            )
            .await;

        assert!(matches!(result, Err(AppError::Shape { .. })));
        assert_eq!(calls, 1);
        assert!(log.anomalies.is_empty());
    }
}
