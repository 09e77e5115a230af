// src/pipeline/orchestrator.rs

//! Bounded concurrent fan-out of pagination drivers across work items.

use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};

use crate::models::{Config, ProductRecord, WorkItemSummary};
use crate::services::normalize::normalize_all;
use crate::services::{PaginationDriver, SourceAdapter};

/// Records and accounting of one finished work item.
#[derive(Debug)]
pub struct WorkItemOutcome {
    pub records: Vec<ProductRecord>,
    /// `accepted` is filled in once the gate has run
    pub summary: WorkItemSummary,
}

/// Runs one driver per work item, at most `max_concurrent` at a time.
///
/// All drivers are polled on the calling task, so the shared HTTP client and
/// the per-item results need no locking. A failing work item is isolated:
/// it yields no records and a recorded fault while the others finish.
pub struct Orchestrator {
    driver: PaginationDriver,
    max_concurrent: usize,
    crawled_at: DateTime<Utc>,
}

impl Orchestrator {
    pub fn new(driver: PaginationDriver, max_concurrent: usize, crawled_at: DateTime<Utc>) -> Self {
        Self {
            driver,
            max_concurrent: max_concurrent.max(1),
            crawled_at,
        }
    }

    pub fn from_config(config: &Config, crawled_at: DateTime<Utc>) -> Self {
        Self::new(
            PaginationDriver::from_config(config),
            config.crawler.max_concurrent,
            crawled_at,
        )
    }

    /// Timestamp stamped on every record of this run.
    pub fn crawled_at(&self) -> DateTime<Utc> {
        self.crawled_at
    }

    /// Gather every work item, then return the outcomes in input order.
    pub async fn harvest<A: SourceAdapter>(
        &self,
        adapter: &A,
        items: Vec<A::WorkItem>,
    ) -> Vec<WorkItemOutcome> {
        let mut indexed: Vec<(usize, WorkItemOutcome)> =
            self.harvest_stream(adapter, items).collect().await;
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// Yield each outcome as soon as its work item completes, tagged with
    /// the work item's input position.
    pub fn harvest_stream<'a, A: SourceAdapter>(
        &'a self,
        adapter: &'a A,
        items: Vec<A::WorkItem>,
    ) -> impl Stream<Item = (usize, WorkItemOutcome)> + 'a {
        log::info!(
            "[{}] harvesting {} work items, {} at a time",
            adapter.scope(),
            items.len(),
            self.max_concurrent
        );
        stream::iter(items.into_iter().enumerate())
            .map(move |(index, item)| async move { (index, self.run_one(adapter, item).await) })
            .buffer_unordered(self.max_concurrent)
    }

    async fn run_one<A: SourceAdapter>(&self, adapter: &A, item: A::WorkItem) -> WorkItemOutcome {
        let harvest = self.driver.drive(adapter, &item).await;

        let mut summary = WorkItemSummary {
            work_item: item.to_string(),
            pages: harvest.pages,
            fetches: harvest.log.fetches,
            harvested: harvest.items.len(),
            anomalies: harvest.log.anomalies,
            truncated: harvest.truncated,
            ..WorkItemSummary::default()
        };

        if let Some(fault) = harvest.fault {
            summary.fault = Some(fault.to_string());
            return WorkItemOutcome {
                records: Vec::new(),
                summary,
            };
        }

        match normalize_all(adapter, &item, &harvest.items, self.crawled_at) {
            Ok(normalized) => {
                summary.normalized = normalized.records.len();
                summary.skipped = normalized.skipped;
                log::debug!(
                    "[{}] {}: {} pages, {} records",
                    adapter.scope(),
                    summary.work_item,
                    summary.pages,
                    summary.normalized
                );
                WorkItemOutcome {
                    records: normalized.records,
                    summary,
                }
            }
            Err(e) => {
                log::error!("[{}] {}: {}", adapter.scope(), summary.work_item, e);
                summary.fault = Some(e.to_string());
                WorkItemOutcome {
                    records: Vec::new(),
                    summary,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use super::*;
    use crate::models::{MissingFieldPolicy, NaturalKey, RecordDetail};
    use crate::services::RetryPolicy;
    use crate::services::testing::{ScriptedAdapter, Step, TestEntry};

    fn orchestrator(max_concurrent: usize) -> Orchestrator {
        Orchestrator::new(
            PaginationDriver::new(RetryPolicy::new(3, Duration::ZERO), Duration::ZERO, 50),
            max_concurrent,
            Utc::now(),
        )
    }

    fn scripts() -> Vec<(&'static str, Vec<Step>)> {
        vec![
            ("a", vec![Step::ids(&[1, 2]), Step::ids(&[3]), Step::ids(&[])]),
            ("b", vec![Step::ids(&[4]), Step::ids(&[])]),
            ("c", vec![Step::ids(&[5, 6, 7]), Step::ids(&[8]), Step::ids(&[])]),
            ("d", vec![Step::ids(&[])]),
            ("e", vec![Step::ids(&[2, 9]), Step::ids(&[])]),
        ]
    }

    fn adapter(jitter_ms: u64) -> ScriptedAdapter {
        scripts()
            .into_iter()
            .fold(ScriptedAdapter::new().jitter(jitter_ms), |a, (item, steps)| {
                a.with(item, steps)
            })
    }

    fn work_items() -> Vec<String> {
        scripts().iter().map(|(item, _)| item.to_string()).collect()
    }

    fn merged(outcomes: &[WorkItemOutcome]) -> BTreeSet<(NaturalKey, String)> {
        outcomes
            .iter()
            .flat_map(|o| o.records.iter())
            .map(|r| (r.natural_key(), category(r)))
            .collect()
    }

    fn category(record: &ProductRecord) -> String {
        match &record.detail {
            RecordDetail::MomoProduct(d) => d.category_code.clone(),
            _ => String::new(),
        }
    }

    #[tokio::test]
    async fn test_outcomes_follow_input_order() {
        let outcomes = orchestrator(2).harvest(&adapter(5), work_items()).await;

        let labels: Vec<_> = outcomes.iter().map(|o| o.summary.work_item.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(outcomes[2].summary.harvested, 4);
        assert_eq!(outcomes[2].summary.fetches, 3);
        assert_eq!(outcomes[3].records.len(), 0);
    }

    #[tokio::test]
    async fn test_merged_set_is_independent_of_completion_order() {
        let baseline = merged(&orchestrator(5).harvest(&adapter(0), work_items()).await);
        assert_eq!(baseline.len(), 10);

        for round in 0..8 {
            let concurrency = 1 + round % 5;
            let outcomes = orchestrator(concurrency)
                .harvest(&adapter(15), work_items())
                .await;
            assert_eq!(merged(&outcomes), baseline, "round {round}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_drivers_respect_bound() {
        for bound in 1..=6 {
            let adapter = scripts()
                .into_iter()
                .fold(ScriptedAdapter::new().latency(10), |a, (item, steps)| {
                    a.with(item, steps)
                });

            let outcomes = orchestrator(bound).harvest(&adapter, work_items()).await;

            assert_eq!(outcomes.len(), 5);
            assert!(adapter.peak_in_flight() <= bound, "bound {bound}");
            assert_eq!(adapter.peak_in_flight(), bound.min(5), "bound {bound}");
        }
    }

    #[tokio::test]
    async fn test_failing_item_is_isolated() {
        let adapter = ScriptedAdapter::new()
            .with("good", vec![Step::ids(&[1, 2]), Step::ids(&[])])
            .with("bad", vec![Step::ids(&[3]), Step::Shape]);

        let outcomes = orchestrator(2)
            .harvest(&adapter, vec!["good".to_string(), "bad".to_string()])
            .await;

        assert_eq!(outcomes[0].records.len(), 2);
        assert!(outcomes[0].summary.fault.is_none());
        assert!(outcomes[1].records.is_empty());
        assert!(outcomes[1].summary.fault.is_some());
    }

    #[tokio::test]
    async fn test_missing_field_policy_per_item() {
        let steps = vec![
            Step::entries(vec![TestEntry::new(1, 10.0), TestEntry::nameless(2)]),
            Step::ids(&[]),
        ];

        let skip = ScriptedAdapter::new().with("a", steps.clone());
        let outcomes = orchestrator(1).harvest(&skip, vec!["a".to_string()]).await;
        assert_eq!(outcomes[0].records.len(), 1);
        assert_eq!(outcomes[0].summary.skipped, 1);
        assert_eq!(outcomes[0].summary.harvested, 2);

        let fail = ScriptedAdapter::new()
            .with("a", steps)
            .policy(MissingFieldPolicy::Fail);
        let outcomes = orchestrator(1).harvest(&fail, vec!["a".to_string()]).await;
        assert!(outcomes[0].records.is_empty());
        assert!(outcomes[0].summary.fault.is_some());
    }

    #[tokio::test]
    async fn test_stream_tags_input_positions() {
        let adapter = adapter(5);
        let orchestrator = orchestrator(3);
        let mut seen: Vec<usize> = orchestrator
            .harvest_stream(&adapter, work_items())
            .map(|(index, _)| index)
            .collect()
            .await;
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }
}
