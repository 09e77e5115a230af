// src/pipeline/ingest.rs

//! One ingestion run: harvest, gate, persist, report.

use chrono::Utc;
use futures::StreamExt;

use crate::error::Result;
use crate::models::{MergeMode, ProductRecord, RunReport, WorkItemSummary};
use crate::pipeline::gate::{DedupGate, take_indices};
use crate::pipeline::orchestrator::Orchestrator;
use crate::services::SourceAdapter;
use crate::storage::RecordSink;

/// Result of one run.
#[derive(Debug)]
pub struct IngestOutcome {
    pub report: RunReport,
    /// Records handed to the sink, in admission order
    pub accepted: Vec<ProductRecord>,
}

/// Crawl every work item of one source and persist the new records.
///
/// The known-key set is read once before any admission decision. A failing
/// work item is reported and contributes nothing; only sink failures abort
/// the run.
pub async fn run_ingest<A, S>(
    adapter: &A,
    sink: &S,
    orchestrator: &Orchestrator,
    items: Vec<A::WorkItem>,
    mode: MergeMode,
) -> Result<IngestOutcome>
where
    A: SourceAdapter,
    S: RecordSink + ?Sized,
{
    let source = adapter.scope();
    let started_at = orchestrator.crawled_at();

    let known = sink.list_known_keys(source).await?;

    let (summaries, accepted, inserted) = match mode {
        MergeMode::Gather => gather(adapter, sink, orchestrator, items, known).await?,
        MergeMode::Streaming => stream(adapter, sink, orchestrator, items, known).await?,
    };

    let report = RunReport {
        source,
        mode,
        started_at,
        finished_at: Utc::now(),
        items: summaries,
        accepted: accepted.len(),
        inserted,
    };
    sink.save_run_report(&report).await?;
    crate::utils::log::run_summary(&report);

    Ok(IngestOutcome { report, accepted })
}

type Merged = (Vec<WorkItemSummary>, Vec<ProductRecord>, usize);

/// Barrier merge: every work item first, then one gate pass and one append.
async fn gather<A, S>(
    adapter: &A,
    sink: &S,
    orchestrator: &Orchestrator,
    items: Vec<A::WorkItem>,
    known: std::collections::HashSet<crate::models::NaturalKey>,
) -> Result<Merged>
where
    A: SourceAdapter,
    S: RecordSink + ?Sized,
{
    let outcomes = orchestrator.harvest(adapter, items).await;

    let mut summaries = Vec::with_capacity(outcomes.len());
    let mut merged = Vec::new();
    let mut owner = Vec::new();
    for (position, outcome) in outcomes.into_iter().enumerate() {
        owner.extend(std::iter::repeat_n(position, outcome.records.len()));
        merged.extend(outcome.records);
        summaries.push(outcome.summary);
    }

    let gate = DedupGate::new(known);
    log::info!("[{}] {} keys already stored", adapter.scope(), gate.known_len());
    let admission = gate.screen(&merged);
    for &index in &admission.indices {
        summaries[owner[index]].accepted += 1;
    }
    log::info!(
        "[{}] gate: {} candidates, {} accepted, {} exact duplicates, {} known, {} key collisions",
        adapter.scope(),
        merged.len(),
        admission.indices.len(),
        admission.duplicates,
        admission.known,
        admission.collisions
    );

    let accepted = take_indices(merged, &admission.indices);
    let inserted = if accepted.is_empty() {
        0
    } else {
        sink.append_if_absent(&accepted).await?
    };

    Ok((summaries, accepted, inserted))
}

/// Streaming merge: each work item is gated and persisted as it completes.
async fn stream<A, S>(
    adapter: &A,
    sink: &S,
    orchestrator: &Orchestrator,
    items: Vec<A::WorkItem>,
    known: std::collections::HashSet<crate::models::NaturalKey>,
) -> Result<Merged>
where
    A: SourceAdapter,
    S: RecordSink + ?Sized,
{
    let mut slots: Vec<Option<WorkItemSummary>> = vec![None; items.len()];
    let mut gate = DedupGate::new(known);
    log::info!("[{}] {} keys already stored", adapter.scope(), gate.known_len());
    let mut accepted = Vec::new();
    let mut inserted = 0;

    let mut outcomes = std::pin::pin!(orchestrator.harvest_stream(adapter, items));
    while let Some((position, outcome)) = outcomes.next().await {
        let mut summary = outcome.summary;
        let (admitted, _) = gate.admit_incremental(outcome.records);
        summary.accepted = admitted.len();

        if !admitted.is_empty() {
            inserted += sink.append_if_absent(&admitted).await?;
            log::info!(
                "[{}] {}: {} records persisted",
                adapter.scope(),
                summary.work_item,
                admitted.len()
            );
        }
        accepted.extend(admitted);
        slots[position] = Some(summary);
    }

    Ok((slots.into_iter().flatten().collect(), accepted, inserted))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::models::{NaturalKey, RecordDetail, RecordScope};
    use crate::services::testing::{ScriptedAdapter, Step, TestEntry};
    use crate::services::{PaginationDriver, RetryPolicy};
    use crate::storage::MemorySink;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            PaginationDriver::new(RetryPolicy::new(3, Duration::ZERO), Duration::ZERO, 50),
            4,
            Utc::now(),
        )
    }

    /// A: pages [{1},{2}] then empty. B: [{2}] then empty.
    fn overlapping() -> ScriptedAdapter {
        ScriptedAdapter::new()
            .with(
                "A",
                vec![
                    Step::entries(vec![TestEntry::new(1, 100.0)]),
                    Step::entries(vec![TestEntry::new(2, 200.0)]),
                    Step::ids(&[]),
                ],
            )
            .with(
                "B",
                vec![Step::entries(vec![TestEntry::new(2, 180.0)]), Step::ids(&[])],
            )
            .jitter(5)
    }

    fn items() -> Vec<String> {
        vec!["A".to_string(), "B".to_string()]
    }

    fn ids(records: &[ProductRecord]) -> HashSet<String> {
        records.iter().map(|r| r.item_id.clone()).collect()
    }

    fn key(id: &str) -> NaturalKey {
        NaturalKey {
            scope: RecordScope::MomoProducts,
            id: id.to_string(),
        }
    }

    fn category(record: &ProductRecord) -> &str {
        match &record.detail {
            RecordDetail::MomoProduct(d) => &d.category_code,
            _ => "",
        }
    }

    #[tokio::test]
    async fn test_empty_sink_accepts_both_keys_keep_last() {
        let sink = MemorySink::new();

        let outcome = run_ingest(&overlapping(), &sink, &orchestrator(), items(), MergeMode::Gather)
            .await
            .unwrap();

        assert_eq!(ids(&outcome.accepted), HashSet::from(["1".to_string(), "2".to_string()]));
        let two = outcome.accepted.iter().find(|r| r.item_id == "2").unwrap();
        assert_eq!(category(two), "B");
        assert_eq!(two.price.value(), 180.0);

        assert_eq!(outcome.report.inserted, 2);
        assert_eq!(outcome.report.items[0].accepted, 1);
        assert_eq!(outcome.report.items[1].accepted, 1);

        let keys = sink.list_known_keys(RecordScope::MomoProducts).await.unwrap();
        assert_eq!(keys, HashSet::from([key("1"), key("2")]));
    }

    #[tokio::test]
    async fn test_known_key_is_not_accepted_again() {
        let sink = MemorySink::new();
        sink.append_if_absent(&[crate::models::fixtures::momo_record("1", 1.0)])
            .await
            .unwrap();

        let outcome = run_ingest(&overlapping(), &sink, &orchestrator(), items(), MergeMode::Gather)
            .await
            .unwrap();

        assert_eq!(ids(&outcome.accepted), HashSet::from(["2".to_string()]));
        assert_eq!(outcome.report.inserted, 1);
        assert_eq!(outcome.report.items[0].harvested, 2);
    }

    #[tokio::test]
    async fn test_second_run_inserts_nothing() {
        let sink = MemorySink::new();
        run_ingest(&overlapping(), &sink, &orchestrator(), items(), MergeMode::Gather)
            .await
            .unwrap();

        let again = run_ingest(&overlapping(), &sink, &orchestrator(), items(), MergeMode::Gather)
            .await
            .unwrap();

        assert!(again.accepted.is_empty());
        assert_eq!(again.report.inserted, 0);
        assert_eq!(sink.reports().await.len(), 2);
    }

    #[tokio::test]
    async fn test_streaming_never_persists_a_key_twice() {
        let sink = MemorySink::new();

        let outcome = run_ingest(
            &overlapping(),
            &sink,
            &orchestrator(),
            items(),
            MergeMode::Streaming,
        )
        .await
        .unwrap();

        assert_eq!(ids(&outcome.accepted), HashSet::from(["1".to_string(), "2".to_string()]));
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.report.inserted, 2);
        assert_eq!(outcome.report.items[0].work_item, "A");
        assert_eq!(outcome.report.items[1].work_item, "B");
        let records = sink.load_records(RecordScope::MomoProducts).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_item_reports_fault_and_zero_accepted() {
        let adapter = ScriptedAdapter::new()
            .with("ok", vec![Step::ids(&[1]), Step::ids(&[])])
            .with("broken", vec![Step::Shape]);
        let sink = MemorySink::new();

        let outcome = run_ingest(
            &adapter,
            &sink,
            &orchestrator(),
            vec!["ok".to_string(), "broken".to_string()],
            MergeMode::Gather,
        )
        .await
        .unwrap();

        assert_eq!(outcome.report.failed_items(), 1);
        assert_eq!(outcome.report.items[1].accepted, 0);
        assert!(outcome.report.items[1].fault.is_some());
        assert_eq!(outcome.report.inserted, 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_reported_as_anomalies() {
        let adapter = ScriptedAdapter::new().with(
            "flaky",
            vec![Step::ids(&[1]), Step::Transient, Step::Transient, Step::Transient],
        );
        let sink = MemorySink::new();

        let outcome = run_ingest(
            &adapter,
            &sink,
            &orchestrator(),
            vec!["flaky".to_string()],
            MergeMode::Gather,
        )
        .await
        .unwrap();

        let summary = &outcome.report.items[0];
        assert!(summary.fault.is_none());
        assert_eq!(summary.anomalies.len(), 3);
        assert_eq!(summary.accepted, 1);
        assert_eq!(outcome.report.anomaly_count(), 3);
    }
}
