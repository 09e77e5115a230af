// src/pipeline/search.rs

//! Read path over persisted records: name lookup across every source.

use std::cmp::Ordering;
use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use crate::error::{AppError, Result};
use crate::models::{ProductRecord, RecordScope};
use crate::storage::RecordSink;

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub name: String,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matcher(&self) -> Result<Regex> {
        RegexBuilder::new(&regex::escape(self.name.trim()))
            .case_insensitive(true)
            .build()
            .map_err(|e| AppError::validation(format!("search name: {e}")))
    }
}

/// Cheapest first; equal prices show the newest record first.
fn by_price_then_newest(a: &ProductRecord, b: &ProductRecord) -> Ordering {
    a.price
        .value()
        .total_cmp(&b.price.value())
        .then_with(|| b.crawled_at.cmp(&a.crawled_at))
        .then_with(|| match (a.item_id.parse::<u64>(), b.item_id.parse::<u64>()) {
            (Ok(x), Ok(y)) => y.cmp(&x),
            _ => b.item_id.cmp(&a.item_id),
        })
}

/// Match, order and deduplicate records by display URL.
pub fn search<'a>(records: &'a [ProductRecord], query: &SearchQuery) -> Result<Vec<&'a ProductRecord>> {
    let matcher = query.matcher()?;

    let mut hits: Vec<&ProductRecord> = records
        .iter()
        .filter(|r| matcher.is_match(&r.name))
        .collect();
    hits.sort_by(|a, b| by_price_then_newest(a, b));

    let mut seen = HashSet::new();
    let hits = hits
        .into_iter()
        .filter(|r| seen.insert(r.display_url()))
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();
    Ok(hits)
}

/// Load every persisted scope from a sink.
pub async fn load_catalog<S: RecordSink + ?Sized>(sink: &S) -> Result<Vec<ProductRecord>> {
    let mut records = Vec::new();
    for scope in RecordScope::ALL {
        let loaded = sink.load_records(scope).await?;
        log::debug!("{scope}: {} records", loaded.len());
        records.extend(loaded);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::models::fixtures::momo_record;
    use crate::storage::MemorySink;

    fn named(id: &str, name: &str, price: f64) -> ProductRecord {
        let mut record = momo_record(id, price);
        record.name = name.to_string();
        record
    }

    #[test]
    fn test_case_insensitive_containment() {
        let records = vec![
            named("1", "Google Pixel 7", 18_990.0),
            named("2", "iPhone 15", 29_900.0),
            named("3", "pixel buds", 5_990.0),
        ];

        let hits = search(&records, &SearchQuery::new("PIXEL")).unwrap();

        let ids: Vec<_> = hits.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn test_name_is_matched_literally() {
        let records = vec![named("1", "USB-C (2m)", 199.0), named("2", "USB-C 2m", 99.0)];

        let hits = search(&records, &SearchQuery::new("(2m)")).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item_id, "1");
    }

    #[test]
    fn test_ties_prefer_newest_then_larger_id() {
        let older = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut a = named("9", "cable", 100.0);
        a.url_path = "/goods.momo?i_code=9".into();
        let mut b = named("10", "cable", 100.0);
        b.url_path = "/goods.momo?i_code=10".into();
        let mut c = named("11", "cable", 100.0);
        c.url_path = "/goods.momo?i_code=11".into();
        c.crawled_at = older - Duration::days(1);
        a.crawled_at = older;
        b.crawled_at = older;

        let records = vec![c, a, b];
        let hits = search(&records, &SearchQuery::new("cable")).unwrap();

        let ids: Vec<_> = hits.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["10", "9", "11"]);
    }

    #[test]
    fn test_duplicate_urls_keep_first_after_sort() {
        let mut cheap = named("1", "mouse", 300.0);
        cheap.crawled_at = cheap.crawled_at + Duration::hours(1);
        let records = vec![named("1", "mouse", 500.0), cheap, named("2", "mouse", 400.0)];

        let hits = search(&records, &SearchQuery::new("mouse").limit(5)).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].price.value(), 300.0);
        assert_eq!(hits[1].item_id, "2");
    }

    #[test]
    fn test_limit() {
        let records: Vec<_> = (0..10)
            .map(|i| named(&i.to_string(), "keyboard", i as f64))
            .collect();

        let hits = search(&records, &SearchQuery::new("key").limit(3)).unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].item_id, "0");
    }

    #[tokio::test]
    async fn test_load_catalog_merges_scopes() {
        let sink = MemorySink::with_records(vec![momo_record("1", 1.0), momo_record("2", 2.0)]);

        let records = load_catalog(&sink).await.unwrap();

        assert_eq!(records.len(), 2);
    }
}
