// src/services/normalize.rs

//! Projection of raw entries onto canonical records.
//!
//! Typed field extraction helpers yield `AppError::MissingField` instead of
//! panicking on an absent field; `normalize_all` applies the source's
//! missing-field policy to a whole harvest.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{MissingFieldPolicy, Price, ProductRecord};
use crate::services::SourceAdapter;

/// Records normalized from one work item.
#[derive(Debug, Default)]
pub struct Normalized {
    pub records: Vec<ProductRecord>,
    /// Entries dropped under the skip policy
    pub skipped: usize,
}

/// Normalize every raw entry of a work item.
///
/// A missing field drops that entry under [`MissingFieldPolicy::Skip`] and
/// fails the whole work item under [`MissingFieldPolicy::Fail`].
pub fn normalize_all<A: SourceAdapter>(
    adapter: &A,
    item: &A::WorkItem,
    raws: &[A::RawItem],
    crawled_at: DateTime<Utc>,
) -> Result<Normalized> {
    let policy = adapter.missing_field_policy();
    let mut out = Normalized::default();

    for raw in raws {
        match adapter.normalize(raw, item, crawled_at) {
            Ok(record) => out.records.push(record),
            Err(e @ AppError::MissingField { .. }) => match policy {
                MissingFieldPolicy::Skip => {
                    log::warn!("[{}] {}: skipping entry: {}", adapter.scope(), item, e);
                    out.skipped += 1;
                }
                MissingFieldPolicy::Fail => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }

    Ok(out)
}

fn present<'a>(entry: &'a Value, field: &str) -> Option<&'a Value> {
    entry.get(field).filter(|v| !v.is_null())
}

fn missing(field: &str, entry: &Value) -> AppError {
    AppError::missing_field(field, format!("entry itemid={}", id_of(entry)))
}

/// Integer field that accepts both JSON numbers and numeric strings.
pub fn required_i64(entry: &Value, field: &str) -> Result<i64> {
    optional_i64(entry, field).ok_or_else(|| missing(field, entry))
}

pub fn optional_i64(entry: &Value, field: &str) -> Option<i64> {
    match present(entry, field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-empty string field.
pub fn required_str<'a>(entry: &'a Value, field: &str) -> Result<&'a str> {
    present(entry, field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing(field, entry))
}

/// String field that must be present but may be empty.
pub fn required_string_allow_empty(entry: &Value, field: &str) -> Result<String> {
    present(entry, field)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| missing(field, entry))
}

pub fn optional_string(entry: &Value, field: &str) -> Option<String> {
    match present(entry, field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Scaled integer price plus its raw text; `-1` counts as missing.
pub fn required_scaled_price(entry: &Value, field: &str) -> Result<(Price, String)> {
    let raw = required_i64(entry, field)?;
    let price = Price::from_scaled(raw).ok_or_else(|| {
        AppError::missing_field(field, format!("no price ({raw}) for itemid={}", id_of(entry)))
    })?;
    Ok((price, raw.to_string()))
}

/// Optional scaled price; absent, null and `-1` all map to `None`.
pub fn optional_scaled_price(entry: &Value, field: &str) -> Option<Price> {
    optional_i64(entry, field).and_then(Price::from_scaled)
}

/// Unix seconds to a UTC timestamp.
pub fn optional_timestamp(entry: &Value, field: &str) -> Option<DateTime<Utc>> {
    optional_i64(entry, field)
        .filter(|secs| *secs > 0)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Required display text of an HTML entry.
pub fn required_text(value: Option<&str>, field: &str, context: &str) -> Result<String> {
    value
        .map(str::to_string)
        .ok_or_else(|| AppError::missing_field(field, context))
}

/// Formatted price text such as `"1,234"`.
pub fn required_price_text(text: &str, field: &str, context: &str) -> Result<Price> {
    Price::parse(text).ok_or_else(|| {
        AppError::missing_field(field, format!("unparsable price '{text}' in {context}"))
    })
}

fn id_of(entry: &Value) -> String {
    entry
        .get("itemid")
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string())
}
