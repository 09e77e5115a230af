// src/services/adapter.rs

//! The per-source capability every upstream implements.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Cursor, MissingFieldPolicy, ProductRecord, RecordScope};

/// Entries extracted from one fetched page.
#[derive(Debug)]
pub struct FetchedPage<T> {
    pub items: Vec<T>,
    /// No further page should be requested
    pub terminal: bool,
}

impl<T> FetchedPage<T> {
    pub fn new(items: Vec<T>, terminal: bool) -> Self {
        Self { items, terminal }
    }

    /// Graceful end of pagination.
    pub fn terminal_empty() -> Self {
        Self {
            items: Vec::new(),
            terminal: true,
        }
    }
}

/// Fetch and project one upstream source.
///
/// An adapter owns the brittle upstream contract (endpoint, response path or
/// DOM shape) so an upstream change touches a single implementation.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Independently crawlable unit (shop, item, brand).
    type WorkItem: Clone + Send + Sync + fmt::Display + 'static;

    /// One entry in source-native shape.
    type RawItem: Send + Sync + 'static;

    /// Catalog partition the normalized records belong to.
    fn scope(&self) -> RecordScope;

    /// Cursor of the first page.
    fn first_cursor(&self) -> Cursor;

    /// Handling of entries that lack a required field.
    fn missing_field_policy(&self) -> MissingFieldPolicy;

    /// Fetch a single page.
    ///
    /// Errors classified transient by [`crate::error::AppError::is_transient`]
    /// are retried; any other error fails the work item.
    async fn fetch_page(
        &self,
        item: &Self::WorkItem,
        cursor: Cursor,
    ) -> Result<FetchedPage<Self::RawItem>>;

    /// Project a raw entry onto the canonical record.
    ///
    /// Fails with `AppError::MissingField` when a required field is absent.
    fn normalize(
        &self,
        raw: &Self::RawItem,
        item: &Self::WorkItem,
        crawled_at: DateTime<Utc>,
    ) -> Result<ProductRecord>;
}
