// src/models/mod.rs

//! Domain models for the harvester.
//!
//! Configuration, work items, pagination cursors, canonical records and
//! run reports.

mod config;
mod cursor;
mod record;
mod report;
mod work_item;

pub use config::{
    Config, CrawlerConfig, MissingFieldPolicy, MomoConfig, RetryConfig, ShopeeConfig, ShopeeSort,
};
pub use cursor::Cursor;
pub use record::{
    MomoProductDetail, NaturalKey, Platform, Price, ProductRecord, RecordDetail, RecordScope,
    ShopeeModelDetail, ShopeeProductDetail,
};
pub use report::{Anomaly, MergeMode, RunReport, WorkItemSummary};
pub use work_item::{BrandRef, ItemRef, ShopRef, WorkItems};

#[cfg(test)]
pub(crate) use record::fixtures;
