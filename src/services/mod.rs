//! Service layer for the harvester.
//!
//! This module contains the ingestion building blocks:
//! - The per-source contract (`SourceAdapter`) and its upstream variants
//! - Page fetch retry (`RetryPolicy`)
//! - Per work item pagination (`PaginationDriver`)
//! - Raw entry projection (`normalize`)

mod adapter;
pub mod driver;
pub mod momo;
pub mod normalize;
pub mod retry;
pub mod shopee;
pub mod shopee_models;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{FetchedPage, SourceAdapter};
pub use driver::{Harvest, PaginationDriver};
pub use momo::MomoBrandAdapter;
pub use retry::RetryPolicy;
pub use shopee::ShopeeShopAdapter;
pub use shopee_models::ShopeeModelAdapter;
