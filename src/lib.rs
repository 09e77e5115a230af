// src/lib.rs

//! Harvester: product catalog ingestion for price comparison.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
