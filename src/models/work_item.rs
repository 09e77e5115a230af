// src/models/work_item.rs

//! Work items: the independently crawlable units handed to each adapter.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// An official Shopee shop whose listings are paginated by offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopRef {
    pub shopid: i64,

    /// Shop username, informational only
    #[serde(default)]
    pub username: String,
}

impl fmt::Display for ShopRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.username.is_empty() {
            write!(f, "shop {}", self.shopid)
        } else {
            write!(f, "shop {} ({})", self.shopid, self.username)
        }
    }
}

/// A single Shopee item whose models (variants) are fetched in one page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub itemid: i64,
    pub shopid: i64,
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item {}/{}", self.shopid, self.itemid)
    }
}

/// A Momo brand (child category) listing paginated by page number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandRef {
    /// Child category code used as the `cn` query parameter
    pub code: String,

    /// Brand display name
    #[serde(default)]
    pub name: String,
}

impl fmt::Display for BrandRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "brand {} [{}]", self.name, self.code)
    }
}

/// Work items supplied by the discovery step, loaded at run start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkItems {
    #[serde(default)]
    pub shopee_shops: Vec<ShopRef>,

    #[serde(default)]
    pub momo_brands: Vec<BrandRef>,
}

impl WorkItems {
    /// Load work items from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Reject duplicate keys; blank brand codes are allowed and skipped at crawl time.
    pub fn validate(&self) -> Result<()> {
        let mut shops = std::collections::HashSet::new();
        for shop in &self.shopee_shops {
            if !shops.insert(shop.shopid) {
                return Err(AppError::validation(format!(
                    "duplicate shopee shopid {}",
                    shop.shopid
                )));
            }
        }
        let mut brands = std::collections::HashSet::new();
        for brand in self.momo_brands.iter().filter(|b| !b.code.is_empty()) {
            if !brands.insert(brand.code.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate momo brand code {}",
                    brand.code
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.shopee_shops.is_empty() && self.momo_brands.is_empty()
    }
}
