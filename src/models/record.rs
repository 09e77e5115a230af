// src/models/record.rs

//! Canonical product record shared by every source.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// E-commerce platform a record was harvested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Shopee,
    Momo,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Shopee => "shopee",
            Platform::Momo => "momo",
        }
    }

    /// Public storefront host used to build display URLs.
    pub fn web_base(&self) -> &'static str {
        match self {
            Platform::Shopee => "https://shopee.tw",
            Platform::Momo => "https://m.momoshop.com.tw",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Sink partition; each adapter writes exactly one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordScope {
    ShopeeProducts,
    ShopeeModels,
    MomoProducts,
}

impl RecordScope {
    pub const ALL: [RecordScope; 3] = [
        RecordScope::ShopeeProducts,
        RecordScope::ShopeeModels,
        RecordScope::MomoProducts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordScope::ShopeeProducts => "shopee_products",
            RecordScope::ShopeeModels => "shopee_models",
            RecordScope::MomoProducts => "momo_products",
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            RecordScope::ShopeeProducts | RecordScope::ShopeeModels => Platform::Shopee,
            RecordScope::MomoProducts => Platform::Momo,
        }
    }
}

impl fmt::Display for RecordScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Parsed numeric price. Always finite, so it can be compared and hashed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(f64);

impl Price {
    /// Scale factor of Shopee's integer price fields.
    pub const SHOPEE_SCALE: f64 = 100_000.0;

    pub fn new(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        // -0.0 and 0.0 must hash identically
        Some(Self(if value == 0.0 { 0.0 } else { value }))
    }

    /// Parse source-formatted price text such as `"1,234"` or `"$ 1,290.5"`.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let trimmed = trimmed
            .strip_prefix("NT$")
            .or_else(|| trimmed.strip_prefix('$'))
            .unwrap_or(trimmed);
        let cleaned: String = trimmed
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        cleaned.parse::<f64>().ok().and_then(Self::new)
    }

    /// Convert a Shopee integer price; `-1` is Shopee's "no price" marker.
    pub fn from_scaled(raw: i64) -> Option<Self> {
        if raw < 0 {
            return None;
        }
        Self::new(raw as f64 / Self::SHOPEE_SCALE)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Render with thousands separators; `Price::parse` reads it back unchanged.
    pub fn format_grouped(&self) -> String {
        let text = self.0.abs().to_string();
        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (text.as_str(), None),
        };

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        let sign = if self.0 < 0.0 { "-" } else { "" };
        match frac_part {
            Some(frac) => format!("{sign}{grouped}.{frac}"),
            None => format!("{sign}{grouped}"),
        }
    }
}

impl Eq for Price {}

impl Hash for Price {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl TryFrom<f64> for Price {
    type Error = String;

    fn try_from(value: f64) -> std::result::Result<Self, Self::Error> {
        Price::new(value).ok_or_else(|| format!("price {value} is not finite"))
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_grouped())
    }
}

/// Identity of a record across crawl runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    pub scope: RecordScope,
    pub id: String,
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.id)
    }
}

/// Normalized listing record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductRecord {
    pub platform: Platform,

    /// Stable upstream item identifier
    pub item_id: String,

    pub name: String,

    /// Parsed price
    pub price: Price,

    /// Price exactly as the source formatted it
    pub price_text: String,

    pub currency: String,

    /// Storefront path; `display_url` joins it with the platform host
    pub url_path: String,

    /// Run start time, shared by every record of the run
    pub crawled_at: DateTime<Utc>,

    #[serde(flatten)]
    pub detail: RecordDetail,
}

/// Source-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordDetail {
    ShopeeProduct(ShopeeProductDetail),
    ShopeeModel(ShopeeModelDetail),
    MomoProduct(MomoProductDetail),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShopeeProductDetail {
    pub shop_id: i64,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub price_min: Option<Price>,
    #[serde(default)]
    pub price_max: Option<Price>,
    #[serde(default)]
    pub price_min_before_discount: Option<Price>,
    #[serde(default)]
    pub price_max_before_discount: Option<Price>,
    #[serde(default)]
    pub discount: Option<String>,
    #[serde(default)]
    pub listed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShopeeModelDetail {
    pub shop_id: i64,
    pub model_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MomoProductDetail {
    pub category_code: String,
    pub category_name: String,
    /// Promotional label shown on the listing
    pub promotion: String,
    /// Price caption as displayed next to the price
    pub display_price: String,
}

impl ProductRecord {
    pub fn scope(&self) -> RecordScope {
        match self.detail {
            RecordDetail::ShopeeProduct(_) => RecordScope::ShopeeProducts,
            RecordDetail::ShopeeModel(_) => RecordScope::ShopeeModels,
            RecordDetail::MomoProduct(_) => RecordScope::MomoProducts,
        }
    }

    pub fn natural_key(&self) -> NaturalKey {
        let id = match &self.detail {
            RecordDetail::ShopeeModel(model) => format!("{}:{}", self.item_id, model.model_id),
            _ => self.item_id.clone(),
        };
        NaturalKey {
            scope: self.scope(),
            id,
        }
    }

    pub fn display_url(&self) -> String {
        if self.url_path.starts_with("http://") || self.url_path.starts_with("https://") {
            return self.url_path.clone();
        }
        format!(
            "{}/{}",
            self.platform.web_base(),
            self.url_path.trim_start_matches('/')
        )
    }

    /// Shop id for Shopee records.
    pub fn shop_id(&self) -> Option<i64> {
        match &self.detail {
            RecordDetail::ShopeeProduct(d) => Some(d.shop_id),
            RecordDetail::ShopeeModel(d) => Some(d.shop_id),
            RecordDetail::MomoProduct(_) => None,
        }
    }
}
