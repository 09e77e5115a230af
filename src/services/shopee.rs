// src/services/shopee.rs

//! Shopee official shop listings.
//!
//! Endpoint: `GET {base}/api/v4/recommend/recommend`, offset/limit paginated.
//! The response must hold exactly one section carrying `total` and
//! `data.item` (an array, or null once the listing is exhausted).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{
    Cursor, MissingFieldPolicy, Platform, ProductRecord, RecordDetail, RecordScope, ShopRef,
    ShopeeConfig, ShopeeProductDetail,
};
use crate::services::normalize::{
    optional_i64, optional_scaled_price, optional_string, optional_timestamp, required_i64,
    required_scaled_price, required_str,
};
use crate::services::{FetchedPage, SourceAdapter};
use crate::utils::{build_url, http};

const RECOMMEND_PATH: &str = "/api/v4/recommend/recommend";
const BUNDLE: &str = "shop_page_category_tab_main";
const SECTION: &str = "shop_page_category_tab_main_sec";

/// Storefront path of a Shopee item.
pub fn product_path(shop_id: i64, item_id: i64) -> String {
    format!("/product/{shop_id}/{item_id}")
}

/// Extract the items of one recommend response window.
///
/// `null` bodies and missing `data`/`sections`/`total` are transient. More
/// than one section is a shape violation. A null item list ends pagination
/// only when `total` says the window lies past the end.
pub fn parse_recommend_page(
    body: &Value,
    offset: u32,
    limit: u32,
    context: &str,
) -> Result<FetchedPage<Value>> {
    if body.is_null() {
        return Err(AppError::transient(context, "null response body"));
    }
    let sections = body
        .get("data")
        .and_then(|d| d.get("sections"))
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::transient(context, "response has no data.sections"))?;

    let section = match sections.as_slice() {
        [] => return Err(AppError::transient(context, "response has zero sections")),
        [section] => section,
        many => {
            return Err(AppError::shape(
                context,
                format!("expected 1 section, got {}", many.len()),
            ));
        }
    };

    let total = section
        .get("total")
        .and_then(Value::as_u64)
        .ok_or_else(|| AppError::transient(context, "section has no total"))?;

    let items = match section.get("data").and_then(|d| d.get("item")) {
        None | Some(Value::Null) => {
            if total <= u64::from(offset) {
                return Ok(FetchedPage::terminal_empty());
            }
            return Err(AppError::transient(
                context,
                format!("item list is null at offset {offset} of {total}"),
            ));
        }
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            return Err(AppError::shape(
                context,
                format!("item list is not an array: {other}"),
            ));
        }
    };

    let terminal = items.is_empty() || u64::from(offset) + u64::from(limit) >= total;
    Ok(FetchedPage::new(items, terminal))
}

/// Project one recommend `item` entry onto a product record.
pub fn normalize_shop_item(entry: &Value, crawled_at: DateTime<Utc>) -> Result<ProductRecord> {
    let item_id = required_i64(entry, "itemid")?;
    let shop_id = required_i64(entry, "shopid")?;
    let name = required_str(entry, "name")?;
    let (price, price_text) = required_scaled_price(entry, "price")?;

    Ok(ProductRecord {
        platform: Platform::Shopee,
        item_id: item_id.to_string(),
        name: name.to_string(),
        price,
        price_text,
        currency: optional_string(entry, "currency").unwrap_or_else(|| "TWD".to_string()),
        url_path: product_path(shop_id, item_id),
        crawled_at,
        detail: RecordDetail::ShopeeProduct(ShopeeProductDetail {
            shop_id,
            stock: optional_i64(entry, "stock"),
            price_min: optional_scaled_price(entry, "price_min"),
            price_max: optional_scaled_price(entry, "price_max"),
            price_min_before_discount: optional_scaled_price(entry, "price_min_before_discount"),
            price_max_before_discount: optional_scaled_price(entry, "price_max_before_discount"),
            discount: optional_string(entry, "discount"),
            listed_at: optional_timestamp(entry, "ctime"),
        }),
    })
}

/// Paginates the listings of official shops.
pub struct ShopeeShopAdapter {
    client: reqwest::Client,
    config: ShopeeConfig,
}

impl ShopeeShopAdapter {
    pub fn new(client: reqwest::Client, config: ShopeeConfig) -> Self {
        Self { client, config }
    }

    fn page_url(&self, shop: &ShopRef, offset: u32, limit: u32) -> Result<url::Url> {
        let sort = self.config.sort;
        Ok(build_url(
            &self.config.base_url,
            RECOMMEND_PATH,
            &[
                ("bundle", BUNDLE.to_string()),
                ("item_card", "2".to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("section", SECTION.to_string()),
                ("shopid", shop.shopid.to_string()),
                ("sort_type", sort.sort_type().to_string()),
                ("tab_name", sort.tab_name().to_string()),
            ],
        )?)
    }
}

#[async_trait]
impl SourceAdapter for ShopeeShopAdapter {
    type WorkItem = ShopRef;
    type RawItem = Value;

    fn scope(&self) -> RecordScope {
        RecordScope::ShopeeProducts
    }

    fn first_cursor(&self) -> Cursor {
        Cursor::first_window(self.config.page_limit)
    }

    fn missing_field_policy(&self) -> MissingFieldPolicy {
        self.config.missing_field
    }

    async fn fetch_page(&self, shop: &ShopRef, cursor: Cursor) -> Result<FetchedPage<Value>> {
        let Cursor::Offset { offset, limit } = cursor else {
            return Err(AppError::crawl(shop.to_string(), "expected an offset cursor"));
        };
        let url = self.page_url(shop, offset, limit)?;
        let body = http::fetch_json(&self.client, url.as_str()).await?;
        parse_recommend_page(&body, offset, limit, &shop.to_string())
    }

    fn normalize(
        &self,
        raw: &Value,
        _shop: &ShopRef,
        crawled_at: DateTime<Utc>,
    ) -> Result<ProductRecord> {
        normalize_shop_item(raw, crawled_at)
    }
}
