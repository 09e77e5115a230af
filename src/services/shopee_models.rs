// src/services/shopee_models.rs

//! Shopee item models (variants).
//!
//! Endpoint: `GET {base}/api/v4/item/get?itemid&shopid`. One page per item.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{
    Cursor, ItemRef, MissingFieldPolicy, Platform, ProductRecord, RecordDetail, RecordScope,
    ShopeeConfig, ShopeeModelDetail,
};
use crate::services::normalize::{
    required_i64, required_scaled_price, required_string_allow_empty,
};
use crate::services::shopee::product_path;
use crate::services::{FetchedPage, SourceAdapter};
use crate::utils::{build_url, http};

const ITEM_PATH: &str = "/api/v4/item/get";

/// Extract `data.models` of an item response.
pub fn parse_item_models(body: &Value, context: &str) -> Result<FetchedPage<Value>> {
    if body.is_null() {
        return Err(AppError::transient(context, "null response body"));
    }
    let data = body
        .get("data")
        .filter(|d| !d.is_null())
        .ok_or_else(|| AppError::transient(context, "response has no data"))?;

    match data.get("models") {
        Some(Value::Array(models)) => Ok(FetchedPage::new(models.clone(), true)),
        None | Some(Value::Null) => Err(AppError::transient(context, "item has no models")),
        Some(other) => Err(AppError::shape(
            context,
            format!("models is not an array: {other}"),
        )),
    }
}

/// Model work items for every distinct stored Shopee product.
pub fn model_work_items(products: &[ProductRecord]) -> Vec<ItemRef> {
    let mut seen = HashSet::new();
    products
        .iter()
        .filter_map(|record| {
            let itemid = record.item_id.parse::<i64>().ok()?;
            let shopid = record.shop_id()?;
            Some(ItemRef { itemid, shopid })
        })
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

pub struct ShopeeModelAdapter {
    client: reqwest::Client,
    config: ShopeeConfig,
}

impl ShopeeModelAdapter {
    pub fn new(client: reqwest::Client, config: ShopeeConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl SourceAdapter for ShopeeModelAdapter {
    type WorkItem = ItemRef;
    type RawItem = Value;

    fn scope(&self) -> RecordScope {
        RecordScope::ShopeeModels
    }

    fn first_cursor(&self) -> Cursor {
        Cursor::first_page()
    }

    fn missing_field_policy(&self) -> MissingFieldPolicy {
        self.config.missing_field
    }

    async fn fetch_page(&self, item: &ItemRef, _cursor: Cursor) -> Result<FetchedPage<Value>> {
        let url = build_url(
            &self.config.base_url,
            ITEM_PATH,
            &[
                ("itemid", item.itemid.to_string()),
                ("shopid", item.shopid.to_string()),
            ],
        )?;
        let body = http::fetch_json(&self.client, url.as_str()).await?;
        parse_item_models(&body, &item.to_string())
    }

    fn normalize(
        &self,
        raw: &Value,
        item: &ItemRef,
        crawled_at: DateTime<Utc>,
    ) -> Result<ProductRecord> {
        let item_id = required_i64(raw, "itemid")?;
        let model_id = required_i64(raw, "modelid")?;
        // single-variant items carry one model with an empty name
        let name = required_string_allow_empty(raw, "name")?;
        let (price, price_text) = required_scaled_price(raw, "price")?;

        Ok(ProductRecord {
            platform: Platform::Shopee,
            item_id: item_id.to_string(),
            name,
            price,
            price_text,
            currency: "TWD".to_string(),
            url_path: product_path(item.shopid, item_id),
            crawled_at,
            detail: RecordDetail::ShopeeModel(ShopeeModelDetail {
                shop_id: item.shopid,
                model_id: model_id.to_string(),
            }),
        })
    }
}
