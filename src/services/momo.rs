// src/services/momo.rs

//! Momo brand listings scraped from the mobile storefront.
//!
//! Endpoint: `GET {base}/category.momo?cn={code}&page={n}&sortType=6&imgSH=fourCardStyle`.
//! Products live in `article.prdListArea`, one `li` per product. A page
//! without that container is the end of the listing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{
    BrandRef, Cursor, MissingFieldPolicy, MomoConfig, MomoProductDetail, Platform, ProductRecord,
    RecordDetail, RecordScope,
};
use crate::services::normalize::{required_price_text, required_text};
use crate::services::{FetchedPage, SourceAdapter};
use crate::utils::{build_url, http, path_and_query, query_param};

const LISTING_PATH: &str = "/category.momo";

/// Display fields of one listing entry; `None` when the element is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MomoEntry {
    pub url_path: Option<String>,
    pub promotion: Option<String>,
    pub name: Option<String>,
    pub price: Option<String>,
    pub price_text: Option<String>,
}

/// Compiled selectors of the listing DOM.
pub struct ListingSelectors {
    container: Selector,
    entry: Selector,
    link: Selector,
    promotion: Selector,
    name: Selector,
    price: Selector,
    price_text: Selector,
}

impl ListingSelectors {
    pub fn new() -> Result<Self> {
        Ok(Self {
            container: parse_selector("article.prdListArea")?,
            entry: parse_selector("li")?,
            link: parse_selector("a.productInfo")?,
            promotion: parse_selector("p.prdEvent")?,
            name: parse_selector("h3.prdName")?,
            price: parse_selector("b.price")?,
            price_text: parse_selector("b.priceText")?,
        })
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn text_of(entry: &ElementRef, selector: &Selector) -> Option<String> {
    entry
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// Extract every product entry of a listing page.
///
/// A missing container yields a terminal empty page; missing fields inside
/// an entry are left for normalization to reject.
pub fn parse_listing(html: &str, selectors: &ListingSelectors) -> FetchedPage<MomoEntry> {
    let document = Html::parse_document(html);
    let Some(container) = document.select(&selectors.container).next() else {
        return FetchedPage::terminal_empty();
    };

    let items: Vec<MomoEntry> = container
        .select(&selectors.entry)
        .map(|li| MomoEntry {
            url_path: li
                .select(&selectors.link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| href.trim().to_string())
                .filter(|href| !href.is_empty()),
            promotion: text_of(&li, &selectors.promotion),
            name: text_of(&li, &selectors.name).filter(|n| !n.is_empty()),
            price: text_of(&li, &selectors.price).filter(|p| !p.is_empty()),
            price_text: text_of(&li, &selectors.price_text),
        })
        .collect();

    let terminal = items.is_empty();
    FetchedPage::new(items, terminal)
}

/// Identity of a Momo product: the `i_code` query parameter, else the path.
pub fn momo_item_id(url_path: &str) -> String {
    query_param(url_path, "i_code").unwrap_or_else(|| path_and_query(url_path))
}

pub struct MomoBrandAdapter {
    client: reqwest::Client,
    config: MomoConfig,
    selectors: ListingSelectors,
}

impl MomoBrandAdapter {
    pub fn new(client: reqwest::Client, config: MomoConfig) -> Result<Self> {
        Ok(Self {
            client,
            config,
            selectors: ListingSelectors::new()?,
        })
    }

    fn page_url(&self, brand: &BrandRef, page: u32) -> Result<url::Url> {
        Ok(build_url(
            &self.config.base_url,
            LISTING_PATH,
            &[
                ("cn", brand.code.clone()),
                ("page", page.to_string()),
                ("sortType", "6".to_string()),
                ("imgSH", "fourCardStyle".to_string()),
            ],
        )?)
    }
}

#[async_trait]
impl SourceAdapter for MomoBrandAdapter {
    type WorkItem = BrandRef;
    type RawItem = MomoEntry;

    fn scope(&self) -> RecordScope {
        RecordScope::MomoProducts
    }

    fn first_cursor(&self) -> Cursor {
        Cursor::first_page()
    }

    fn missing_field_policy(&self) -> MissingFieldPolicy {
        self.config.missing_field
    }

    async fn fetch_page(&self, brand: &BrandRef, cursor: Cursor) -> Result<FetchedPage<MomoEntry>> {
        if brand.code.trim().is_empty() {
            log::debug!("{brand}: blank code, nothing to fetch");
            return Ok(FetchedPage::terminal_empty());
        }
        let Cursor::Page(page) = cursor else {
            return Err(AppError::crawl(brand.to_string(), "expected a page cursor"));
        };
        let url = self.page_url(brand, page)?;
        let html = http::fetch_text(&self.client, url.as_str()).await?;
        Ok(parse_listing(&html, &self.selectors))
    }

    fn normalize(
        &self,
        raw: &MomoEntry,
        brand: &BrandRef,
        crawled_at: DateTime<Utc>,
    ) -> Result<ProductRecord> {
        let context = format!("{brand} entry {}", raw.name.as_deref().unwrap_or("?"));
        let href = required_text(raw.url_path.as_deref(), "a.productInfo[href]", &context)?;
        let promotion = required_text(raw.promotion.as_deref(), "p.prdEvent", &context)?;
        let name = required_text(raw.name.as_deref(), "h3.prdName", &context)?;
        let price_raw = required_text(raw.price.as_deref(), "b.price", &context)?;
        let display_price = required_text(raw.price_text.as_deref(), "b.priceText", &context)?;
        let price = required_price_text(&price_raw, "b.price", &context)?;

        let url_path = path_and_query(&href);
        Ok(ProductRecord {
            platform: Platform::Momo,
            item_id: momo_item_id(&url_path),
            name,
            price,
            price_text: price_raw,
            currency: "TWD".to_string(),
            url_path,
            crawled_at,
            detail: RecordDetail::MomoProduct(MomoProductDetail {
                category_code: brand.code.clone(),
                category_name: brand.name.clone(),
                promotion,
                display_price,
            }),
        })
    }
}
