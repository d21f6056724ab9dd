//! Shared fixtures for session integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use catalog_harvester::infrastructure::{FetchError, PageFetcher};
use std::collections::HashMap;
use std::sync::Mutex;

pub const BASE: &str = "https://shop.example.com";

pub fn listing_url(page: u32) -> String {
    format!("{BASE}/c/handbags/-/N-5xtbo?page={page}")
}

pub fn detail_url(id: &str) -> String {
    format!("{BASE}/p/bag-{id}/-/A-{id}")
}

/// In-memory fetcher: fixed responses per URL, 404 for anything else
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, Result<String, FetchError>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), Ok(body.into()));
        self
    }

    pub fn with_error(mut self, url: impl Into<String>, error: FetchError) -> Self {
        self.pages.insert(url.into(), Err(error));
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        self.pages.get(url).cloned().unwrap_or_else(|| {
            Err(FetchError::Status {
                code: 404,
                url: url.to_string(),
            })
        })
    }
}

/// One product card in the default listing markup
pub fn card(id: &str, current: &str, regular: Option<&str>) -> String {
    let regular = regular
        .map(|price| format!(r#"<span data-test="comparison-price">reg {price}</span>"#))
        .unwrap_or_default();
    format!(
        r#"<div data-test="@web/site-top-of-funnel/ProductCardWrapper">
            <a data-test="@web/ProductCard/title" href="/p/bag-{id}/-/A-{id}">Bag {id}</a>
            <a data-test="@web/ProductCard/ProductCardBrandAndRibbonMessage/brand">Universal Thread</a>
            <span data-test="current-price"><span>{current}</span></span>
            {regular}
            <span data-test="@web/ProductCard/ProductCardSwatches" aria-label="Black, Cognac"></span>
            <picture data-test="@web/ProductCard/ProductCardImage/primary">
                <img src="https://target.scene7.com/is/image/Target/GUEST_{id}">
            </picture>
        </div>"#
    )
}

/// A listing page; `next` is the page number linked as next, if any
pub fn listing_page(cards: &[String], next: Option<u32>) -> String {
    let pagination = next
        .map(|page| format!(r#"<a rel="next" href="{}">Next</a>"#, listing_url(page)))
        .unwrap_or_default();
    format!(
        "<html><body><section>{}</section><nav>{}</nav></body></html>",
        cards.join("\n"),
        pagination
    )
}

/// Listing pages `1..=count`, each with `per_page` unique ids, linked in order
pub fn linked_listing(count: u32, per_page: u32) -> FakeFetcher {
    let mut fetcher = FakeFetcher::new();
    for page in 1..=count {
        let cards: Vec<String> = (0..per_page)
            .map(|i| card(&format!("{}", page * 100 + i), "$20.00", None))
            .collect();
        let next = (page < count).then_some(page + 1);
        fetcher = fetcher.with_page(listing_url(page), listing_page(&cards, next));
    }
    fetcher
}

pub fn detail_page(material: &str) -> String {
    format!(
        r#"<html><body>
        <h1 data-test="product-title">Detail Title</h1>
        <div id="PdpHighlightsSection"><ul><li>Adjustable strap</li></ul></div>
        <div data-test="item-details-specifications">
            <div><b>Dimensions (Overall):</b> 9 Inches (H) x 11 Inches (W)</div>
            <div><b>Material:</b> {material}</div>
        </div>
        </body></html>"#
    )
}
