//! Parsing context for listing and detail pages

use crate::infrastructure::config::defaults::DEFAULT_PAGE_SIZE;

/// Context information for a listing page
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// 1-based position of this page in the session
    pub page_number: u32,

    /// URL the page was fetched from; relative links resolve against it
    pub page_url: String,

    /// Expected number of products per page, used for offset pagination
    pub page_size: u32,
}

impl ParseContext {
    pub fn new(page_number: u32, page_url: impl Into<String>) -> Self {
        Self {
            page_number,
            page_url: page_url.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set expected products per page
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Context for a product detail page
#[derive(Debug, Clone)]
pub struct DetailParseContext {
    /// Product URL being parsed
    pub url: String,

    /// Id of the listing card this page enriches
    pub product_id: Option<String>,
}

impl DetailParseContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            product_id: None,
        }
    }

    #[must_use]
    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }
}
