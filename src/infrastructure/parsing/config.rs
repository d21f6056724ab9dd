//! Selector configuration for listing and detail extraction
//!
//! Every field carries an ordered list of selectors, primary first. All of
//! them can be overridden from the config file.

use serde::{Deserialize, Serialize};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Selector configuration for both page kinds
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SelectorConfig {
    pub listing: ListingSelectors,
    pub detail: DetailSelectors,
}

/// CSS selectors for search/listing pages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListingSelectors {
    /// Selectors for product cards - multiple fallbacks
    pub product_container: Vec<String>,

    /// Card attributes holding the product id
    pub product_id_attributes: Vec<String>,

    /// Regex applied to the product link when no id attribute is present
    pub product_id_pattern: String,

    pub product_link: Vec<String>,
    pub title: Vec<String>,
    pub brand: Vec<String>,
    pub current_price: Vec<String>,
    pub regular_price: Vec<String>,

    /// Applied to the card HTML when no price element is tagged
    pub price_pattern: String,

    /// Elements whose text may hold the star rating
    pub rating: Vec<String>,
    pub rating_count: Vec<String>,
    pub bought_last_month: Vec<String>,

    /// Swatch elements; the `aria-label` lists colors comma separated
    pub color_swatch: Vec<String>,
    pub image: Vec<String>,

    /// Elements whose text or aria-label feeds flag derivation
    pub badges: Vec<String>,

    /// Next-page anchors
    pub next_link: Vec<String>,

    /// Next-page buttons that only advance an offset query parameter
    pub next_button: Vec<String>,

    /// Offset query parameter used when only a next button exists
    pub offset_parameter: String,

    /// Products per listing page
    pub page_size: u32,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            product_container: strings(&[
                r#"[data-test="@web/site-top-of-funnel/ProductCardWrapper"]"#,
                r#"[data-test="product-grid"] section"#,
                r#"div[data-test*="ProductCard"]"#,
                "li.product-card",
            ]),
            product_id_attributes: strings(&["data-tcin", "data-product-id", "data-item-id"]),
            product_id_pattern: r"/A-(\d+)".to_string(),
            product_link: strings(&[
                r#"a[data-test="@web/ProductCard/title"]"#,
                r#"a[href*="/p/"][href*="/A-"]"#,
                r#"a[href*="/A-"]"#,
            ]),
            title: strings(&[
                r#"a[data-test="@web/ProductCard/title"]"#,
                r#"[data-test="product-title"]"#,
                r#"a[href*="/p/"][href*="/A-"]"#,
            ]),
            brand: strings(&[
                r#"a[data-test="@web/ProductCard/ProductCardBrandAndRibbonMessage/brand"]"#,
                r#"a[data-test*="brand"]"#,
            ]),
            current_price: strings(&[r#"span[data-test="current-price"]"#, r#"[data-test*="current-price"]"#]),
            regular_price: strings(&[r#"span[data-test="comparison-price"]"#, r#"[data-test*="comparison-price"]"#]),
            price_pattern: r"(\$\s*[\d,]+(?:\.\d{1,2})?)".to_string(),
            rating: strings(&[r#"span[aria-hidden="true"]"#, r#"[data-test="ratings"] span"#]),
            rating_count: strings(&[r#"span[aria-label*="ratings"]"#, r#"[data-test="rating-count"]"#]),
            bought_last_month: strings(&[r#"[data-test*="ProductCardSocialProof"] strong"#, "strong"]),
            color_swatch: strings(&[r#"span[data-test="@web/ProductCard/ProductCardSwatches"]"#]),
            image: strings(&[
                r#"picture[data-test="@web/ProductCard/ProductCardImage/primary"] img"#,
                r#"picture[data-test="@web/ProductCard/ProductCardImage/primary"] source"#,
                "picture img",
            ]),
            badges: strings(&[
                r#"[data-test*="badge"]"#,
                r#"[aria-label*="Bestseller"]"#,
                r#"[data-test*="urgency"]"#,
                r#"[data-test*="ribbon"]"#,
            ]),
            next_link: strings(&[
                r#"a[aria-label="Go to next page"]"#,
                r#"nav[aria-label*="pagination"] a[rel="next"]"#,
                r#"a[rel="next"]"#,
                r#"a[data-test*="pagination"][href*="page"]"#,
            ]),
            next_button: strings(&[r#"button[data-test="next"]"#, r#"button[aria-label="next page"]"#]),
            offset_parameter: "Nao".to_string(),
            page_size: 24,
        }
    }
}

/// CSS selectors and structured-data paths for product detail pages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DetailSelectors {
    pub title: Vec<String>,
    pub brand: Vec<String>,
    pub current_price: Vec<String>,
    pub regular_price: Vec<String>,
    pub rating: Vec<String>,
    pub rating_count: Vec<String>,
    pub description: Vec<String>,
    pub highlights: Vec<String>,
    pub colors: Vec<String>,
    pub images: Vec<String>,
    pub seller: Vec<String>,
    pub breadcrumb: Vec<String>,
    pub badges: Vec<String>,

    /// Containers of `<b>Key:</b> value` specification rows
    pub spec_container: Vec<String>,

    /// Element that ends the specification rows
    pub spec_terminator: String,

    /// Key/value tables, tried after spec rows
    pub info_table: Vec<String>,
    pub definition_list: Vec<String>,

    /// Blocks whose text lines look like `Key: value`
    pub labeled_lines: Vec<String>,

    /// Spec values longer than this are dropped as boilerplate
    pub max_spec_value_chars: usize,

    pub json_title: Vec<String>,
    pub json_brand: Vec<String>,
    pub json_price: Vec<String>,
    pub json_regular_price: Vec<String>,
    pub json_rating: Vec<String>,
    pub json_rating_count: Vec<String>,
    pub json_description: Vec<String>,
    pub json_images: Vec<String>,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            title: strings(&[r#"h1[data-test="product-title"]"#, "h1"]),
            brand: strings(&[r#"a[data-test="shopAllBrandLink"]"#, r#"[data-test="brandName"]"#]),
            current_price: strings(&[r#"span[data-test="product-price"]"#, r#"[data-test*="product-price"]"#]),
            regular_price: strings(&[r#"span[data-test="product-regular-price"]"#, r#"[data-test*="regular-price"]"#]),
            rating: strings(&[r#"[data-test="ratings"] span[aria-hidden="true"]"#, r#"[data-test*="rating-value"]"#]),
            rating_count: strings(&[r#"[data-test="ratingCount"]"#, r#"[data-test="ratings"] [aria-label*="ratings"]"#]),
            description: strings(&[
                r#"[data-test="item-details-description"]"#,
                r#"div[data-test*="description"]"#,
            ]),
            highlights: strings(&["#PdpHighlightsSection li", r#"[data-test*="highlights"] li"#]),
            colors: strings(&[r#"[data-test*="colorSwatch"] [aria-label]"#, r#"[data-test="@web/VariationComponent"] a"#]),
            images: strings(&[
                r#"section[aria-label="Image gallery"] img"#,
                r#"[data-test*="image-gallery-item"] img"#,
            ]),
            seller: strings(&[r#"a[data-test="targetPlusExtraInfoSection"]"#, r#"[data-test*="sellerName"]"#]),
            breadcrumb: strings(&[
                r#"nav[aria-label="Breadcrumbs"] a"#,
                r#"[data-test="@web/Breadcrumbs/BreadcrumbLink"]"#,
            ]),
            badges: strings(&[r#"[data-test*="badge"]"#, r#"[data-test*="urgency"]"#, r#"[data-test*="fulfillment"]"#]),
            spec_container: strings(&[
                r#"div[data-test="item-details-specifications"]"#,
                r#"[data-test*="ProductDetailCollapsible-Specifications"]"#,
            ]),
            spec_terminator: r#"[data-test="itemDetailsTabMarketplaceMessage"]"#.to_string(),
            info_table: strings(&["table"]),
            definition_list: strings(&["dl"]),
            labeled_lines: strings(&[r#"[data-test*="Specifications"]"#, r#"[data-test*="item-details"]"#]),
            max_spec_value_chars: 1000,
            json_title: strings(&["name", "props.pageProps.product.title"]),
            json_brand: strings(&["brand.name", "brand", "props.pageProps.product.brand"]),
            json_price: strings(&["offers.price", "offers.0.price", "props.pageProps.product.price.current"]),
            json_regular_price: strings(&["props.pageProps.product.price.regular"]),
            json_rating: strings(&["aggregateRating.ratingValue"]),
            json_rating_count: strings(&["aggregateRating.reviewCount", "aggregateRating.ratingCount"]),
            json_description: strings(&["description"]),
            json_images: strings(&["image", "props.pageProps.product.images"]),
        }
    }
}
