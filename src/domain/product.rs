//! Product record types
//!
//! A product moves through three shapes during a session:
//! - `RawProductFields` / `DetailFields`: strings exactly as the extractors found them
//! - `ProductDraft`: typed, normalized, still mutable (enrichment happens here)
//! - `ProductRecord`: sealed, timestamped and validated; read-only from then on

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// Maximum number of image URLs kept on a record
pub const MAX_IMAGES: usize = 10;

/// Spec keys that describe physical dimensions
const DIMENSION_KEY_MARKERS: &[&str] = &["dimension", "height", "width", "depth", "length"];

/// Values extracted from one listing card, before any normalization.
///
/// Empty strings and empty vectors mean "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProductFields {
    pub id: String,
    pub url: String,
    pub title: String,
    pub brand: String,
    pub price_current: String,
    pub price_regular: String,
    pub rating: String,
    pub rating_count: String,
    pub bought_last_month: String,
    /// Swatch labels; a single label may hold a comma separated list
    pub colors: Vec<String>,
    pub images: Vec<String>,
    /// Badge, ribbon and marker texts used for flag detection
    pub badges: Vec<String>,
    pub seller: String,
    pub description: String,
    pub highlights: Vec<String>,
}

/// Values extracted from a product detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub title: String,
    pub brand: String,
    pub price_current: String,
    pub price_regular: String,
    pub rating: String,
    pub rating_count: String,
    pub description: String,
    pub highlights: Vec<String>,
    pub colors: Vec<String>,
    pub images: Vec<String>,
    pub seller: String,
    pub category_breadcrumb: String,
    pub specs: BTreeMap<String, String>,
    pub badges: Vec<String>,
}

impl DetailFields {
    /// True when the page produced nothing usable
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Boolean markers derived from badge text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFlags {
    pub is_sale: bool,
    pub is_clearance: bool,
    pub is_new: bool,
    pub in_stock: bool,
    pub is_best_seller: bool,
}

impl Default for ProductFlags {
    fn default() -> Self {
        Self {
            is_sale: false,
            is_clearance: false,
            is_new: false,
            in_stock: true,
            is_best_seller: false,
        }
    }
}

impl ProductFlags {
    /// Combine markers from two sources. Any source reporting a product as
    /// unavailable wins over one that does not mention stock.
    pub fn merge(self, other: Self) -> Self {
        Self {
            is_sale: self.is_sale || other.is_sale,
            is_clearance: self.is_clearance || other.is_clearance,
            is_new: self.is_new || other.is_new,
            in_stock: self.in_stock && other.in_stock,
            is_best_seller: self.is_best_seller || other.is_best_seller,
        }
    }
}

/// Unsealed, mutable product under construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub id: String,
    pub url: String,
    pub title: String,
    pub brand: String,
    pub price_current: Decimal,
    pub price_regular: Option<Decimal>,
    pub discount_percent: Option<u8>,
    pub discount_amount: Option<Decimal>,
    pub rating: Option<Decimal>,
    pub rating_count: Option<u32>,
    pub bought_last_month: Option<String>,
    pub colors: Vec<String>,
    pub images: Vec<String>,
    pub flags: ProductFlags,
    pub seller: Option<String>,
    pub description: Option<String>,
    pub highlights: Vec<String>,
    pub specs: BTreeMap<String, String>,
    pub category_breadcrumb: Option<String>,
    pub material: Option<String>,
}

impl Default for ProductDraft {
    fn default() -> Self {
        Self {
            id: String::new(),
            url: String::new(),
            title: String::new(),
            brand: String::new(),
            price_current: Decimal::ZERO,
            price_regular: None,
            discount_percent: None,
            discount_amount: None,
            rating: None,
            rating_count: None,
            bought_last_month: None,
            colors: Vec::new(),
            images: Vec::new(),
            flags: ProductFlags::default(),
            seller: None,
            description: None,
            highlights: Vec::new(),
            specs: BTreeMap::new(),
            category_breadcrumb: None,
            material: None,
        }
    }
}

/// Reasons a draft cannot be sealed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("product id is empty")]
    EmptyId,

    #[error("product url is not absolute: '{url}'")]
    RelativeUrl { url: String },

    #[error("{count} images exceed the cap of {max}")]
    TooManyImages { count: usize, max: usize },

    #[error("negative value for {field}: {value}")]
    NegativeValue { field: &'static str, value: Decimal },

    #[error("rating {value} is outside 0-5")]
    RatingOutOfRange { value: Decimal },

    #[error("discount percent {value} is above 100")]
    DiscountOutOfRange { value: u8 },
}

impl ProductDraft {
    /// Validate the draft and stamp it, producing an immutable record
    pub fn seal(self, scraped_at: DateTime<Utc>) -> Result<ProductRecord, ValidationError> {
        self.validate()?;

        Ok(ProductRecord {
            id: self.id,
            url: self.url,
            title: self.title,
            brand: self.brand,
            price_current: self.price_current,
            price_regular: self.price_regular,
            discount_percent: self.discount_percent,
            discount_amount: self.discount_amount,
            rating: self.rating,
            rating_count: self.rating_count,
            bought_last_month: self.bought_last_month,
            colors: self.colors,
            images: self.images,
            flags: self.flags,
            seller: self.seller,
            description: self.description,
            highlights: self.highlights,
            specs: self.specs,
            category_breadcrumb: self.category_breadcrumb,
            material: self.material,
            scraped_at,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }

        let absolute = Url::parse(&self.url).is_ok_and(|url| url.has_host());
        if !absolute {
            return Err(ValidationError::RelativeUrl { url: self.url.clone() });
        }

        if self.images.len() > MAX_IMAGES {
            return Err(ValidationError::TooManyImages {
                count: self.images.len(),
                max: MAX_IMAGES,
            });
        }

        let amounts = [
            ("priceCurrent", Some(self.price_current)),
            ("priceRegular", self.price_regular),
            ("discountAmount", self.discount_amount),
        ];
        for (field, value) in amounts {
            if let Some(value) = value.filter(|v| *v < Decimal::ZERO) {
                return Err(ValidationError::NegativeValue { field, value });
            }
        }

        if let Some(rating) = self.rating {
            if rating < Decimal::ZERO || rating > Decimal::from(5) {
                return Err(ValidationError::RatingOutOfRange { value: rating });
            }
        }

        if let Some(percent) = self.discount_percent {
            if percent > 100 {
                return Err(ValidationError::DiscountOutOfRange { value: percent });
            }
        }

        Ok(())
    }
}

/// A sealed product record. Fields are only readable once sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    id: String,
    url: String,
    title: String,
    brand: String,
    price_current: Decimal,
    price_regular: Option<Decimal>,
    discount_percent: Option<u8>,
    discount_amount: Option<Decimal>,
    rating: Option<Decimal>,
    rating_count: Option<u32>,
    bought_last_month: Option<String>,
    colors: Vec<String>,
    images: Vec<String>,
    flags: ProductFlags,
    seller: Option<String>,
    description: Option<String>,
    highlights: Vec<String>,
    specs: BTreeMap<String, String>,
    category_breadcrumb: Option<String>,
    material: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    scraped_at: DateTime<Utc>,
}

impl ProductRecord {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn price_current(&self) -> Decimal {
        self.price_current
    }

    pub fn price_regular(&self) -> Option<Decimal> {
        self.price_regular
    }

    pub fn discount_percent(&self) -> Option<u8> {
        self.discount_percent
    }

    pub fn discount_amount(&self) -> Option<Decimal> {
        self.discount_amount
    }

    pub fn rating(&self) -> Option<Decimal> {
        self.rating
    }

    pub fn rating_count(&self) -> Option<u32> {
        self.rating_count
    }

    pub fn bought_last_month(&self) -> Option<&str> {
        self.bought_last_month.as_deref()
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn flags(&self) -> ProductFlags {
        self.flags
    }

    pub fn seller(&self) -> Option<&str> {
        self.seller.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn highlights(&self) -> &[String] {
        &self.highlights
    }

    pub fn specs(&self) -> &BTreeMap<String, String> {
        &self.specs
    }

    pub fn category_breadcrumb(&self) -> Option<&str> {
        self.category_breadcrumb.as_deref()
    }

    pub fn material(&self) -> Option<&str> {
        self.material.as_deref()
    }

    pub fn scraped_at(&self) -> DateTime<Utc> {
        self.scraped_at
    }

    /// Spec entries describing physical size (overall dimensions, height, width, ...)
    pub fn dimensions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.specs
            .iter()
            .filter(|(key, _)| is_dimension_key(key))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Whether a spec key names a physical dimension
pub fn is_dimension_key(key: &str) -> bool {
    let key = key.to_lowercase();
    DIMENSION_KEY_MARKERS.iter().any(|marker| key.contains(marker))
}

/// ISO-8601 rendering shared by every output format
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_timestamp<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(timestamp))
}
