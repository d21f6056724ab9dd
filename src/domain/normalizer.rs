//! Raw field normalization
//!
//! Turns the strings produced by the extractors into typed draft fields.
//! Every function here is pure and total: unparsable input becomes `None`
//! or an empty value, never an error. Running the draft cleaners a second
//! time leaves a draft unchanged.

use crate::domain::product::{DetailFields, ProductDraft, ProductFlags, RawProductFields, MAX_IMAGES};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use url::Url;

/// Default host preferred when the same image is served from several hosts
pub const DEFAULT_CANONICAL_IMAGE_HOST: &str = "target.scene7.com";

/// Maximum description length in characters
pub const MAX_DESCRIPTION_CHARS: usize = 800;

const BRAND_PREFIX: &str = "Shop all ";

const CLEARANCE_KEYWORDS: &[&str] = &["clearance"];
const SALE_KEYWORDS: &[&str] = &["sale", "deal"];
const NEW_KEYWORDS: &[&str] = &["new at", "new arrival", "just in"];
const BEST_SELLER_KEYWORDS: &[&str] = &["bestseller", "best seller"];
const OUT_OF_STOCK_KEYWORDS: &[&str] = &["out of stock", "sold out"];

/// Converts raw extracted values into normalized drafts
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    canonical_image_host: String,
    image_cap: usize,
    description_limit: usize,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_CANONICAL_IMAGE_HOST)
    }
}

impl RecordNormalizer {
    pub fn new(canonical_image_host: impl Into<String>) -> Self {
        Self {
            canonical_image_host: canonical_image_host.into(),
            image_cap: MAX_IMAGES,
            description_limit: MAX_DESCRIPTION_CHARS,
        }
    }

    pub fn canonical_image_host(&self) -> &str {
        &self.canonical_image_host
    }

    /// Build a draft from listing-card values
    pub fn normalize(&self, raw: &RawProductFields) -> ProductDraft {
        let price_current = parse_price(&raw.price_current).unwrap_or(Decimal::ZERO);
        let price_regular = parse_price(&raw.price_regular);

        let draft = ProductDraft {
            id: raw.id.trim().to_string(),
            url: raw.url.trim().to_string(),
            title: collapse_whitespace(&raw.title),
            brand: clean_brand(&raw.brand),
            price_current,
            price_regular,
            discount_percent: None,
            discount_amount: None,
            rating: parse_rating(&raw.rating),
            rating_count: parse_count(&raw.rating_count),
            bought_last_month: non_empty(&raw.bought_last_month),
            colors: split_colors(&raw.colors),
            images: self.select_images(&raw.images),
            flags: derive_flags(&raw.badges),
            seller: non_empty(&raw.seller),
            description: self.clean_description(&raw.description),
            highlights: clean_list(&raw.highlights),
            specs: BTreeMap::new(),
            category_breadcrumb: None,
            material: None,
        };

        self.renormalize(&draft)
    }

    /// Re-apply every cleaner and recompute derived fields.
    ///
    /// `renormalize(renormalize(d)) == renormalize(d)` for any draft.
    pub fn renormalize(&self, draft: &ProductDraft) -> ProductDraft {
        let price_regular = draft.price_regular.filter(|price| *price > Decimal::ZERO);
        let (discount_amount, discount_percent) = compute_discount(draft.price_current, price_regular);

        let mut flags = draft.flags;
        if discount_amount.is_some() {
            flags.is_sale = true;
        }

        let specs = clean_specs(&draft.specs);
        let material = draft
            .material
            .as_deref()
            .and_then(non_empty)
            .or_else(|| material_from_specs(&specs));

        ProductDraft {
            id: draft.id.trim().to_string(),
            url: draft.url.trim().to_string(),
            title: collapse_whitespace(&draft.title),
            brand: clean_brand(&draft.brand),
            price_current: draft.price_current.max(Decimal::ZERO),
            price_regular,
            discount_percent,
            discount_amount,
            rating: draft.rating.filter(|r| in_rating_range(*r)),
            rating_count: draft.rating_count,
            bought_last_month: draft.bought_last_month.as_deref().and_then(non_empty),
            colors: split_colors(&draft.colors),
            images: self.select_images(&draft.images),
            flags,
            seller: draft.seller.as_deref().and_then(non_empty),
            description: draft.description.as_deref().and_then(|d| self.clean_description(d)),
            highlights: clean_list(&draft.highlights),
            specs,
            category_breadcrumb: draft.category_breadcrumb.as_deref().and_then(non_empty),
            material,
        }
    }

    /// Merge detail-page values into a draft. Detail values win for every
    /// field they provide; detail images are placed ahead of listing images.
    pub fn merge_detail(&self, draft: &ProductDraft, detail: &DetailFields) -> ProductDraft {
        let mut merged = draft.clone();

        if let Some(title) = non_empty(&detail.title) {
            merged.title = title;
        }
        let brand = clean_brand(&detail.brand);
        if !brand.is_empty() {
            merged.brand = brand;
        }
        if let Some(price) = parse_price(&detail.price_current) {
            merged.price_current = price;
        }
        if let Some(price) = parse_price(&detail.price_regular) {
            merged.price_regular = Some(price);
        }
        if let Some(rating) = parse_rating(&detail.rating) {
            merged.rating = Some(rating);
        }
        if let Some(count) = parse_count(&detail.rating_count) {
            merged.rating_count = Some(count);
        }
        if let Some(description) = self.clean_description(&detail.description) {
            merged.description = Some(description);
        }
        if let Some(seller) = non_empty(&detail.seller) {
            merged.seller = Some(seller);
        }
        if let Some(breadcrumb) = non_empty(&detail.category_breadcrumb) {
            merged.category_breadcrumb = Some(breadcrumb);
        }

        let highlights = clean_list(&detail.highlights);
        if !highlights.is_empty() {
            merged.highlights = highlights;
        }
        let colors = split_colors(&detail.colors);
        if !colors.is_empty() {
            merged.colors = colors;
        }

        merged.images = detail.images.iter().chain(draft.images.iter()).cloned().collect();
        merged.specs.extend(clean_specs(&detail.specs));
        merged.material = material_from_specs(&merged.specs).or(merged.material);
        merged.flags = merged.flags.merge(derive_flags(&detail.badges));

        self.renormalize(&merged)
    }

    /// Deduplicate image URLs by path, prefer the canonical host for
    /// equivalent images, and keep at most `image_cap` entries.
    pub fn select_images(&self, urls: &[String]) -> Vec<String> {
        let mut selected: Vec<(String, String)> = Vec::new();

        for url in urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
            let key = image_key(url);
            match selected.iter_mut().find(|(existing, _)| *existing == key) {
                Some(entry) => {
                    if !self.is_canonical(&entry.1) && self.is_canonical(url) {
                        entry.1 = url.to_string();
                    }
                }
                None => selected.push((key, url.to_string())),
            }
        }

        selected
            .into_iter()
            .map(|(_, url)| url)
            .take(self.image_cap)
            .collect()
    }

    fn is_canonical(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(&self.canonical_image_host)))
            .unwrap_or(false)
    }

    /// Collapse whitespace and cap the length on a character boundary
    pub fn clean_description(&self, text: &str) -> Option<String> {
        let collapsed = collapse_whitespace(text);
        if collapsed.is_empty() {
            return None;
        }
        let truncated: String = collapsed.chars().take(self.description_limit).collect();
        Some(truncated.trim_end().to_string())
    }
}

/// Parse currency text such as "$1,299.99" or "$46.80 - $78.00".
/// A price range yields its first amount.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let amount = first_number(text, true)?;
    let value = Decimal::from_str(&amount).ok()?;
    (value >= Decimal::ZERO).then_some(value.round_dp(2))
}

/// Parse a star rating; values outside 0-5 are discarded
pub fn parse_rating(text: &str) -> Option<Decimal> {
    let number = first_number(text, false)?;
    Decimal::from_str(&number).ok().filter(|r| in_rating_range(*r))
}

/// Parse a count such as "(1,234)" or "53 ratings"
pub fn parse_count(text: &str) -> Option<u32> {
    let number = first_number(text, true)?;
    let digits: String = number.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// `discountAmount = regular - current` and the rounded percentage of the
/// regular price, only when both prices are known and regular is higher.
/// A zero current price counts as unknown.
pub fn compute_discount(current: Decimal, regular: Option<Decimal>) -> (Option<Decimal>, Option<u8>) {
    let Some(regular) = regular else {
        return (None, None);
    };
    if current <= Decimal::ZERO || regular <= current {
        return (None, None);
    }

    let amount = regular - current;
    let percent = (amount / regular * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u8();

    (Some(amount), percent)
}

/// Keyword matching over badge and marker text
pub fn derive_flags(badges: &[String]) -> ProductFlags {
    let text = badges
        .iter()
        .map(|b| word_text(b))
        .collect::<Vec<_>>()
        .join(" | ");
    let text = format!(" {text} ");
    let has = |keywords: &[&str]| keywords.iter().any(|k| text.contains(&format!(" {k} ")));

    ProductFlags {
        is_sale: has(SALE_KEYWORDS),
        is_clearance: has(CLEARANCE_KEYWORDS),
        is_new: has(NEW_KEYWORDS),
        in_stock: !has(OUT_OF_STOCK_KEYWORDS),
        is_best_seller: has(BEST_SELLER_KEYWORDS),
    }
}

/// Split swatch labels on ',' and keep the first occurrence of each colour
pub fn split_colors(labels: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .iter()
        .flat_map(|label| label.split(','))
        .map(collapse_whitespace)
        .filter(|color| !color.is_empty())
        .filter(|color| seen.insert(color.to_lowercase()))
        .collect()
}

/// First spec value whose key mentions the material
pub fn material_from_specs(specs: &BTreeMap<String, String>) -> Option<String> {
    specs
        .iter()
        .find(|(key, _)| key.to_lowercase().contains("material"))
        .and_then(|(_, value)| non_empty(value))
}

pub fn clean_brand(brand: &str) -> String {
    let mut brand = collapse_whitespace(brand);
    while let Some(stripped) = brand.strip_prefix(BRAND_PREFIX) {
        brand = stripped.trim().to_string();
    }
    brand
}

fn clean_list(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(|item| collapse_whitespace(item))
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn clean_specs(specs: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    specs
        .iter()
        .map(|(key, value)| {
            let key = collapse_whitespace(key.trim_end_matches(':'));
            (key, collapse_whitespace(value))
        })
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .collect()
}

fn image_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().trim_end_matches('/').to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    }
}

fn in_rating_range(rating: Decimal) -> bool {
    rating >= Decimal::ZERO && rating <= Decimal::from(5)
}

fn non_empty(text: &str) -> Option<String> {
    let cleaned = collapse_whitespace(text);
    (!cleaned.is_empty()).then_some(cleaned)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase words separated by single spaces, punctuation dropped
fn word_text(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// First run of digits (with optional thousands separators and a decimal
/// part) in `text`
fn first_number(text: &str, allow_grouping: bool) -> Option<String> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let mut number = String::new();
    let mut seen_point = false;

    for c in text[start..].chars() {
        match c {
            '0'..='9' => number.push(c),
            ',' if allow_grouping && !seen_point => {}
            '.' if !seen_point => {
                seen_point = true;
                number.push(c);
            }
            _ => break,
        }
    }

    let number = number.trim_end_matches('.').to_string();
    (!number.is_empty()).then_some(number)
}
