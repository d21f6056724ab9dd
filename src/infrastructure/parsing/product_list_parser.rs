//! Product list parser
//!
//! Turns one listing page into raw card fields plus the URL of the next
//! page. Card-level problems skip the card; only a page without any
//! product container is an error.

use super::field_extractor::{element_text, ExtractionScope, FieldCascade, RegexCapture};
use super::{
    compile_labeled_selectors, compile_selectors, ContextualParser, ListingSelectors, ParseContext, ParsingError,
    ParsingResult,
};
use crate::domain::normalizer::parse_rating;
use crate::domain::RawProductFields;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Everything extracted from one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub cards: Vec<RawProductFields>,
    pub next_page: Option<String>,
    /// Cards dropped because a required field was missing
    pub skipped_cards: usize,
}

/// Parser for extracting product cards from listing pages
pub struct ProductListParser {
    container_selectors: Vec<(String, Selector)>,
    id_attributes: Vec<String>,
    id: FieldCascade<String>,
    link: FieldCascade<String>,
    title: FieldCascade<String>,
    brand: FieldCascade<String>,
    current_price: FieldCascade<String>,
    regular_price: FieldCascade<String>,
    rating: FieldCascade<Vec<String>>,
    rating_count: FieldCascade<String>,
    bought_last_month: FieldCascade<String>,
    colors: FieldCascade<Vec<String>>,
    images: FieldCascade<Vec<String>>,
    badge_texts: FieldCascade<Vec<String>>,
    badge_labels: FieldCascade<Vec<String>>,
    next_link_selectors: Vec<Selector>,
    next_button_selectors: Vec<Selector>,
    offset_parameter: String,
}

impl ProductListParser {
    /// Create a new parser with default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ListingSelectors::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &ListingSelectors) -> ParsingResult<Self> {
        let id_selectors: Vec<String> = selectors
            .product_id_attributes
            .iter()
            .map(|attribute| format!("[{attribute}]"))
            .collect();
        let id_attributes: Vec<&str> = selectors.product_id_attributes.iter().map(String::as_str).collect();

        Ok(Self {
            container_selectors: compile_labeled_selectors(&selectors.product_container)?,
            id_attributes: selectors.product_id_attributes.clone(),
            id: FieldCascade::new("id")
                .with_selector_attributes(&id_selectors, &id_attributes)?
                .with(RegexCapture::new(&selectors.product_id_pattern)?),
            link: FieldCascade::new("url").with_selector_attributes(&selectors.product_link, &["href"])?,
            title: FieldCascade::new("title")
                .with_selector_texts(&selectors.title)?
                .with_selector_attributes(&selectors.product_link, &["aria-label", "title"])?
                .with_selector_texts(&["h2".to_string(), "h3".to_string()])?,
            brand: FieldCascade::new("brand").with_selector_texts(&selectors.brand)?,
            current_price: FieldCascade::new("price_current")
                .with_selector_texts(&selectors.current_price)?
                .with(RegexCapture::new(&selectors.price_pattern)?),
            regular_price: FieldCascade::new("price_regular").with_selector_texts(&selectors.regular_price)?,
            rating: FieldCascade::new("rating").with_selector_text_lists(&selectors.rating)?,
            rating_count: FieldCascade::new("rating_count")
                .with_selector_texts(&selectors.rating_count)?
                .with(RegexCapture::new(r"([\d,]+)\s+ratings")?),
            bought_last_month: FieldCascade::new("bought_last_month")
                .with_selector_texts(&selectors.bought_last_month)?,
            colors: FieldCascade::new("colors").with_selector_attribute_lists(&selectors.color_swatch, &["aria-label"])?,
            images: FieldCascade::new("images")
                .with_selector_attribute_lists(&selectors.image, &["src", "data-src", "srcset"])?,
            badge_texts: FieldCascade::new("badges").with_selector_text_lists(&selectors.badges)?,
            badge_labels: FieldCascade::new("badge_labels")
                .with_selector_attribute_lists(&selectors.badges, &["aria-label"])?,
            next_link_selectors: compile_selectors(&selectors.next_link)?,
            next_button_selectors: compile_selectors(&selectors.next_button)?,
            offset_parameter: selectors.offset_parameter.clone(),
        })
    }

    /// Parse raw page content
    pub fn parse_page(&self, html_content: &str, context: &ParseContext) -> ParsingResult<ListingPage> {
        let html = Html::parse_document(html_content);
        self.parse_with_context(&html, context)
    }

    fn product_elements<'a>(&self, html: &'a Html) -> Option<(&str, Vec<ElementRef<'a>>)> {
        self.container_selectors.iter().find_map(|(label, selector)| {
            let elements: Vec<ElementRef<'a>> = html.select(selector).collect();
            (!elements.is_empty()).then_some((label.as_str(), elements))
        })
    }

    /// Extract one card; fails only when the card has no id, url or title
    fn extract_card(&self, element: ElementRef<'_>, context: &ParseContext) -> ParsingResult<RawProductFields> {
        let scope = ExtractionScope::element(element);

        let href = self.link.extract(&scope).into_value();
        if href.is_empty() {
            return Err(ParsingError::required_field_missing("url", Some("listing card")));
        }
        let url = resolve_url(&href, &context.page_url)?;

        let id = self
            .id_attributes
            .iter()
            .find_map(|attribute| element.value().attr(attribute))
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.id.extract(&scope).into_value());
        if id.is_empty() {
            return Err(ParsingError::required_field_missing("id", Some(&url)));
        }

        let title = self.title.extract(&scope).into_value();
        if title.is_empty() {
            return Err(ParsingError::required_field_missing("title", Some(&url)));
        }

        let rating = self
            .rating
            .extract(&scope)
            .into_value()
            .into_iter()
            .find(|candidate| parse_rating(candidate).is_some())
            .unwrap_or_default();

        let mut badges = self.badge_texts.extract(&scope).into_value();
        badges.extend(self.badge_labels.extract(&scope).into_value());
        badges.push(element_text(&element));

        Ok(RawProductFields {
            id,
            url,
            title,
            brand: self.brand.extract(&scope).into_value(),
            price_current: self.current_price.extract(&scope).into_value(),
            price_regular: self.regular_price.extract(&scope).into_value(),
            rating,
            rating_count: self.rating_count.extract(&scope).into_value(),
            bought_last_month: self.bought_last_month.extract(&scope).into_value(),
            colors: self.colors.extract(&scope).into_value(),
            images: self.images.extract(&scope).into_value(),
            badges,
            ..RawProductFields::default()
        })
    }

    /// Next listing URL: an explicit link, else an offset advanced past
    /// this page when an enabled "next" button is present
    fn find_next_page(&self, html: &Html, context: &ParseContext) -> Option<String> {
        let link = self.next_link_selectors.iter().find_map(|selector| {
            html.select(selector)
                .filter_map(|element| element.value().attr("href"))
                .map(str::trim)
                .find(|href| !href.is_empty() && *href != "#" && !href.starts_with("javascript"))
                .map(ToString::to_string)
        });

        if let Some(href) = link {
            return match resolve_url(&href, &context.page_url) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("Ignoring next page link: {}", e);
                    None
                }
            };
        }

        let button_enabled = self
            .next_button_selectors
            .iter()
            .flat_map(|selector| html.select(selector))
            .any(|button| is_enabled(&button));
        if !button_enabled {
            return None;
        }

        match offset_url(&context.page_url, &self.offset_parameter, context.page_size) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Cannot build offset page URL: {}", e);
                None
            }
        }
    }
}

impl ContextualParser for ProductListParser {
    type Output = ListingPage;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        debug!("Parsing listing page {} ({})", context.page_number, context.page_url);

        let Some((container, elements)) = self.product_elements(html) else {
            let tried = self.container_selectors.iter().map(|(label, _)| label.clone()).collect();
            return Err(ParsingError::no_products_found(context.page_number, tried));
        };
        debug!("Found {} product containers using {}", elements.len(), container);

        let mut page = ListingPage::default();
        for (index, element) in elements.into_iter().enumerate() {
            match self.extract_card(element, context) {
                Ok(card) => page.cards.push(card),
                Err(e) => {
                    warn!("Skipping card {} on page {}: {}", index, context.page_number, e);
                    page.skipped_cards += 1;
                }
            }
        }

        page.next_page = self.find_next_page(html, context);
        debug!(
            "Extracted {} cards from page {} (skipped {}), next page: {:?}",
            page.cards.len(),
            context.page_number,
            page.skipped_cards,
            page.next_page
        );

        Ok(page)
    }
}

fn is_enabled(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("disabled").is_none() && value.attr("aria-disabled") != Some("true")
}

/// Resolve `href` against the page it was found on
pub fn resolve_url(href: &str, base_url: &str) -> ParsingResult<String> {
    let failed = |reason: String| ParsingError::UrlResolutionFailed {
        url: href.to_string(),
        reason,
        base_url: Some(base_url.to_string()),
    };

    if let Ok(url) = Url::parse(href) {
        return Ok(url.to_string());
    }
    let base = Url::parse(base_url).map_err(|e| failed(e.to_string()))?;
    base.join(href).map(|url| url.to_string()).map_err(|e| failed(e.to_string()))
}

/// `page_url` with `parameter` advanced by `page_size`, other query pairs kept
pub fn offset_url(page_url: &str, parameter: &str, page_size: u32) -> ParsingResult<String> {
    let mut url = Url::parse(page_url).map_err(|e| ParsingError::UrlResolutionFailed {
        url: page_url.to_string(),
        reason: e.to_string(),
        base_url: None,
    })?;

    let current = url
        .query_pairs()
        .find(|(key, _)| key == parameter)
        .and_then(|(_, value)| value.parse::<u32>().ok())
        .unwrap_or(0);
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != parameter)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let next = current.saturating_add(page_size).to_string();
    url.query_pairs_mut().clear().extend_pairs(&kept).append_pair(parameter, &next);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://www.target.com/c/handbags/-/N-5xtbo?type=products";

    fn card(id: &str, title: &str, price: &str) -> String {
        format!(
            r#"<div data-test="@web/site-top-of-funnel/ProductCardWrapper">
                <a data-test="@web/ProductCard/title" href="/p/{slug}/-/A-{id}">{title}</a>
                <a data-test="@web/ProductCard/ProductCardBrandAndRibbonMessage/brand">Universal Thread</a>
                <span data-test="current-price"><span>{price}</span></span>
                <span data-test="comparison-price">reg $78.00</span>
                <span aria-hidden="true">4.5</span>
                <span aria-label="4.5 out of 5 stars with 53 ratings">53</span>
                <div><strong>3k+ bought in last month</strong></div>
                <span data-test="@web/ProductCard/ProductCardSwatches" aria-label="Black, Cognac"></span>
                <picture data-test="@web/ProductCard/ProductCardImage/primary">
                    <img src="https://target.scene7.com/is/image/Target/GUEST_{id}">
                </picture>
                <span data-test="badge">Clearance</span>
            </div>"#,
            slug = title.to_lowercase().replace(' ', "-"),
        )
    }

    fn page(cards: &[String], pagination: &str) -> String {
        format!("<html><body><section>{}</section>{}</body></html>", cards.join(""), pagination)
    }

    fn parse(content: &str) -> ListingPage {
        let parser = ProductListParser::new().unwrap();
        parser.parse_page(content, &ParseContext::new(1, PAGE_URL)).unwrap()
    }

    #[test]
    fn test_extracts_card_fields() {
        let listing = parse(&page(&[card("94110251", "Crossbody Bag", "$46.80")], ""));
        assert_eq!(listing.cards.len(), 1);

        let card = &listing.cards[0];
        assert_eq!(card.id, "94110251");
        assert_eq!(card.url, "https://www.target.com/p/crossbody-bag/-/A-94110251");
        assert_eq!(card.title, "Crossbody Bag");
        assert_eq!(card.brand, "Universal Thread");
        assert_eq!(card.price_current, "$46.80");
        assert_eq!(card.price_regular, "reg $78.00");
        assert_eq!(card.rating, "4.5");
        assert_eq!(card.rating_count, "53");
        assert_eq!(card.bought_last_month, "3k+ bought in last month");
        assert_eq!(card.colors, vec!["Black, Cognac"]);
        assert_eq!(card.images, vec!["https://target.scene7.com/is/image/Target/GUEST_94110251"]);
        assert!(card.badges.iter().any(|b| b == "Clearance"));
    }

    #[test]
    fn test_card_missing_optional_markup_still_extracted() {
        let content = page(
            &[r#"<div data-test="@web/site-top-of-funnel/ProductCardWrapper" data-tcin="555">
                <a href="/p/plain/-/A-555" aria-label="Plain Tote"></a>
            </div>"#
                .to_string()],
            "",
        );
        let card = &parse(&content).cards[0];
        assert_eq!(card.id, "555");
        assert_eq!(card.title, "Plain Tote");
        assert_eq!(card.price_current, "");
        assert!(card.images.is_empty());
    }

    #[test]
    fn test_untagged_price_falls_back_to_card_text() {
        let content = page(
            &[r#"<div data-test="@web/site-top-of-funnel/ProductCardWrapper" data-tcin="77">
                <a href="/p/mini/-/A-77">Mini Bag</a>
                <div><span>$1,019.99</span></div>
            </div>"#
                .to_string()],
            "",
        );
        assert_eq!(parse(&content).cards[0].price_current, "$1,019.99");
    }

    #[test]
    fn test_card_without_link_is_skipped() {
        let content = page(
            &[
                r#"<div data-test="@web/site-top-of-funnel/ProductCardWrapper"><span>Sponsored</span></div>"#.to_string(),
                card("1", "Tote", "$10.00"),
            ],
            "",
        );
        let listing = parse(&content);
        assert_eq!(listing.cards.len(), 1);
        assert_eq!(listing.skipped_cards, 1);
    }

    #[test]
    fn test_no_containers_is_an_error() {
        let parser = ProductListParser::new().unwrap();
        let result = parser.parse_page("<html><body><p>nothing</p></body></html>", &ParseContext::new(2, PAGE_URL));
        assert!(matches!(result, Err(ParsingError::NoProductsFound { page_number: 2, .. })));
    }

    #[test]
    fn test_next_link_preferred_over_button() {
        let content = page(
            &[card("1", "Tote", "$10.00")],
            r##"<a aria-label="Go to next page" href="/c/handbags/-/N-5xtbo?page=2">Next</a>
               <button data-test="next">next</button>"##,
        );
        assert_eq!(
            parse(&content).next_page.as_deref(),
            Some("https://www.target.com/c/handbags/-/N-5xtbo?page=2")
        );
    }

    #[test]
    fn test_next_button_advances_offset() {
        let content = page(&[card("1", "Tote", "$10.00")], r#"<button data-test="next">next</button>"#);
        assert_eq!(
            parse(&content).next_page.as_deref(),
            Some("https://www.target.com/c/handbags/-/N-5xtbo?type=products&Nao=24")
        );
    }

    #[test]
    fn test_disabled_next_button_ends_listing() {
        let content = page(&[card("1", "Tote", "$10.00")], r#"<button data-test="next" disabled>next</button>"#);
        assert_eq!(parse(&content).next_page, None);
    }

    #[test]
    fn test_offset_url_replaces_existing_offset() {
        let next = offset_url("https://example.com/s?q=bag&Nao=24", "Nao", 24).unwrap();
        assert_eq!(next, "https://example.com/s?q=bag&Nao=48");
    }
}
