//! HTML parsing infrastructure
//!
//! Listing and detail parsers are built from per-field extraction cascades
//! (see [`field_extractor`]). Selector lists come from [`config`] so every
//! fallback can be overridden without a rebuild.

pub mod config;
pub mod context;
pub mod field_extractor;
pub mod product_detail_parser;
pub mod product_list_parser;
pub mod structured_data;

pub use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};
pub use config::{DetailSelectors, ListingSelectors, SelectorConfig};
pub use context::{DetailParseContext, ParseContext};
pub use field_extractor::{Extraction, ExtractionScope, ExtractionStrategy, FieldCascade};
pub use product_detail_parser::ProductDetailParser;
pub use product_list_parser::{ListingPage, ProductListParser};
pub use structured_data::StructuredData;

use scraper::{Html, Selector};
use tracing::{debug, warn};

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}

/// Compile selector strings, skipping (and logging) the ones that do not
/// parse. Fails only when a non-empty list yields no usable selector.
pub fn compile_selectors(selector_strings: &[String]) -> ParsingResult<Vec<Selector>> {
    Ok(compile_labeled_selectors(selector_strings)?
        .into_iter()
        .map(|(_, selector)| selector)
        .collect())
}

/// Same as [`compile_selectors`], keeping each selector's source text for logs
pub fn compile_labeled_selectors(selector_strings: &[String]) -> ParsingResult<Vec<(String, Selector)>> {
    let mut selectors = Vec::with_capacity(selector_strings.len());
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push((selector_str.clone(), selector)),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                errors.push(format!("'{selector_str}': {e}"));
            }
        }
    }

    if selectors.is_empty() && !selector_strings.is_empty() {
        return Err(ParsingError::invalid_selector(
            &selector_strings.join(", "),
            format!("no valid selectors compiled: {}", errors.join(", ")),
        ));
    }

    if !errors.is_empty() {
        debug!("Some selectors failed to compile: {}", errors.join(", "));
    }

    Ok(selectors)
}

/// Compile a single selector that the parser cannot work without
pub fn compile_selector(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, e))
}
