//! Product detail parser
//!
//! Structured data is consulted before markup for every scalar field.
//! Specifications go through their own cascade: `<b>Key:</b> value` rows,
//! then table rows, then definition lists, then free "Key: value" lines.

use super::field_extractor::{
    element_text, ExtractionScope, ExtractionStrategy, FieldCascade, StructuredDataList, StructuredDataPath,
};
use super::{compile_labeled_selectors, compile_selector, compile_selectors, ContextualParser};
use super::{DetailParseContext, DetailSelectors, ParsingError, ParsingResult, StructuredData};
use crate::domain::DetailFields;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::debug;

const BREADCRUMB_SEPARATOR: &str = " > ";
const MAX_SPEC_KEY_CHARS: usize = 60;

type Specs = BTreeMap<String, String>;

/// Parser for extracting detail fields from product pages
pub struct ProductDetailParser {
    title: FieldCascade<String>,
    brand: FieldCascade<String>,
    current_price: FieldCascade<String>,
    regular_price: FieldCascade<String>,
    rating: FieldCascade<String>,
    rating_count: FieldCascade<String>,
    description: FieldCascade<String>,
    seller: FieldCascade<String>,
    highlights: FieldCascade<Vec<String>>,
    colors: FieldCascade<Vec<String>>,
    images: FieldCascade<Vec<String>>,
    breadcrumb: FieldCascade<Vec<String>>,
    badges: FieldCascade<Vec<String>>,
    specs: FieldCascade<Specs>,
}

impl ProductDetailParser {
    /// Create a new parser with default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&DetailSelectors::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &DetailSelectors) -> ParsingResult<Self> {
        let text = |field: &'static str, paths: &[String], css: &[String]| -> ParsingResult<FieldCascade<String>> {
            FieldCascade::new(field)
                .with(StructuredDataPath::new(paths))
                .with_selector_texts(css)
        };

        let max_value_chars = selectors.max_spec_value_chars;
        let terminator = (!selectors.spec_terminator.is_empty())
            .then(|| compile_selector(&selectors.spec_terminator))
            .transpose()?;

        Ok(Self {
            title: text("title", &selectors.json_title, &selectors.title)?,
            brand: text("brand", &selectors.json_brand, &selectors.brand)?,
            current_price: text("price_current", &selectors.json_price, &selectors.current_price)?,
            regular_price: text("price_regular", &selectors.json_regular_price, &selectors.regular_price)?,
            rating: text("rating", &selectors.json_rating, &selectors.rating)?,
            rating_count: text("rating_count", &selectors.json_rating_count, &selectors.rating_count)?,
            description: text("description", &selectors.json_description, &selectors.description)?,
            seller: FieldCascade::new("seller").with_selector_texts(&selectors.seller)?,
            highlights: FieldCascade::new("highlights").with_selector_text_lists(&selectors.highlights)?,
            colors: FieldCascade::new("colors")
                .with_selector_attribute_lists(&selectors.colors, &["aria-label"])?
                .with_selector_text_lists(&selectors.colors)?,
            images: FieldCascade::new("images")
                .with(StructuredDataList::new(&selectors.json_images, Some("url")))
                .with_selector_attribute_lists(&selectors.images, &["src", "data-src", "srcset"])?,
            breadcrumb: FieldCascade::new("category_breadcrumb").with_selector_text_lists(&selectors.breadcrumb)?,
            badges: FieldCascade::new("badges").with_selector_text_lists(&selectors.badges)?,
            specs: FieldCascade::new("specs")
                .with(SpecRows {
                    containers: compile_labeled_selectors(&selectors.spec_container)?,
                    terminator,
                    max_value_chars,
                })
                .with(TableRows {
                    tables: compile_selectors(&selectors.info_table)?,
                    max_value_chars,
                })
                .with(DefinitionList {
                    lists: compile_selectors(&selectors.definition_list)?,
                    max_value_chars,
                })
                .with(LabeledLines {
                    blocks: compile_selectors(&selectors.labeled_lines)?,
                    max_value_chars,
                }),
        })
    }

    /// Parse raw page content
    pub fn parse_page(&self, html_content: &str, context: &DetailParseContext) -> ParsingResult<DetailFields> {
        let html = Html::parse_document(html_content);
        self.parse_with_context(&html, context)
    }
}

impl ContextualParser for ProductDetailParser {
    type Output = DetailFields;
    type Context = DetailParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        debug!("Parsing product detail {}", context.url);

        let structured = StructuredData::from_document(html);
        let scope = ExtractionScope::document(html, &structured);

        let detail = DetailFields {
            title: self.title.extract(&scope).into_value(),
            brand: self.brand.extract(&scope).into_value(),
            price_current: self.current_price.extract(&scope).into_value(),
            price_regular: self.regular_price.extract(&scope).into_value(),
            rating: self.rating.extract(&scope).into_value(),
            rating_count: self.rating_count.extract(&scope).into_value(),
            description: self.description.extract(&scope).into_value(),
            highlights: self.highlights.extract(&scope).into_value(),
            colors: self.colors.extract(&scope).into_value(),
            images: self.images.extract(&scope).into_value(),
            seller: self.seller.extract(&scope).into_value(),
            category_breadcrumb: self.breadcrumb.extract(&scope).into_value().join(BREADCRUMB_SEPARATOR),
            specs: self.specs.extract(&scope).into_value(),
            badges: self.badges.extract(&scope).into_value(),
        };

        if detail.is_empty() {
            return Err(ParsingError::required_field_missing("any detail field", Some(&context.url)));
        }

        debug!(
            "Detail {}: {} specs, {} images, {} highlights",
            context.product_id.as_deref().unwrap_or(&context.url),
            detail.specs.len(),
            detail.images.len(),
            detail.highlights.len()
        );
        Ok(detail)
    }
}

/// Insert a cleaned pair; the first occurrence of a key wins
fn insert_spec(specs: &mut Specs, key: &str, value: &str, max_value_chars: usize) {
    let key = key.trim().trim_end_matches(':').trim();
    let value = value.trim().trim_start_matches(':').trim();
    if key.is_empty() || value.is_empty() || key.chars().count() > MAX_SPEC_KEY_CHARS {
        return;
    }
    if value.chars().count() > max_value_chars {
        debug!("Dropping oversized spec value for '{}'", key);
        return;
    }
    specs.entry(key.to_string()).or_insert_with(|| value.to_string());
}

fn non_empty(specs: Specs) -> Option<Specs> {
    (!specs.is_empty()).then_some(specs)
}

fn child_elements<'a>(element: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

/// `<div><b>Key:</b> value</div>` rows inside a specifications container
struct SpecRows {
    containers: Vec<(String, Selector)>,
    terminator: Option<Selector>,
    max_value_chars: usize,
}

impl SpecRows {
    /// Only the marketplace block itself ends the rows, not its ancestors
    fn is_terminator(&self, element: &ElementRef<'_>) -> bool {
        self.terminator.as_ref().is_some_and(|terminator| terminator.matches(element))
    }
}

impl ExtractionStrategy for SpecRows {
    type Output = Specs;

    fn name(&self) -> &str {
        "spec_rows"
    }

    fn extract(&self, scope: &ExtractionScope<'_>) -> ParsingResult<Option<Specs>> {
        let mut specs = Specs::new();

        for (label, selector) in &self.containers {
            let Some(container) = scope.root().select(selector).next() else {
                continue;
            };
            debug!("Specification container found via {}", label);

            for row in container.descendants().skip(1).filter_map(ElementRef::wrap) {
                if self.is_terminator(&row) {
                    break;
                }
                if row.value().name() != "div" {
                    continue;
                }
                let Some(bold) = child_elements(&row).find(|child| child.value().name() == "b") else {
                    continue;
                };
                let key = element_text(&bold);
                let row_text = element_text(&row);
                let value = row_text.strip_prefix(key.as_str()).unwrap_or(&row_text);
                insert_spec(&mut specs, &key, value, self.max_value_chars);
            }

            if !specs.is_empty() {
                break;
            }
        }

        Ok(non_empty(specs))
    }
}

/// Two-cell table rows (`th`/`td` or `td`/`td`)
struct TableRows {
    tables: Vec<Selector>,
    max_value_chars: usize,
}

impl ExtractionStrategy for TableRows {
    type Output = Specs;

    fn name(&self) -> &str {
        "table_rows"
    }

    fn extract(&self, scope: &ExtractionScope<'_>) -> ParsingResult<Option<Specs>> {
        let row_selector = compile_selector("tr")?;
        let cell_selector = compile_selector("th, td")?;
        let mut specs = Specs::new();

        for table in self.tables.iter().flat_map(|selector| scope.root().select(selector)) {
            for row in table.select(&row_selector) {
                let cells: Vec<String> = row.select(&cell_selector).map(|cell| element_text(&cell)).collect();
                if let [key, value] = cells.as_slice() {
                    insert_spec(&mut specs, key, value, self.max_value_chars);
                }
            }
        }

        Ok(non_empty(specs))
    }
}

/// `dt`/`dd` pairs
struct DefinitionList {
    lists: Vec<Selector>,
    max_value_chars: usize,
}

impl ExtractionStrategy for DefinitionList {
    type Output = Specs;

    fn name(&self) -> &str {
        "definition_list"
    }

    fn extract(&self, scope: &ExtractionScope<'_>) -> ParsingResult<Option<Specs>> {
        let mut specs = Specs::new();

        for list in self.lists.iter().flat_map(|selector| scope.root().select(selector)) {
            let mut pending_key: Option<String> = None;
            for child in child_elements(&list) {
                match child.value().name() {
                    "dt" => pending_key = Some(element_text(&child)),
                    "dd" => {
                        if let Some(key) = pending_key.take() {
                            insert_spec(&mut specs, &key, &element_text(&child), self.max_value_chars);
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(non_empty(specs))
    }
}

/// Text lines shaped like `Key: value`
struct LabeledLines {
    blocks: Vec<Selector>,
    max_value_chars: usize,
}

impl ExtractionStrategy for LabeledLines {
    type Output = Specs;

    fn name(&self) -> &str {
        "labeled_lines"
    }

    fn extract(&self, scope: &ExtractionScope<'_>) -> ParsingResult<Option<Specs>> {
        let mut specs = Specs::new();

        for block in self.blocks.iter().flat_map(|selector| scope.root().select(selector)) {
            let text = block.text().collect::<Vec<_>>().join("\n");
            for line in text.lines() {
                if let Some((key, value)) = line.split_once(':') {
                    insert_spec(&mut specs, key, value, self.max_value_chars);
                }
            }
        }

        Ok(non_empty(specs))
    }
}
