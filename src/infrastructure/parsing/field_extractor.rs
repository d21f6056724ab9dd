//! Ordered extraction cascades
//!
//! A [`FieldCascade`] holds the strategies for one field, most reliable
//! first (structured data, primary selector, legacy selectors, regex over
//! raw markup). The first strategy producing a non-blank value wins. A
//! strategy that misses or fails is logged at debug level and the cascade
//! moves on, so a missing field never aborts the record.

use super::structured_data::{scalar_text, text_list, StructuredData};
use super::{compile_labeled_selectors, ParsingError, ParsingResult};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::debug;

/// Values a cascade can produce; blank values count as a miss
pub trait FieldValue: Clone + Default {
    fn is_blank(&self) -> bool;
}

impl FieldValue for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl FieldValue for Vec<String> {
    fn is_blank(&self) -> bool {
        self.iter().all(|item| item.trim().is_empty())
    }
}

impl FieldValue for BTreeMap<String, String> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// The part of a page a cascade runs against
pub struct ExtractionScope<'a> {
    element: ElementRef<'a>,
    raw_html: String,
    structured: Option<&'a StructuredData>,
}

impl<'a> ExtractionScope<'a> {
    /// A fragment, such as one product card
    pub fn element(element: ElementRef<'a>) -> Self {
        Self {
            raw_html: element.html(),
            element,
            structured: None,
        }
    }

    /// A whole document with its embedded structured data
    pub fn document(html: &'a Html, structured: &'a StructuredData) -> Self {
        Self {
            element: html.root_element(),
            raw_html: html.html(),
            structured: Some(structured),
        }
    }

    pub fn root(&self) -> ElementRef<'a> {
        self.element
    }

    pub fn raw_html(&self) -> &str {
        &self.raw_html
    }

    pub fn structured(&self) -> Option<&'a StructuredData> {
        self.structured
    }
}

/// One way of pulling a value out of a scope.
///
/// `Ok(None)` is a miss; `Err` is a failure. Both hand over to the next
/// strategy in the cascade.
pub trait ExtractionStrategy: Send + Sync {
    type Output;

    fn name(&self) -> &str;

    fn extract(&self, scope: &ExtractionScope<'_>) -> ParsingResult<Option<Self::Output>>;
}

/// Result of running a cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction<T> {
    pub value: T,
    pub found: bool,
    /// Name of the strategy that produced the value
    pub strategy: Option<String>,
}

impl<T: FieldValue> Extraction<T> {
    fn hit(value: T, strategy: &str) -> Self {
        Self {
            value,
            found: true,
            strategy: Some(strategy.to_string()),
        }
    }

    fn miss() -> Self {
        Self {
            value: T::default(),
            found: false,
            strategy: None,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Ordered strategies for one field
pub struct FieldCascade<T> {
    field: &'static str,
    strategies: Vec<Box<dyn ExtractionStrategy<Output = T>>>,
}

impl<T: FieldValue + 'static> FieldCascade<T> {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    #[must_use]
    pub fn with<S>(mut self, strategy: S) -> Self
    where
        S: ExtractionStrategy<Output = T> + 'static,
    {
        self.strategies.push(Box::new(strategy));
        self
    }

    #[must_use]
    pub fn with_all<S, I>(mut self, strategies: I) -> Self
    where
        S: ExtractionStrategy<Output = T> + 'static,
        I: IntoIterator<Item = S>,
    {
        for strategy in strategies {
            self.strategies.push(Box::new(strategy));
        }
        self
    }

    /// Run strategies in order until one yields a non-blank value
    pub fn extract(&self, scope: &ExtractionScope<'_>) -> Extraction<T> {
        for strategy in &self.strategies {
            match strategy.extract(scope) {
                Ok(Some(value)) if !value.is_blank() => {
                    debug!("{}: extracted via {}", self.field, strategy.name());
                    return Extraction::hit(value, strategy.name());
                }
                Ok(_) => debug!("{}: no match for {}", self.field, strategy.name()),
                Err(e) => debug!("{}: strategy {} failed: {}", self.field, strategy.name(), e),
            }
        }

        debug!("{}: all {} strategies missed", self.field, self.strategies.len());
        Extraction::miss()
    }
}

impl FieldCascade<String> {
    /// Append one text strategy per selector
    pub fn with_selector_texts(self, selectors: &[String]) -> ParsingResult<Self> {
        let strategies = compile_labeled_selectors(selectors)?
            .into_iter()
            .map(|(label, selector)| SelectorText::new(label, selector));
        Ok(self.with_all(strategies))
    }

    /// Append one attribute strategy per selector
    pub fn with_selector_attributes(self, selectors: &[String], attributes: &[&str]) -> ParsingResult<Self> {
        let strategies = compile_labeled_selectors(selectors)?
            .into_iter()
            .map(|(label, selector)| SelectorAttribute::new(label, selector, attributes));
        Ok(self.with_all(strategies))
    }
}

impl FieldCascade<Vec<String>> {
    pub fn with_selector_text_lists(self, selectors: &[String]) -> ParsingResult<Self> {
        let strategies = compile_labeled_selectors(selectors)?
            .into_iter()
            .map(|(label, selector)| SelectorTextList::new(label, selector));
        Ok(self.with_all(strategies))
    }

    pub fn with_selector_attribute_lists(self, selectors: &[String], attributes: &[&str]) -> ParsingResult<Self> {
        let strategies = compile_labeled_selectors(selectors)?
            .into_iter()
            .map(|(label, selector)| SelectorAttributeList::new(label, selector, attributes));
        Ok(self.with_all(strategies))
    }
}

/// Whitespace-collapsed text content of an element
pub fn element_text(element: &ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// First non-empty value among `attributes`; `srcset` yields its first URL
fn attribute_value(element: &ElementRef<'_>, attributes: &[String]) -> Option<String> {
    attributes.iter().find_map(|attribute| {
        let value = element.value().attr(attribute)?.trim();
        let value = if attribute == "srcset" {
            value.split(',').next()?.split_whitespace().next()?
        } else {
            value
        };
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Text of the first matching element with non-empty text
pub struct SelectorText {
    label: String,
    selector: Selector,
}

impl SelectorText {
    pub fn new(label: impl Into<String>, selector: Selector) -> Self {
        Self {
            label: format!("text:{}", label.into()),
            selector,
        }
    }
}

impl ExtractionStrategy for SelectorText {
    type Output = String;

    fn name(&self) -> &str {
        &self.label
    }

    fn extract(&self, scope: &ExtractionScope<'_>) -> ParsingResult<Option<String>> {
        Ok(scope
            .root()
            .select(&self.selector)
            .map(|element| element_text(&element))
            .find(|text| !text.is_empty()))
    }
}

/// First non-empty attribute value among matching elements
pub struct SelectorAttribute {
    label: String,
    selector: Selector,
    attributes: Vec<String>,
}

impl SelectorAttribute {
    pub fn new(label: impl Into<String>, selector: Selector, attributes: &[&str]) -> Self {
        Self {
            label: format!("attr:{}[{}]", label.into(), attributes.join("|")),
            selector,
            attributes: attributes.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ExtractionStrategy for SelectorAttribute {
    type Output = String;

    fn name(&self) -> &str {
        &self.label
    }

    fn extract(&self, scope: &ExtractionScope<'_>) -> ParsingResult<Option<String>> {
        Ok(scope
            .root()
            .select(&self.selector)
            .find_map(|element| attribute_value(&element, &self.attributes)))
    }
}

/// Texts of every matching element
pub struct SelectorTextList {
    label: String,
    selector: Selector,
}

impl SelectorTextList {
    pub fn new(label: impl Into<String>, selector: Selector) -> Self {
        Self {
            label: format!("texts:{}", label.into()),
            selector,
        }
    }
}

impl ExtractionStrategy for SelectorTextList {
    type Output = Vec<String>;

    fn name(&self) -> &str {
        &self.label
    }

    fn extract(&self, scope: &ExtractionScope<'_>) -> ParsingResult<Option<Vec<String>>> {
        let texts: Vec<String> = scope
            .root()
            .select(&self.selector)
            .map(|element| element_text(&element))
            .filter(|text| !text.is_empty())
            .collect();
        Ok((!texts.is_empty()).then_some(texts))
    }
}

/// Attribute values of every matching element
pub struct SelectorAttributeList {
    label: String,
    selector: Selector,
    attributes: Vec<String>,
}

impl SelectorAttributeList {
    pub fn new(label: impl Into<String>, selector: Selector, attributes: &[&str]) -> Self {
        Self {
            label: format!("attrs:{}[{}]", label.into(), attributes.join("|")),
            selector,
            attributes: attributes.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ExtractionStrategy for SelectorAttributeList {
    type Output = Vec<String>;

    fn name(&self) -> &str {
        &self.label
    }

    fn extract(&self, scope: &ExtractionScope<'_>) -> ParsingResult<Option<Vec<String>>> {
        let values: Vec<String> = scope
            .root()
            .select(&self.selector)
            .filter_map(|element| attribute_value(&element, &self.attributes))
            .collect();
        Ok((!values.is_empty()).then_some(values))
    }
}

/// First capture group (or whole match) of a regex over the raw markup
pub struct RegexCapture {
    label: String,
    regex: Regex,
}

impl RegexCapture {
    pub fn new(pattern: &str) -> ParsingResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| ParsingError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            label: format!("regex:{pattern}"),
            regex,
        })
    }
}

impl ExtractionStrategy for RegexCapture {
    type Output = String;

    fn name(&self) -> &str {
        &self.label
    }

    fn extract(&self, scope: &ExtractionScope<'_>) -> ParsingResult<Option<String>> {
        let Some(captures) = self.regex.captures(scope.raw_html()) else {
            return Ok(None);
        };
        let matched = captures
            .get(1)
            .or_else(|| captures.get(0))
            .ok_or_else(|| ParsingError::strategy_failed(&self.label, "match without capture"))?;
        Ok(Some(matched.as_str().trim().to_string()))
    }
}

/// Scalar from embedded structured data at the first resolving path
pub struct StructuredDataPath {
    label: String,
    paths: Vec<String>,
}

impl StructuredDataPath {
    pub fn new(paths: &[String]) -> Self {
        Self {
            label: format!("json:{}", paths.join("|")),
            paths: paths.to_vec(),
        }
    }
}

impl ExtractionStrategy for StructuredDataPath {
    type Output = String;

    fn name(&self) -> &str {
        &self.label
    }

    fn extract(&self, scope: &ExtractionScope<'_>) -> ParsingResult<Option<String>> {
        let Some(data) = scope.structured() else {
            return Ok(None);
        };
        match data.lookup(&self.paths) {
            Some(value) => scalar_text(value)
                .map(Some)
                .ok_or_else(|| ParsingError::strategy_failed(&self.label, "value is not a scalar")),
            None => Ok(None),
        }
    }
}

/// List from embedded structured data; object items contribute `item_key`
pub struct StructuredDataList {
    label: String,
    paths: Vec<String>,
    item_key: Option<String>,
}

impl StructuredDataList {
    pub fn new(paths: &[String], item_key: Option<&str>) -> Self {
        Self {
            label: format!("json-list:{}", paths.join("|")),
            paths: paths.to_vec(),
            item_key: item_key.map(ToString::to_string),
        }
    }
}

impl ExtractionStrategy for StructuredDataList {
    type Output = Vec<String>;

    fn name(&self) -> &str {
        &self.label
    }

    fn extract(&self, scope: &ExtractionScope<'_>) -> ParsingResult<Option<Vec<String>>> {
        let Some(value) = scope.structured().and_then(|data| data.lookup(&self.paths)) else {
            return Ok(None);
        };
        let items = text_list(value, self.item_key.as_deref());
        Ok((!items.is_empty()).then_some(items))
    }
}
