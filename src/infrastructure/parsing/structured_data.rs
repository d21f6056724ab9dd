//! Embedded JSON documents (`__NEXT_DATA__`, JSON-LD `Product` blocks)
//!
//! Paths are dot separated; numeric segments index into arrays, e.g.
//! `props.pageProps.product.images.0.url`.

use super::{ParsingError, ParsingResult};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

const NEXT_DATA_SELECTOR: &str = "script#__NEXT_DATA__";
const LD_JSON_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// Structured data blocks found in one document, in lookup order
#[derive(Debug, Clone, Default)]
pub struct StructuredData {
    documents: Vec<Value>,
}

impl StructuredData {
    /// Collect every parsable block. Malformed blocks are logged and skipped.
    pub fn from_document(html: &Html) -> Self {
        let mut documents = Vec::new();

        for (selector_str, source_name) in [(NEXT_DATA_SELECTOR, "__NEXT_DATA__"), (LD_JSON_SELECTOR, "ld+json")] {
            let Ok(selector) = Selector::parse(selector_str) else {
                continue;
            };
            for script in html.select(&selector) {
                let body = script.text().collect::<String>();
                match Self::parse_block(&body, source_name) {
                    Ok(values) => documents.extend(values),
                    Err(e) => debug!("Skipping structured data block: {}", e),
                }
            }
        }

        Self { documents }
    }

    pub fn from_values(documents: Vec<Value>) -> Self {
        Self { documents }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Parse one script body. JSON-LD blocks are reduced to their `Product`
    /// entries, whether top-level, in an array, or under `@graph`.
    fn parse_block(body: &str, source_name: &str) -> ParsingResult<Vec<Value>> {
        let value: Value = serde_json::from_str(body.trim()).map_err(|e| ParsingError::MalformedStructuredData {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;

        if source_name != "ld+json" {
            return Ok(vec![value]);
        }

        let candidates = match value {
            Value::Array(items) => items,
            Value::Object(ref map) if map.contains_key("@graph") => {
                map.get("@graph").and_then(Value::as_array).cloned().unwrap_or_default()
            }
            other => vec![other],
        };

        Ok(candidates.into_iter().filter(is_product).collect())
    }

    /// First value found at any of `paths`, searching documents in order
    pub fn lookup(&self, paths: &[String]) -> Option<&Value> {
        paths.iter().find_map(|path| {
            self.documents
                .iter()
                .find_map(|doc| resolve_path(doc, path).filter(|v| !v.is_null()))
        })
    }
}

fn is_product(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => kind.eq_ignore_ascii_case("product"),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| kind.eq_ignore_ascii_case("product")),
        _ => false,
    }
}

/// Walk a dot separated path through objects and arrays
pub fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |current, segment| match current {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Object(map) => map.get(segment),
            _ => None,
        })
}

/// Render a scalar as text; arrays and objects are not scalars
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text items from a scalar, an array of scalars, or an array of objects
/// carrying `key` (e.g. image objects with a `url`)
pub fn text_list(value: &Value, key: Option<&str>) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match (item, key) {
                (Value::Object(_), Some(key)) => item.get(key).and_then(scalar_text),
                _ => scalar_text(item),
            })
            .collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}
