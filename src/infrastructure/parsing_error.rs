//! Parsing error types for listing and detail extraction
//!
//! Per-field failures are recovered inside the extraction cascade and only
//! show up in debug logs. Card-level and page-level failures are returned to
//! the parser's caller, which decides whether to skip or stop.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Required field '{field}' not found in HTML")]
    RequiredFieldMissing {
        field: String,
        context: Option<String>,
    },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid regex pattern: {pattern} - {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("No products found on page {page_number}")]
    NoProductsFound {
        page_number: u32,
        tried_selectors: Vec<String>,
    },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: Option<String>,
    },

    #[error("Malformed structured data in {source_name}: {reason}")]
    MalformedStructuredData { source_name: String, reason: String },

    #[error("Strategy '{strategy}' failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },
}

impl ParsingError {
    /// Create a required field missing error with context
    pub fn required_field_missing(field: &str, context: Option<&str>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            context: context.map(ToString::to_string),
        }
    }

    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a no products found error with tried selectors
    pub fn no_products_found(page_number: u32, tried_selectors: Vec<String>) -> Self {
        Self::NoProductsFound {
            page_number,
            tried_selectors,
        }
    }

    pub fn strategy_failed(strategy: &str, reason: impl ToString) -> Self {
        Self::StrategyFailed {
            strategy: strategy.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether processing can continue with the next card, field or strategy
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RequiredFieldMissing { .. }
            | Self::UrlResolutionFailed { .. }
            | Self::MalformedStructuredData { .. }
            | Self::StrategyFailed { .. } => true,
            Self::InvalidSelector { .. } | Self::InvalidPattern { .. } | Self::NoProductsFound { .. } => false,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
