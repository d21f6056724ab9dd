//! Catalog Harvester - paginated e-commerce catalog harvesting
//!
//! Walks a category listing page by page, optionally visits each product's
//! detail page, and writes normalized, deduplicated product records as
//! JSON, JSONL and CSV.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{HarvestError, HarvestReport, HarvestSession, SessionConfig};
pub use domain::ProductRecord;
