//! In-memory session state: the identifier set and the record aggregate.
//!
//! Both are owned by a single session and touched from one control flow,
//! so neither carries any locking.

use crate::domain::product::ProductRecord;
use std::collections::HashSet;

/// Identifiers already emitted in this session
#[derive(Debug, Default)]
pub struct Deduplicator {
    admitted: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` and return `true`, or return `false` if it was seen before
    pub fn admit(&mut self, id: &str) -> bool {
        self.admitted.insert(id.to_string())
    }

    /// Non-recording lookup, used to skip work for known duplicates
    pub fn contains(&self, id: &str) -> bool {
        self.admitted.contains(id)
    }

    pub fn len(&self) -> usize {
        self.admitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
    }
}

/// Append-only, ordered collection of sealed records
#[derive(Debug, Default)]
pub struct SessionAggregator {
    records: Vec<ProductRecord>,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ProductRecord) {
        self.records.push(record);
    }

    /// Read-only view for writers
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ProductRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::ProductDraft;
    use chrono::Utc;

    fn record(id: &str) -> ProductRecord {
        ProductDraft {
            id: id.to_string(),
            url: format!("https://www.target.com/p/item/-/A-{id}"),
            title: format!("Item {id}"),
            ..ProductDraft::default()
        }
        .seal(Utc::now())
        .unwrap()
    }

    #[test]
    fn test_admit_rejects_repeats() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.admit("94110251"));
        assert!(!dedup.admit("94110251"));
        assert!(dedup.admit("94110252"));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_contains_does_not_admit() {
        let mut dedup = Deduplicator::new();
        assert!(!dedup.contains("1"));
        assert!(dedup.admit("1"));
        assert!(dedup.contains("1"));
    }

    #[test]
    fn test_aggregator_preserves_order() {
        let mut aggregator = SessionAggregator::new();
        aggregator.append(record("2"));
        aggregator.append(record("1"));

        let ids: Vec<_> = aggregator.records().iter().map(ProductRecord::id).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(aggregator.into_records().len(), 2);
    }
}
