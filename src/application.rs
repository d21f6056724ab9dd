//! Application layer
//!
//! Wires the domain state machines to the fetcher, parsers and writers
//! for one harvesting session.

pub mod detail_enricher;
pub mod harvest_session;
pub mod session_config;

pub use detail_enricher::{DetailEnricher, Enrichment, EnrichmentError};
pub use harvest_session::{HarvestError, HarvestReport, HarvestSession};
pub use session_config::SessionConfig;
