//! Domain module - product records and the session's core state machines
//!
//! Nothing in here touches the network or the file system.

pub mod normalizer;
pub mod pagination;
pub mod product;
pub mod session_manager;

pub use normalizer::RecordNormalizer;
pub use pagination::{Paginator, PaginatorState, StopReason};
pub use product::{
    DetailFields, ProductDraft, ProductFlags, ProductRecord, RawProductFields, ValidationError, MAX_IMAGES,
};
pub use session_manager::{Deduplicator, SessionAggregator};
