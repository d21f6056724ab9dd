//! Detail page enrichment
//!
//! Failures never cost the record: [`DetailEnricher::enrich`] falls back
//! to the listing draft unchanged.

use crate::domain::{ProductDraft, RecordNormalizer};
use crate::infrastructure::fetcher::FetchError;
use crate::infrastructure::parsing::{DetailParseContext, ParsingError, ProductDetailParser};
use crate::infrastructure::retry_manager::PacedRetrier;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("Detail fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Detail parse failed: {0}")]
    Parse(#[from] ParsingError),
}

/// Outcome of one enrichment attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub draft: ProductDraft,
    pub enriched: bool,
}

pub struct DetailEnricher {
    parser: ProductDetailParser,
    normalizer: RecordNormalizer,
    retrier: Arc<PacedRetrier>,
}

impl DetailEnricher {
    pub fn new(parser: ProductDetailParser, normalizer: RecordNormalizer, retrier: Arc<PacedRetrier>) -> Self {
        Self {
            parser,
            normalizer,
            retrier,
        }
    }

    /// Fetch, parse and merge; detail values win over listing values
    pub async fn try_enrich(&self, draft: &ProductDraft, detail_url: &str) -> Result<ProductDraft, EnrichmentError> {
        let content = self.retrier.fetch(detail_url).await?;

        let context = DetailParseContext::new(detail_url).with_product_id(draft.id.clone());
        let detail = self.parser.parse_page(&content, &context)?;
        debug!("Merging {} detail specs into {}", detail.specs.len(), draft.id);

        Ok(self.normalizer.merge_detail(draft, &detail))
    }

    /// Like [`Self::try_enrich`], keeping the listing draft on any failure
    /// except a transport setup failure, which is returned
    pub async fn enrich(&self, draft: ProductDraft, detail_url: &str) -> Result<Enrichment, FetchError> {
        match self.try_enrich(&draft, detail_url).await {
            Ok(enriched) => Ok(Enrichment {
                draft: enriched,
                enriched: true,
            }),
            Err(EnrichmentError::Fetch(e)) if e.is_setup_failure() => Err(e),
            Err(e) => {
                warn!("Keeping listing data for {}: {}", draft.id, e);
                Ok(Enrichment { draft, enriched: false })
            }
        }
    }
}
