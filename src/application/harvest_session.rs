//! One end-to-end harvesting run
//!
//! Strictly sequential: page N+1 is only requested after every card of
//! page N has been drafted, optionally enriched, sealed and deduplicated.
//! The product cap is checked before every listing and detail fetch.

use crate::application::detail_enricher::DetailEnricher;
use crate::application::session_config::SessionConfig;
use crate::domain::{
    Deduplicator, Paginator, ProductRecord, RawProductFields, RecordNormalizer, SessionAggregator, StopReason,
};
use crate::infrastructure::config::ConfigError;
use crate::infrastructure::export::ExportError;
use crate::infrastructure::fetcher::{FetchError, PageFetcher};
use crate::infrastructure::parsing::{
    DetailSelectors, ListingPage, ParseContext, ParsingError, ProductDetailParser, ProductListParser, SelectorConfig,
};
use crate::infrastructure::retry_manager::{PacedRetrier, RetryPolicy};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Session-level failures; everything else degrades into the report
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Transport or parser could not be set up; no output is produced
    #[error("Session setup failed: {0}")]
    SessionSetup(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Output(#[from] ExportError),
}

impl From<ParsingError> for HarvestError {
    fn from(error: ParsingError) -> Self {
        Self::SessionSetup(format!("invalid extraction configuration: {error}"))
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestReport {
    pub records: usize,
    pub pages_fetched: u32,
    pub duplicates_skipped: usize,
    pub invalid_cards_skipped: usize,
    pub enrichment_failures: usize,
    pub stop_reason: Option<StopReason>,
    /// Non-fatal problems, such as a page that stayed unavailable
    pub warnings: Vec<String>,
}

#[derive(Debug, Default)]
struct Counters {
    duplicates_skipped: usize,
    invalid_cards_skipped: usize,
    enrichment_failures: usize,
    warnings: Vec<String>,
}

pub struct HarvestSession {
    config: SessionConfig,
    list_parser: ProductListParser,
    normalizer: RecordNormalizer,
    retrier: Arc<PacedRetrier>,
    enricher: Option<DetailEnricher>,
    paginator: Paginator,
    deduplicator: Deduplicator,
    aggregator: SessionAggregator,
    counters: Counters,
}

impl HarvestSession {
    pub fn new(
        config: SessionConfig,
        fetcher: Arc<dyn PageFetcher>,
        selectors: &SelectorConfig,
    ) -> Result<Self, HarvestError> {
        let policy = RetryPolicy::new(config.delay_min(), config.delay_max(), config.max_attempts());
        Self::with_retrier(config, Arc::new(PacedRetrier::new(policy, fetcher)), selectors)
    }

    /// Use a prepared retrier, e.g. with a custom failure classifier
    pub fn with_retrier(
        config: SessionConfig,
        retrier: Arc<PacedRetrier>,
        selectors: &SelectorConfig,
    ) -> Result<Self, HarvestError> {
        let normalizer = RecordNormalizer::new(config.canonical_image_host());
        let enricher = if config.fetch_details() {
            Some(Self::build_enricher(&selectors.detail, normalizer.clone(), Arc::clone(&retrier))?)
        } else {
            None
        };

        Ok(Self {
            list_parser: ProductListParser::with_config(&selectors.listing)?,
            paginator: Paginator::new(config.start_url(), config.max_pages()),
            normalizer,
            retrier,
            enricher,
            deduplicator: Deduplicator::new(),
            aggregator: SessionAggregator::new(),
            counters: Counters::default(),
            config,
        })
    }

    fn build_enricher(
        selectors: &DetailSelectors,
        normalizer: RecordNormalizer,
        retrier: Arc<PacedRetrier>,
    ) -> Result<DetailEnricher, HarvestError> {
        let parser = ProductDetailParser::with_config(selectors)?;
        Ok(DetailEnricher::new(parser, normalizer, retrier))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &SessionAggregator {
        &self.aggregator
    }

    pub fn into_records(self) -> Vec<ProductRecord> {
        self.aggregator.into_records()
    }

    fn cap_reached(&self) -> bool {
        self.aggregator.len() >= self.config.max_products()
    }

    /// Run until the cap, the last page, or an unavailable page.
    ///
    /// Only a setup failure is returned as an error; records collected
    /// before any other failure are kept.
    pub async fn run(&mut self) -> Result<HarvestReport, HarvestError> {
        info!(
            "Starting harvest at {} (max {} products, details: {})",
            self.config.start_url(),
            self.config.max_products(),
            self.config.fetch_details()
        );

        while let Some(url) = self.paginator.next_target(self.cap_reached()) {
            let page_number = self.paginator.pages_fetched() + 1;

            let content = match self.retrier.fetch(&url).await {
                Ok(content) => content,
                Err(FetchError::Setup { message }) => return Err(HarvestError::SessionSetup(message)),
                Err(e) => {
                    warn!("Stopping pagination at page {}: {}", page_number, e);
                    self.counters.warnings.push(e.to_string());
                    self.paginator.page_unavailable();
                    continue;
                }
            };

            let context = ParseContext::new(page_number, url.as_str()).with_page_size(self.config.page_size());
            let listing = match self.list_parser.parse_page(&content, &context) {
                Ok(listing) => listing,
                Err(e) => {
                    warn!("No products on page {}: {}", page_number, e);
                    self.counters.warnings.push(e.to_string());
                    ListingPage::default()
                }
            };
            self.counters.invalid_cards_skipped += listing.skipped_cards;

            for card in &listing.cards {
                if self.cap_reached() {
                    debug!("Product cap reached mid-page {}", page_number);
                    break;
                }
                self.process_card(card).await?;
            }

            info!(
                "Page {} done: {} cards, {} records so far",
                page_number,
                listing.cards.len(),
                self.aggregator.len()
            );
            let card_count = listing.cards.len();
            self.paginator.page_processed(listing.next_page, card_count, self.cap_reached());
        }

        let report = self.report();
        info!(
            "Harvest finished: {} records from {} pages ({:?})",
            report.records, report.pages_fetched, report.stop_reason
        );
        Ok(report)
    }

    /// Draft, enrich, seal, admit, append
    async fn process_card(&mut self, card: &RawProductFields) -> Result<(), HarvestError> {
        let draft = self.normalizer.normalize(card);

        if self.deduplicator.contains(&draft.id) {
            debug!("Skipping duplicate {}", draft.id);
            self.counters.duplicates_skipped += 1;
            return Ok(());
        }

        let draft = match &self.enricher {
            Some(enricher) => {
                let detail_url = draft.url.clone();
                let enrichment = enricher
                    .enrich(draft, &detail_url)
                    .await
                    .map_err(|e| HarvestError::SessionSetup(e.to_string()))?;
                if !enrichment.enriched {
                    self.counters.enrichment_failures += 1;
                }
                enrichment.draft
            }
            None => draft,
        };

        let record = match draft.seal(Utc::now()) {
            Ok(record) => record,
            Err(e) => {
                warn!("Dropping invalid card {}: {}", card.url, e);
                self.counters.invalid_cards_skipped += 1;
                return Ok(());
            }
        };

        if !self.deduplicator.admit(record.id()) {
            self.counters.duplicates_skipped += 1;
            return Ok(());
        }
        self.aggregator.append(record);
        Ok(())
    }

    pub fn report(&self) -> HarvestReport {
        HarvestReport {
            records: self.aggregator.len(),
            pages_fetched: self.paginator.pages_fetched(),
            duplicates_skipped: self.counters.duplicates_skipped,
            invalid_cards_skipped: self.counters.invalid_cards_skipped,
            enrichment_failures: self.counters.enrichment_failures,
            stop_reason: self.paginator.stop_reason().cloned(),
            warnings: self.counters.warnings.clone(),
        }
    }
}
