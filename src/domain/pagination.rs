//! Listing traversal state machine.
//!
//! `Start -> FetchingPage -> HasNext | NoNext -> Done`
//!
//! The paginator never fetches anything itself. The session asks it for the
//! next target, fetches and processes the page, then reports the outcome.
//! Pages are visited strictly forward and a URL is never fetched twice.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Why traversal ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum StopReason {
    /// The last page had no usable next link
    NoNextLink,
    /// The product cap was met
    CapReached,
    /// A page could not be fetched after all retries
    PageUnavailable { url: String },
    /// A page yielded no product cards
    EmptyPage,
    /// The configured page limit was met
    PageLimit,
    /// The next link pointed at a page already fetched
    LoopDetected { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginatorState {
    Start,
    FetchingPage { url: String, page_number: u32 },
    HasNext { url: String },
    NoNext,
    Done(StopReason),
}

#[derive(Debug, Clone)]
pub struct Paginator {
    state: PaginatorState,
    start_url: String,
    max_pages: Option<u32>,
    pages_fetched: u32,
    visited: HashSet<String>,
}

impl Paginator {
    pub fn new(start_url: impl Into<String>, max_pages: Option<u32>) -> Self {
        Self {
            state: PaginatorState::Start,
            start_url: start_url.into(),
            max_pages,
            pages_fetched: 0,
            visited: HashSet::new(),
        }
    }

    pub fn state(&self) -> &PaginatorState {
        &self.state
    }

    /// Pages whose content was processed (successfully fetched)
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, PaginatorState::Done(_))
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        match &self.state {
            PaginatorState::Done(reason) => Some(reason),
            _ => None,
        }
    }

    /// Advance to the next page to fetch, or finish.
    ///
    /// `cap_reached` is checked before any new fetch is started.
    pub fn next_target(&mut self, cap_reached: bool) -> Option<String> {
        let target = match &self.state {
            PaginatorState::Start | PaginatorState::HasNext { .. } if cap_reached => {
                self.finish(StopReason::CapReached);
                return None;
            }
            PaginatorState::Start | PaginatorState::HasNext { .. } if self.page_limit_reached() => {
                self.finish(StopReason::PageLimit);
                return None;
            }
            PaginatorState::Start => self.start_url.clone(),
            PaginatorState::HasNext { url } => url.clone(),
            PaginatorState::NoNext => {
                self.finish(StopReason::NoNextLink);
                return None;
            }
            PaginatorState::FetchingPage { url, .. } => {
                warn!("next_target called while {} is still being processed", url);
                return None;
            }
            PaginatorState::Done(_) => return None,
        };

        self.visited.insert(target.clone());
        let page_number = self.pages_fetched + 1;
        debug!("Paginator fetching page {}: {}", page_number, target);
        self.state = PaginatorState::FetchingPage {
            url: target.clone(),
            page_number,
        };
        Some(target)
    }

    /// Report a fetched page once its products have been processed
    pub fn page_processed(&mut self, next_link: Option<String>, card_count: usize, cap_reached: bool) {
        if !matches!(self.state, PaginatorState::FetchingPage { .. }) {
            warn!("page_processed called outside of a page fetch ({:?})", self.state);
            return;
        }
        self.pages_fetched += 1;

        if cap_reached {
            self.finish(StopReason::CapReached);
            return;
        }
        if card_count == 0 {
            self.finish(StopReason::EmptyPage);
            return;
        }

        self.state = match next_link {
            Some(url) if self.visited.contains(&url) => {
                warn!("Next link {} was already fetched; stopping", url);
                PaginatorState::Done(StopReason::LoopDetected { url })
            }
            Some(url) => PaginatorState::HasNext { url },
            None => PaginatorState::NoNext,
        };
    }

    /// Report a terminal fetch failure for the current page
    pub fn page_unavailable(&mut self) {
        if let PaginatorState::FetchingPage { url, .. } = &self.state {
            let url = url.clone();
            self.finish(StopReason::PageUnavailable { url });
        }
    }

    fn page_limit_reached(&self) -> bool {
        self.max_pages.is_some_and(|max| self.pages_fetched >= max)
    }

    fn finish(&mut self, reason: StopReason) {
        debug!("Paginator done after {} pages: {:?}", self.pages_fetched, reason);
        self.state = PaginatorState::Done(reason);
    }
}
