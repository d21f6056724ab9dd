//! End-to-end session runs over an in-memory fetcher
mod common;

use catalog_harvester::application::{HarvestError, HarvestSession, SessionConfig};
use catalog_harvester::domain::StopReason;
use catalog_harvester::infrastructure::{FetchError, SelectorConfig};
use common::{card, detail_page, detail_url, linked_listing, listing_page, listing_url, FakeFetcher};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> SessionConfig {
    SessionConfig::new(listing_url(1)).with_delays(Duration::ZERO, Duration::ZERO)
}

async fn run(config: SessionConfig, fetcher: Arc<FakeFetcher>) -> (HarvestSession, catalog_harvester::HarvestReport) {
    let mut session = HarvestSession::new(config, fetcher, &SelectorConfig::default()).unwrap();
    let report = session.run().await.unwrap();
    (session, report)
}

#[tokio::test]
async fn duplicate_ids_across_pages_emit_one_record() {
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_page(
                listing_url(1),
                listing_page(&[card("94110251", "$46.80", None), card("1", "$10.00", None)], Some(2)),
            )
            .with_page(
                listing_url(2),
                listing_page(&[card("94110251", "$46.80", None), card("2", "$12.00", None)], None),
            ),
    );

    let (session, report) = run(fast_config(), fetcher).await;

    let ids: Vec<&str> = session.aggregator().records().iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["94110251", "1", "2"]);
    assert_eq!(report.duplicates_skipped, 1);
    assert_eq!(report.stop_reason, Some(StopReason::NoNextLink));
}

#[tokio::test]
async fn discount_is_derived_from_both_prices() {
    let fetcher = Arc::new(FakeFetcher::new().with_page(
        listing_url(1),
        listing_page(&[card("7", "$46.80", Some("$78.00"))], None),
    ));

    let (session, _) = run(fast_config(), fetcher).await;

    let record = &session.aggregator().records()[0];
    assert_eq!(record.price_current(), Decimal::new(4680, 2));
    assert_eq!(record.discount_amount(), Some(Decimal::new(3120, 2)));
    assert_eq!(record.discount_percent(), Some(40));
    assert!(record.flags().is_sale);
}

#[tokio::test]
async fn cap_stops_mid_second_page() {
    let fetcher = Arc::new(linked_listing(3, 4));

    let (session, report) = run(fast_config().with_max_products(5), Arc::clone(&fetcher)).await;

    assert_eq!(session.aggregator().len(), 5);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.stop_reason, Some(StopReason::CapReached));
    assert_eq!(fetcher.calls(&listing_url(3)), 0);
}

#[tokio::test]
async fn cap_prevents_detail_fetches_beyond_limit() {
    let mut fetcher = linked_listing(1, 4);
    for i in 0..4 {
        let id = format!("{}", 100 + i);
        fetcher = fetcher.with_page(detail_url(&id), detail_page("Canvas"));
    }
    let fetcher = Arc::new(fetcher);

    let config = fast_config().with_max_products(2).with_fetch_details(true);
    let (session, _) = run(config, Arc::clone(&fetcher)).await;

    assert_eq!(session.aggregator().len(), 2);
    assert_eq!(fetcher.calls(&detail_url("100")), 1);
    assert_eq!(fetcher.calls(&detail_url("101")), 1);
    assert_eq!(fetcher.calls(&detail_url("102")), 0);
}

#[tokio::test]
async fn detail_timeout_keeps_listing_record() {
    let url = detail_url("5");
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_page(listing_url(1), listing_page(&[card("5", "$20.00", None)], None))
            .with_error(url.clone(), FetchError::Timeout { url: url.clone() }),
    );

    let config = fast_config().with_fetch_details(true).with_max_attempts(3);
    let (session, report) = run(config, Arc::clone(&fetcher)).await;

    let record = &session.aggregator().records()[0];
    assert_eq!(record.id(), "5");
    assert_eq!(record.title(), "Bag 5");
    assert!(record.specs().is_empty());
    assert_eq!(report.enrichment_failures, 1);
    assert_eq!(fetcher.calls(&url), 3);
}

#[tokio::test]
async fn detail_values_win_over_listing_values() {
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_page(listing_url(1), listing_page(&[card("9", "$20.00", None)], None))
            .with_page(detail_url("9"), detail_page("100% Polyurethane")),
    );

    let (session, report) = run(fast_config().with_fetch_details(true), fetcher).await;

    let record = &session.aggregator().records()[0];
    assert_eq!(record.title(), "Detail Title");
    assert_eq!(record.material(), Some("100% Polyurethane"));
    assert_eq!(record.highlights(), ["Adjustable strap".to_string()]);
    assert_eq!(record.price_current(), Decimal::new(2000, 2));
    assert_eq!(record.dimensions().count(), 1);
    assert_eq!(report.enrichment_failures, 0);
}

#[tokio::test]
async fn known_duplicates_are_not_enriched() {
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_page(
                listing_url(1),
                listing_page(&[card("3", "$20.00", None), card("3", "$20.00", None)], None),
            )
            .with_page(detail_url("3"), detail_page("Canvas")),
    );

    let (session, report) = run(fast_config().with_fetch_details(true), Arc::clone(&fetcher)).await;

    assert_eq!(session.aggregator().len(), 1);
    assert_eq!(report.duplicates_skipped, 1);
    assert_eq!(fetcher.calls(&detail_url("3")), 1);
}

#[tokio::test]
async fn unavailable_page_keeps_collected_records() {
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_page(listing_url(1), listing_page(&[card("1", "$5.00", None)], Some(2)))
            .with_error(
                listing_url(2),
                FetchError::Status {
                    code: 429,
                    url: listing_url(2),
                },
            ),
    );

    let (session, report) = run(fast_config().with_max_attempts(2), Arc::clone(&fetcher)).await;

    assert_eq!(session.aggregator().len(), 1);
    assert_eq!(fetcher.calls(&listing_url(2)), 2);
    assert_eq!(report.stop_reason, Some(StopReason::PageUnavailable { url: listing_url(2) }));
    assert_eq!(report.warnings.len(), 1);
}

#[tokio::test]
async fn setup_failure_aborts_the_session() {
    let fetcher = Arc::new(FakeFetcher::new().with_error(listing_url(1), FetchError::setup("no TLS backend")));

    let mut session = HarvestSession::new(fast_config(), fetcher, &SelectorConfig::default()).unwrap();
    let result = session.run().await;

    assert!(matches!(result, Err(HarvestError::SessionSetup(message)) if message.contains("no TLS backend")));
    assert!(session.aggregator().is_empty());
}

#[tokio::test]
async fn page_without_cards_ends_pagination() {
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_page(listing_url(1), listing_page(&[card("1", "$5.00", None)], Some(2)))
            .with_page(listing_url(2), "<html><body><p>No results</p></body></html>"),
    );

    let (session, report) = run(fast_config(), fetcher).await;

    assert_eq!(session.aggregator().len(), 1);
    assert_eq!(report.stop_reason, Some(StopReason::EmptyPage));
}

#[tokio::test]
async fn next_link_back_to_visited_page_stops() {
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_page(listing_url(1), listing_page(&[card("1", "$5.00", None)], Some(2)))
            .with_page(listing_url(2), listing_page(&[card("2", "$5.00", None)], Some(1))),
    );

    let (_, report) = run(fast_config(), Arc::clone(&fetcher)).await;

    assert_eq!(report.records, 2);
    assert_eq!(report.stop_reason, Some(StopReason::LoopDetected { url: listing_url(1) }));
    assert_eq!(fetcher.calls(&listing_url(1)), 1);
}

#[tokio::test]
async fn page_limit_is_honoured() {
    let fetcher = Arc::new(linked_listing(3, 2));

    let (session, report) = run(fast_config().with_max_pages(Some(2)), fetcher).await;

    assert_eq!(session.aggregator().len(), 4);
    assert_eq!(report.stop_reason, Some(StopReason::PageLimit));
}

#[tokio::test]
async fn output_ids_are_unique_and_images_bounded() {
    let mut cards: Vec<String> = (0..6).map(|i| card(&i.to_string(), "$5.00", None)).collect();
    cards.extend((0..6).map(|i| card(&i.to_string(), "$5.00", None)));
    let fetcher = Arc::new(FakeFetcher::new().with_page(listing_url(1), listing_page(&cards, None)));

    let (session, _) = run(fast_config(), fetcher).await;

    let records = session.into_records();
    let ids: HashSet<&str> = records.iter().map(|r| r.id()).collect();
    assert_eq!(ids.len(), records.len());
    assert!(records.iter().all(|r| r.images().len() <= 10));
}

#[tokio::test(start_paused = true)]
async fn every_fetch_is_paced() {
    let fetcher = Arc::new(linked_listing(2, 1));
    let config = SessionConfig::new(listing_url(1)).with_delays(Duration::from_secs(2), Duration::from_secs(2));

    let started = tokio::time::Instant::now();
    let (_, report) = run(config, fetcher).await;

    assert_eq!(report.pages_fetched, 2);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(4));
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn bare_card_is_emitted_with_defaults() {
    let bare = r#"<div data-test="@web/site-top-of-funnel/ProductCardWrapper" data-tcin="88">
            <a href="/p/plain-tote/-/A-88" aria-label="Plain Tote"></a>
        </div>"#
        .to_string();
    let fetcher = Arc::new(FakeFetcher::new().with_page(listing_url(1), listing_page(&[bare], None)));

    let (session, report) = run(fast_config(), fetcher).await;

    assert_eq!(report.invalid_cards_skipped, 0);
    let record = &session.aggregator().records()[0];
    assert_eq!(record.id(), "88");
    assert_eq!(record.title(), "Plain Tote");
    assert_eq!(record.brand(), "");
    assert_eq!(record.price_current(), Decimal::ZERO);
    assert_eq!(record.price_regular(), None);
    assert_eq!(record.discount_amount(), None);
    assert_eq!(record.discount_percent(), None);
    assert!(record.images().is_empty());
    assert!(record.flags().in_stock);
}

#[tokio::test]
async fn session_runs_on_a_spawned_task() {
    let fetcher = Arc::new(linked_listing(2, 3));
    let session = HarvestSession::new(fast_config(), fetcher, &SelectorConfig::default()).unwrap();

    let handle = tokio::spawn(async move {
        let mut session = session;
        let report = session.run().await?;
        Ok::<_, HarvestError>((report, session.into_records()))
    });
    let (report, records) = handle.await.unwrap().unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(records.len(), 6);
}
