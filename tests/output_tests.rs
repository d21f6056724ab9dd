//! Session output written through the writers
mod common;

use catalog_harvester::application::{HarvestSession, SessionConfig};
use catalog_harvester::infrastructure::{FetchError, OutputFormat, OutputWriter, SelectorConfig};
use common::{card, listing_page, listing_url, FakeFetcher};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn partial_run_still_writes_every_format() {
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with_page(
                listing_url(1),
                listing_page(&[card("11", "$46.80", Some("$78.00")), card("12", "$9.99", None)], Some(2)),
            )
            .with_error(listing_url(2), FetchError::Timeout { url: listing_url(2) }),
    );
    let config = SessionConfig::new(listing_url(1))
        .with_delays(Duration::ZERO, Duration::ZERO)
        .with_max_attempts(1);

    let mut session = HarvestSession::new(config, fetcher, &SelectorConfig::default()).unwrap();
    session.run().await.unwrap();

    let dir = TempDir::new().unwrap();
    let paths = OutputWriter::new(dir.path(), "products")
        .write_all(
            session.aggregator().records(),
            &[OutputFormat::Json, OutputFormat::Jsonl, OutputFormat::Csv],
        )
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&paths[0]).unwrap()).unwrap();
    assert_eq!(json[0]["id"], "11");
    assert_eq!(json[0]["discountPercent"], 40);
    assert_eq!(json[0]["colors"], serde_json::json!(["Black", "Cognac"]));
    assert!(json[0]["scrapedAt"].as_str().unwrap().ends_with('Z'));

    assert_eq!(fs::read_to_string(&paths[1]).unwrap().lines().count(), 2);

    let mut reader = csv::Reader::from_path(&paths[2]).unwrap();
    let headers = reader.headers().unwrap().clone();
    let colors = headers.iter().position(|h| h == "colors").unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][colors], "Black|Cognac");
}

#[tokio::test]
async fn rerun_overwrites_previous_files() {
    let dir = TempDir::new().unwrap();
    let writer = OutputWriter::new(dir.path(), "products");

    let fetcher = Arc::new(
        FakeFetcher::new().with_page(listing_url(1), listing_page(&[card("1", "$5.00", None), card("2", "$5.00", None)], None)),
    );
    let config = SessionConfig::new(listing_url(1)).with_delays(Duration::ZERO, Duration::ZERO);
    let mut session = HarvestSession::new(config.clone(), fetcher, &SelectorConfig::default()).unwrap();
    session.run().await.unwrap();
    writer.write_jsonl(session.aggregator().records()).await.unwrap();

    let fetcher = Arc::new(FakeFetcher::new().with_page(listing_url(1), listing_page(&[card("3", "$5.00", None)], None)));
    let mut session = HarvestSession::new(config, fetcher, &SelectorConfig::default()).unwrap();
    session.run().await.unwrap();
    let path = writer.write_jsonl(session.aggregator().records()).await.unwrap();

    let content = fs::read_to_string(path).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains(r#""id":"3""#));
}
