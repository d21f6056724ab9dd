//! Listing and detail extraction throughput
//!
//! A 24-card listing page is parsed and normalized per iteration, the size
//! of one real category page.

use catalog_harvester::domain::RecordNormalizer;
use catalog_harvester::infrastructure::parsing::{
    DetailParseContext, ParseContext, ProductDetailParser, ProductListParser,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const PAGE_URL: &str = "https://www.target.com/c/handbags/-/N-5xtbo";

fn listing_page(cards: usize) -> String {
    let cards: String = (0..cards)
        .map(|i| {
            format!(
                r#"<div data-test="@web/site-top-of-funnel/ProductCardWrapper">
                    <a data-test="@web/ProductCard/title" href="/p/bag-{i}/-/A-{i}">Bag {i}</a>
                    <span data-test="current-price"><span>$46.80</span></span>
                    <span data-test="comparison-price">reg $78.00</span>
                    <span aria-label="4.5 out of 5 stars with 53 ratings">53</span>
                    <span data-test="@web/ProductCard/ProductCardSwatches" aria-label="Black, Cognac"></span>
                    <picture><img src="https://target.scene7.com/is/image/Target/GUEST_{i}"></picture>
                    <span data-test="badge">Sale</span>
                </div>"#
            )
        })
        .collect();
    format!(r#"<html><body><section>{cards}</section><button data-test="next">next</button></body></html>"#)
}

const DETAIL_PAGE: &str = r#"<html><head>
    <script type="application/ld+json">{"name": "Crossbody Bag", "offers": {"price": 46.8}}</script>
    </head><body>
    <div id="PdpHighlightsSection"><ul><li>Adjustable strap</li><li>Zip closure</li></ul></div>
    <div data-test="item-details-specifications">
        <div><b>Dimensions (Overall):</b> 9 Inches (H) x 11 Inches (W)</div>
        <div><b>Material:</b> 100% Polyurethane</div>
    </div></body></html>"#;

fn bench_listing(c: &mut Criterion) {
    let parser = ProductListParser::new().unwrap();
    let normalizer = RecordNormalizer::new("target.scene7.com");
    let content = listing_page(24);
    let context = ParseContext::new(1, PAGE_URL);

    c.bench_function("parse_listing_24_cards", |b| {
        b.iter(|| {
            let listing = parser.parse_page(black_box(&content), &context).unwrap();
            listing.cards.iter().map(|card| normalizer.normalize(card)).count()
        })
    });
}

fn bench_detail(c: &mut Criterion) {
    let parser = ProductDetailParser::new().unwrap();
    let context = DetailParseContext::new("https://www.target.com/p/bag/-/A-1");

    c.bench_function("parse_detail_page", |b| {
        b.iter(|| parser.parse_page(black_box(DETAIL_PAGE), &context).unwrap())
    });
}

criterion_group!(benches, bench_listing, bench_detail);
criterion_main!(benches);
