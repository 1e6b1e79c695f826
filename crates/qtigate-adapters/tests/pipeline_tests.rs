//! End-to-end pipeline runs against the in-memory adapters.

use std::sync::Arc;

use qtigate_adapters::{InMemoryContentService, StaticFetcher};
use qtigate_core::{
    application::{
        ItemStrategy, ReachabilityOptions, ValidationPipeline, ports::FetchResponse,
    },
    domain::{RootTag, ValidationContext, ValidationError},
};

fn item(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<qti-assessment-item identifier="item-7" title="Fractions">
<qti-item-body>
{body}
</qti-item-body>
</qti-assessment-item>"#
    )
}

fn stimulus(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<qti-assessment-stimulus identifier="stim-7" title="Passage">
<qti-stimulus-body>
{body}
</qti-stimulus-body>
</qti-assessment-stimulus>"#
    )
}

fn pipeline(fetcher: &StaticFetcher, service: &InMemoryContentService) -> ValidationPipeline {
    ValidationPipeline::builder()
        .with_reachability(Arc::new(fetcher.clone()), ReachabilityOptions::default())
        .with_ground_truth(Arc::new(service.clone()), ItemStrategy::RoundTrip)
        .build()
}

#[tokio::test]
async fn clean_item_passes_every_pass() {
    let fetcher = StaticFetcher::new().with("https://cdn.test/a.png", FetchResponse::new(200));
    let service = InMemoryContentService::new();
    let xml = item(r#"<p>Look: <img src="https://cdn.test/a.png" alt="a"/></p>"#);
    let ctx = ValidationContext::new("tmp-item", RootTag::Item, "Fractions");

    let result = pipeline(&fetcher, &service).run(&xml, &ctx).await;

    assert!(result.is_valid(), "{:?}", result.errors());
    assert_eq!(result.xml(), xml);
    assert_eq!(
        service.calls(),
        vec![
            "update_item:tmp-item",
            "create_item:tmp-item",
            "delete_item:tmp-item"
        ]
    );
    assert!(service.is_empty());
}

#[tokio::test]
async fn content_and_network_errors_are_collected_together() {
    let fetcher = StaticFetcher::new()
        .with("https://cdn.test/pic.svg", FetchResponse::new(200));
    let service = InMemoryContentService::rejecting("schema violation");
    let xml = item(r#"<p>Solve \frac{1}{2} <img src="https://cdn.test/pic.png"/></p>"#);
    let ctx = ValidationContext::new("tmp-item", RootTag::Item, "Fractions");

    let result = pipeline(&fetcher, &service).run(&xml, &ctx).await;
    let errors = result.errors();

    assert!(errors.iter().any(|e| matches!(e, ValidationError::LatexCommand { .. })));
    let broken = errors.iter().find_map(|e| match e {
        ValidationError::BrokenImages { images } => Some(images),
        _ => None,
    });
    let broken = broken.expect("broken image reported");
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].status, 404);
    assert_eq!(broken[0].suggestion.as_deref(), Some("https://cdn.test/pic.svg"));
    assert!(errors.iter().any(|e| matches!(
        e,
        ValidationError::GroundTruthRejected { kind: "item", .. }
    )));
}

#[tokio::test]
async fn stimulus_round_trip_cleans_up_existing_record() {
    let fetcher = StaticFetcher::new();
    let service = InMemoryContentService::new().with_stimulus("tmp-stim", "old", "<p>old</p>");
    let xml = stimulus("<p>A short passage.</p>");
    let ctx = ValidationContext::new("tmp-stim", RootTag::Stimulus, "Passage");

    let result = pipeline(&fetcher, &service).run(&xml, &ctx).await;

    assert!(result.is_valid(), "{:?}", result.errors());
    assert_eq!(
        service.calls(),
        vec!["update_stimulus:tmp-stim", "delete_stimulus:tmp-stim"]
    );
    assert!(service.is_empty());
}

#[tokio::test]
async fn cleanup_failure_does_not_fail_validation() {
    let fetcher = StaticFetcher::new();
    let service = InMemoryContentService::new().with_failing_deletes();
    let xml = stimulus("<p>A short passage.</p>");
    let ctx = ValidationContext::new("tmp-stim", RootTag::Stimulus, "Passage");

    let result = pipeline(&fetcher, &service).run(&xml, &ctx).await;

    assert!(result.is_valid(), "{:?}", result.errors());
    assert_eq!(service.calls().last().map(String::as_str), Some("delete_stimulus:tmp-stim"));
}

#[tokio::test]
async fn invalid_context_skips_network_passes() {
    let fetcher = StaticFetcher::new();
    let service = InMemoryContentService::new();
    let xml = item(r#"<p><img src="https://cdn.test/a.png"/></p>"#);
    let ctx = ValidationContext::new("bad id", RootTag::Item, "Fractions");

    let result = pipeline(&fetcher, &service).run(&xml, &ctx).await;

    assert!(matches!(
        result.errors().first(),
        Some(ValidationError::InvalidContext { .. })
    ));
    assert!(fetcher.requested().is_empty());
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn oracle_strategy_submits_declared_identifier() {
    let service = InMemoryContentService::new();
    let pipeline = ValidationPipeline::builder()
        .with_ground_truth(Arc::new(service.clone()), ItemStrategy::Oracle)
        .build();
    let xml = item("<p>No images here.</p>");
    let ctx = ValidationContext::new("tmp-item", RootTag::Item, "Fractions");

    let result = pipeline.run(&xml, &ctx).await;

    assert!(result.is_valid(), "{:?}", result.errors());
    assert_eq!(service.calls(), vec!["validate_item:item-7"]);
}
