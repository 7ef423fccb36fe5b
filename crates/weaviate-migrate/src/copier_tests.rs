//! Tests for the batch copier.

use super::*;
use crate::config::InstanceConfig;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
        backoff_multiplier: 1.0,
        add_jitter: false,
        fail_fast: false,
    }
}

fn test_copier() -> BatchCopier {
    BatchCopier::new(&MigrationOptions {
        batch_size: 100,
        sleep_between_batches_ms: 0,
        insert_retry: fast_retry(3),
        fetch_retry: fast_retry(3),
        ..MigrationOptions::default()
    })
}

fn client(server: &MockServer) -> WeaviateClient {
    WeaviateClient::new(&InstanceConfig {
        url: server.uri(),
        api_key: None,
    })
}

fn page(class: &str, start: usize, len: usize) -> Value {
    let objects: Vec<Value> = (start..start + len)
        .map(|i| {
            json!({
                "class": class,
                "id": format!("00000000-0000-0000-0000-{:012}", i),
                "properties": {"name": format!("widget-{}", i)},
                "vector": [0.5, 0.25],
                "creationTimeUnix": 1_700_000_000_000u64,
                "lastUpdateTimeUnix": 1_700_000_000_000u64
            })
        })
        .collect();
    json!({ "objects": objects, "totalResults": len })
}

async fn mount_page(server: &MockServer, class: &str, offset: usize, len: usize, expect: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/objects"))
        .and(query_param("class", class))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(class, offset, len)))
        .expect(expect)
        .mount(server)
        .await;
}

#[test]
fn test_copy_stats_merge() {
    let mut total = CopyStats {
        fetched: 10,
        processed: 9,
        failed: 1,
        batches: 1,
    };
    total.merge(&CopyStats {
        fetched: 5,
        processed: 5,
        failed: 0,
        batches: 1,
    });
    assert_eq!(total.fetched, 15);
    assert_eq!(total.processed, 14);
    assert_eq!(total.failed, 1);
    assert_eq!(total.batches, 2);
}

#[tokio::test]
async fn test_copy_250_objects_in_three_pages() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;

    mount_page(&source, "Widgets", 0, 100, 1).await;
    mount_page(&source, "Widgets", 100, 100, 1).await;
    mount_page(&source, "Widgets", 200, 50, 1).await;
    mount_page(&source, "Widgets", 300, 0, 0).await;

    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(200))
        .expect(250)
        .mount(&destination)
        .await;

    let stats = test_copier()
        .copy_class(
            &client(&source),
            "Widgets",
            &client(&destination),
            "Widgets",
            true,
        )
        .await
        .unwrap();

    assert_eq!(stats.fetched, 250);
    assert_eq!(stats.processed, 250);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.batches, 3);
}

#[tokio::test]
async fn test_copy_stops_on_empty_page() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;

    mount_page(&source, "Widgets", 0, 100, 1).await;
    mount_page(&source, "Widgets", 100, 100, 1).await;
    mount_page(&source, "Widgets", 200, 0, 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(200))
        .expect(200)
        .mount(&destination)
        .await;

    let stats = test_copier()
        .copy_class(
            &client(&source),
            "Widgets",
            &client(&destination),
            "Widgets",
            true,
        )
        .await
        .unwrap();

    assert_eq!(stats.processed, 200);
    assert_eq!(stats.batches, 2);
}

#[tokio::test]
async fn test_empty_source_copies_nothing() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;
    mount_page(&source, "Widgets", 0, 0, 1).await;

    let stats = test_copier()
        .copy_class(
            &client(&source),
            "Widgets",
            &client(&destination),
            "Widgets",
            true,
        )
        .await
        .unwrap();

    assert_eq!(stats, CopyStats::default());
}

#[tokio::test]
async fn test_insert_succeeds_on_third_attempt() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;
    mount_page(&source, "Widgets", 0, 1, 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(500).set_body_string("embedding provider timeout"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&destination)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&destination)
        .await;

    let stats = test_copier()
        .copy_class(
            &client(&source),
            "Widgets",
            &client(&destination),
            "Widgets",
            true,
        )
        .await
        .unwrap();

    assert_eq!(stats.processed, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_insert_gives_up_after_three_attempts() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;
    mount_page(&source, "Widgets", 0, 2, 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(503))
        .expect(6)
        .mount(&destination)
        .await;

    let stats = test_copier()
        .copy_class(
            &client(&source),
            "Widgets",
            &client(&destination),
            "Widgets",
            true,
        )
        .await
        .unwrap();

    assert_eq!(stats.processed, 0);
    assert_eq!(stats.failed, 2);
}

#[tokio::test]
async fn test_rejected_insert_is_retried() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;
    mount_page(&source, "Widgets", 0, 1, 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(422).set_body_string("vectorizer: rate limited"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&destination)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&destination)
        .await;

    let stats = test_copier()
        .copy_class(
            &client(&source),
            "Widgets",
            &client(&destination),
            "Widgets",
            true,
        )
        .await
        .unwrap();

    assert_eq!(stats.processed, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_fail_fast_insert_skips_invalid_object() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;
    mount_page(&source, "Widgets", 0, 1, 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid property"))
        .expect(1)
        .mount(&destination)
        .await;

    let copier = BatchCopier::new(&MigrationOptions {
        sleep_between_batches_ms: 0,
        insert_retry: RetryConfig {
            fail_fast: true,
            ..fast_retry(3)
        },
        fetch_retry: fast_retry(3),
        ..MigrationOptions::default()
    });
    let stats = copier
        .copy_class(
            &client(&source),
            "Widgets",
            &client(&destination),
            "Widgets",
            true,
        )
        .await
        .unwrap();

    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn test_fetch_failure_is_bounded() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&source)
        .await;

    let result = test_copier()
        .copy_class(
            &client(&source),
            "Widgets",
            &client(&destination),
            "Widgets",
            true,
        )
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_fetch_retries_same_offset() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/objects"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&source)
        .await;
    mount_page(&source, "Widgets", 0, 3, 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&destination)
        .await;

    let stats = test_copier()
        .copy_class(
            &client(&source),
            "Widgets",
            &client(&destination),
            "Widgets",
            true,
        )
        .await
        .unwrap();

    assert_eq!(stats.processed, 3);
}

#[tokio::test]
async fn test_fetch_retries_truncated_page() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/objects"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"objects": [trunc"#))
        .up_to_n_times(1)
        .expect(1)
        .mount(&source)
        .await;
    mount_page(&source, "Widgets", 0, 2, 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&destination)
        .await;

    let stats = test_copier()
        .copy_class(
            &client(&source),
            "Widgets",
            &client(&destination),
            "Widgets",
            true,
        )
        .await
        .unwrap();

    assert_eq!(stats.fetched, 2);
    assert_eq!(stats.processed, 2);
}

#[tokio::test]
async fn test_fetch_retries_client_error() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not ready"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&source)
        .await;
    mount_page(&source, "Widgets", 0, 1, 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&destination)
        .await;

    let stats = test_copier()
        .copy_class(
            &client(&source),
            "Widgets",
            &client(&destination),
            "Widgets",
            true,
        )
        .await
        .unwrap();

    assert_eq!(stats.processed, 1);
}

#[tokio::test]
async fn test_rewrites_class_and_drops_vector() {
    let source = MockServer::start().await;
    let destination = MockServer::start().await;
    mount_page(&source, "Widgets", 0, 1, 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/objects"))
        .and(body_json(json!({
            "class": "Widgets_temp",
            "id": "00000000-0000-0000-0000-000000000000",
            "properties": {"name": "widget-0"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&destination)
        .await;

    let stats = test_copier()
        .copy_class(
            &client(&source),
            "Widgets",
            &client(&destination),
            "Widgets_temp",
            false,
        )
        .await
        .unwrap();

    assert_eq!(stats.processed, 1);
}
