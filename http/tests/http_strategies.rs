//! Integration tests for the HTTP strategies against a local mock server

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use karman_core::error::{ErrorKind, KarmanError, TransportError};
use karman_core::payload::Payload;
use karman_http::{FetchStrategy, HttpStrategyConfig, JsonStrategy};
use karman_runtime::Karman;
use karman_testing::fixtures::{fake_store_at, sample_product};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("payload must be an object, got {other}"),
    }
}

fn client(server: &MockServer, config: HttpStrategyConfig) -> Karman {
    Karman::builder(fake_store_at(&server.uri()))
        .strategy("fetch", Arc::new(FetchStrategy::new(config.clone()).unwrap()))
        .strategy("json", Arc::new(JsonStrategy::new(config).unwrap()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn fetch_sends_query_and_shapes_the_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([sample_product(1), sample_product(2)])))
        .expect(1)
        .mount(&server)
        .await;

    let karman = client(&server, HttpStrategyConfig::default());
    let products = karman.call("product.getAll", Payload::new()).await.unwrap();

    let products = products.as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[1]["id"], json!(2));
    assert!(products[0].get("internal_sku").is_none());
}

#[tokio::test]
async fn fetch_sends_body_fields_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "username": "mor_2314", "password": "83r5^_" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "t0k3n" })))
        .expect(1)
        .mount(&server)
        .await;

    let karman = client(&server, HttpStrategyConfig::default());
    let login = karman
        .call("login", payload(json!({ "username": "mor_2314", "password": "83r5^_" })))
        .await
        .unwrap();
    assert_eq!(login, json!({ "token": "t0k3n" }));
}

#[tokio::test]
async fn error_statuses_become_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/products/7"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such product"))
        .mount(&server)
        .await;

    let karman = client(&server, HttpStrategyConfig::default());
    let error = karman
        .call("product.delete", payload(json!({ "id": 7 })))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        KarmanError::Transport(TransportError::Status { status: 404, ref body }) if body == "no such product"
    ));
}

#[tokio::test]
async fn oversized_responses_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["a".repeat(256)])))
        .mount(&server)
        .await;

    let karman = client(&server, HttpStrategyConfig::default().with_max_response_bytes(64));
    let error = karman.call("product.getCategories", Payload::new()).await.unwrap_err();
    assert!(matches!(error, KarmanError::Transport(TransportError::Protocol(_))));
}

#[tokio::test]
async fn client_timeout_maps_to_transport_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/1"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let karman = client(&server, HttpStrategyConfig::default().with_timeout(Duration::from_millis(100)));
    let error = karman
        .call("product.getById", payload(json!({ "id": 1 })))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Transport);
    assert!(matches!(error, KarmanError::Transport(TransportError::Timeout { .. })));
}

#[tokio::test]
async fn json_strategy_returns_structured_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .and(header("x-client", "karman"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "load": 0.2 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let root = karman_core::Namespace::new(server.uri())
        .strategy("json")
        .header("x-client", "karman")
        .api("status", karman_core::EndpointDef::get("status"))
        .api("empty", karman_core::EndpointDef::get("empty"));
    let karman = Karman::builder(root)
        .strategy("json", Arc::new(JsonStrategy::new(HttpStrategyConfig::default()).unwrap()))
        .build()
        .unwrap();

    let status = karman.call("status", Payload::new()).await.unwrap();
    assert_eq!(status, json!({ "ok": true, "load": 0.2 }));
    assert_eq!(karman.call("empty", Payload::new()).await.unwrap(), Value::Null);
}

#[tokio::test]
async fn cancelling_drops_the_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/3"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let karman = client(&server, HttpStrategyConfig::default());
    let executor = karman.call("product.getById", payload(json!({ "id": 3 })));
    let cancel = executor.cancel_handle();
    let call = tokio::spawn(executor);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(cancel.cancel());
    let error = call.await.unwrap().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Cancelled);
}
