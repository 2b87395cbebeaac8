//! Integration tests for calls driven through the pipe chain
//!
//! Uses the fake-store fixtures with a scripted strategy standing in for the
//! network.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use karman_core::definition::{EndpointDef, Namespace};
use karman_core::error::{DefinitionError, ErrorKind, FailureReason, KarmanError, TransportError};
use karman_core::hook::{BeforeRequestHook, ErrorHook, FinallyHook, SuccessHook};
use karman_core::payload::{FieldSpec, Payload};
use karman_core::rule::RuleSpec;
use karman_runtime::{Flow, Karman, KarmanConfig, PipeDetail, Stage, StageExtension, StageFuture, StageKind};
use karman_testing::fixtures::{fake_store, sample_product};
use karman_testing::{MockReply, MockStrategy};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("payload must be an object, got {other}"),
    }
}

fn fake_store_client(mock: &MockStrategy) -> Karman {
    Karman::builder(fake_store())
        .strategy("fetch", Arc::new(mock.clone()))
        .build()
        .unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct Rating {
    rate: f64,
    count: i64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Product {
    id: i64,
    title: String,
    price: f64,
    rating: Rating,
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn missing_required_field_fails_without_dispatch() {
    let mock = MockStrategy::body();
    let karman = fake_store_client(&mock);

    let error = karman
        .call("login", payload(json!({ "username": "johnd" })))
        .await
        .unwrap_err();

    let failures = error.validation_errors().expect("validation error");
    assert_eq!(failures.fields(), vec!["password"]);
    assert_eq!(failures.field("password").unwrap().reason, FailureReason::Required);
    assert_eq!(mock.dispatch_count(), 0);
}

#[tokio::test]
async fn every_failing_field_is_reported() {
    let mock = MockStrategy::body();
    let karman = fake_store_client(&mock);

    let error = karman.call("login", Payload::new()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::PayloadValidation);
    let mut fields = error.validation_errors().unwrap().fields();
    fields.sort_unstable();
    assert_eq!(fields, vec!["password", "username"]);
}

#[tokio::test]
async fn length_and_value_bounds_are_enforced() {
    let mock = MockStrategy::body();
    let karman = fake_store_client(&mock);

    let error = karman
        .call("login", payload(json!({ "username": "", "password": "m38rmF$" })))
        .await
        .unwrap_err();
    assert!(matches!(
        error.validation_errors().unwrap().field("username").unwrap().reason,
        FailureReason::BelowMin { .. }
    ));

    let error = karman
        .call(
            "product.create",
            payload(json!({
                "title": "Lamp",
                "price": -1,
                "description": "A lamp",
                "image": "lamp.png",
                "category": "home"
            })),
        )
        .await
        .unwrap_err();
    let failures = error.validation_errors().unwrap();
    assert_eq!(failures.fields(), vec!["price"]);
    assert_eq!(mock.dispatch_count(), 0);
}

#[tokio::test]
async fn validation_can_be_disabled_by_configuration() {
    let mock = MockStrategy::body();
    mock.respond_json(json!({ "token": "abc" }));
    let karman = Karman::builder(fake_store())
        .config(KarmanConfig::default().with_validation(false))
        .strategy("fetch", Arc::new(mock.clone()))
        .build()
        .unwrap();

    let token = karman
        .call("login", payload(json!({ "username": "" })))
        .await
        .unwrap();
    assert_eq!(token, json!({ "token": "abc" }));
    assert_eq!(mock.dispatch_count(), 1);
}

// ============================================================================
// Request assembly
// ============================================================================

#[tokio::test]
async fn path_fields_fill_slots_in_index_order() {
    let mock = MockStrategy::body();
    mock.respond_json(sample_product(42));
    let karman = fake_store_client(&mock);

    karman
        .call("product.getById", payload(json!({ "id": 42 })))
        .await
        .unwrap();
    let request = mock.last_request().unwrap();
    assert_eq!(request.url, "https://fakestoreapi.com/products/42");
    assert_eq!(request.method.as_str(), "GET");

    let root = Namespace::new("https://api.example.com").route(
        "shop",
        Namespace::new("shops").api(
            "order",
            EndpointDef::get("orders")
                .field(FieldSpec::path("order", 1).rule(RuleSpec::string().required()))
                .field(FieldSpec::path("shop", 0).rule(RuleSpec::string().required())),
        ),
    );
    let mock = MockStrategy::structured();
    mock.respond_json(json!({}));
    let karman = Karman::builder(root)
        .strategy("fetch", Arc::new(mock.clone()))
        .build()
        .unwrap();
    karman
        .call(&["shop", "order"], payload(json!({ "order": "o 1", "shop": "s1" })))
        .await
        .unwrap();
    assert_eq!(
        mock.last_request().unwrap().url,
        "https://api.example.com/shops/orders/s1/o%201"
    );
}

#[tokio::test]
async fn body_query_and_headers_are_partitioned() {
    let root = Namespace::new("https://api.example.com")
        .header("accept", "application/json")
        .api(
            "search",
            EndpointDef::post("search")
                .field(FieldSpec::query("tag"))
                .field(FieldSpec::header("x-trace"))
                .field(FieldSpec::body("text").rule(RuleSpec::string().required())),
        );
    let mock = MockStrategy::structured();
    mock.respond_json(json!([]));
    let karman = Karman::builder(root)
        .config(KarmanConfig::default().with_default_header("user-agent", "karman-tests"))
        .strategy("fetch", Arc::new(mock.clone()))
        .build()
        .unwrap();

    karman
        .call(
            "search",
            payload(json!({ "tag": ["a", "b"], "x-trace": 7, "text": "lamp", "ignored": true })),
        )
        .await
        .unwrap();

    let request = mock.last_request().unwrap();
    assert_eq!(request.full_url(), "https://api.example.com/search?tag=a&tag=b");
    assert_eq!(request.headers.get("x-trace").map(String::as_str), Some("7"));
    assert_eq!(request.headers.get("accept").map(String::as_str), Some("application/json"));
    assert_eq!(request.headers.get("user-agent").map(String::as_str), Some("karman-tests"));
    assert_eq!(request.body, Some(payload(json!({ "text": "lamp" }))));
}

#[tokio::test]
async fn get_all_defaults_limit_when_absent() {
    let mock = MockStrategy::body();
    mock.respond_json(json!([])).respond_json(json!([]));
    let karman = fake_store_client(&mock);

    karman.call("product.getAll", Payload::new()).await.unwrap();
    assert_eq!(mock.last_request().unwrap().query_value("limit"), Some("10"));

    karman
        .call("product.getAll", payload(json!({ "limit": 5 })))
        .await
        .unwrap();
    assert_eq!(mock.last_request().unwrap().query_value("limit"), Some("5"));
}

// ============================================================================
// Response shaping
// ============================================================================

#[tokio::test]
async fn undeclared_response_fields_are_pruned() {
    let mock = MockStrategy::body();
    mock.respond_json(sample_product(1));
    let karman = fake_store_client(&mock);

    let product = karman
        .call("product.getById", payload(json!({ "id": 1 })))
        .await
        .unwrap();
    assert!(product.get("internal_sku").is_none());
    assert_eq!(product["rating"], json!({ "rate": 4.1, "count": 120 }));
    assert_eq!(product["title"], json!("Product 1"));
}

#[tokio::test]
async fn array_dto_shapes_every_element() {
    let mock = MockStrategy::body();
    mock.respond_json(json!([sample_product(1), { "id": 2 }]));
    let karman = fake_store_client(&mock);

    let products = karman.call("product.getAll", Payload::new()).await.unwrap();
    let products = products.as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert!(products[0].get("internal_sku").is_none());
    assert_eq!(products[1]["title"], json!(""));
    assert_eq!(products[1]["rating"], json!({ "rate": 0, "count": 0 }));
}

#[tokio::test]
async fn non_array_for_array_dto_is_a_shape_error() {
    let mock = MockStrategy::body();
    mock.respond_json(json!({ "id": 1 }));
    let karman = fake_store_client(&mock);

    let error = karman.call("product.getAll", Payload::new()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::DtoShape);
}

#[tokio::test]
async fn missing_dto_passes_the_response_through() {
    let mock = MockStrategy::body();
    mock.respond_json(json!({ "token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9", "extra": 1 }));
    let karman = fake_store_client(&mock);

    let response = karman
        .call("login", payload(json!({ "username": "johnd", "password": "m38rmF$" })))
        .await
        .unwrap();
    assert_eq!(response["extra"], json!(1));
}

#[tokio::test]
async fn call_as_decodes_into_caller_types() {
    let mock = MockStrategy::body();
    mock.respond_json(sample_product(3)).respond_json(json!(["a"]));
    let karman = fake_store_client(&mock);

    let endpoint = karman.endpoint("product.getById").unwrap();
    let product: Product = endpoint.call_as(payload(json!({ "id": 3 }))).await.unwrap();
    assert_eq!(product.id, 3);
    assert_eq!(product.rating, Rating { rate: 4.1, count: 120 });
    assert!((product.price - 9.5).abs() < f64::EPSILON);
    assert_eq!(product.title, "Product 3");

    let categories = karman.endpoint("product.getCategories").unwrap();
    let error = categories.call_as::<Vec<i64>>(Payload::new()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn structured_strategies_pass_results_through_by_default() {
    let root = Namespace::new("https://api.example.com").api("ping", EndpointDef::get("ping"));
    let mock = MockStrategy::structured();
    mock.respond_json(json!({ "pong": true }));
    let karman = Karman::builder(root)
        .config(KarmanConfig::default().with_default_strategy("memory"))
        .strategy("memory", Arc::new(mock.clone()))
        .build()
        .unwrap();

    assert_eq!(karman.call("ping", Payload::new()).await.unwrap(), json!({ "pong": true }));
}

#[tokio::test]
async fn strategy_default_success_hook_can_be_replaced() {
    let root = Namespace::new("https://api.example.com").api("ping", EndpointDef::get("ping"));
    let mock = MockStrategy::body();
    mock.push_reply(MockReply::Body {
        status: 200,
        body: b"pong".to_vec(),
    });
    let karman = Karman::builder(root)
        .strategy_with_success_hook("fetch", Arc::new(mock.clone()), SuccessHook::identity())
        .build()
        .unwrap();

    assert_eq!(karman.call("ping", Payload::new()).await.unwrap(), json!("pong"));
}

// ============================================================================
// Failures and hooks
// ============================================================================

#[tokio::test]
async fn unknown_endpoint_fails_with_definition_not_found() {
    let mock = MockStrategy::body();
    let karman = fake_store_client(&mock);

    let error = karman.call("product.nope", Payload::new()).await.unwrap_err();
    assert!(matches!(error, KarmanError::DefinitionNotFound { ref path } if path == "product.nope"));
    assert!(karman.endpoint(&["cart", "getAll"]).is_err());
    assert!(karman.endpoints().contains(&"product.getAll"));
}

#[tokio::test]
async fn unknown_strategy_fails_the_build() {
    let error = Karman::builder(fake_store()).build().unwrap_err();
    assert!(matches!(error, DefinitionError::UnknownStrategy { ref strategy, .. } if strategy == "fetch"));
}

#[tokio::test]
async fn transport_errors_reach_the_caller() {
    let mock = MockStrategy::body();
    mock.fail(TransportError::Status {
        status: 404,
        body: "not found".to_string(),
    });
    let karman = fake_store_client(&mock);

    let error = karman
        .call("product.getById", payload(json!({ "id": 999 })))
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        KarmanError::Transport(TransportError::Status {
            status: 404,
            body: "not found".to_string()
        })
        .to_string()
    );
    assert_eq!(error.kind(), ErrorKind::Transport);
}

fn hooked_root(counter: &Arc<AtomicUsize>, finally: &Arc<AtomicUsize>) -> Namespace {
    let successes = Arc::clone(counter);
    let finals = Arc::clone(finally);
    Namespace::new("https://api.example.com")
        .on_finally(FinallyHook::sync(move || {
            finals.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .on_success(SuccessHook::sync(move |raw| {
            successes.fetch_add(1, Ordering::SeqCst);
            match raw {
                karman_core::request::RawResult::Structured(value) => Ok(value),
                karman_core::request::RawResult::Body { body, .. } => Ok(serde_json::from_slice(&body)?),
            }
        }))
        .api("item", EndpointDef::get("item"))
        .api(
            "recovering",
            EndpointDef::get("item").on_error(ErrorHook::sync(|error| match error.kind() {
                ErrorKind::Transport => Some(json!({ "fallback": true })),
                _ => None,
            })),
        )
        .api(
            "failingHook",
            EndpointDef::get("item").on_before_request(BeforeRequestHook::sync(|_, _| {
                Err(anyhow::anyhow!("token expired"))
            })),
        )
}

#[tokio::test]
async fn before_request_hook_failure_stops_the_call() {
    let successes = Arc::new(AtomicUsize::new(0));
    let finals = Arc::new(AtomicUsize::new(0));
    let mock = MockStrategy::structured();
    let karman = Karman::builder(hooked_root(&successes, &finals))
        .strategy("fetch", Arc::new(mock.clone()))
        .build()
        .unwrap();

    let error = karman.call("failingHook", Payload::new()).await.unwrap_err();
    assert!(matches!(error, KarmanError::Hook { ref stage, .. } if stage == "onBeforeRequest"));
    assert!(error.to_string().contains("token expired"));
    assert_eq!(mock.dispatch_count(), 0);
    assert_eq!(successes.load(Ordering::SeqCst), 0);
    assert_eq!(finals.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn on_error_can_recover_and_on_finally_always_runs() {
    let successes = Arc::new(AtomicUsize::new(0));
    let finals = Arc::new(AtomicUsize::new(0));
    let mock = MockStrategy::structured();
    mock.fail(TransportError::Network("connection reset".to_string()))
        .fail(TransportError::Network("connection reset".to_string()))
        .respond_json(json!({ "id": 1 }));
    let karman = Karman::builder(hooked_root(&successes, &finals))
        .strategy("fetch", Arc::new(mock.clone()))
        .build()
        .unwrap();

    let recovered = karman.call("recovering", Payload::new()).await.unwrap();
    assert_eq!(recovered, json!({ "fallback": true }));

    let error = karman.call("item", Payload::new()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Transport);

    let item = karman.call("item", Payload::new()).await.unwrap();
    assert_eq!(item, json!({ "id": 1 }));

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(finals.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn success_hook_failure_is_a_hook_error() {
    let mock = MockStrategy::body();
    mock.respond_body(200, "<html>oops</html>");
    let karman = fake_store_client(&mock);

    let error = karman.call("product.getAll", Payload::new()).await.unwrap_err();
    assert!(matches!(error, KarmanError::Hook { ref stage, .. } if stage == "onSuccess"));
}

// ============================================================================
// Custom stages
// ============================================================================

struct CachedCategories;

impl Stage for CachedCategories {
    fn name(&self) -> &str {
        "cache"
    }

    fn run<'a>(&'a self, detail: &'a mut PipeDetail) -> StageFuture<'a> {
        Box::pin(async move {
            if detail.endpoint().path() == "product.getCategories" {
                return Ok(Flow::Settle(json!(["cached"])));
            }
            Ok(Flow::Continue)
        })
    }
}

struct StampHeader;

impl Stage for StampHeader {
    fn name(&self) -> &str {
        "stamp"
    }

    fn run<'a>(&'a self, detail: &'a mut PipeDetail) -> StageFuture<'a> {
        Box::pin(async move {
            let request_id = detail.request_id().to_string();
            if let Some(request) = detail.request.as_mut() {
                request.headers.insert("x-request-id".to_string(), request_id);
            }
            Ok(Flow::Continue)
        })
    }
}

#[tokio::test]
async fn custom_stages_can_settle_early_or_amend_the_request() {
    let mock = MockStrategy::body();
    mock.respond_json(json!(["electronics"]));
    let karman = Karman::builder(fake_store())
        .strategy("fetch", Arc::new(mock.clone()))
        .stage(StageExtension::before(StageKind::Dispatch, CachedCategories))
        .stage(StageExtension::after(StageKind::Build, StampHeader))
        .build()
        .unwrap();

    assert_eq!(
        karman.chain().stage_names(),
        vec!["pre_hook", "build", "stamp", "cache", "dispatch", "success_hook", "project"]
    );

    let cached = karman.call("product.getCategories", Payload::new()).await.unwrap();
    assert_eq!(cached, json!(["cached"]));
    assert_eq!(mock.dispatch_count(), 0);

    karman
        .call("product.getProductsByCategory", payload(json!({ "category": "electronics" })))
        .await
        .unwrap();
    let request = mock.last_request().unwrap();
    assert_eq!(request.url, "https://fakestoreapi.com/products/category/electronics");
    assert_eq!(
        request.headers.get("x-request-id").map(String::as_str),
        Some(request.request_id.to_string().as_str())
    );
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn concurrent_calls_do_not_interfere() {
    let mock = MockStrategy::body();
    mock.with_delay(Duration::from_millis(5))
        .respond_with(|request| {
            let id: i64 = request.url.rsplit('/').next().unwrap().parse().unwrap();
            MockReply::Json(sample_product(id))
        });
    let karman = fake_store_client(&mock);

    let calls = (1..=20).map(|id| {
        let karman = karman.clone();
        tokio::spawn(async move {
            let product = karman
                .call("product.getById", payload(json!({ "id": id })))
                .await
                .unwrap();
            (id, product)
        })
    });

    for call in futures::future::join_all(calls).await {
        let (id, product) = call.unwrap();
        assert_eq!(product["id"], json!(id));
        assert_eq!(product["title"], json!(format!("Product {id}")));
    }
    assert_eq!(mock.dispatch_count(), 20);

    let mut ids: Vec<_> = mock.dispatched().iter().map(|r| r.request_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn payload_hooks_stay_within_their_own_call() {
    let mock = MockStrategy::body();
    mock.with_delay(Duration::from_millis(5))
        .respond_with(|request| match request.endpoint.as_str() {
            "product.getAll" => MockReply::Json(json!([sample_product(1)])),
            "product.getById" => MockReply::Json(sample_product(7)),
            _ => MockReply::Json(json!({ "token": "t" })),
        });
    let karman = fake_store_client(&mock);

    let (all, one, login) = tokio::join!(
        karman.call("product.getAll", Payload::new()),
        karman.call("product.getById", payload(json!({ "id": 7 }))),
        karman.call("login", payload(json!({ "username": "johnd", "password": "m38rmF$" }))),
    );
    assert_eq!(all.unwrap().as_array().unwrap().len(), 1);
    assert_eq!(one.unwrap()["id"], json!(7));
    assert_eq!(login.unwrap()["token"], json!("t"));

    let dispatched = mock.dispatched();
    assert_eq!(dispatched.len(), 3);
    let sent = |endpoint: &str| dispatched.iter().find(|r| r.endpoint == endpoint).unwrap();

    let get_all = sent("product.getAll");
    assert_eq!(get_all.query_value("limit"), Some("10"));
    assert_eq!(get_all.payload.get("limit"), Some(&json!(10)));

    let get_by_id = sent("product.getById");
    assert_eq!(get_by_id.full_url(), "https://fakestoreapi.com/products/7");
    assert_eq!(get_by_id.body, None);
    assert!(!get_by_id.payload.contains_key("limit"));

    let login = sent("login");
    assert_eq!(login.full_url(), "https://fakestoreapi.com/auth/login");
    assert_eq!(
        login.body,
        Some(payload(json!({ "username": "johnd", "password": "m38rmF$" })))
    );
    assert!(!login.payload.contains_key("limit"));
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn explicit_limits_reach_the_query_unchanged(limit in 1i64..10_000) {
            init_tracing();
            let mock = MockStrategy::body();
            mock.respond_with(|_| MockReply::Json(json!([])));
            let karman = fake_store_client(&mock);

            tokio_test::block_on(karman.call("product.getAll", payload(json!({ "limit": limit })))).unwrap();

            let expected = limit.to_string();
            let request = mock.last_request().unwrap();
            prop_assert_eq!(request.query_value("limit"), Some(expected.as_str()));
        }

        #[test]
        fn non_positive_limits_are_rejected(limit in -10_000i64..=-1) {
            let mock = MockStrategy::body();
            let karman = fake_store_client(&mock);

            let error = tokio_test::block_on(karman.call("product.getAll", payload(json!({ "limit": limit }))))
                .unwrap_err();

            prop_assert_eq!(error.kind(), ErrorKind::PayloadValidation);
            prop_assert_eq!(mock.dispatch_count(), 0);
        }
    }
}
