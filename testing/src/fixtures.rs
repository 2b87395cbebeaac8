//! A fake-store API definition
//!
//! Mirrors the public <https://fakestoreapi.com> API: a `login` endpoint on the
//! root and a `product` namespace with the usual CRUD operations. Tests point
//! it at a mock server with [`fake_store_at`].

#![allow(clippy::unwrap_used)] // Declarations below are static and known to be valid

use karman_core::definition::{EndpointDef, Namespace};
use karman_core::dto::{DtoSpec, ObjectSpec, Primitive};
use karman_core::hook::{BeforeRequestHook, SuccessHook};
use karman_core::payload::{FieldSpec, PayloadDef};
use karman_core::rule::{Measurement, RuleSpec};
use serde_json::{json, Value};

/// Base URL of the public fake store
pub const FAKE_STORE_URL: &str = "https://fakestoreapi.com";

/// Page size `product.getAll` falls back to
pub const DEFAULT_LIMIT: i64 = 10;

/// The shape of one product
#[must_use]
pub fn product_info_dto() -> ObjectSpec {
    ObjectSpec::new()
        .field("id", Primitive::Integer)
        .field("title", Primitive::String)
        .field("price", Primitive::Number)
        .field("description", Primitive::String)
        .field("category", Primitive::String)
        .field("image", Primitive::String)
        .field(
            "rating",
            ObjectSpec::new()
                .field("rate", Primitive::Number)
                .field("count", Primitive::Integer),
        )
}

/// `id` as path slot 0
#[must_use]
pub fn id_field() -> FieldSpec {
    FieldSpec::path("id", 0).rule(RuleSpec::integer().required().min(1.0))
}

/// `limit` and `sort` query parameters
#[must_use]
pub fn limit_and_sort() -> PayloadDef {
    PayloadDef::new()
        .field(FieldSpec::query("limit").rule(RuleSpec::integer().min(1.0)))
        .field(FieldSpec::query("sort").rule(RuleSpec::pattern("^(asc|desc)$").unwrap()))
}

/// Product body fields, all required or all optional
#[must_use]
pub fn product_info(required: bool) -> PayloadDef {
    let field = |name: &str, rule: RuleSpec| {
        FieldSpec::body(name).rule(if required { rule.required() } else { rule })
    };
    PayloadDef::new()
        .field(field("title", RuleSpec::string().min(1.0).measure(Measurement::Length)))
        .field(field("price", RuleSpec::number().min(0.0)))
        .field(field("description", RuleSpec::string()))
        .field(field("image", RuleSpec::string()))
        .field(field("category", RuleSpec::string().min(1.0)))
}

/// Fill in `limit` when the caller left it out
#[must_use]
pub fn default_limit_hook() -> BeforeRequestHook {
    BeforeRequestHook::sync(|_context, payload| {
        let missing = match payload.get("limit") {
            None | Some(Value::Null) => true,
            Some(limit) => limit.as_i64() == Some(0),
        };
        if missing {
            payload.insert("limit".to_string(), json!(DEFAULT_LIMIT));
        }
        Ok(())
    })
}

/// The `product` namespace
#[must_use]
pub fn product_namespace() -> Namespace {
    let product = DtoSpec::from(product_info_dto());

    Namespace::new("products")
        .api(
            "getAll",
            EndpointDef::get("")
                .payload(limit_and_sort())
                .dto(DtoSpec::array_of(product.clone()))
                .strategy("fetch")
                .on_before_request(default_limit_hook())
                .on_success(SuccessHook::parse_json()),
        )
        .api("getById", EndpointDef::get("").field(id_field()).dto(product.clone()))
        .api(
            "create",
            EndpointDef::post("").payload(product_info(true)).dto(product.clone()),
        )
        .api(
            "update",
            EndpointDef::put("")
                .payload(PayloadDef::new().field(id_field()).merge(product_info(true)))
                .dto(product.clone()),
        )
        .api(
            "modify",
            EndpointDef::patch("")
                .payload(PayloadDef::new().field(id_field()).merge(product_info(false)))
                .dto(product.clone()),
        )
        .api("delete", EndpointDef::delete("").field(id_field()).dto(product))
        .api(
            "getCategories",
            EndpointDef::get("categories").dto(DtoSpec::array_of(Primitive::String)),
        )
        .api(
            "getProductsByCategory",
            EndpointDef::get("category").field(FieldSpec::path("category", 0).rule(RuleSpec::string().required())),
        )
}

/// The `login` endpoint, declared from JSON the way a config file would
#[must_use]
pub fn login_endpoint() -> EndpointDef {
    let payload = PayloadDef::from_declaration(&json!({
        "username": {
            "body": true,
            "rules": ["string", { "required": true, "min": 1, "measurement": "length" }]
        },
        "password": {
            "body": true,
            "rules": ["string", { "required": true, "min": 1, "measurement": "length" }]
        }
    }))
    .unwrap();

    EndpointDef::post("auth/login").payload(payload).strategy("fetch")
}

/// The fake store rooted at `base_url`
#[must_use]
pub fn fake_store_at(base_url: &str) -> Namespace {
    Namespace::new(base_url)
        .api("login", login_endpoint())
        .route("product", product_namespace())
}

/// The fake store rooted at [`FAKE_STORE_URL`]
#[must_use]
pub fn fake_store() -> Namespace {
    fake_store_at(FAKE_STORE_URL)
}

/// A product as the fake store returns it, with one extra undeclared field
#[must_use]
pub fn sample_product(id: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Product {id}"),
        "price": 9.5,
        "description": "A product",
        "category": "electronics",
        "image": "https://fakestoreapi.com/img/1.jpg",
        "rating": { "rate": 4.1, "count": 120 },
        "internal_sku": format!("SKU-{id}")
    })
}
