//! # Karman Core
//!
//! Declarative HTTP API definitions and the building blocks of their
//! execution.
//!
//! This crate holds everything that does not perform I/O: the definition tree,
//! payload rules and validation, URL templates, DTO projection, hooks and the
//! [`Strategy`](strategy::Strategy) contract that transports implement. The
//! async engine that drives a call lives in `karman-runtime`.
//!
//! ## Core Concepts
//!
//! - **Namespace**: URL segment plus shared defaults, inherited by descendants
//! - **Endpoint**: method, URL segment, payload definition and DTO
//! - **Payload definition**: per-field location (body, query, header, path slot) and rules
//! - **DTO**: the response shape; undeclared fields are pruned
//! - **Strategy**: pluggable dispatch back-end producing a raw result
//! - **Hooks**: `onBeforeRequest`, `onSuccess`, `onError`, `onFinally`
//!
//! ## Example
//!
//! ```
//! use karman_core::definition::{DefinitionTree, EndpointDef, Namespace};
//! use karman_core::dto::{DtoSpec, ObjectSpec, Primitive};
//! use karman_core::payload::FieldSpec;
//! use karman_core::rule::RuleSpec;
//!
//! let product = ObjectSpec::new()
//!     .field("id", Primitive::Integer)
//!     .field("title", Primitive::String);
//!
//! let root = Namespace::new("https://fakestoreapi.com").route(
//!     "product",
//!     Namespace::new("products").api(
//!         "getAll",
//!         EndpointDef::get("")
//!             .field(FieldSpec::query("limit").rule(RuleSpec::integer().min(1.0)))
//!             .dto(DtoSpec::array_of(product)),
//!     ),
//! );
//!
//! let tree = DefinitionTree::build(root)?;
//! assert_eq!(tree.paths(), vec!["product.getAll"]);
//! # Ok::<(), karman_core::error::DefinitionError>(())
//! ```

pub mod definition;
pub mod dto;
pub mod error;
pub mod hook;
pub mod payload;
pub mod request;
pub mod rule;
pub mod strategy;
pub mod url;
pub mod value;

pub use definition::{DefinitionTree, EndpointDef, EndpointPath, Namespace, ResolvedEndpoint};
pub use error::{DefinitionError, ErrorKind, KarmanError, Result, TransportError};
pub use payload::Payload;
pub use request::{Method, RawKind, RawResult, RequestDetail};
pub use serde_json::Value;
pub use strategy::{DispatchFuture, Strategy};
