//! # Karman Testing
//!
//! Testing utilities for Karman API definitions.
//!
//! This crate provides:
//! - [`MockStrategy`]: a scriptable strategy that records what it dispatched
//! - [`fixtures`]: a fake-store API definition used across the test suites
//!
//! ## Example
//!
//! ```ignore
//! use karman_testing::{fixtures, MockStrategy};
//!
//! #[tokio::test]
//! async fn test_get_all() {
//!     let mock = MockStrategy::body();
//!     mock.respond_json(json!([]));
//!
//!     let karman = Karman::builder(fixtures::fake_store())
//!         .strategy("fetch", Arc::new(mock.clone()))
//!         .build()?;
//!
//!     karman.call("product.getAll", Payload::new()).await?;
//!     assert_eq!(mock.last_request().unwrap().query_value("limit"), Some("10"));
//! }
//! ```

pub mod fixtures;
pub mod mock_strategy;

// Re-export commonly used items
pub use mock_strategy::{MockReply, MockStrategy};
