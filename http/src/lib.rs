//! # Karman HTTP
//!
//! [`Strategy`](karman_core::Strategy) implementations on top of `reqwest`.
//!
//! - [`FetchStrategy`] (`"fetch"`): returns status, headers and the unparsed
//!   body; the default success hook parses it as JSON
//! - [`JsonStrategy`] (`"json"`): parses the body itself and returns
//!   structured data
//!
//! Both send body fields as a JSON object, stream responses with a size limit
//! and report HTTP error statuses as [`TransportError::Status`](karman_core::TransportError::Status).
//!
//! ## Example
//!
//! ```ignore
//! use karman_http::{FetchStrategy, HttpStrategyConfig};
//!
//! let fetch = FetchStrategy::new(HttpStrategyConfig::default().with_timeout(Duration::from_secs(10)))?;
//! let karman = Karman::builder(root).strategy("fetch", Arc::new(fetch)).build()?;
//! ```

mod config;
mod error;
mod strategy;
mod transport;

pub use config::HttpStrategyConfig;
pub use error::HttpError;
pub use strategy::{FetchStrategy, JsonStrategy};
