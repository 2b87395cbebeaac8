//! # Karman Runtime
//!
//! Async execution engine for Karman API definitions.
//!
//! This crate turns a [`Namespace`](karman_core::Namespace) tree into a
//! callable client. Each call is driven through the pipe chain and handed back
//! as a cancellable [`RequestExecutor`].
//!
//! ## Core Components
//!
//! - **Karman**: the client facade; binds endpoints to strategies at build time
//! - **Pipe chain**: `pre_hook → build → dispatch → success_hook → project`, extensible with custom stages
//! - **Request executor**: awaitable, cancellable handle for one call
//! - **Strategy registry**: strategy ids mapped to adapters and their default success hooks
//!
//! ## Example
//!
//! ```ignore
//! use karman_runtime::{Karman, KarmanConfig};
//!
//! let karman = Karman::builder(root)
//!     .config(KarmanConfig::from_env()?)
//!     .strategy("fetch", Arc::new(fetch))
//!     .build()?;
//!
//! let user = karman.endpoint("user.getById")?.call_as::<User>(payload).await?;
//! ```

/// Client facade and endpoint handles
pub mod client;

/// Runtime defaults and environment configuration
pub mod config;

/// Request executors and cancellation
pub mod executor;

/// Call metrics
pub mod metrics;

/// The pipe chain and its stages
pub mod pipe;

/// Strategy registry
pub mod registry;

pub use client::{Endpoint, Karman, KarmanBuilder};
pub use config::{ConfigError, KarmanConfig};
pub use executor::{CancelHandle, CancelReason, CancelSignal, RequestExecutor};
pub use pipe::{Flow, PipeChain, PipeDetail, Stage, StageExtension, StageFuture, StageKind};
pub use registry::StrategyRegistry;
