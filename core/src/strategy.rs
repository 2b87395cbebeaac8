//! Strategy adapter contract
//!
//! A strategy performs the actual network dispatch of a built
//! [`RequestDetail`]. The engine only depends on this trait; concrete
//! transports live in other crates.
//!
//! # Cancellation
//!
//! Cancellation is cooperative. When a call is cancelled after its
//! `onBeforeRequest` hook has finished and before its dispatch has completed,
//! the engine drops any in-flight dispatch future and then calls
//! [`Strategy::abort`] so adapters with out-of-band resources can release them.
//!
//! # Dyn Compatibility
//!
//! `dispatch` returns an explicit `Pin<Box<dyn Future>>` so strategies can be
//! stored as `Arc<dyn Strategy>` in a registry.

use crate::error::TransportError;
use crate::request::{RawKind, RawResult, RequestDetail};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

/// Future returned by [`Strategy::dispatch`]
pub type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<RawResult, TransportError>> + Send + 'a>>;

/// A pluggable transport back-end
pub trait Strategy: Send + Sync {
    /// The kind of raw result `dispatch` produces
    ///
    /// Selects the default success hook for endpoints using this strategy.
    fn raw_kind(&self) -> RawKind;

    /// Send the request
    ///
    /// Transport failures must be reported through the returned future, never
    /// by panicking.
    fn dispatch<'a>(&'a self, request: &'a RequestDetail) -> DispatchFuture<'a>;

    /// Release resources of a cancelled call
    ///
    /// Any dispatch future has already been dropped when this runs. `request`
    /// is `None` when the call was cancelled before its request was built.
    fn abort(&self, request_id: Uuid, request: Option<&RequestDetail>) {
        let _ = (request_id, request);
    }
}
