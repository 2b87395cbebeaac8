//! The `fetch` and `json` strategies

use crate::config::HttpStrategyConfig;
use crate::error::HttpError;
use crate::transport::HttpTransport;
use karman_core::error::TransportError;
use karman_core::request::{RawKind, RawResult, RequestDetail};
use karman_core::strategy::{DispatchFuture, Strategy};
use serde_json::Value;
use uuid::Uuid;

/// Returns status, headers and the unparsed body
pub struct FetchStrategy {
    transport: HttpTransport,
}

impl FetchStrategy {
    /// Build a strategy with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::ClientBuild`] if the TLS backend cannot be initialised.
    pub fn new(config: HttpStrategyConfig) -> Result<Self, HttpError> {
        Ok(Self {
            transport: HttpTransport::new(config)?,
        })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &HttpStrategyConfig {
        self.transport.config()
    }

    async fn fetch(&self, request: &RequestDetail) -> Result<RawResult, TransportError> {
        let received = self.transport.execute(request).await?;
        Ok(RawResult::Body {
            status: received.status,
            headers: received.headers,
            body: received.body,
        })
    }
}

impl Strategy for FetchStrategy {
    fn raw_kind(&self) -> RawKind {
        RawKind::Body
    }

    fn dispatch<'a>(&'a self, request: &'a RequestDetail) -> DispatchFuture<'a> {
        Box::pin(self.fetch(request))
    }

    fn abort(&self, request_id: Uuid, _request: Option<&RequestDetail>) {
        tracing::debug!(%request_id, "HTTP request dropped");
    }
}

impl std::fmt::Debug for FetchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchStrategy")
            .field("config", self.config())
            .finish_non_exhaustive()
    }
}

/// Parses the response body as JSON and returns structured data
///
/// An empty body parses as `null`.
pub struct JsonStrategy {
    transport: HttpTransport,
}

impl JsonStrategy {
    /// Build a strategy with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::ClientBuild`] if the TLS backend cannot be initialised.
    pub fn new(config: HttpStrategyConfig) -> Result<Self, HttpError> {
        Ok(Self {
            transport: HttpTransport::new(config)?,
        })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &HttpStrategyConfig {
        self.transport.config()
    }

    async fn fetch_json(&self, request: &RequestDetail) -> Result<RawResult, TransportError> {
        let received = self.transport.execute(request).await?;
        if received.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(RawResult::Structured(Value::Null));
        }
        let value = serde_json::from_slice(&received.body)
            .map_err(|e| TransportError::Protocol(format!("Response is not JSON: {e}")))?;
        Ok(RawResult::Structured(value))
    }
}

impl Strategy for JsonStrategy {
    fn raw_kind(&self) -> RawKind {
        RawKind::Structured
    }

    fn dispatch<'a>(&'a self, request: &'a RequestDetail) -> DispatchFuture<'a> {
        Box::pin(self.fetch_json(request))
    }

    fn abort(&self, request_id: Uuid, _request: Option<&RequestDetail>) {
        tracing::debug!(%request_id, "HTTP request dropped");
    }
}

impl std::fmt::Debug for JsonStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStrategy")
            .field("config", self.config())
            .finish_non_exhaustive()
    }
}
