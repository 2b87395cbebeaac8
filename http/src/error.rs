//! Error types for the HTTP strategies

use thiserror::Error;

/// Errors constructing an HTTP strategy
#[derive(Debug, Error)]
pub enum HttpError {
    /// The underlying `reqwest` client could not be built
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}
