//! Error types for definition building and request execution
//!
//! Two families live here:
//!
//! - [`DefinitionError`]: raised once, while a [`DefinitionTree`](crate::definition::DefinitionTree)
//!   is being built from declarations. A malformed declaration never reaches call time.
//! - [`KarmanError`]: the call-time taxonomy delivered through a request executor's
//!   failure channel.

use crate::rule::Measurement;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias for call-time results
pub type Result<T> = std::result::Result<T, KarmanError>;

/// Errors raised while building a definition tree from declarations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// A namespace or endpoint name is empty or contains a reserved character
    #[error("Invalid definition name {name:?}: names must be non-empty and contain no '.' or whitespace")]
    InvalidName {
        /// The offending name
        name: String,
    },

    /// Two endpoints resolve to the same dotted path
    #[error("Duplicate endpoint path: {path}")]
    DuplicateEndpoint {
        /// The dotted path declared twice
        path: String,
    },

    /// A payload definition declares the same field twice
    #[error("Endpoint {endpoint} declares field {field:?} more than once")]
    DuplicateField {
        /// Dotted endpoint path
        endpoint: String,
        /// Field name declared twice
        field: String,
    },

    /// Two fields claim the same path slot
    #[error("Endpoint {endpoint} declares path slot {index} more than once")]
    DuplicatePathIndex {
        /// Dotted endpoint path
        endpoint: String,
        /// Slot index declared twice
        index: usize,
    },

    /// Path slots must be numbered contiguously from zero
    #[error("Endpoint {endpoint} has no field for path slot {missing}; slots must be contiguous from 0")]
    PathIndexGap {
        /// Dotted endpoint path
        endpoint: String,
        /// First slot index with no field
        missing: usize,
    },

    /// An endpoint segment references a `{n}` placeholder no field fills
    #[error("Endpoint {endpoint} references placeholder {{{index}}} but declares no path field for it")]
    UnknownPlaceholder {
        /// Dotted endpoint path
        endpoint: String,
        /// Placeholder index
        index: usize,
    },

    /// An endpoint names a strategy that was never registered
    #[error("Endpoint {endpoint} uses unregistered request strategy {strategy:?}")]
    UnknownStrategy {
        /// Dotted endpoint path
        endpoint: String,
        /// Strategy identifier
        strategy: String,
    },

    /// A method string is not one of GET, POST, PUT, PATCH, DELETE
    #[error("Unknown HTTP method: {0}")]
    UnknownMethod(String),

    /// A rule or DTO declaration could not be parsed
    #[error("Invalid declaration: {0}")]
    InvalidDeclaration(String),
}

/// Coarse classification of a [`KarmanError`], used for metric labels and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`KarmanError::DefinitionNotFound`]
    DefinitionNotFound,
    /// See [`KarmanError::PayloadValidation`]
    PayloadValidation,
    /// See [`KarmanError::Hook`]
    Hook,
    /// See [`KarmanError::Transport`]
    Transport,
    /// See [`KarmanError::DtoShape`]
    DtoShape,
    /// See [`KarmanError::Cancelled`]
    Cancelled,
    /// See [`KarmanError::Decode`]
    Decode,
}

impl ErrorKind {
    /// Stable snake-case label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DefinitionNotFound => "definition_not_found",
            Self::PayloadValidation => "payload_validation",
            Self::Hook => "hook",
            Self::Transport => "transport",
            Self::DtoShape => "dto_shape",
            Self::Cancelled => "cancelled",
            Self::Decode => "decode",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Call-time failures
///
/// Every failure of a call is delivered as one of these through the executor.
/// Nothing is retried internally.
#[derive(Error, Debug)]
pub enum KarmanError {
    /// The requested namespace or endpoint does not exist
    #[error("Definition not found: {path}")]
    DefinitionNotFound {
        /// The dotted path that failed to resolve
        path: String,
    },

    /// One or more payload fields failed validation
    ///
    /// Aggregates every failing field, not just the first.
    #[error("Payload validation failed: {0}")]
    PayloadValidation(ValidationErrors),

    /// A lifecycle hook or custom stage failed
    #[error("{stage} failed: {source}")]
    Hook {
        /// Stage or hook name (`onBeforeRequest`, `onSuccess`, custom stage name)
        stage: String,
        /// Underlying cause
        #[source]
        source: anyhow::Error,
    },

    /// The strategy adapter reported a failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The raw response could not be shaped into the declared DTO
    #[error(transparent)]
    DtoShape(#[from] DtoShapeError),

    /// The call was cancelled through its executor
    #[error("Request cancelled")]
    Cancelled,

    /// The projected response could not be deserialized into the caller's type
    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl KarmanError {
    /// Wrap a hook failure
    pub fn hook(stage: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Hook {
            stage: stage.into(),
            source,
        }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DefinitionNotFound { .. } => ErrorKind::DefinitionNotFound,
            Self::PayloadValidation(_) => ErrorKind::PayloadValidation,
            Self::Hook { .. } => ErrorKind::Hook,
            Self::Transport(_) => ErrorKind::Transport,
            Self::DtoShape(_) => ErrorKind::DtoShape,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Field failures, if this is a validation error
    #[must_use]
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::PayloadValidation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for KarmanError {
    fn from(errors: ValidationErrors) -> Self {
        Self::PayloadValidation(errors)
    }
}

/// Failures reported by a strategy adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection-level failure (DNS, refused, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with an error status
    #[error("HTTP status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body text, possibly empty
        body: String,
    },

    /// The call exceeded its deadline
    #[error("Request timed out after {after:?}")]
    Timeout {
        /// The deadline that elapsed
        after: Duration,
    },

    /// The response violated the protocol (oversized, unparseable)
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// The raw response did not match the declared DTO shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Response shape mismatch at {path}: expected {expected}, found {found}")]
pub struct DtoShapeError {
    /// JSON path of the mismatch, e.g. `$[2].rating.rate`
    pub path: String,
    /// Expected shape
    pub expected: &'static str,
    /// Actual JSON type
    pub found: &'static str,
}

/// A single field's validation failure
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Payload field name
    pub field: String,
    /// Tag of the failing rule (`string`, `number`, `custom`, ...)
    pub rule: &'static str,
    /// What went wrong
    pub reason: FailureReason,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} rule): {}", self.field, self.rule, self.reason)
    }
}

impl std::error::Error for FieldError {}

/// Why a rule rejected a value
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The field is required but absent
    Required,
    /// The value has the wrong JSON type and cannot be coerced
    TypeMismatch {
        /// Expected type
        expected: &'static str,
        /// Actual JSON type
        found: &'static str,
    },
    /// The measured quantity is below the minimum
    BelowMin {
        /// What was measured
        measurement: Measurement,
        /// Declared minimum
        min: f64,
        /// Measured quantity
        actual: f64,
    },
    /// The measured quantity is above the maximum
    AboveMax {
        /// What was measured
        measurement: Measurement,
        /// Declared maximum
        max: f64,
        /// Measured quantity
        actual: f64,
    },
    /// The measured quantity differs from the required one
    NotEqual {
        /// What was measured
        measurement: Measurement,
        /// Required quantity
        expected: f64,
        /// Measured quantity
        actual: f64,
    },
    /// A string did not match a pattern rule
    PatternMismatch {
        /// The regex source
        pattern: String,
    },
    /// A custom rule rejected the value
    Custom(String),
    /// A path slot had no value once the payload was assembled
    UnfilledPathSlot {
        /// Slot index
        index: usize,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("value is required"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            },
            Self::BelowMin {
                measurement,
                min,
                actual,
            } => write!(f, "{measurement} {actual} is below minimum {min}"),
            Self::AboveMax {
                measurement,
                max,
                actual,
            } => write!(f, "{measurement} {actual} is above maximum {max}"),
            Self::NotEqual {
                measurement,
                expected,
                actual,
            } => write!(f, "{measurement} {actual} does not equal {expected}"),
            Self::PatternMismatch { pattern } => write!(f, "does not match /{pattern}/"),
            Self::Custom(explanation) => f.write_str(explanation),
            Self::UnfilledPathSlot { index } => write!(f, "path slot {index} was not filled"),
        }
    }
}

/// Every field failure from one payload, in declaration order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Create an empty collection
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a failure
    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// No failures recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failures
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over failures
    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// Failure for a given field, if any
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldError> {
        self.0.iter().find(|error| error.field == name)
    }

    /// Names of every failing field
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|error| error.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
