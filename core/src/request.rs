//! Request descriptors threaded through the pipe chain and handed to strategies

use crate::error::DefinitionError;
use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// HTTP method of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET (the default)
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(DefinitionError::UnknownMethod(s.to_string())),
        }
    }
}

/// A fully built request, owned by exactly one in-flight call
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDetail {
    /// Per-call correlation id
    pub request_id: Uuid,
    /// Dotted endpoint path
    pub endpoint: String,
    /// HTTP method
    pub method: Method,
    /// Absolute URL with path slots substituted, without query string
    pub url: String,
    /// Query parameters in declaration order
    pub query: Vec<(String, String)>,
    /// Static headers merged with header fields (fields win)
    pub headers: BTreeMap<String, String>,
    /// JSON body, `None` when no body field was supplied
    pub body: Option<Payload>,
    /// The payload as it stood after `onBeforeRequest`
    pub payload: Payload,
}

impl RequestDetail {
    /// URL including the percent-encoded query string
    #[must_use]
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.url)
    }

    /// First query value for `key`
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Which raw result a strategy produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawKind {
    /// Status, headers and an unparsed body
    Body,
    /// Already-parsed structured data
    Structured,
}

/// Strategy-specific result of a successful dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// Unparsed response
    Body {
        /// HTTP status
        status: u16,
        /// Response headers
        headers: BTreeMap<String, String>,
        /// Response bytes
        body: Vec<u8>,
    },
    /// Parsed response data
    Structured(serde_json::Value),
}

impl RawResult {
    /// Which kind of result this is
    #[must_use]
    pub const fn kind(&self) -> RawKind {
        match self {
            Self::Body { .. } => RawKind::Body,
            Self::Structured(_) => RawKind::Structured,
        }
    }
}
