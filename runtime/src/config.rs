//! Runtime defaults applied to every call
//!
//! Values declared on the definition tree win over these. Only what an
//! endpoint leaves unset falls back to the client configuration.

use std::collections::BTreeMap;
use thiserror::Error;

/// Strategy used when no namespace or endpoint names one
pub const DEFAULT_STRATEGY: &str = "fetch";

/// Environment variable overriding the default strategy
pub const ENV_DEFAULT_STRATEGY: &str = "KARMAN_DEFAULT_STRATEGY";

/// Environment variable toggling payload validation (`true`/`false`/`1`/`0`)
pub const ENV_VALIDATION: &str = "KARMAN_VALIDATION";

/// Errors reading configuration from the environment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to something unparseable
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

/// Client-wide defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KarmanConfig {
    default_strategy: String,
    validation: bool,
    default_headers: BTreeMap<String, String>,
}

impl Default for KarmanConfig {
    fn default() -> Self {
        Self {
            default_strategy: DEFAULT_STRATEGY.to_string(),
            validation: true,
            default_headers: BTreeMap::new(),
        }
    }
}

impl KarmanConfig {
    /// Defaults overridden by `KARMAN_DEFAULT_STRATEGY` and `KARMAN_VALIDATION`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set but empty or
    /// not a recognised boolean.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(strategy) = lookup(ENV_DEFAULT_STRATEGY) {
            if strategy.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    name: ENV_DEFAULT_STRATEGY,
                    value: strategy,
                });
            }
            config.default_strategy = strategy.trim().to_string();
        }

        if let Some(value) = lookup(ENV_VALIDATION) {
            config.validation = match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: ENV_VALIDATION,
                        value,
                    });
                }
            };
        }

        Ok(config)
    }

    /// Set the fallback strategy
    #[must_use]
    pub fn with_default_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.default_strategy = strategy.into();
        self
    }

    /// Set whether validation runs when an endpoint does not say
    #[must_use]
    pub const fn with_validation(mut self, enabled: bool) -> Self {
        self.validation = enabled;
        self
    }

    /// Add a header sent with every request unless the tree overrides it
    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Fallback strategy id
    #[must_use]
    pub fn default_strategy(&self) -> &str {
        &self.default_strategy
    }

    /// Fallback validation toggle
    #[must_use]
    pub const fn validation(&self) -> bool {
        self.validation
    }

    /// Headers sent with every request
    #[must_use]
    pub const fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.default_headers
    }
}
