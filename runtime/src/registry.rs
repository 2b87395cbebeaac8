//! Strategy registry
//!
//! Maps strategy identifiers to adapters. Each entry also carries the success
//! hook used when an endpoint declares no `onSuccess`: by default this is
//! chosen from the strategy's [`RawKind`] (unparsed bodies are parsed as JSON,
//! structured results pass through), and can be replaced per strategy.
//!
//! The registry is populated while building a client and is read-only
//! afterwards, so lookups take no lock.

use karman_core::hook::SuccessHook;
use karman_core::request::RawKind;
use karman_core::strategy::Strategy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default success hook for a raw result kind
#[must_use]
pub fn default_success_hook(kind: RawKind) -> SuccessHook {
    match kind {
        RawKind::Body => SuccessHook::parse_json(),
        RawKind::Structured => SuccessHook::identity(),
    }
}

/// A registered strategy and its default success hook
#[derive(Clone)]
pub struct StrategyEntry {
    strategy: Arc<dyn Strategy>,
    success_hook: SuccessHook,
}

impl StrategyEntry {
    /// The adapter
    #[must_use]
    pub fn strategy(&self) -> &Arc<dyn Strategy> {
        &self.strategy
    }

    /// Success hook applied when an endpoint declares none
    #[must_use]
    pub const fn success_hook(&self) -> &SuccessHook {
        &self.success_hook
    }
}

impl fmt::Debug for StrategyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyEntry")
            .field("raw_kind", &self.strategy.raw_kind())
            .finish_non_exhaustive()
    }
}

/// Strategies available to a client, by identifier
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    entries: HashMap<String, StrategyEntry>,
}

impl StrategyRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy with the default success hook for its raw kind
    ///
    /// Returns `true` if an existing strategy with this id was replaced.
    pub fn register(&mut self, id: impl Into<String>, strategy: Arc<dyn Strategy>) -> bool {
        let hook = default_success_hook(strategy.raw_kind());
        self.register_with_success_hook(id, strategy, hook)
    }

    /// Register a strategy with an explicit default success hook
    ///
    /// Returns `true` if an existing strategy with this id was replaced.
    pub fn register_with_success_hook(
        &mut self,
        id: impl Into<String>,
        strategy: Arc<dyn Strategy>,
        success_hook: SuccessHook,
    ) -> bool {
        let id = id.into();
        tracing::debug!(strategy = %id, raw_kind = ?strategy.raw_kind(), "Registered strategy");
        self.entries
            .insert(id, StrategyEntry { strategy, success_hook })
            .is_some()
    }

    /// Look up a strategy
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StrategyEntry> {
        self.entries.get(id)
    }

    /// Whether `id` is registered
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered ids, sorted
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
