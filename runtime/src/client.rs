//! The client facade
//!
//! [`Karman`] binds a validated definition tree to a set of strategies and
//! runtime defaults. Every endpoint is bound to its strategy once, when the
//! client is built, so a call does no lookups beyond the endpoint itself.
//!
//! # Example
//!
//! ```ignore
//! let karman = Karman::builder(api_root())
//!     .strategy("fetch", Arc::new(FetchStrategy::new(HttpStrategyConfig::default())?))
//!     .build()?;
//!
//! let products = karman
//!     .call("product.getAll", Payload::new())
//!     .with_timeout(Duration::from_secs(10))
//!     .await?;
//! ```

use crate::config::KarmanConfig;
use crate::executor::{cancel_pair, RequestExecutor};
use crate::metrics::{counter, CALLS_TOTAL, CALL_FAILURES_TOTAL};
use crate::pipe::{Binding, PipeChain, PipeDetail, StageExtension};
use crate::registry::StrategyRegistry;
use karman_core::definition::{DefinitionTree, EndpointPath, Namespace, ResolvedEndpoint};
use karman_core::error::{DefinitionError, KarmanError};
use karman_core::hook::SuccessHook;
use karman_core::payload::Payload;
use karman_core::request::Method;
use karman_core::strategy::Strategy;
use karman_core::url::UrlTemplate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Builder for [`Karman`]
#[derive(Debug)]
pub struct KarmanBuilder {
    root: Namespace,
    config: KarmanConfig,
    strategies: StrategyRegistry,
    extensions: Vec<StageExtension>,
}

impl KarmanBuilder {
    /// Replace the runtime defaults
    #[must_use]
    pub fn config(mut self, config: KarmanConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a strategy under `id`
    #[must_use]
    pub fn strategy(mut self, id: impl Into<String>, strategy: Arc<dyn Strategy>) -> Self {
        self.strategies.register(id, strategy);
        self
    }

    /// Register a strategy with its own default success hook
    #[must_use]
    pub fn strategy_with_success_hook(
        mut self,
        id: impl Into<String>,
        strategy: Arc<dyn Strategy>,
        success_hook: SuccessHook,
    ) -> Self {
        self.strategies.register_with_success_hook(id, strategy, success_hook);
        self
    }

    /// Insert a custom stage into the pipe chain
    #[must_use]
    pub fn stage(mut self, extension: StageExtension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Validate the tree and bind every endpoint to its strategy
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] if the tree is malformed or an endpoint
    /// names a strategy that was not registered.
    pub fn build(self) -> Result<Karman, DefinitionError> {
        let tree = DefinitionTree::build(self.root)?;

        let mut bindings = HashMap::with_capacity(tree.len());
        for endpoint in tree.iter() {
            let binding = bind(Arc::clone(endpoint), &self.config, &self.strategies)?;
            bindings.insert(endpoint.path().to_string(), Arc::new(binding));
        }

        tracing::info!(
            endpoints = bindings.len(),
            strategies = ?self.strategies.ids(),
            "Karman client built"
        );

        Ok(Karman {
            inner: Arc::new(Inner {
                tree,
                bindings,
                chain: Arc::new(PipeChain::new(self.extensions)),
                config: self.config,
            }),
        })
    }
}

fn bind(
    endpoint: Arc<ResolvedEndpoint>,
    config: &KarmanConfig,
    strategies: &StrategyRegistry,
) -> Result<Binding, DefinitionError> {
    let effective = endpoint.config();
    let strategy_id = effective
        .strategy
        .clone()
        .unwrap_or_else(|| config.default_strategy().to_string());
    let Some(entry) = strategies.get(&strategy_id) else {
        return Err(DefinitionError::UnknownStrategy {
            endpoint: endpoint.path().to_string(),
            strategy: strategy_id,
        });
    };

    let mut headers = config.default_headers().clone();
    headers.extend(effective.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

    Ok(Binding {
        validation: effective.validation.unwrap_or(config.validation()),
        strategy: Arc::clone(entry.strategy()),
        success_hook: entry.success_hook().clone(),
        strategy_id,
        headers,
        endpoint,
    })
}

struct Inner {
    tree: DefinitionTree,
    bindings: HashMap<String, Arc<Binding>>,
    chain: Arc<PipeChain>,
    config: KarmanConfig,
}

/// A built API client
///
/// Cheap to clone; clones share the same immutable definitions.
#[derive(Clone)]
pub struct Karman {
    inner: Arc<Inner>,
}

impl Karman {
    /// Start building a client for `root`
    pub fn builder(root: Namespace) -> KarmanBuilder {
        KarmanBuilder {
            root,
            config: KarmanConfig::default(),
            strategies: StrategyRegistry::new(),
            extensions: Vec::new(),
        }
    }

    /// Look up an endpoint by dotted path or segment list
    ///
    /// # Errors
    ///
    /// Returns [`KarmanError::DefinitionNotFound`] for an unknown path.
    pub fn endpoint<P: EndpointPath + ?Sized>(&self, path: &P) -> Result<Endpoint, KarmanError> {
        let dotted = path.dotted();
        match self.inner.bindings.get(&dotted) {
            Some(binding) => Ok(Endpoint {
                binding: Arc::clone(binding),
                chain: Arc::clone(&self.inner.chain),
            }),
            None => Err(KarmanError::DefinitionNotFound { path: dotted }),
        }
    }

    /// Call an endpoint
    ///
    /// An unknown path yields an executor that fails with
    /// [`KarmanError::DefinitionNotFound`].
    pub fn call<P: EndpointPath + ?Sized>(&self, path: &P, payload: Payload) -> RequestExecutor<Value> {
        match self.endpoint(path) {
            Ok(endpoint) => endpoint.call(payload),
            Err(error) => {
                tracing::warn!(error = %error, "Call to unknown endpoint");
                RequestExecutor::failed(error)
            },
        }
    }

    /// All endpoint paths, sorted
    #[must_use]
    pub fn endpoints(&self) -> Vec<&str> {
        self.inner.tree.paths()
    }

    /// Runtime defaults
    #[must_use]
    pub fn config(&self) -> &KarmanConfig {
        &self.inner.config
    }

    /// The pipe chain every call runs through
    #[must_use]
    pub fn chain(&self) -> &PipeChain {
        &self.inner.chain
    }
}

impl std::fmt::Debug for Karman {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Karman")
            .field("endpoints", &self.inner.bindings.len())
            .field("chain", &self.inner.chain)
            .finish_non_exhaustive()
    }
}

/// A callable endpoint
#[derive(Debug, Clone)]
pub struct Endpoint {
    binding: Arc<Binding>,
    chain: Arc<PipeChain>,
}

impl Endpoint {
    /// Dotted path
    #[must_use]
    pub fn path(&self) -> &str {
        self.binding.endpoint().path()
    }

    /// HTTP method
    #[must_use]
    pub fn method(&self) -> Method {
        self.binding.endpoint().method()
    }

    /// URL template
    #[must_use]
    pub fn url(&self) -> &UrlTemplate {
        self.binding.endpoint().url()
    }

    /// Strategy, validation and header bindings
    #[must_use]
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Call with `payload`, yielding the projected JSON
    ///
    /// Failures run `onError`, which may recover with a value; `onFinally`
    /// runs once the call has settled either way.
    pub fn call(&self, payload: Payload) -> RequestExecutor<Value> {
        let (handle, signal) = cancel_pair();
        let binding = Arc::clone(&self.binding);
        let chain = Arc::clone(&self.chain);
        let request_id = Uuid::new_v4();

        let span = tracing::info_span!(
            "karman_call",
            endpoint = %binding.endpoint().path(),
            method = %binding.endpoint().method(),
            %request_id
        );

        let settle = handle.clone();
        let future = async move {
            let path = binding.endpoint().path().to_string();
            counter!(CALLS_TOTAL, "endpoint" => path.clone()).increment(1);

            let hooks = binding.endpoint().config().hooks.clone();
            let mut detail = PipeDetail::new(binding, request_id, payload, signal);
            let outcome = chain.run(&mut detail).await;
            settle.settle();

            let result = match outcome {
                Ok(value) => {
                    tracing::debug!(stages = ?detail.trace(), "Call succeeded");
                    Ok(value)
                },
                Err(error) => {
                    counter!(CALL_FAILURES_TOTAL, "endpoint" => path, "kind" => error.kind().as_str())
                        .increment(1);
                    tracing::warn!(error = %error, kind = %error.kind(), "Call failed");
                    let recovered = match &hooks.on_error {
                        Some(hook) => hook.call(&error).await,
                        None => None,
                    };
                    match recovered {
                        Some(value) => {
                            tracing::debug!("onError recovered the call");
                            Ok(value)
                        },
                        None => Err(error),
                    }
                },
            };

            if let Some(hook) = &hooks.on_finally {
                if let Err(error) = hook.call().await {
                    tracing::warn!(error = %error, "onFinally failed");
                }
            }

            result
        };

        RequestExecutor::new(future.instrument(span), handle)
    }

    /// Call and deserialize the projected JSON into `T`
    ///
    /// Deserialization failure yields [`KarmanError::Decode`].
    pub fn call_as<T>(&self, payload: Payload) -> RequestExecutor<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.call(payload)
            .and_then(|value| serde_json::from_value(value).map_err(KarmanError::Decode))
    }
}
