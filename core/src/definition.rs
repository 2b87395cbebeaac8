//! Definition tree
//!
//! API definitions are declared as a tree of [`Namespace`]s (URL segment,
//! shared defaults, child namespaces) whose leaves are [`EndpointDef`]s.
//! [`DefinitionTree::build`] validates every declaration eagerly and flattens
//! the tree into a map from dotted path (`"product.getAll"`) to a
//! [`ResolvedEndpoint`]: the URL template, the effective configuration merged
//! root → namespace → leaf, and the endpoint definition itself.
//!
//! The built tree has no mutation API. Resolution is a single map lookup and
//! returns shared, immutable data that concurrent calls can use freely.
//!
//! # Example
//!
//! ```
//! use karman_core::definition::{DefinitionTree, EndpointDef, Namespace};
//! use karman_core::payload::FieldSpec;
//! use karman_core::rule::RuleSpec;
//!
//! let root = Namespace::new("https://fakestoreapi.com").route(
//!     "product",
//!     Namespace::new("products").api(
//!         "getById",
//!         EndpointDef::get("").field(FieldSpec::path("id", 0).rule(RuleSpec::integer().required())),
//!     ),
//! );
//!
//! let tree = DefinitionTree::build(root)?;
//! let endpoint = tree.resolve("product.getById")?;
//! assert_eq!(endpoint.url().to_string(), "https://fakestoreapi.com/products/{0}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::dto::DtoSpec;
use crate::error::{DefinitionError, KarmanError};
use crate::hook::{BeforeRequestHook, ErrorHook, FinallyHook, Hooks, SuccessHook};
use crate::payload::{FieldSpec, PayloadDef};
use crate::request::Method;
use crate::url::UrlTemplate;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Defaults a namespace or endpoint declares for itself and its descendants
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    /// Request strategy identifier
    pub strategy: Option<String>,
    /// Static request headers
    pub headers: BTreeMap<String, String>,
    /// Whether payload validation runs
    pub validation: Option<bool>,
    /// Lifecycle hooks
    pub hooks: Hooks,
}

impl SharedConfig {
    /// Overlay `child` on `self`; descendant values win
    #[must_use]
    pub fn overlay(&self, child: &Self) -> Self {
        let mut headers = self.headers.clone();
        headers.extend(child.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            strategy: child.strategy.clone().or_else(|| self.strategy.clone()),
            headers,
            validation: child.validation.or(self.validation),
            hooks: self.hooks.overlay(&child.hooks),
        }
    }
}

macro_rules! shared_config_builders {
    () => {
        /// Use the named request strategy
        #[must_use]
        pub fn strategy(mut self, strategy: impl Into<String>) -> Self {
            self.config.strategy = Some(strategy.into());
            self
        }

        /// Add a static header
        #[must_use]
        pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
            self.config.headers.insert(name.into(), value.into());
            self
        }

        /// Turn payload validation on or off
        #[must_use]
        pub fn validation(mut self, enabled: bool) -> Self {
            self.config.validation = Some(enabled);
            self
        }

        /// Set `onBeforeRequest`
        #[must_use]
        pub fn on_before_request(mut self, hook: BeforeRequestHook) -> Self {
            self.config.hooks.on_before_request = Some(hook);
            self
        }

        /// Set `onSuccess`
        #[must_use]
        pub fn on_success(mut self, hook: SuccessHook) -> Self {
            self.config.hooks.on_success = Some(hook);
            self
        }

        /// Set `onError`
        #[must_use]
        pub fn on_error(mut self, hook: ErrorHook) -> Self {
            self.config.hooks.on_error = Some(hook);
            self
        }

        /// Set `onFinally`
        #[must_use]
        pub fn on_finally(mut self, hook: FinallyHook) -> Self {
            self.config.hooks.on_finally = Some(hook);
            self
        }

        /// Declared defaults
        #[must_use]
        pub const fn config(&self) -> &SharedConfig {
            &self.config
        }
    };
}

/// A leaf endpoint declaration
#[derive(Debug, Clone, Default)]
pub struct EndpointDef {
    method: Method,
    endpoint: String,
    payload: PayloadDef,
    dto: Option<DtoSpec>,
    config: SharedConfig,
}

impl EndpointDef {
    /// Declare an endpoint with a method and URL segment (may be empty)
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// GET endpoint
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    /// POST endpoint
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    /// PUT endpoint
    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Put, endpoint)
    }

    /// PATCH endpoint
    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Patch, endpoint)
    }

    /// DELETE endpoint
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    /// Replace the payload definition
    #[must_use]
    pub fn payload(mut self, payload: PayloadDef) -> Self {
        self.payload = payload;
        self
    }

    /// Append one payload field
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.payload = self.payload.field(field);
        self
    }

    /// Declare the response shape
    #[must_use]
    pub fn dto(mut self, dto: impl Into<DtoSpec>) -> Self {
        self.dto = Some(dto.into());
        self
    }

    shared_config_builders!();

    /// HTTP method
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// URL segment appended to the namespace URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Payload definition
    #[must_use]
    pub const fn payload_def(&self) -> &PayloadDef {
        &self.payload
    }

    /// Response shape, `None` for pass-through
    #[must_use]
    pub const fn dto_spec(&self) -> Option<&DtoSpec> {
        self.dto.as_ref()
    }
}

/// A namespace declaration
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    url: String,
    api: Vec<(String, EndpointDef)>,
    route: Vec<(String, Namespace)>,
    config: SharedConfig,
}

impl Namespace {
    /// Declare a namespace with its URL segment (the root carries the base URL)
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Add an endpoint
    #[must_use]
    pub fn api(mut self, name: impl Into<String>, endpoint: EndpointDef) -> Self {
        self.api.push((name.into(), endpoint));
        self
    }

    /// Add a child namespace
    #[must_use]
    pub fn route(mut self, name: impl Into<String>, namespace: Self) -> Self {
        self.route.push((name.into(), namespace));
        self
    }

    shared_config_builders!();
}

/// Configuration in effect for one endpoint after inheritance
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    /// Strategy identifier, `None` to use the runtime default
    pub strategy: Option<String>,
    /// Static headers
    pub headers: BTreeMap<String, String>,
    /// Validation toggle, `None` to use the runtime default
    pub validation: Option<bool>,
    /// Hooks
    pub hooks: Hooks,
}

impl From<SharedConfig> for EffectiveConfig {
    fn from(config: SharedConfig) -> Self {
        Self {
            strategy: config.strategy,
            headers: config.headers,
            validation: config.validation,
            hooks: config.hooks,
        }
    }
}

/// An endpoint with its URL and inherited configuration resolved
#[derive(Debug, Clone)]
pub struct ResolvedEndpoint {
    path: String,
    url: UrlTemplate,
    config: EffectiveConfig,
    def: EndpointDef,
}

impl ResolvedEndpoint {
    /// Dotted path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// URL template
    #[must_use]
    pub const fn url(&self) -> &UrlTemplate {
        &self.url
    }

    /// Effective configuration
    #[must_use]
    pub const fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    /// The leaf definition
    #[must_use]
    pub const fn def(&self) -> &EndpointDef {
        &self.def
    }

    /// HTTP method
    #[must_use]
    pub const fn method(&self) -> Method {
        self.def.method
    }
}

/// Anything that names an endpoint: `"a.b.c"`, `["a", "b", "c"]`, ...
pub trait EndpointPath {
    /// The dotted form
    fn dotted(&self) -> String;
}

impl EndpointPath for str {
    fn dotted(&self) -> String {
        self.to_string()
    }
}

impl EndpointPath for String {
    fn dotted(&self) -> String {
        self.clone()
    }
}

impl<S: AsRef<str>> EndpointPath for [S] {
    fn dotted(&self) -> String {
        self.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(".")
    }
}

impl<S: AsRef<str>, const N: usize> EndpointPath for [S; N] {
    fn dotted(&self) -> String {
        self.as_slice().dotted()
    }
}

impl<T: EndpointPath + ?Sized> EndpointPath for &T {
    fn dotted(&self) -> String {
        (**self).dotted()
    }
}

/// The immutable, flattened definition registry
#[derive(Debug, Clone, Default)]
pub struct DefinitionTree {
    endpoints: HashMap<String, Arc<ResolvedEndpoint>>,
}

impl DefinitionTree {
    /// Validate and flatten a namespace tree
    ///
    /// # Errors
    ///
    /// Returns the first [`DefinitionError`] found: invalid names, duplicate
    /// paths, malformed payload definitions or placeholders with no path field.
    pub fn build(root: Namespace) -> Result<Self, DefinitionError> {
        let mut tree = Self::default();
        let mut segments = Vec::new();
        let mut names = Vec::new();
        tree.walk(root, &SharedConfig::default(), &mut segments, &mut names)?;
        tracing::debug!(endpoints = tree.endpoints.len(), "Definition tree built");
        Ok(tree)
    }

    fn walk(
        &mut self,
        namespace: Namespace,
        inherited: &SharedConfig,
        segments: &mut Vec<String>,
        names: &mut Vec<String>,
    ) -> Result<(), DefinitionError> {
        let config = inherited.overlay(&namespace.config);
        segments.push(namespace.url);

        for (name, def) in namespace.api {
            check_name(&name)?;
            names.push(name);
            let path = names.join(".");
            names.pop();

            let slots = def.payload.check(&path)?;
            segments.push(def.endpoint.clone());
            let url = UrlTemplate::compose(segments.as_slice(), slots, &path);
            segments.pop();

            let resolved = ResolvedEndpoint {
                url: url?,
                config: config.overlay(&def.config).into(),
                path: path.clone(),
                def,
            };
            tracing::trace!(endpoint = %path, url = %resolved.url, "Resolved endpoint");
            if self.endpoints.insert(path.clone(), Arc::new(resolved)).is_some() {
                return Err(DefinitionError::DuplicateEndpoint { path });
            }
        }

        for (name, child) in namespace.route {
            check_name(&name)?;
            names.push(name);
            let walked = self.walk(child, &config, segments, names);
            names.pop();
            walked?;
        }

        segments.pop();
        Ok(())
    }

    /// Look up an endpoint
    ///
    /// # Errors
    ///
    /// Returns [`KarmanError::DefinitionNotFound`] if no endpoint has this path.
    pub fn resolve<P: EndpointPath + ?Sized>(&self, path: &P) -> Result<Arc<ResolvedEndpoint>, KarmanError> {
        let dotted = path.dotted();
        self.endpoints
            .get(&dotted)
            .cloned()
            .ok_or(KarmanError::DefinitionNotFound { path: dotted })
    }

    /// All endpoint paths, sorted
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.endpoints.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Iterate over resolved endpoints in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResolvedEndpoint>> {
        self.endpoints.values()
    }

    /// Number of endpoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the tree declares no endpoints
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

fn check_name(name: &str) -> Result<(), DefinitionError> {
    if name.is_empty() || name.contains('.') || name.chars().any(char::is_whitespace) {
        return Err(DefinitionError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
