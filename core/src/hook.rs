//! Lifecycle hooks
//!
//! Hooks are modelled uniformly as suspension points: each returns a boxed
//! future, and the runtime awaits it before moving on even when the hook body
//! is synchronous. The `sync` constructors wrap plain closures.
//!
//! | Hook | Runs | May |
//! |------|------|-----|
//! | [`BeforeRequestHook`] | before the request is built | mutate the payload |
//! | [`SuccessHook`] | after dispatch succeeds | turn the raw result into JSON |
//! | [`ErrorHook`] | after any failure | supply an explicit recovery value |
//! | [`FinallyHook`] | once the call settles | observe completion |

use crate::error::KarmanError;
use crate::payload::Payload;
use crate::request::{Method, RawResult};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

/// Boxed future returned by fallible hooks
pub type HookFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// Boxed future returned by the error hook
pub type RecoveryFuture<'a> = Pin<Box<dyn Future<Output = Option<Value>> + Send + 'a>>;

/// Read-only call context handed to `onBeforeRequest`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
    /// Per-call correlation id
    pub request_id: Uuid,
    /// Dotted endpoint path
    pub endpoint: String,
    /// HTTP method
    pub method: Method,
    /// URL template with `{n}` slot markers
    pub url_template: String,
}

type BeforeFn = dyn for<'a> Fn(&'a HookContext, &'a mut Payload) -> HookFuture<'a, ()> + Send + Sync;
type SuccessFn = dyn Fn(RawResult) -> HookFuture<'static, Value> + Send + Sync;
type ErrorFn = dyn for<'a> Fn(&'a KarmanError) -> RecoveryFuture<'a> + Send + Sync;
type FinallyFn = dyn Fn() -> HookFuture<'static, ()> + Send + Sync;

/// `onBeforeRequest(context, payload)`: may mutate the payload in place
#[derive(Clone)]
pub struct BeforeRequestHook(Arc<BeforeFn>);

impl BeforeRequestHook {
    /// Wrap an asynchronous hook
    ///
    /// ```
    /// use karman_core::hook::BeforeRequestHook;
    ///
    /// let hook = BeforeRequestHook::new(|_context, payload| {
    ///     Box::pin(async move {
    ///         payload.entry("limit").or_insert(10.into());
    ///         Ok(())
    ///     })
    /// });
    /// # drop(hook);
    /// ```
    pub fn new<F>(hook: F) -> Self
    where
        F: for<'a> Fn(&'a HookContext, &'a mut Payload) -> HookFuture<'a, ()> + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    /// Wrap a synchronous hook
    pub fn sync<F>(hook: F) -> Self
    where
        F: Fn(&HookContext, &mut Payload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(move |context, payload| {
            let result = hook(context, payload);
            Box::pin(async move { result })
        })
    }

    /// Run the hook
    pub fn call<'a>(&'a self, context: &'a HookContext, payload: &'a mut Payload) -> HookFuture<'a, ()> {
        (self.0)(context, payload)
    }
}

impl fmt::Debug for BeforeRequestHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BeforeRequestHook(<fn>)")
    }
}

/// `onSuccess(rawResult)`: turns a strategy's raw result into JSON
#[derive(Clone)]
pub struct SuccessHook(Arc<SuccessFn>);

impl SuccessHook {
    /// Wrap an asynchronous hook
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(RawResult) -> HookFuture<'static, Value> + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    /// Wrap a synchronous hook
    pub fn sync<F>(hook: F) -> Self
    where
        F: Fn(RawResult) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::new(move |raw| {
            let result = hook(raw);
            Box::pin(async move { result })
        })
    }

    /// Parse an unparsed body as JSON; an empty body parses as `null`
    ///
    /// Structured results pass through.
    #[must_use]
    pub fn parse_json() -> Self {
        Self::sync(|raw| match raw {
            RawResult::Body { body, .. } if body.iter().all(u8::is_ascii_whitespace) => Ok(Value::Null),
            RawResult::Body { body, .. } => Ok(serde_json::from_slice(&body)?),
            RawResult::Structured(value) => Ok(value),
        })
    }

    /// Pass structured data through unchanged
    ///
    /// An unparsed body becomes a JSON string (lossy UTF-8).
    #[must_use]
    pub fn identity() -> Self {
        Self::sync(|raw| match raw {
            RawResult::Structured(value) => Ok(value),
            RawResult::Body { body, .. } => Ok(Value::String(String::from_utf8_lossy(&body).into_owned())),
        })
    }

    /// Run the hook
    #[must_use]
    pub fn call(&self, raw: RawResult) -> HookFuture<'static, Value> {
        (self.0)(raw)
    }
}

impl fmt::Debug for SuccessHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SuccessHook(<fn>)")
    }
}

/// `onError(error)`: observes a failure and may return an explicit recovery value
///
/// Returning `None` propagates the error unchanged.
#[derive(Clone)]
pub struct ErrorHook(Arc<ErrorFn>);

impl ErrorHook {
    /// Wrap an asynchronous hook
    pub fn new<F>(hook: F) -> Self
    where
        F: for<'a> Fn(&'a KarmanError) -> RecoveryFuture<'a> + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    /// Wrap a synchronous hook
    pub fn sync<F>(hook: F) -> Self
    where
        F: Fn(&KarmanError) -> Option<Value> + Send + Sync + 'static,
    {
        Self::new(move |error| {
            let recovery = hook(error);
            Box::pin(async move { recovery })
        })
    }

    /// Run the hook
    #[must_use]
    pub fn call<'a>(&'a self, error: &'a KarmanError) -> RecoveryFuture<'a> {
        (self.0)(error)
    }
}

impl fmt::Debug for ErrorHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorHook(<fn>)")
    }
}

/// `onFinally()`: runs once after the call settles
#[derive(Clone)]
pub struct FinallyHook(Arc<FinallyFn>);

impl FinallyHook {
    /// Wrap an asynchronous hook
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn() -> HookFuture<'static, ()> + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    /// Wrap a synchronous hook
    pub fn sync<F>(hook: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(move || {
            let result = hook();
            Box::pin(async move { result })
        })
    }

    /// Run the hook
    #[must_use]
    pub fn call(&self) -> HookFuture<'static, ()> {
        (self.0)()
    }
}

impl fmt::Debug for FinallyHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FinallyHook(<fn>)")
    }
}

/// The hooks declared at one level of the definition tree
#[derive(Debug, Clone, Default)]
pub struct Hooks {
    /// `onBeforeRequest`
    pub on_before_request: Option<BeforeRequestHook>,
    /// `onSuccess`
    pub on_success: Option<SuccessHook>,
    /// `onError`
    pub on_error: Option<ErrorHook>,
    /// `onFinally`
    pub on_finally: Option<FinallyHook>,
}

impl Hooks {
    /// Overlay `child` on `self`; each hook the child declares wins
    #[must_use]
    pub fn overlay(&self, child: &Self) -> Self {
        Self {
            on_before_request: child.on_before_request.clone().or_else(|| self.on_before_request.clone()),
            on_success: child.on_success.clone().or_else(|| self.on_success.clone()),
            on_error: child.on_error.clone().or_else(|| self.on_error.clone()),
            on_finally: child.on_finally.clone().or_else(|| self.on_finally.clone()),
        }
    }
}
