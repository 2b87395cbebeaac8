//! The pipe chain
//!
//! A call is driven through an ordered list of stages. The built-in order is
//! fixed:
//!
//! 1. **`pre_hook`**: runs `onBeforeRequest`, which may mutate the payload
//! 2. **`build`**: validates and assembles the payload into a [`RequestDetail`]
//! 3. **`dispatch`**: hands the request to the strategy
//! 4. **`success_hook`**: turns the raw result into JSON
//! 5. **`project`**: shapes the JSON into the declared DTO
//!
//! Custom [`Stage`]s can be inserted before or after any built-in stage with a
//! [`StageExtension`]. Any stage may settle the call early by returning
//! [`Flow::Settle`], or fail it by returning an error; no later stage runs in
//! either case.
//!
//! Every stage races the call's cancel signal. A call cancelled after
//! `pre_hook` has finished and before `dispatch` has completed asks the
//! strategy to abort.

use crate::executor::{CancelReason, CancelSignal};
use crate::metrics::{histogram, DISPATCH_DURATION_SECONDS};
use karman_core::definition::ResolvedEndpoint;
use karman_core::dto::project_optional;
use karman_core::error::{KarmanError, TransportError};
use karman_core::hook::{HookContext, SuccessHook};
use karman_core::payload::Payload;
use karman_core::request::{RawResult, RequestDetail};
use karman_core::strategy::Strategy;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Future returned by [`Stage::run`]
pub type StageFuture<'a> = Pin<Box<dyn Future<Output = Result<Flow, KarmanError>> + Send + 'a>>;

/// What the chain does after a stage
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Run the next stage
    Continue,
    /// Settle the call with this value, skipping the remaining stages
    Settle(Value),
}

/// One step of the chain
pub trait Stage: Send + Sync {
    /// Name recorded in the stage trace and logs
    fn name(&self) -> &str;

    /// Run the stage against the call's detail
    fn run<'a>(&'a self, detail: &'a mut PipeDetail) -> StageFuture<'a>;
}

/// The built-in stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// `onBeforeRequest`
    PreHook,
    /// Validation and request assembly
    Build,
    /// Strategy dispatch
    Dispatch,
    /// `onSuccess`
    SuccessHook,
    /// DTO projection
    Project,
}

impl StageKind {
    /// Built-in stages in chain order
    pub const ALL: [Self; 5] = [
        Self::PreHook,
        Self::Build,
        Self::Dispatch,
        Self::SuccessHook,
        Self::Project,
    ];

    /// Stage name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PreHook => "pre_hook",
            Self::Build => "build",
            Self::Dispatch => "dispatch",
            Self::SuccessHook => "success_hook",
            Self::Project => "project",
        }
    }

    fn stage(self) -> Arc<dyn Stage> {
        match self {
            Self::PreHook => Arc::new(PreHookStage),
            Self::Build => Arc::new(BuildStage),
            Self::Dispatch => Arc::new(DispatchStage),
            Self::SuccessHook => Arc::new(SuccessHookStage),
            Self::Project => Arc::new(ProjectStage),
        }
    }
}

/// Where a custom stage goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePosition {
    /// Immediately before a built-in stage
    Before(StageKind),
    /// Immediately after a built-in stage
    After(StageKind),
}

/// A custom stage and its position
#[derive(Clone)]
pub struct StageExtension {
    position: StagePosition,
    stage: Arc<dyn Stage>,
}

impl StageExtension {
    /// Insert `stage` before a built-in stage
    pub fn before(kind: StageKind, stage: impl Stage + 'static) -> Self {
        Self {
            position: StagePosition::Before(kind),
            stage: Arc::new(stage),
        }
    }

    /// Insert `stage` after a built-in stage
    pub fn after(kind: StageKind, stage: impl Stage + 'static) -> Self {
        Self {
            position: StagePosition::After(kind),
            stage: Arc::new(stage),
        }
    }

    /// Position in the chain
    #[must_use]
    pub const fn position(&self) -> StagePosition {
        self.position
    }
}

impl fmt::Debug for StageExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageExtension")
            .field("position", &self.position)
            .field("stage", &self.stage.name())
            .finish()
    }
}

/// An endpoint bound to its strategy and effective defaults
///
/// Computed once per endpoint when the client is built.
#[derive(Clone)]
pub struct Binding {
    pub(crate) endpoint: Arc<ResolvedEndpoint>,
    pub(crate) strategy_id: String,
    pub(crate) strategy: Arc<dyn Strategy>,
    pub(crate) success_hook: SuccessHook,
    pub(crate) validation: bool,
    pub(crate) headers: BTreeMap<String, String>,
}

impl Binding {
    /// The resolved endpoint
    #[must_use]
    pub fn endpoint(&self) -> &ResolvedEndpoint {
        &self.endpoint
    }

    /// Strategy id
    #[must_use]
    pub fn strategy_id(&self) -> &str {
        &self.strategy_id
    }

    /// Whether payload validation runs
    #[must_use]
    pub const fn validation(&self) -> bool {
        self.validation
    }

    /// Static headers (client defaults overlaid by the tree)
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("endpoint", &self.endpoint.path())
            .field("strategy", &self.strategy_id)
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

/// Mutable state of one call, owned by that call alone
pub struct PipeDetail {
    binding: Arc<Binding>,
    /// Context handed to `onBeforeRequest`
    pub context: HookContext,
    /// The caller's payload; `onBeforeRequest` may change it
    pub payload: Payload,
    /// Set by the build stage
    pub request: Option<RequestDetail>,
    /// Set by the dispatch stage
    pub raw: Option<RawResult>,
    /// Set by the success hook stage, replaced by projection
    pub output: Option<Value>,
    cancel: CancelSignal,
    trace: Vec<String>,
}

impl PipeDetail {
    pub(crate) fn new(binding: Arc<Binding>, request_id: Uuid, payload: Payload, cancel: CancelSignal) -> Self {
        let context = HookContext {
            request_id,
            endpoint: binding.endpoint.path().to_string(),
            method: binding.endpoint.method(),
            url_template: binding.endpoint.url().to_string(),
        };
        Self {
            binding,
            context,
            payload,
            request: None,
            raw: None,
            output: None,
            cancel,
            trace: Vec::new(),
        }
    }

    /// The endpoint this call targets
    #[must_use]
    pub fn endpoint(&self) -> &ResolvedEndpoint {
        &self.binding.endpoint
    }

    /// The endpoint's binding
    #[must_use]
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Per-call correlation id
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.context.request_id
    }

    /// Cancellation reason, if cancelled
    #[must_use]
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.cancel.reason()
    }

    /// Names of the stages entered so far, in order
    #[must_use]
    pub fn trace(&self) -> &[String] {
        &self.trace
    }
}

impl fmt::Debug for PipeDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeDetail")
            .field("request_id", &self.context.request_id)
            .field("endpoint", &self.context.endpoint)
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}

/// A stage in the chain, tagged with its built-in kind
#[derive(Clone)]
struct ChainEntry {
    kind: Option<StageKind>,
    stage: Arc<dyn Stage>,
}

impl ChainEntry {
    fn custom(ext: &StageExtension) -> Self {
        Self {
            kind: None,
            stage: Arc::clone(&ext.stage),
        }
    }
}

/// An ordered list of stages
#[derive(Clone)]
pub struct PipeChain {
    stages: Vec<ChainEntry>,
}

impl Default for PipeChain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PipeChain {
    /// Built-in stages with `extensions` inserted
    ///
    /// Extensions sharing a position keep their relative order.
    #[must_use]
    pub fn new(extensions: Vec<StageExtension>) -> Self {
        let mut stages = Vec::with_capacity(StageKind::ALL.len() + extensions.len());
        for kind in StageKind::ALL {
            stages.extend(
                extensions
                    .iter()
                    .filter(|ext| ext.position == StagePosition::Before(kind))
                    .map(ChainEntry::custom),
            );
            stages.push(ChainEntry {
                kind: Some(kind),
                stage: kind.stage(),
            });
            stages.extend(
                extensions
                    .iter()
                    .filter(|ext| ext.position == StagePosition::After(kind))
                    .map(ChainEntry::custom),
            );
        }
        Self { stages }
    }

    /// Stage names in run order
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|entry| entry.stage.name()).collect()
    }

    /// Drive `detail` through every stage
    ///
    /// # Errors
    ///
    /// Returns the first stage error, or the cancellation error if the call
    /// was cancelled before or during any stage.
    pub async fn run(&self, detail: &mut PipeDetail) -> Result<Value, KarmanError> {
        let mut cancel = detail.cancel.clone();
        // Set between the end of pre_hook and the end of dispatch
        let mut abortable = false;

        for ChainEntry { kind, stage } in &self.stages {
            let outcome = if let Some(reason) = detail.cancel_reason() {
                tracing::debug!(stage = stage.name(), "Call cancelled before stage");
                Err(reason)
            } else {
                tracing::trace!(stage = stage.name(), "Entering stage");
                detail.trace.push(stage.name().to_string());
                tokio::select! {
                    biased;
                    reason = cancel.cancelled() => {
                        tracing::debug!(stage = stage.name(), "Call cancelled during stage");
                        Err(reason)
                    },
                    flow = stage.run(detail) => Ok(flow),
                }
            };

            let flow = match outcome {
                Ok(flow) => flow?,
                Err(reason) => {
                    if abortable {
                        abort(detail);
                    }
                    return Err(reason.into_error());
                },
            };

            match kind {
                Some(StageKind::PreHook) => abortable = true,
                Some(StageKind::Dispatch) => abortable = false,
                _ => {},
            }

            if let Flow::Settle(value) = flow {
                tracing::trace!(stage = stage.name(), "Stage settled the call");
                return Ok(value);
            }
        }

        detail
            .output
            .take()
            .ok_or_else(|| missing("no stage produced an output"))
    }
}

impl fmt::Debug for PipeChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeChain")
            .field("stages", &self.stage_names())
            .finish()
    }
}

fn abort(detail: &PipeDetail) {
    let binding = &detail.binding;
    tracing::debug!(strategy = %binding.strategy_id, "Aborting dispatch");
    binding
        .strategy
        .abort(detail.context.request_id, detail.request.as_ref());
}

fn missing(what: &str) -> KarmanError {
    KarmanError::Transport(TransportError::Protocol(what.to_string()))
}

macro_rules! built_in_stage {
    ($stage:ident, $kind:expr, $run:ident) => {
        struct $stage;

        impl Stage for $stage {
            fn name(&self) -> &str {
                $kind.name()
            }

            fn run<'a>(&'a self, detail: &'a mut PipeDetail) -> StageFuture<'a> {
                Box::pin($run(detail))
            }
        }
    };
}

built_in_stage!(PreHookStage, StageKind::PreHook, pre_hook);
built_in_stage!(BuildStage, StageKind::Build, build);
built_in_stage!(DispatchStage, StageKind::Dispatch, dispatch);
built_in_stage!(SuccessHookStage, StageKind::SuccessHook, success_hook);
built_in_stage!(ProjectStage, StageKind::Project, project);

async fn pre_hook(detail: &mut PipeDetail) -> Result<Flow, KarmanError> {
    let binding = Arc::clone(&detail.binding);
    if let Some(hook) = &binding.endpoint.config().hooks.on_before_request {
        hook.call(&detail.context, &mut detail.payload)
            .await
            .map_err(|source| KarmanError::hook("onBeforeRequest", source))?;
    }
    Ok(Flow::Continue)
}

async fn build(detail: &mut PipeDetail) -> Result<Flow, KarmanError> {
    let binding = &detail.binding;
    let endpoint = &binding.endpoint;
    let assembled = endpoint
        .def()
        .payload_def()
        .assemble(&detail.payload, binding.validation)?;

    let mut headers = binding.headers.clone();
    headers.extend(assembled.headers);

    let request = RequestDetail {
        request_id: detail.context.request_id,
        endpoint: endpoint.path().to_string(),
        method: endpoint.method(),
        url: endpoint.url().render(&assembled.path),
        query: assembled.query,
        headers,
        body: (!assembled.body.is_empty()).then_some(assembled.body),
        payload: detail.payload.clone(),
    };
    tracing::trace!(url = %request.url, "Request built");
    detail.request = Some(request);
    Ok(Flow::Continue)
}

async fn dispatch(detail: &mut PipeDetail) -> Result<Flow, KarmanError> {
    let binding = Arc::clone(&detail.binding);
    let request = detail.request.as_ref().ok_or_else(|| missing("no request was built"))?;

    let started = Instant::now();
    let result = binding.strategy.dispatch(request).await;
    histogram!(DISPATCH_DURATION_SECONDS, "strategy" => binding.strategy_id.clone())
        .record(started.elapsed().as_secs_f64());

    detail.raw = Some(result?);
    Ok(Flow::Continue)
}

async fn success_hook(detail: &mut PipeDetail) -> Result<Flow, KarmanError> {
    let raw = detail.raw.take().ok_or_else(|| missing("no raw result"))?;
    let binding = &detail.binding;
    let hook = binding
        .endpoint
        .config()
        .hooks
        .on_success
        .as_ref()
        .unwrap_or(&binding.success_hook);
    let value = hook
        .call(raw)
        .await
        .map_err(|source| KarmanError::hook("onSuccess", source))?;
    detail.output = Some(value);
    Ok(Flow::Continue)
}

async fn project(detail: &mut PipeDetail) -> Result<Flow, KarmanError> {
    let output = detail.output.take().ok_or_else(|| missing("no output to project"))?;
    let projected = project_optional(output, detail.binding.endpoint.def().dto_spec())?;
    detail.output = Some(projected);
    Ok(Flow::Continue)
}
