//! Scriptable in-memory strategy
//!
//! [`MockStrategy`] records every dispatched [`RequestDetail`] and answers
//! from a queue of scripted [`MockReply`]s, falling back to an optional
//! responder closure. It can also hang forever, which is how tests exercise
//! cancellation of an in-flight dispatch.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use karman_core::error::TransportError;
use karman_core::request::{RawKind, RawResult, RequestDetail};
use karman_core::strategy::{DispatchFuture, Strategy};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// One scripted answer
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// JSON data; structured strategies return it as is, body strategies serialize it
    Json(Value),
    /// A raw body with status
    Body {
        /// HTTP status
        status: u16,
        /// Response bytes
        body: Vec<u8>,
    },
    /// A transport failure
    Fail(TransportError),
    /// Never answer
    Hang,
}

type Responder = dyn Fn(&RequestDetail) -> MockReply + Send + Sync;

/// In-memory strategy for tests
///
/// Clones share state, so a test can keep one clone for assertions and hand
/// another to the client.
///
/// # Example
///
/// ```
/// use karman_testing::MockStrategy;
/// use serde_json::json;
///
/// let mock = MockStrategy::structured();
/// mock.respond_json(json!({ "id": 1 }));
/// assert_eq!(mock.dispatch_count(), 0);
/// ```
#[derive(Clone)]
pub struct MockStrategy {
    kind: RawKind,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    responder: Arc<Mutex<Option<Arc<Responder>>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    dispatched: Arc<Mutex<Vec<RequestDetail>>>,
    aborted: Arc<Mutex<Vec<Uuid>>>,
    dispatch_count: Arc<watch::Sender<usize>>,
}

impl MockStrategy {
    /// A strategy producing structured results
    #[must_use]
    pub fn structured() -> Self {
        Self::new(RawKind::Structured)
    }

    /// A strategy producing unparsed bodies
    #[must_use]
    pub fn body() -> Self {
        Self::new(RawKind::Body)
    }

    fn new(kind: RawKind) -> Self {
        let (dispatch_count, _) = watch::channel(0);
        Self {
            kind,
            replies: Arc::new(Mutex::new(VecDeque::new())),
            responder: Arc::new(Mutex::new(None)),
            delay: Arc::new(Mutex::new(None)),
            dispatched: Arc::new(Mutex::new(Vec::new())),
            aborted: Arc::new(Mutex::new(Vec::new())),
            dispatch_count: Arc::new(dispatch_count),
        }
    }

    /// Queue a reply
    pub fn push_reply(&self, reply: MockReply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Queue a JSON reply
    pub fn respond_json(&self, value: Value) -> &Self {
        self.push_reply(MockReply::Json(value))
    }

    /// Queue a raw body reply
    pub fn respond_body(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.push_reply(MockReply::Body {
            status,
            body: body.into(),
        })
    }

    /// Queue a transport failure
    pub fn fail(&self, error: TransportError) -> &Self {
        self.push_reply(MockReply::Fail(error))
    }

    /// Queue a reply that never arrives
    pub fn hang(&self) -> &Self {
        self.push_reply(MockReply::Hang)
    }

    /// Answer with `responder` once the queue is empty
    pub fn respond_with<F>(&self, responder: F) -> &Self
    where
        F: Fn(&RequestDetail) -> MockReply + Send + Sync + 'static,
    {
        *self.responder.lock().unwrap() = Some(Arc::new(responder));
        self
    }

    /// Wait this long before answering each dispatch
    pub fn with_delay(&self, delay: Duration) -> &Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    /// Requests dispatched so far, in order
    #[must_use]
    pub fn dispatched(&self) -> Vec<RequestDetail> {
        self.dispatched.lock().unwrap().clone()
    }

    /// The most recent dispatched request
    #[must_use]
    pub fn last_request(&self) -> Option<RequestDetail> {
        self.dispatched.lock().unwrap().last().cloned()
    }

    /// Number of dispatches so far
    #[must_use]
    pub fn dispatch_count(&self) -> usize {
        *self.dispatch_count.borrow()
    }

    /// Request ids of aborted calls
    #[must_use]
    pub fn aborted(&self) -> Vec<Uuid> {
        self.aborted.lock().unwrap().clone()
    }

    /// Number of aborted calls
    #[must_use]
    pub fn abort_count(&self) -> usize {
        self.aborted.lock().unwrap().len()
    }

    /// Resolve once at least `count` dispatches have started
    pub async fn wait_for_dispatch(&self, count: usize) {
        let mut receiver = self.dispatch_count.subscribe();
        let _ = receiver.wait_for(|dispatched| *dispatched >= count).await;
    }

    fn record(&self, request: &RequestDetail) -> MockReply {
        self.dispatched.lock().unwrap().push(request.clone());
        self.dispatch_count.send_modify(|count| *count += 1);

        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        let responder = self.responder.lock().unwrap().clone();
        match responder {
            Some(responder) => responder(request),
            None => MockReply::Fail(TransportError::Network(format!(
                "no scripted reply for {}",
                request.endpoint
            ))),
        }
    }

    fn raw(&self, value: Value) -> RawResult {
        match self.kind {
            RawKind::Structured => RawResult::Structured(value),
            RawKind::Body => RawResult::Body {
                status: 200,
                headers: BTreeMap::from([("content-type".to_string(), "application/json".to_string())]),
                body: value.to_string().into_bytes(),
            },
        }
    }
}

impl Strategy for MockStrategy {
    fn raw_kind(&self) -> RawKind {
        self.kind
    }

    fn dispatch<'a>(&'a self, request: &'a RequestDetail) -> DispatchFuture<'a> {
        Box::pin(async move {
            let reply = self.record(request);
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match reply {
                MockReply::Json(value) => Ok(self.raw(value)),
                MockReply::Body { status, body } => Ok(RawResult::Body {
                    status,
                    headers: BTreeMap::new(),
                    body,
                }),
                MockReply::Fail(error) => Err(error),
                MockReply::Hang => std::future::pending().await,
            }
        })
    }

    fn abort(&self, request_id: Uuid, _request: Option<&RequestDetail>) {
        self.aborted.lock().unwrap().push(request_id);
    }
}

impl fmt::Debug for MockStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockStrategy")
            .field("kind", &self.kind)
            .field("queued", &self.replies.lock().unwrap().len())
            .field("dispatched", &self.dispatch_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use karman_core::request::Method;
    use serde_json::json;

    fn request() -> RequestDetail {
        RequestDetail {
            request_id: Uuid::new_v4(),
            endpoint: "product.getAll".to_string(),
            method: Method::Get,
            url: "https://fakestoreapi.com/products".to_string(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            body: None,
            payload: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn replies_are_served_in_order() {
        let mock = MockStrategy::structured();
        mock.respond_json(json!(1)).fail(TransportError::Protocol("bad".to_string()));

        let request = request();
        assert_eq!(mock.dispatch(&request).await, Ok(RawResult::Structured(json!(1))));
        assert_eq!(
            mock.dispatch(&request).await,
            Err(TransportError::Protocol("bad".to_string()))
        );
        assert!(matches!(mock.dispatch(&request).await, Err(TransportError::Network(_))));
        assert_eq!(mock.dispatch_count(), 3);
    }

    #[tokio::test]
    async fn body_strategies_serialize_json_replies() {
        let mock = MockStrategy::body();
        mock.respond_json(json!({ "ok": true }));
        let RawResult::Body { status, body, .. } = mock.dispatch(&request()).await.unwrap() else {
            panic!("expected a body");
        };
        assert_eq!(status, 200);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({ "ok": true }));
    }

    #[tokio::test]
    async fn responder_answers_when_queue_is_empty() {
        let mock = MockStrategy::structured();
        mock.respond_with(|request| MockReply::Json(json!(request.endpoint)));
        assert_eq!(
            mock.dispatch(&request()).await,
            Ok(RawResult::Structured(json!("product.getAll")))
        );
    }

    #[tokio::test]
    async fn wait_for_dispatch_observes_hanging_calls() {
        let mock = MockStrategy::structured();
        mock.hang();
        let background = mock.clone();
        let task = tokio::spawn(async move {
            let request = request();
            background.dispatch(&request).await
        });

        mock.wait_for_dispatch(1).await;
        assert_eq!(mock.dispatch_count(), 1);
        task.abort();
    }
}
