//! Request executor and cancellation
//!
//! Every call returns a [`RequestExecutor`]: a single-use future yielding the
//! projected result or a [`KarmanError`]. The executor owns a [`CancelHandle`]
//! that can be cloned out and triggered from anywhere; the pipe chain observes
//! the matching [`CancelSignal`] between stages and while a dispatch is in
//! flight.
//!
//! Cancellation state lives in a `watch` channel with three states: running,
//! cancelled (with a reason) and settled. Only the first transition out of
//! running takes effect, so cancelling a settled call is a no-op.
//!
//! Like any Rust future the executor is lazy: nothing runs until it is polled.
//!
//! # Example
//!
//! ```ignore
//! let executor = karman.call("product.getAll", Payload::new())
//!     .with_timeout(Duration::from_secs(5));
//! let cancel = executor.cancel_handle();
//! tokio::spawn(async move { shutdown.await; cancel.cancel(); });
//! let products = executor.await?;
//! ```

use futures::future::BoxFuture;
use karman_core::error::{KarmanError, TransportError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::watch;

/// Why a call was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Cancelled by the caller
    Cancelled,
    /// A caller-supplied timeout elapsed
    Timeout(Duration),
}

impl CancelReason {
    /// The error a call cancelled for this reason fails with
    #[must_use]
    pub const fn into_error(self) -> KarmanError {
        match self {
            Self::Cancelled => KarmanError::Cancelled,
            Self::Timeout(after) => KarmanError::Transport(TransportError::Timeout { after }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Running,
    Cancelled(CancelReason),
    Settled,
}

/// Create a connected handle/signal pair for one call
#[must_use]
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (sender, receiver) = watch::channel(CallState::Running);
    (
        CancelHandle {
            sender: Arc::new(sender),
        },
        CancelSignal { receiver },
    )
}

/// Triggers cancellation of one call
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<CallState>>,
}

impl CancelHandle {
    /// Cancel the call
    ///
    /// Returns `false` if the call had already settled or been cancelled.
    pub fn cancel(&self) -> bool {
        self.cancel_with(CancelReason::Cancelled)
    }

    /// Cancel the call with a specific reason
    pub fn cancel_with(&self, reason: CancelReason) -> bool {
        let cancelled = self.transition(CallState::Cancelled(reason));
        if cancelled {
            tracing::debug!(?reason, "Call cancelled");
        }
        cancelled
    }

    /// Whether `cancel` has taken effect
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.sender.borrow(), CallState::Cancelled(_))
    }

    pub(crate) fn settle(&self) -> bool {
        self.transition(CallState::Settled)
    }

    fn transition(&self, next: CallState) -> bool {
        self.sender.send_if_modified(|state| {
            if *state == CallState::Running {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

/// Observes cancellation of one call
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<CallState>,
}

impl CancelSignal {
    /// The cancellation reason, if the call has been cancelled
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        match *self.receiver.borrow() {
            CallState::Cancelled(reason) => Some(reason),
            CallState::Running | CallState::Settled => None,
        }
    }

    /// Resolve once the call is cancelled
    ///
    /// Never resolves for a call that settles or whose handles are all dropped.
    pub async fn cancelled(&mut self) -> CancelReason {
        loop {
            match *self.receiver.borrow_and_update() {
                CallState::Cancelled(reason) => return reason,
                CallState::Settled => break,
                CallState::Running => {},
            }
            if self.receiver.changed().await.is_err() {
                break;
            }
        }
        std::future::pending().await
    }
}

/// Single-use, cancellable handle for the eventual result of a call
#[must_use = "executors do nothing unless awaited"]
pub struct RequestExecutor<T> {
    future: BoxFuture<'static, Result<T, KarmanError>>,
    cancel: CancelHandle,
}

impl<T: Send + 'static> RequestExecutor<T> {
    pub(crate) fn new<F>(future: F, cancel: CancelHandle) -> Self
    where
        F: Future<Output = Result<T, KarmanError>> + Send + 'static,
    {
        Self {
            future: Box::pin(future),
            cancel,
        }
    }

    /// An executor that fails immediately
    pub fn failed(error: KarmanError) -> Self {
        let (cancel, _signal) = cancel_pair();
        Self::new(async move { Err(error) }, cancel)
    }

    /// A handle that cancels this call
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel this call
    ///
    /// Returns `false` if it had already settled or been cancelled.
    pub fn cancel(&self) -> bool {
        self.cancel.cancel()
    }

    /// Cancel the call if it has not settled after `after`
    ///
    /// The call then fails with [`TransportError::Timeout`].
    pub fn with_timeout(self, after: Duration) -> Self {
        let cancel = self.cancel.clone();
        let trigger = self.cancel.clone();
        let mut inner = self.future;
        let future = async move {
            tokio::select! {
                biased;
                result = &mut inner => return result,
                () = tokio::time::sleep(after) => {
                    trigger.cancel_with(CancelReason::Timeout(after));
                }
            }
            inner.await
        };
        Self::new(future, cancel)
    }

    /// Transform a successful result
    pub fn and_then<U, F>(self, f: F) -> RequestExecutor<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U, KarmanError> + Send + 'static,
    {
        let inner = self.future;
        RequestExecutor::new(async move { inner.await.and_then(f) }, self.cancel)
    }
}

impl<T> Future for RequestExecutor<T> {
    type Output = Result<T, KarmanError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

impl<T> std::fmt::Debug for RequestExecutor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}
