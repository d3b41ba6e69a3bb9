//! Request handles
//!
//! A [`RequestHandle`] wraps one in-flight call running on a spawned task.
//! The outcome is delivered once, either to a callback registered with
//! [`RequestHandle::response`] or to the future returned by
//! [`RequestHandle::result`], whichever claims it first.
//!
//! Cancellation races the work with a [`CancellationToken`]. Once
//! [`RequestHandle::cancel`] has been observed, the outcome is always
//! `TransportFailure(Cancelled)`, even if the response had already arrived.

use crate::error::ClassifiedError;
use bridge_traits::http::{Progress, ProgressCallback};
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub type CallResult<T, E> = Result<T, ClassifiedError<E>>;

/// Handle of an RPC call.
pub type RpcRequest<R, E> = RequestHandle<R, E>;
/// Handle of an upload; same response shape as RPC.
pub type UploadRequest<R, E> = RequestHandle<R, E>;
/// Handle of a download buffered in memory.
pub type DownloadToMemoryRequest<R, E> = RequestHandle<(R, Bytes), E>;
/// Handle of a download placed at a path.
pub type DownloadToFileRequest<R, E> = RequestHandle<(R, PathBuf), E>;

type ProgressSlot = Arc<Mutex<Option<ProgressCallback>>>;

/// In-flight API call producing `T` or a [`ClassifiedError<E>`].
pub struct RequestHandle<T, E> {
    token: CancellationToken,
    progress: ProgressSlot,
    outcome: Mutex<Option<oneshot::Receiver<CallResult<T, E>>>>,
    runtime: Option<Handle>,
}

impl<T, E> RequestHandle<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Spawn the work built by `build` on the current tokio runtime.
    ///
    /// `build` receives the progress callback to attach to the transfer.
    pub(crate) fn launch<F, Fut>(build: F) -> Self
    where
        F: FnOnce(ProgressCallback) -> Fut,
        Fut: Future<Output = CallResult<T, E>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let progress: ProgressSlot = Arc::new(Mutex::new(None));
        let (tx, rx) = oneshot::channel();

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "No tokio runtime, request not started");
                let _ = tx.send(Err(ClassifiedError::transport(
                    bridge_traits::BridgeError::NotAvailable(format!("tokio runtime: {}", e)),
                )));
                return Self::from_parts(token, progress, rx, None);
            }
        };

        let work = build(relay(Arc::clone(&progress)));
        let task_token = token.clone();
        runtime.spawn(async move {
            let result = tokio::select! {
                biased;
                _ = task_token.cancelled() => Err(ClassifiedError::cancelled()),
                result = work => result,
            };
            // Receiver may already be gone
            let _ = tx.send(result);
        });

        Self::from_parts(token, progress, rx, Some(runtime))
    }

    /// Handle that is already resolved with `error`.
    pub(crate) fn failed(error: ClassifiedError<E>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(error));
        Self::from_parts(
            CancellationToken::new(),
            Arc::new(Mutex::new(None)),
            rx,
            Handle::try_current().ok(),
        )
    }

    fn from_parts(
        token: CancellationToken,
        progress: ProgressSlot,
        rx: oneshot::Receiver<CallResult<T, E>>,
        runtime: Option<Handle>,
    ) -> Self {
        Self {
            token,
            progress,
            outcome: Mutex::new(Some(rx)),
            runtime,
        }
    }

    /// Cancel the call. Safe to call repeatedly and from any thread.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!("Request cancelled by caller");
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Receive byte-count updates. Replaces any earlier progress callback.
    pub fn progress(&self, callback: impl Fn(Progress) + Send + Sync + 'static) -> &Self {
        if let Ok(mut slot) = self.progress.lock() {
            *slot = Some(Arc::new(callback));
        }
        self
    }

    /// Register the terminal callback, invoked exactly once with the outcome.
    ///
    /// Returns `false` and drops `callback` when the outcome was already
    /// claimed by an earlier registration or by [`result`](Self::result).
    /// The callback may run on any runtime worker thread.
    pub fn response<F>(&self, callback: F) -> bool
    where
        F: FnOnce(CallResult<T, E>) + Send + 'static,
    {
        let Some(mut rx) = self.claim() else {
            return false;
        };

        let token = self.token.clone();
        match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => {
                runtime.spawn(async move {
                    callback(settle(rx.await.ok(), &token));
                });
            }
            // Only handles that failed before launch lack a runtime; their
            // outcome is already in the channel
            None => callback(settle(rx.try_recv().ok(), &token)),
        }
        true
    }

    /// Await the outcome. Returns `None` when it was already claimed.
    pub async fn result(&self) -> Option<CallResult<T, E>> {
        let rx = self.claim()?;
        Some(settle(rx.await.ok(), &self.token))
    }

    fn claim(&self) -> Option<oneshot::Receiver<CallResult<T, E>>> {
        self.outcome.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl<T, E> fmt::Debug for RequestHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Apply the cancellation rule to a received outcome.
fn settle<T, E>(received: Option<CallResult<T, E>>, token: &CancellationToken) -> CallResult<T, E> {
    if token.is_cancelled() {
        return Err(ClassifiedError::cancelled());
    }
    received.unwrap_or_else(|| {
        warn!("Request task ended without an outcome");
        Err(ClassifiedError::cancelled())
    })
}

/// Progress callback forwarding to whatever the caller registers, now or
/// later.
fn relay(slot: ProgressSlot) -> ProgressCallback {
    Arc::new(move |progress: Progress| {
        let callback = slot.lock().ok().and_then(|slot| slot.clone());
        if let Some(callback) = callback {
            callback(progress);
        }
    })
}
