//! Synchronous-caller → scheduler-context request bridge.
//!
//! A blocking caller (an HTTP handler running on a blocking worker thread)
//! hands a piece of async work to the scheduler's single cooperative context,
//! where the shared [`CatalogProvider`] lives, and waits for the result.
//!
//! ```text
//! caller thread                       scheduler context
//!   submit_and_wait ──PendingRequest──► serve() ──spawn──► work(provider)
//!        ▲                                                     │
//!        └──────────── reply channel (bounded 1) ◄─────────────┘
//! ```
//!
//! # Deadlines
//!
//! The caller and the scheduler share one deadline. The caller stops waiting
//! at the deadline and the scheduler drops the work future at the same
//! instant, so abandoned work does not keep running. A request whose deadline
//! has already passed when it is dequeued is dropped without running.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use common::ServiceError;
use crossbeam_channel::RecvTimeoutError;
use futures::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::provider::CatalogProvider;

/// Errors surfaced to a bridged caller.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The scheduler context has not started yet or has shut down.
    #[error("scheduler context is not ready")]
    NotReady,

    /// No result arrived before the deadline.
    #[error("bridged request timed out after {0:?}")]
    TimedOut(Duration),

    /// The work ran and failed, or was dropped before replying.
    #[error("bridged request failed: {0}")]
    Failed(String),
}

impl From<BridgeError> for ServiceError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::NotReady => ServiceError::Unavailable(e.to_string()),
            BridgeError::TimedOut(_) => ServiceError::Timeout(e.to_string()),
            BridgeError::Failed(_) => ServiceError::Upstream(e.to_string()),
        }
    }
}

type Work = Box<dyn FnOnce(Arc<dyn CatalogProvider>) -> BoxFuture<'static, ()> + Send>;

/// One unit of bridged work in flight.
pub struct PendingRequest {
    id: Uuid,
    deadline: Instant,
    work: Work,
}

impl PendingRequest {
    /// Run the work in the current (scheduler) context, cancelling it at the
    /// deadline.
    async fn execute(self, provider: Arc<dyn CatalogProvider>) {
        let id = self.id;
        if Instant::now() >= self.deadline {
            debug!(request_id = %id, "dropping bridged request past its deadline");
            return;
        }
        let deadline = tokio::time::Instant::from_std(self.deadline);
        if tokio::time::timeout_at(deadline, (self.work)(provider))
            .await
            .is_err()
        {
            warn!(request_id = %id, "bridged request cancelled at deadline");
        }
    }
}

/// Handle used by request threads to reach the scheduler context.
///
/// Clones share the same inbound queue. Until the scheduler attaches its queue
/// every submission fails fast with [`BridgeError::NotReady`].
#[derive(Clone, Debug, Default)]
pub struct RequestBridge {
    inbound: Arc<OnceLock<UnboundedSender<PendingRequest>>>,
}

impl RequestBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether submissions can currently reach a running scheduler context.
    pub fn is_ready(&self) -> bool {
        self.inbound.get().is_some_and(|tx| !tx.is_closed())
    }

    /// Publish the scheduler's inbound queue. Only the first call wins.
    pub(crate) fn attach(&self, tx: UnboundedSender<PendingRequest>) -> bool {
        self.inbound.set(tx).is_ok()
    }

    /// Run `work` inside the scheduler context and block until it yields a
    /// result or `timeout` elapses.
    ///
    /// Blocks the calling thread; call from a plain thread or
    /// `tokio::task::spawn_blocking`, never directly from async code.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::NotReady`] if no scheduler context is attached or it
    ///   has shut down, including a shutdown that drops the queued request.
    /// - [`BridgeError::TimedOut`] if the deadline passes first.
    /// - [`BridgeError::Failed`] if the work returns an error or is dropped.
    pub fn submit_and_wait<T, E, F, Fut>(&self, work: F, timeout: Duration) -> Result<T, BridgeError>
    where
        T: Send + 'static,
        E: std::fmt::Display + Send + 'static,
        F: FnOnce(Arc<dyn CatalogProvider>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let tx = self.inbound.get().ok_or(BridgeError::NotReady)?;

        let (reply_tx, reply_rx) = crossbeam_channel::bounded::<Result<T, E>>(1);
        let deadline = Instant::now() + timeout;
        let request = PendingRequest {
            id: Uuid::new_v4(),
            deadline,
            work: Box::new(move |provider: Arc<dyn CatalogProvider>| {
                async move {
                    let result = work(provider).await;
                    // The caller may have given up already.
                    let _ = reply_tx.send(result);
                }
                .boxed()
            }),
        };
        let id = request.id;
        tx.send(request).map_err(|_| BridgeError::NotReady)?;
        debug!(request_id = %id, "bridged request submitted");

        match reply_rx.recv_timeout(timeout) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(BridgeError::Failed(e.to_string())),
            Err(RecvTimeoutError::Timeout) => Err(BridgeError::TimedOut(timeout)),
            Err(RecvTimeoutError::Disconnected) if Instant::now() >= deadline => {
                Err(BridgeError::TimedOut(timeout))
            }
            // Queued just before the scheduler stopped; dropped with the queue.
            Err(RecvTimeoutError::Disconnected) if tx.is_closed() => Err(BridgeError::NotReady),
            Err(RecvTimeoutError::Disconnected) => Err(BridgeError::Failed(
                "request dropped before completion".into(),
            )),
        }
    }
}

/// Scheduler-side loop: spawn each inbound request onto the current context
/// until shutdown or until every sender is gone.
pub(crate) async fn serve(
    mut inbound: UnboundedReceiver<PendingRequest>,
    provider: Arc<dyn CatalogProvider>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            next = inbound.recv() => match next {
                Some(request) => {
                    tokio::spawn(request.execute(Arc::clone(&provider)));
                }
                None => break,
            },
        }
    }
    // Refuse anything queued after this point.
    inbound.close();
    debug!("request bridge stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockCatalogProvider;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    /// Run `serve` on a dedicated current-thread runtime, as the scheduler does.
    fn running_bridge(provider: MockCatalogProvider) -> (RequestBridge, CancellationToken, thread::JoinHandle<()>) {
        let bridge = RequestBridge::new();
        let shutdown = CancellationToken::new();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        assert!(bridge.attach(tx));
        let provider: Arc<dyn CatalogProvider> = Arc::new(provider);
        let token = shutdown.clone();
        let handle = thread::spawn(move || {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
                .block_on(serve(rx, provider, token));
        });
        (bridge, shutdown, handle)
    }

    #[test]
    fn not_ready_before_attach_fails_fast() {
        let bridge = RequestBridge::new();
        assert!(!bridge.is_ready());

        let started = Instant::now();
        let result = bridge.submit_and_wait(
            |_p| async { Ok::<_, String>(1) },
            Duration::from_secs(30),
        );
        assert!(matches!(result, Err(BridgeError::NotReady)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn result_is_returned_to_caller() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_search_catalog()
            .withf(|q, n| q == "arijit" && *n == 3)
            .returning(|_, _| Ok(serde_json::json!({"data": {"results": []}})));
        let (bridge, shutdown, handle) = running_bridge(provider);
        assert!(bridge.is_ready());

        let payload = bridge
            .submit_and_wait(
                |p| async move { p.search_catalog("arijit", 3).await },
                Duration::from_secs(5),
            )
            .unwrap();
        assert!(payload["data"]["results"].is_array());

        shutdown.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn work_error_becomes_failed() {
        let (bridge, shutdown, handle) = running_bridge(MockCatalogProvider::new());
        let result = bridge.submit_and_wait(
            |_p| async { Err::<(), _>("upstream unavailable: 502") },
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(BridgeError::Failed(ref m)) if m.contains("502")));
        shutdown.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn timeout_unblocks_caller_and_cancels_work() {
        let (bridge, shutdown, handle) = running_bridge(MockCatalogProvider::new());
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let started = Instant::now();
        let result = bridge.submit_and_wait(
            move |_p| async move {
                tokio::time::sleep(Duration::from_millis(600)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<_, String>(())
            },
            Duration::from_millis(100),
        );
        assert!(matches!(result, Err(BridgeError::TimedOut(_))));
        assert!(started.elapsed() < Duration::from_millis(500));

        thread::sleep(Duration::from_millis(900));
        assert!(!finished.load(Ordering::SeqCst), "work should have been cancelled");

        shutdown.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn concurrent_callers_get_their_own_results() {
        let (bridge, shutdown, handle) = running_bridge(MockCatalogProvider::new());
        let callers: Vec<_> = (0..16u32)
            .map(|i| {
                let bridge = bridge.clone();
                thread::spawn(move || {
                    bridge.submit_and_wait(
                        move |_p| async move {
                            tokio::time::sleep(Duration::from_millis(u64::from(16 - i) * 5)).await;
                            Ok::<_, String>(i * 10)
                        },
                        Duration::from_secs(5),
                    )
                })
            })
            .collect();

        for (i, caller) in callers.into_iter().enumerate() {
            assert_eq!(caller.join().unwrap().unwrap(), i as u32 * 10);
        }
        shutdown.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn not_ready_after_shutdown() {
        let (bridge, shutdown, handle) = running_bridge(MockCatalogProvider::new());
        shutdown.cancel();
        handle.join().unwrap();

        assert!(!bridge.is_ready());
        let result = bridge.submit_and_wait(|_p| async { Ok::<_, String>(()) }, Duration::from_secs(5));
        assert!(matches!(result, Err(BridgeError::NotReady)));
    }

    #[test]
    fn request_dropped_by_closing_queue_is_not_ready() {
        let bridge = RequestBridge::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<PendingRequest>();
        assert!(bridge.attach(tx));
        let closer = thread::spawn(move || {
            let request = rx.blocking_recv();
            rx.close();
            drop(request);
        });

        let started = Instant::now();
        let result = bridge.submit_and_wait(|_p| async { Ok::<_, String>(()) }, Duration::from_secs(5));
        closer.join().unwrap();

        assert!(matches!(result, Err(BridgeError::NotReady)), "{result:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!bridge.is_ready());
    }

    #[test]
    fn bridge_errors_map_to_service_errors() {
        assert_eq!(ServiceError::from(BridgeError::NotReady).http_status(), 503);
        assert_eq!(
            ServiceError::from(BridgeError::TimedOut(Duration::from_secs(1))).http_status(),
            500
        );
        assert_eq!(ServiceError::from(BridgeError::Failed("x".into())).http_status(), 500);
    }

    #[test]
    fn attach_only_once() {
        let bridge = RequestBridge::new();
        let (tx1, _rx1) = tokio::sync::mpsc::unbounded_channel();
        let (tx2, _rx2) = tokio::sync::mpsc::unbounded_channel();
        assert!(bridge.attach(tx1));
        assert!(!bridge.attach(tx2));
    }
}
