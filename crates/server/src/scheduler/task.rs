//! One periodic fetch → normalize → publish → sleep pipeline.
//!
//! Every dataset the service refreshes is an instance of [`RefreshTask`],
//! differing only in its fetch function, its transform, and its [`Sink`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use arc_swap::ArcSwap;
use chrono::Utc;
use common::protocol::{TaskOutcome, TaskPhase, TaskReport};
use common::CanonicalRecord;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::RecordSlot;
use crate::catalog::CatalogError;
use crate::provider::CatalogProvider;
use crate::store::RemoteStore;

/// Interval used when a task is built without one.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(7200);

/// Fetch step: call the provider and pull the raw record list out of its payload.
pub type FetchFn = Arc<
    dyn Fn(Arc<dyn CatalogProvider>) -> BoxFuture<'static, Result<Vec<Value>, CatalogError>>
        + Send
        + Sync,
>;

/// Normalize/dedupe step. Infallible: bad records degrade to defaults.
pub type TransformFn = Arc<dyn Fn(Vec<Value>) -> Vec<CanonicalRecord> + Send + Sync>;

/// Where a successful cycle's records go.
pub enum Sink {
    /// Publish into a cache slot.
    Cache(RecordSlot),
    /// Publish into the slot, then mirror the same records.
    CacheAndMirror {
        slot: RecordSlot,
        store: Arc<dyn RemoteStore>,
        node: String,
    },
}

impl Sink {
    fn slot(&self) -> &RecordSlot {
        match self {
            Sink::Cache(slot) | Sink::CacheAndMirror { slot, .. } => slot,
        }
    }

    async fn deliver(&self, records: Vec<CanonicalRecord>) -> Result<(), CatalogError> {
        match self {
            Sink::Cache(slot) => {
                debug!(slot = slot.name(), records = records.len(), "publishing");
                slot.publish(records);
                Ok(())
            }
            Sink::CacheAndMirror { slot, store, node } => {
                let value = to_document(&records)?;
                debug!(slot = slot.name(), records = records.len(), "publishing");
                slot.publish(records);
                store.write_node(node, &value).await?;
                debug!(node = %node, "mirrored");
                Ok(())
            }
        }
    }
}

fn to_document(records: &[CanonicalRecord]) -> Result<Value, CatalogError> {
    serde_json::to_value(records).map_err(|e| CatalogError::RemoteStoreWriteFailed(e.to_string()))
}

/// Cheap, cloneable read handle on a task's latest [`TaskReport`].
#[derive(Clone, Debug)]
pub struct TaskStatus(Arc<ArcSwap<TaskReport>>);

impl TaskStatus {
    fn new(name: &str, interval: Duration) -> Self {
        Self(Arc::new(ArcSwap::from_pointee(TaskReport::pending(
            name,
            interval.as_secs(),
        ))))
    }

    pub fn report(&self) -> TaskReport {
        TaskReport::clone(&self.0.load())
    }

    fn set_phase(&self, phase: TaskPhase) {
        self.0.rcu(|cur| TaskReport {
            phase,
            ..TaskReport::clone(cur)
        });
    }

    fn finish(&self, outcome: TaskOutcome) {
        self.0.rcu(|cur| TaskReport {
            phase: TaskPhase::Idle,
            last_run_at: Some(Utc::now()),
            last_outcome: Some(outcome.clone()),
            ..TaskReport::clone(cur)
        });
    }
}

/// A periodic refresh pipeline bound to one sink.
pub struct RefreshTask {
    name: String,
    interval: Duration,
    fetch: FetchFn,
    transform: TransformFn,
    sink: Sink,
    status: TaskStatus,
}

impl RefreshTask {
    pub fn builder(name: impl Into<String>) -> RefreshTaskBuilder {
        RefreshTaskBuilder {
            name: name.into(),
            interval: DEFAULT_INTERVAL,
            fetch: None,
            transform: None,
            sink: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn status(&self) -> TaskStatus {
        self.status.clone()
    }

    /// One fetch → normalize → publish pass. Returns the number of records
    /// delivered.
    ///
    /// # Errors
    ///
    /// Returns the first stage error; [`CatalogError::EmptyResult`] when the
    /// transform produced nothing, in which case the sink is not touched.
    pub async fn run_cycle(
        &self,
        provider: Arc<dyn CatalogProvider>,
    ) -> Result<usize, CatalogError> {
        self.status.set_phase(TaskPhase::Fetching);
        let raw = (self.fetch)(provider).await?;

        self.status.set_phase(TaskPhase::Normalizing);
        let records = (self.transform)(raw);
        if records.is_empty() {
            return Err(CatalogError::EmptyResult);
        }

        self.status.set_phase(TaskPhase::Publishing);
        let count = records.len();
        self.sink.deliver(records).await?;
        Ok(count)
    }

    /// Run one cycle and record its outcome in the task status, the log, and
    /// (on failure) the slot's last error. Never propagates the failure.
    pub async fn run_once(&self, provider: Arc<dyn CatalogProvider>) -> TaskOutcome {
        let outcome = match self.run_cycle(provider).await {
            Ok(records) => {
                info!(task = %self.name, records, "refresh cycle complete");
                TaskOutcome::Ok { records }
            }
            Err(e) => {
                warn!(task = %self.name, error = %e, "refresh cycle failed; retaining previous data");
                self.sink.slot().record_failure(&e);
                TaskOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        self.status.finish(outcome.clone());
        outcome
    }

    /// Loop forever: run a cycle, sleep the interval, repeat. Stops at the
    /// next sleep after `shutdown` is cancelled; a cycle in flight always runs
    /// to completion.
    pub async fn run(self, provider: Arc<dyn CatalogProvider>, shutdown: CancellationToken) {
        info!(
            task = %self.name,
            interval_secs = self.interval.as_secs(),
            "refresh task started"
        );
        loop {
            self.run_once(Arc::clone(&provider)).await;
            self.status.set_phase(TaskPhase::Sleeping);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!(task = %self.name, "refresh task stopped");
    }
}

/// Builder for [`RefreshTask`].
pub struct RefreshTaskBuilder {
    name: String,
    interval: Duration,
    fetch: Option<FetchFn>,
    transform: Option<TransformFn>,
    sink: Option<Sink>,
}

impl RefreshTaskBuilder {
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn fetch<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<dyn CatalogProvider>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Value>, CatalogError>> + Send + 'static,
    {
        self.fetch = Some(Arc::new(move |provider| f(provider).boxed()));
        self
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Vec<CanonicalRecord> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    pub fn sink(mut self, sink: Sink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// # Errors
    ///
    /// Returns an error if the fetch, transform, or sink was never set, or the
    /// interval is zero.
    pub fn build(self) -> Result<RefreshTask> {
        let name = self.name;
        if self.interval.is_zero() {
            anyhow::bail!("refresh task '{name}' has a zero interval");
        }
        let fetch = self
            .fetch
            .ok_or_else(|| anyhow::anyhow!("refresh task '{name}' has no fetch step"))?;
        let transform = self
            .transform
            .ok_or_else(|| anyhow::anyhow!("refresh task '{name}' has no transform step"))?;
        let sink = self
            .sink
            .ok_or_else(|| anyhow::anyhow!("refresh task '{name}' has no sink"))?;
        let status = TaskStatus::new(&name, self.interval);
        Ok(RefreshTask {
            name,
            interval: self.interval,
            fetch,
            transform,
            sink,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheSlot;
    use crate::catalog::{normalize, RawKind};
    use crate::provider::MockCatalogProvider;
    use crate::store::{MockRemoteStore, StoreError};
    use serde_json::json;

    fn provider() -> Arc<dyn CatalogProvider> {
        Arc::new(MockCatalogProvider::new())
    }

    fn songs(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({"id": format!("s{i}"), "title": format!("Song {i}")}))
            .collect()
    }

    fn as_songs(raw: Vec<Value>) -> Vec<CanonicalRecord> {
        raw.iter().map(|r| normalize(r, RawKind::Song)).collect()
    }

    fn task_with(raw: Result<Vec<Value>, &'static str>, sink: Sink) -> RefreshTask {
        RefreshTask::builder("test")
            .fetch(move |_provider| {
                let raw = raw.clone();
                async move { raw.map_err(|m| CatalogError::UpstreamUnavailable(m.into())) }
            })
            .transform(as_songs)
            .sink(sink)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn successful_cycle_publishes() {
        let slot = CacheSlot::new("s");
        let task = task_with(Ok(songs(3)), Sink::Cache(slot.clone()));

        let outcome = task.run_once(provider()).await;

        assert_eq!(outcome, TaskOutcome::Ok { records: 3 });
        assert_eq!(slot.read().len(), 3);
        let report = task.status().report();
        assert!(report.last_run_at.is_some());
        assert_eq!(report.last_outcome, Some(TaskOutcome::Ok { records: 3 }));
    }

    #[tokio::test]
    async fn failed_cycle_keeps_previous_value() {
        let slot = CacheSlot::new("s");
        task_with(Ok(songs(2)), Sink::Cache(slot.clone()))
            .run_once(provider())
            .await;
        let before = slot.read();

        let outcome = task_with(Err("connection reset"), Sink::Cache(slot.clone()))
            .run_once(provider())
            .await;

        assert!(matches!(outcome, TaskOutcome::Failed { ref reason } if reason.contains("connection reset")));
        assert_eq!(*slot.read(), *before);
        assert!(slot.report().last_error.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn empty_result_is_soft_failure() {
        let slot = CacheSlot::new("s");
        slot.publish(as_songs(songs(4)));

        let task = task_with(Ok(Vec::new()), Sink::Cache(slot.clone()));
        let err = task.run_cycle(provider()).await.unwrap_err();

        assert!(matches!(err, CatalogError::EmptyResult));
        assert_eq!(slot.read().len(), 4);
    }

    #[tokio::test]
    async fn cache_and_mirror_writes_whole_sequence() {
        let slot = CacheSlot::new("now_trending");
        let mut store = MockRemoteStore::new();
        store
            .expect_write_node()
            .withf(|node, value| {
                node == "/now_trending" && value.as_array().map(Vec::len) == Some(5)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let task = task_with(
            Ok(songs(5)),
            Sink::CacheAndMirror {
                slot: slot.clone(),
                store: Arc::new(store),
                node: "/now_trending".into(),
            },
        );

        assert_eq!(task.run_cycle(provider()).await.unwrap(), 5);
        assert_eq!(slot.read().len(), 5);
    }

    #[tokio::test]
    async fn mirror_failure_is_recorded() {
        let slot = CacheSlot::new("random_albums");
        let mut store = MockRemoteStore::new();
        store
            .expect_write_node()
            .returning(|_, _| Err(StoreError::WriteFailed("permission denied".into())));

        let task = task_with(
            Ok(songs(2)),
            Sink::CacheAndMirror {
                slot: slot.clone(),
                store: Arc::new(store),
                node: "/random_albums".into(),
            },
        );
        let outcome = task.run_once(provider()).await;

        assert!(matches!(outcome, TaskOutcome::Failed { ref reason } if reason.contains("permission denied")));
        assert_eq!(slot.read().len(), 2);
        assert!(slot.report().last_error.is_some());
    }

    #[test]
    fn builder_requires_every_step() {
        let missing_fetch = RefreshTask::builder("x")
            .transform(as_songs)
            .sink(Sink::Cache(CacheSlot::new("x")))
            .build();
        assert!(missing_fetch.is_err());

        let zero_interval = RefreshTask::builder("x")
            .interval(Duration::ZERO)
            .fetch(|_p| async { Ok(Vec::new()) })
            .transform(as_songs)
            .sink(Sink::Cache(CacheSlot::new("x")))
            .build();
        assert!(zero_interval.is_err());
    }

    #[test]
    fn new_task_reports_pending() {
        let task = task_with(Ok(Vec::new()), Sink::Cache(CacheSlot::new("s")));
        let report = task.status().report();
        assert_eq!(report.name, "test");
        assert_eq!(report.interval_secs, 7200);
        assert_eq!(report.phase, TaskPhase::Idle);
        assert!(report.last_outcome.is_none());
    }

    #[tokio::test]
    async fn run_loop_stops_on_shutdown() {
        let slot = CacheSlot::new("s");
        let task = task_with(Ok(songs(1)), Sink::Cache(slot.clone()));
        let status = task.status();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(task.run(provider(), shutdown.clone()));

        for _ in 0..100 {
            if status.report().last_run_at.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(slot.read().len(), 1);
        assert_eq!(status.report().phase, TaskPhase::Sleeping);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("task did not stop")
            .unwrap();
    }
}
