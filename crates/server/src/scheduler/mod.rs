//! The scheduler context: one dedicated OS thread running a single-threaded
//! cooperative runtime.
//!
//! Every refresh task and every bridged request runs here, so the shared
//! [`CatalogProvider`] is only ever driven from this context. The HTTP server
//! runs on its own runtime and reaches in through [`RequestBridge`].
//!
//! Startup order inside the context:
//! 1. spawn the bridge loop and every registered [`RefreshTask`];
//! 2. attach the bridge queue so submissions start succeeding;
//! 3. signal readiness;
//! 4. park until the shutdown token is cancelled.

pub mod pipelines;
pub mod task;

use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub use task::{RefreshTask, TaskStatus};

use crate::bridge::{self, RequestBridge};
use crate::provider::CatalogProvider;

const THREAD_NAME: &str = "sanvia-scheduler";

/// Owns the refresh tasks until [`Scheduler::start`] moves them into the
/// scheduler thread.
pub struct Scheduler {
    provider: Arc<dyn CatalogProvider>,
    bridge: RequestBridge,
    tasks: Vec<RefreshTask>,
}

impl Scheduler {
    pub fn new(provider: Arc<dyn CatalogProvider>, bridge: RequestBridge) -> Self {
        Self {
            provider,
            bridge,
            tasks: Vec::new(),
        }
    }

    pub fn with_tasks(mut self, tasks: impl IntoIterator<Item = RefreshTask>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    /// Status handles for every registered task. Collect these before
    /// calling [`Scheduler::start`].
    pub fn task_statuses(&self) -> Vec<TaskStatus> {
        self.tasks.iter().map(RefreshTask::status).collect()
    }

    /// Spawn the scheduler thread and return immediately.
    ///
    /// Await [`SchedulerHandle::ready`] before serving traffic; until then
    /// bridged submissions fail with `NotReady`.
    pub fn start(self, shutdown: CancellationToken) -> Result<SchedulerHandle> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let Scheduler {
            provider,
            bridge,
            tasks,
        } = self;

        let thread = std::thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!(error = %e, "failed to build scheduler runtime");
                        return;
                    }
                };
                runtime.block_on(run_context(provider, bridge, tasks, shutdown, ready_tx));
            })
            .context("spawning scheduler thread")?;

        Ok(SchedulerHandle {
            ready: Some(ready_rx),
            thread: Some(thread),
        })
    }
}

async fn run_context(
    provider: Arc<dyn CatalogProvider>,
    bridge: RequestBridge,
    tasks: Vec<RefreshTask>,
    shutdown: CancellationToken,
    ready: oneshot::Sender<()>,
) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let bridge_loop = tokio::spawn(bridge::serve(rx, Arc::clone(&provider), shutdown.clone()));

    let task_count = tasks.len();
    let mut running = Vec::with_capacity(task_count);
    for task in tasks {
        debug!(
            task = task.name(),
            interval_secs = task.interval().as_secs(),
            "spawning refresh task"
        );
        running.push(tokio::spawn(task.run(Arc::clone(&provider), shutdown.clone())));
    }

    if !bridge.attach(tx) {
        error!("request bridge was already attached to another scheduler");
    }
    info!(tasks = task_count, "scheduler context ready");
    // The handle may have been dropped; the context keeps running regardless.
    let _ = ready.send(());

    shutdown.cancelled().await;
    info!("scheduler shutting down");

    let _ = bridge_loop.await;
    for handle in running {
        if let Err(e) = handle.await {
            error!(error = %e, "refresh task terminated abnormally");
        }
    }
    info!("scheduler stopped");
}

/// Handle on a started scheduler thread.
pub struct SchedulerHandle {
    ready: Option<oneshot::Receiver<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Resolve once the scheduler context is accepting bridged work.
    pub async fn ready(&mut self) -> Result<()> {
        match self.ready.take() {
            Some(rx) => rx
                .await
                .map_err(|_| anyhow!("scheduler exited before becoming ready")),
            None => Ok(()),
        }
    }

    /// Wait for the scheduler thread to exit. Cancel the shutdown token first
    /// or this blocks forever.
    pub fn join(mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| anyhow!("scheduler thread panicked")),
            None => Ok(()),
        }
    }
}
