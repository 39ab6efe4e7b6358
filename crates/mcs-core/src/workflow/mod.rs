//! Start and stop workflows.
//!
//! A start run raises the desired count, waits, then polls for the task address with
//! exponential backoff until it shows up, the attempts run out or the overall timeout fires.
//! The address is then handed to DNS reconciliation. A stop run lowers the desired count and
//! cancels any start run still polling.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Instant,
};

use mcs_model::{
    AddressLookup, ExecutionId, ExecutionInfo, ExecutionKind, ExecutionStatus, TaskAddress,
    WorkflowConfig,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{Controller, CoreError, ExecutionState, MetricsHandle, NoopMetrics};

/// Result of asking for a new run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// A new run was spawned.
    Started(ExecutionId),
    /// A start run was already in flight; its id is returned instead.
    Joined(ExecutionId),
}

impl Launch {
    pub fn id(&self) -> &ExecutionId {
        match self {
            Launch::Started(id) | Launch::Joined(id) => id,
        }
    }
}

/// Runs start/stop workflows in the background and records them in an [`ExecutionState`].
#[derive(Clone)]
pub struct WorkflowRunner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    controller: Arc<Controller>,
    config: WorkflowConfig,
    state: ExecutionState,
    metrics: MetricsHandle,
    shutdown: CancellationToken,
    /// Cancellation handles of start runs still in flight.
    active: Mutex<HashMap<ExecutionId, CancellationToken>>,
    /// Serializes launches so two concurrent /start calls join the same run.
    launch: Mutex<()>,
}

impl WorkflowRunner {
    pub fn new(controller: Arc<Controller>, config: WorkflowConfig) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                controller,
                config,
                state: ExecutionState::new(),
                metrics: NoopMetrics::handle(),
                shutdown: CancellationToken::new(),
                active: Mutex::new(HashMap::new()),
                launch: Mutex::new(()),
            }),
        }
    }

    /// Builder-style setters; only valid before the runner is cloned.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.metrics = metrics;
        }
        self
    }

    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.shutdown = token;
        }
        self
    }

    pub fn with_state(mut self, state: ExecutionState) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.state = state;
        }
        self
    }

    pub fn controller(&self) -> &Arc<Controller> {
        &self.inner.controller
    }

    pub fn state(&self) -> &ExecutionState {
        &self.inner.state
    }

    /// Spawn a start run, or join the one already in flight.
    pub fn launch_start(&self) -> Launch {
        let _guard = self
            .inner
            .launch
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(running) = self.inner.state.active(ExecutionKind::Start) {
            debug!(execution = %running.id, "start already in flight");
            return Launch::Joined(running.id);
        }

        let (id, cancel) = self.register(ExecutionKind::Start);
        let runner = self.clone();
        let run_id = id.clone();
        tokio::spawn(async move {
            runner.drive(run_id, ExecutionKind::Start, cancel).await;
        });
        Launch::Started(id)
    }

    /// Spawn a stop run. In-flight start runs are canceled first.
    pub fn launch_stop(&self) -> Launch {
        let _guard = self
            .inner
            .launch
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.cancel_starts();
        let (id, cancel) = self.register(ExecutionKind::Stop);
        let runner = self.clone();
        let run_id = id.clone();
        tokio::spawn(async move {
            runner.drive(run_id, ExecutionKind::Stop, cancel).await;
        });
        Launch::Started(id)
    }

    /// Run a start workflow to completion on the current task.
    pub async fn run_start(&self) -> ExecutionInfo {
        let (id, cancel) = self.register(ExecutionKind::Start);
        self.drive(id, ExecutionKind::Start, cancel).await
    }

    /// Run a stop workflow to completion on the current task.
    pub async fn run_stop(&self) -> ExecutionInfo {
        self.cancel_starts();
        let (id, cancel) = self.register(ExecutionKind::Stop);
        self.drive(id, ExecutionKind::Stop, cancel).await
    }

    fn register(&self, kind: ExecutionKind) -> (ExecutionId, CancellationToken) {
        let id = ExecutionId::generate();
        let cancel = self.inner.shutdown.child_token();
        self.inner.state.add(id.clone(), kind);
        if kind == ExecutionKind::Start {
            self.inner
                .active
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id.clone(), cancel.clone());
        }
        (id, cancel)
    }

    /// Cancel every start run in flight and mark it failed before returning, so a start
    /// launched right after never joins a canceled run.
    fn cancel_starts(&self) {
        let canceled: Vec<_> = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (id, token) in canceled {
            info!(execution = %id, "canceling start run");
            token.cancel();
            self.inner.state.finish(
                &id,
                ExecutionStatus::Failed,
                Some(CoreError::Canceled.to_string()),
            );
        }
    }

    #[instrument(skip(self, id), fields(execution = %id))]
    async fn drive(
        &self,
        id: ExecutionId,
        kind: ExecutionKind,
        cancel: CancellationToken,
    ) -> ExecutionInfo {
        let state = &self.inner.state;
        let began = Instant::now();

        let timeout = self.inner.config.timeout();
        let result = if cancel.is_cancelled() || !state.begin(&id) {
            debug!(%kind, "run canceled before it began");
            Err(CoreError::Canceled)
        } else {
            let steps = async {
                match kind {
                    ExecutionKind::Start => self.start_steps(&id, &cancel).await.map(|_| ()),
                    ExecutionKind::Stop => self.inner.controller.stop().await.map(|_| ()),
                }
            };
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(CoreError::Canceled),
                res = tokio::time::timeout(timeout, steps) => {
                    res.unwrap_or(Err(CoreError::Timeout(timeout)))
                }
            }
        };

        let status = match &result {
            Ok(()) => ExecutionStatus::Succeeded,
            Err(e) if e.is_timeout() => ExecutionStatus::TimedOut,
            Err(_) => ExecutionStatus::Failed,
        };
        match &result {
            Ok(()) => info!(%kind, "workflow succeeded"),
            Err(e) => warn!(%kind, error = %e, ?status, "workflow did not succeed"),
        }
        let status = state.finish(&id, status, result.err().map(|e| e.to_string()));

        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        self.inner
            .metrics
            .record_execution(kind, status, began.elapsed());

        match state.get(&id) {
            Some(info) => info,
            None => {
                let mut info = ExecutionInfo::new(id, kind);
                info.status = status;
                info
            }
        }
    }

    async fn start_steps(
        &self,
        id: &ExecutionId,
        cancel: &CancellationToken,
    ) -> Result<TaskAddress, CoreError> {
        let controller = &self.inner.controller;
        let cfg = &self.inner.config;
        let state = &self.inner.state;

        controller.start().await?;
        tokio::time::sleep(cfg.initial_wait()).await;

        let mut attempt = 0;
        let address = loop {
            state.increment_attempt(id);
            match controller.get_ip().await? {
                AddressLookup::Ready { task, address } => {
                    info!(task = task.short_id(), %address, attempt, "task address resolved");
                    break address;
                }
                AddressLookup::NotRunning => return Err(CoreError::StoppedDuringStart),
                AddressLookup::Pending { task } => {
                    debug!(task = ?task.as_ref().map(|t| t.short_id()), attempt, "address not ready");
                }
            }

            attempt += 1;
            if attempt >= cfg.max_attempts {
                return Err(CoreError::AddressTimeout { attempts: attempt });
            }
            tokio::select! {
                _ = tokio::time::sleep(cfg.poll_delay(attempt - 1)) => {}
                _ = cancel.cancelled() => return Err(CoreError::Canceled),
            }
        };
        state.set_address(id, address);

        let dns = controller.update_dns(address).await?;
        state.set_dns(id, dns);
        Ok(address)
    }
}
