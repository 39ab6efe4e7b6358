use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::SystemTime,
};

use mcs_model::{
    DnsOutcome, ExecutionId, ExecutionInfo, ExecutionKind, ExecutionPage, ExecutionQuery,
    ExecutionStatus, TaskAddress,
};

const DEFAULT_HISTORY: usize = 512;

/// In-memory record of workflow runs, newest first.
///
/// Finished runs beyond the history bound are evicted oldest first; active runs are never evicted.
#[derive(Clone)]
pub struct ExecutionState {
    inner: Arc<RwLock<StateInner>>,
}

struct StateInner {
    runs: HashMap<ExecutionId, ExecutionInfo>,
    /// Insertion order, oldest at the front.
    order: VecDeque<ExecutionId>,
    history: usize,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }

    /// Keep at most `history` finished runs.
    pub fn with_history(history: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StateInner {
                runs: HashMap::new(),
                order: VecDeque::new(),
                history: history.max(1),
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StateInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StateInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new pending run.
    pub fn add(&self, id: ExecutionId, kind: ExecutionKind) {
        let mut inner = self.write();
        inner
            .runs
            .insert(id.clone(), ExecutionInfo::new(id.clone(), kind));
        inner.order.push_back(id);
        inner.evict();
    }

    pub fn update_status(&self, id: &ExecutionId, status: ExecutionStatus, error: Option<String>) {
        self.modify(id, |info| {
            info.status = status;
            if let Some(err) = error {
                info.error = Some(err);
            }
        });
    }

    /// Move a pending run to running; returns `false` if it already finished.
    pub fn begin(&self, id: &ExecutionId) -> bool {
        let mut begun = false;
        self.modify(id, |info| {
            if info.status.is_active() {
                info.status = ExecutionStatus::Running;
                begun = true;
            }
        });
        begun
    }

    /// Record the outcome unless the run already finished; returns the status it ended with.
    pub fn finish(
        &self,
        id: &ExecutionId,
        status: ExecutionStatus,
        error: Option<String>,
    ) -> ExecutionStatus {
        let mut ended = status;
        self.modify(id, |info| {
            if info.status.is_terminal() {
                ended = info.status;
            } else {
                info.status = status;
                info.error = error;
            }
        });
        ended
    }

    /// Count one address poll.
    pub fn increment_attempt(&self, id: &ExecutionId) {
        self.modify(id, |info| info.attempts += 1);
    }

    pub fn set_address(&self, id: &ExecutionId, address: TaskAddress) {
        self.modify(id, |info| info.address = Some(address));
    }

    pub fn set_dns(&self, id: &ExecutionId, dns: DnsOutcome) {
        self.modify(id, |info| info.dns = Some(dns));
    }

    fn modify(&self, id: &ExecutionId, f: impl FnOnce(&mut ExecutionInfo)) {
        let mut inner = self.write();
        if let Some(info) = inner.runs.get_mut(id) {
            f(info);
            info.updated_at = SystemTime::now();
        }
        if inner.runs.get(id).is_some_and(|i| i.status.is_terminal()) {
            inner.evict();
        }
    }

    pub fn get(&self, id: &ExecutionId) -> Option<ExecutionInfo> {
        self.read().runs.get(id).cloned()
    }

    /// Most recent run of `kind` that has not finished yet.
    pub fn active(&self, kind: ExecutionKind) -> Option<ExecutionInfo> {
        let inner = self.read();
        inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.runs.get(id))
            .find(|info| info.kind == kind && info.status.is_active())
            .cloned()
    }

    /// Most recent run of `kind`, finished or not.
    pub fn latest(&self, kind: ExecutionKind) -> Option<ExecutionInfo> {
        let inner = self.read();
        inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.runs.get(id))
            .find(|info| info.kind == kind)
            .cloned()
    }

    /// Filter and paginate, newest first.
    ///
    /// `total` counts matches before pagination.
    pub fn query(&self, q: &ExecutionQuery) -> ExecutionPage<ExecutionInfo> {
        let inner = self.read();

        let matching: Vec<&ExecutionInfo> = inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.runs.get(id))
            .filter(|info| q.kind.is_none_or(|k| info.kind == k))
            .filter(|info| q.status.is_none_or(|s| info.status == s))
            .collect();

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(q.offset)
            .take(q.limit)
            .cloned()
            .collect();

        ExecutionPage { items, total }
    }

    pub fn len(&self) -> usize {
        self.read().runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateInner {
    fn evict(&mut self) {
        let finished = self
            .runs
            .values()
            .filter(|i| i.status.is_terminal())
            .count();
        let mut excess = finished.saturating_sub(self.history);
        if excess == 0 {
            return;
        }
        let runs = &mut self.runs;
        self.order.retain(|id| {
            if excess > 0 && runs.get(id).is_some_and(|i| i.status.is_terminal()) {
                runs.remove(id);
                excess -= 1;
                false
            } else {
                true
            }
        });
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new()
    }
}
