//! Task graph orchestration: registration, the run/drain protocol, and reuse.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use futures::FutureExt;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::GraphConfig;
use crate::core::context::TaskContext;
use crate::core::error::SchedulerError;
use crate::core::pool::WorkerPool;
use crate::core::signal::Signal;
use crate::core::task::{Task, TaskFailure};

/// Identifier naming one task and its completion signal.
///
/// Ids are small, dense, caller-chosen integers: each indexes one slot of
/// the graph's signal table, so every id used with a graph must be below its
/// configured `max_signals`. Ids above the table are a programming error
/// and panic. An id may also name a pure milestone signal with no task
/// registered behind it, raised only via
/// [`TaskContext::signal`](crate::TaskContext::signal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(usize);

impl TaskId {
    /// Create an id from a raw signal-table index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The raw signal-table index of this id.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for TaskId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of graph activity.
#[derive(Debug, Clone, Default)]
pub struct GraphStats {
    /// Number of worker threads in the pool.
    pub worker_count: usize,
    /// Capacity of the signal table.
    pub max_signals: usize,
    /// Tasks currently registered (since the last reset).
    pub registered_tasks: usize,
    /// Completed `run` calls over the graph's lifetime.
    pub completed_runs: u64,
    /// Task bodies driven to completion over the graph's lifetime.
    pub completed_tasks: u64,
    /// Individual polls delivered to task bodies over the graph's lifetime.
    pub futures_polled: u64,
}

/// Mutable state of the current run, guarded by the graph lock.
///
/// Kept separate from the pool's queue lock so completion bookkeeping does
/// not contend with the scheduling hot path.
#[derive(Default)]
struct RunState {
    /// Tasks submitted but not yet finished in this run.
    pending: usize,
    /// Panics captured from task bodies, in completion order.
    failures: Vec<TaskFailure>,
}

/// State shared between the graph, its task cells, and task contexts.
pub(crate) struct GraphShared {
    signals: Box<[Signal]>,
    run: Mutex<RunState>,
    drained_cv: Condvar,
    tasks_completed: AtomicU64,
}

impl GraphShared {
    pub fn new(max_signals: usize) -> Self {
        Self {
            signals: (0..max_signals).map(|_| Signal::default()).collect(),
            run: Mutex::new(RunState::default()),
            drained_cv: Condvar::new(),
            tasks_completed: AtomicU64::new(0),
        }
    }

    /// Signal slot for `id`. Panics on out-of-range ids; a misconfigured
    /// graph is not a recoverable condition.
    pub fn signal(&self, id: TaskId) -> &Signal {
        assert!(
            id.index() < self.signals.len(),
            "task id {id} out of range: signal table capacity is {}",
            self.signals.len()
        );
        &self.signals[id.index()]
    }

    pub fn max_signals(&self) -> usize {
        self.signals.len()
    }

    /// Arm the pending counter for a batch of `count` tasks.
    pub fn arm(&self, count: usize) {
        let mut run = self.run.lock();
        debug_assert_eq!(run.pending, 0, "previous run still pending");
        run.pending = count;
    }

    /// Block until every armed task has finished, then hand back the panics
    /// captured along the way.
    pub fn wait_drained(&self) -> Vec<TaskFailure> {
        let mut run = self.run.lock();
        while run.pending > 0 {
            self.drained_cv.wait(&mut run);
        }
        std::mem::take(&mut run.failures)
    }

    /// Completion hook, invoked exactly once per task body: record any
    /// captured panic, raise the task's own signal so waiters drain, then
    /// retire the task from the pending count, waking `run` at zero.
    pub fn on_task_finished(&self, id: TaskId, panic_payload: Option<Box<dyn Any + Send>>) {
        let failed = panic_payload.is_some();
        if let Some(payload) = panic_payload {
            let mut run = self.run.lock();
            run.failures.push(TaskFailure { id, payload });
        }
        let woken = self.signal(id).raise();
        debug!(task = %id, woken, failed, "task finished");
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        let mut run = self.run.lock();
        run.pending -= 1;
        if run.pending == 0 {
            self.drained_cv.notify_all();
        }
    }

    /// Clear every signal and all run bookkeeping for the next cycle.
    /// Returns the number of stale waiters dropped.
    pub fn reset_all(&self) -> usize {
        let mut stale = 0;
        for signal in &self.signals {
            stale += signal.reset();
        }
        let mut run = self.run.lock();
        run.pending = 0;
        run.failures.clear();
        stale
    }

    #[cfg(test)]
    pub fn take_failures(&self) -> Vec<TaskFailure> {
        std::mem::take(&mut self.run.lock().failures)
    }

    pub fn completed_tasks(&self) -> u64 {
        self.tasks_completed.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.run.lock().pending
    }
}

/// A reusable graph of interdependent tasks scheduled over a fixed worker
/// pool.
///
/// Register one body per [`TaskId`] with [`add`](Self::add), execute the
/// whole batch with [`run`](Self::run), and [`reset`](Self::reset) to reuse
/// the graph (and its threads) for the next cycle. Bodies synchronize
/// through one-shot broadcast signals via their [`TaskContext`]: a task's
/// own signal is raised automatically when it finishes, and bodies can raise
/// extra milestone signals mid-flight.
///
/// The exclusive receivers on `add`, `run`, and `reset` make overlapped
/// calls impossible; `run` additionally blocks until the batch drains, so a
/// graph observed outside `run` is never mid-flight.
pub struct Graph {
    // Field order is load-bearing for drop: task cells and the submit
    // handle hold queue senders and must die before the pool, whose drop
    // disconnects and joins the workers.
    tasks: Vec<Option<Arc<Task>>>,
    queue: Sender<Arc<Task>>,
    shared: Arc<GraphShared>,
    drained: bool,
    completed_runs: u64,
    pool: WorkerPool,
}

impl Graph {
    /// Create a graph with `worker_threads` workers (`0` selects one per
    /// logical CPU, minimum one) and a signal table of `max_signals` slots.
    ///
    /// # Panics
    ///
    /// Panics if `max_signals` is zero or a worker thread cannot be
    /// spawned. Use [`with_config`](Self::with_config) to handle those as
    /// errors instead.
    #[must_use]
    pub fn new(worker_threads: usize, max_signals: usize) -> Self {
        match Self::with_config(GraphConfig::new(worker_threads, max_signals)) {
            Ok(graph) => graph,
            Err(err) => panic!("graph construction failed: {err}"),
        }
    }

    /// Create a graph from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if validation fails and
    /// [`SchedulerError::Spawn`] if a worker thread cannot be started.
    pub fn with_config(config: GraphConfig) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        let (pool, queue) = WorkerPool::new(&config)?;
        let shared = Arc::new(GraphShared::new(config.max_signals));
        info!(
            worker_count = pool.worker_count(),
            max_signals = config.max_signals,
            "graph ready"
        );
        Ok(Self {
            tasks: vec![None; config.max_signals],
            queue,
            shared,
            drained: false,
            completed_runs: 0,
            pool,
        })
    }

    /// Register the task body for `id`.
    ///
    /// The callable is invoked immediately with a [`TaskContext`] bound to
    /// this graph and returns the body future; no body code executes until
    /// [`run`](Self::run) schedules it.
    ///
    /// # Panics
    ///
    /// Panics if `id` is outside the signal table, if `id` already has a
    /// body registered in this cycle, or if the previous run has not been
    /// [`reset`](Self::reset) yet.
    pub fn add<F, Fut>(&mut self, id: TaskId, f: F)
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let index = id.index();
        assert!(
            index < self.shared.max_signals(),
            "task id {id} out of range: signal table capacity is {}",
            self.shared.max_signals()
        );
        assert!(
            !self.drained,
            "graph has already run; call reset() before registering the next cycle"
        );
        assert!(
            self.tasks[index].is_none(),
            "task id {id} is already registered"
        );

        let body = f(TaskContext::new(Arc::clone(&self.shared))).boxed();
        self.tasks[index] = Some(Task::new(
            id,
            body,
            Arc::clone(&self.shared),
            self.queue.clone(),
        ));
        debug!(task = %id, "task registered");
    }

    /// Execute every registered task and block until all of them finish.
    ///
    /// A no-op when nothing is registered. The calling thread does no task
    /// work itself; it parks until the pending count drains to zero. If any
    /// body panicked, the first captured panic is resumed on this thread
    /// with its original payload; additional panics from the same run are
    /// logged and discarded. Sibling tasks always run to completion first,
    /// so one failure never leaves the batch half-executed.
    ///
    /// A wait cycle among the bodies (or a wait on a signal nobody raises)
    /// blocks forever; the scheduler does not detect deadlocks.
    ///
    /// # Panics
    ///
    /// Panics if the previous run has not been [`reset`](Self::reset), and
    /// resumes the first captured task panic as described above.
    pub fn run(&mut self) {
        let batch: Vec<Arc<Task>> = self.tasks.iter().flatten().map(Arc::clone).collect();
        if batch.is_empty() {
            debug!("run requested on an empty graph");
            return;
        }
        assert!(
            !self.drained,
            "graph has already run; call reset() before the next cycle"
        );

        self.shared.arm(batch.len());
        debug!(tasks = batch.len(), "run started");
        for task in batch {
            self.pool.submit(task);
        }

        let failures = self.shared.wait_drained();
        self.drained = true;
        self.completed_runs += 1;
        debug!(completed_runs = self.completed_runs, "graph drained");

        let mut failures = failures.into_iter();
        if let Some(first) = failures.next() {
            for extra in failures {
                warn!(task = %extra.id, "discarding additional task panic; the first captured wins");
            }
            warn!(task = %first.id, "task panicked; resuming the panic on the run caller");
            panic::resume_unwind(first.payload);
        }
    }

    /// Discard all task bodies and clear every signal, readying the graph
    /// for the next `add`/`run` cycle. The worker pool survives.
    pub fn reset(&mut self) {
        for slot in &mut self.tasks {
            *slot = None;
        }
        let stale = self.shared.reset_all();
        if stale > 0 {
            warn!(stale, "reset dropped waiters that were never woken");
        }
        self.drained = false;
        debug!("graph reset");
    }

    /// Number of worker threads servicing this graph.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// Capacity of the signal table.
    #[must_use]
    pub fn max_signals(&self) -> usize {
        self.shared.max_signals()
    }

    /// Snapshot of activity counters.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            worker_count: self.pool.worker_count(),
            max_signals: self.shared.max_signals(),
            registered_tasks: self.tasks.iter().flatten().count(),
            completed_runs: self.completed_runs,
            completed_tasks: self.shared.completed_tasks(),
            futures_polled: self.pool.polls(),
        }
    }
}
