//! Suspendable task cells driven by the worker pool.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::task::{Context, Poll};

use crossbeam_channel::Sender;
use futures::future::BoxFuture;
use futures::task::{waker_ref, ArcWake};
use parking_lot::Mutex;
use tracing::debug;

use super::graph::{GraphShared, TaskId};

/// One registered task: a boxed body plus the wiring its completion needs.
///
/// The body lives in a mutex-guarded cell. A worker takes it out to drive it
/// and puts it back when it suspends; after completion the cell stays empty,
/// so a stale wake that pops this task again finds nothing to do. The cell
/// lock is held across the poll, which is what keeps two workers from ever
/// driving the same body concurrently.
pub(crate) struct Task {
    id: TaskId,
    body: Mutex<Option<BoxFuture<'static, ()>>>,
    shared: Arc<GraphShared>,
    /// Hand-off back to the pool queue, used on every wake.
    queue: Sender<Arc<Task>>,
}

impl Task {
    pub fn new(
        id: TaskId,
        body: BoxFuture<'static, ()>,
        shared: Arc<GraphShared>,
        queue: Sender<Arc<Task>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            body: Mutex::new(Some(body)),
            shared,
            queue,
        })
    }

    /// Drive the body until it suspends, finishes, or panics.
    ///
    /// Runs on a worker thread. A panic escaping the body is captured here
    /// and routed to the graph's failure list rather than unwinding the
    /// worker. Returns whether a body was actually driven; a wake landing
    /// after completion finds the cell empty and reports `false`.
    pub fn poll(self: &Arc<Self>) -> bool {
        let mut cell = self.body.lock();
        let Some(mut body) = cell.take() else {
            // Woken after completion; nothing left to drive.
            return false;
        };
        let waker = waker_ref(self);
        let mut cx = Context::from_waker(&waker);
        match panic::catch_unwind(AssertUnwindSafe(|| body.as_mut().poll(&mut cx))) {
            Ok(Poll::Pending) => {
                *cell = Some(body);
            }
            Ok(Poll::Ready(())) => {
                drop(cell);
                self.shared.on_task_finished(self.id, None);
            }
            Err(payload) => {
                drop(cell);
                self.shared.on_task_finished(self.id, Some(payload));
            }
        }
        true
    }
}

impl ArcWake for Task {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        if arc_self.queue.send(Arc::clone(arc_self)).is_err() {
            debug!(task = %arc_self.id, "wake after pool shutdown ignored");
        }
    }
}

/// A panic captured from a task body, pending rethrow from `run`.
pub(crate) struct TaskFailure {
    pub id: TaskId,
    pub payload: Box<dyn Any + Send + 'static>,
}
