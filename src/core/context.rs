//! The coordination handle passed into every task body.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tracing::debug;

use super::graph::{GraphShared, TaskId};
use super::signal::Signal;

/// Handle through which a task body coordinates with its siblings.
///
/// A clone of the graph's shared state, handed to the registration closure
/// by [`Graph::add`](crate::Graph::add). Bodies use it for exactly two
/// things: awaiting a signal and raising one mid-body.
///
/// ```no_run
/// use taskgraph::{Graph, TaskId};
///
/// let mut graph = Graph::new(2, 8);
/// graph.add(TaskId::new(0), |ctx| async move {
///     ctx.wait(TaskId::new(1)).await;
///     // everything task 1 wrote before finishing is visible here
/// });
/// graph.add(TaskId::new(1), |_ctx| async move {
///     // produce something
/// });
/// graph.run();
/// ```
#[derive(Clone)]
pub struct TaskContext {
    shared: Arc<GraphShared>,
}

impl TaskContext {
    pub(crate) fn new(shared: Arc<GraphShared>) -> Self {
        Self { shared }
    }

    /// Suspend until the signal for `id` has been raised.
    ///
    /// If the signal is already raised this returns without yielding the
    /// worker. Otherwise the body parks on the signal's waiter list and the
    /// worker moves on to other queued work; the raise pushes the body back
    /// onto the pool. Writes made by the raiser before raising are visible
    /// after this returns.
    ///
    /// Awaiting a signal that is never raised hangs the run forever; the
    /// scheduler does not detect wait cycles.
    ///
    /// # Panics
    ///
    /// Panics if `id` is outside the configured signal table.
    pub async fn wait(&self, id: TaskId) {
        let signal = self.shared.signal(id);
        if signal.is_raised() {
            return;
        }
        debug!(signal = %id, "task suspending on signal");
        WaitSignal { signal }.await;
    }

    /// Raise the signal for `id`, then yield once so released waiters get
    /// scheduled ahead of this body's continuation.
    ///
    /// This is how a body announces an intermediate milestone distinct from
    /// its own completion signal, which the scheduler raises automatically.
    /// Raising a signal twice, including raising one's own id and then
    /// completing, is a harmless no-op the second time.
    ///
    /// # Panics
    ///
    /// Panics if `id` is outside the configured signal table.
    pub async fn signal(&self, id: TaskId) {
        let woken = self.shared.signal(id).raise();
        debug!(signal = %id, woken, "signal raised mid-body");
        YieldNow { yielded: false }.await;
    }
}

/// Future half of [`TaskContext::wait`]: registers the task's waker with the
/// signal and suspends, unless the signal won the race first.
struct WaitSignal<'a> {
    signal: &'a Signal,
}

impl Future for WaitSignal<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.signal.add_waiter(cx.waker().clone()) {
            Poll::Pending
        } else {
            // Raised before (or while) registering; proceed immediately.
            Poll::Ready(())
        }
    }
}

/// Future half of [`TaskContext::signal`]: wakes its own task and suspends
/// exactly once, placing the continuation behind the waiters the raise just
/// queued.
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
