//! Fixed-size worker pool executing ready tasks from a shared FIFO queue.
//!
//! Workers block on the queue's `recv`; there is no polling anywhere in the
//! pool. Shutdown drops the pool-side sender, which lets each worker drain
//! whatever is still queued and then exit when the channel disconnects.
//! Unlike a detach-on-drop pool, `Drop` here joins every worker: graph
//! teardown must not leave threads running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::config::GraphConfig;
use crate::core::error::SchedulerError;
use crate::core::task::Task;

/// Counters for pool activity (lock-free atomics).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    /// Individual polls delivered to task bodies. Stale pops that find an
    /// already-completed task do not count.
    pub polls: AtomicU64,
}

/// Fixed set of worker threads pulling [`Task`] handles from a shared queue.
pub(crate) struct WorkerPool {
    /// Pool-side sender. `None` only during `Drop`, where taking it out
    /// disconnects idle workers.
    queue: Option<Sender<Arc<Task>>>,
    counters: Arc<PoolCounters>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn the pool described by `config`.
    ///
    /// Returns the pool and a sender that task wakers use to re-enqueue
    /// themselves. `worker_threads == 0` selects one worker per logical CPU,
    /// with a minimum of one.
    pub fn new(config: &GraphConfig) -> Result<(Self, Sender<Arc<Task>>), SchedulerError> {
        let worker_count = if config.worker_threads == 0 {
            num_cpus::get().max(1)
        } else {
            config.worker_threads
        };

        let (queue_tx, queue_rx) = unbounded::<Arc<Task>>();
        let counters = Arc::new(PoolCounters::default());

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            workers.push(spawn_worker(
                worker_id,
                config,
                queue_rx.clone(),
                Arc::clone(&counters),
            )?);
        }

        info!(worker_count, "worker pool started");

        let pool = Self {
            queue: Some(queue_tx.clone()),
            counters,
            workers,
        };
        Ok((pool, queue_tx))
    }

    /// Append a ready task to the tail of the queue.
    ///
    /// Exactly one worker will pick it up. Safe to call from worker threads
    /// and from the owning thread alike.
    pub fn submit(&self, task: Arc<Task>) {
        if let Some(queue) = &self.queue {
            if queue.send(task).is_err() {
                // Only reachable if every worker thread died.
                error!("worker queue disconnected; task dropped");
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Total polls delivered to task bodies so far.
    pub fn polls(&self) -> u64 {
        self.counters.polls.load(Ordering::Relaxed)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Dropping the sender lets workers drain the queue and exit on
        // disconnect. Task handles still queued hold their own senders, so
        // disconnection completes once those are drained and dropped.
        drop(self.queue.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
        }
        debug!("worker pool shut down");
    }
}

/// Spawn one worker thread running the pop-and-poll loop.
fn spawn_worker(
    worker_id: usize,
    config: &GraphConfig,
    queue_rx: Receiver<Arc<Task>>,
    counters: Arc<PoolCounters>,
) -> Result<JoinHandle<()>, SchedulerError> {
    let mut builder =
        thread::Builder::new().name(format!("{}-{worker_id}", config.thread_name_prefix));
    if let Some(bytes) = config.thread_stack_size {
        builder = builder.stack_size(bytes);
    }

    builder
        .spawn(move || {
            debug!(worker_id, "worker thread started");
            loop {
                // Block waiting for a ready task. When every sender is gone
                // and the queue is drained, recv fails and the worker exits.
                let task = match queue_rx.recv() {
                    Ok(task) => task,
                    Err(_) => {
                        debug!(worker_id, "worker queue closed, exiting");
                        break;
                    }
                };
                if task.poll() {
                    counters.polls.fetch_add(1, Ordering::Relaxed);
                }
            }
        })
        .map_err(SchedulerError::Spawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::{GraphShared, TaskId};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn small_pool(workers: usize) -> (WorkerPool, Sender<Arc<Task>>) {
        let config = GraphConfig::new(workers, 8);
        WorkerPool::new(&config).expect("pool should start")
    }

    fn wait_for(counter: &AtomicUsize, expected: usize) {
        for _ in 0..500 {
            if counter.load(Ordering::SeqCst) == expected {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!(
            "counter stuck at {} (expected {expected})",
            counter.load(Ordering::SeqCst)
        );
    }

    #[test]
    fn executes_submitted_tasks_off_the_caller_thread() {
        let (pool, queue) = small_pool(2);
        let shared = Arc::new(GraphShared::new(8));
        shared.arm(1);

        let caller = thread::current().id();
        let ran_elsewhere = Arc::new(AtomicUsize::new(0));
        let probe = Arc::clone(&ran_elsewhere);
        let body = Box::pin(async move {
            if thread::current().id() != caller {
                probe.fetch_add(1, Ordering::SeqCst);
            }
        });

        pool.submit(Task::new(TaskId::new(0), body, shared, queue));
        wait_for(&ran_elsewhere, 1);
    }

    #[test]
    fn zero_worker_config_still_spawns_at_least_one() {
        let (pool, _queue) = small_pool(0);
        assert!(pool.worker_count() >= 1);
    }

    #[test]
    fn drop_joins_after_draining_the_queue() {
        let (pool, queue) = small_pool(1);
        let shared = Arc::new(GraphShared::new(8));
        shared.arm(8);

        let executed = Arc::new(AtomicUsize::new(0));
        for i in 0..8 {
            let probe = Arc::clone(&executed);
            let body = Box::pin(async move {
                probe.fetch_add(1, Ordering::SeqCst);
            });
            pool.submit(Task::new(
                TaskId::new(i),
                body,
                Arc::clone(&shared),
                queue.clone(),
            ));
        }

        // Dropping the pool must block until every queued task ran.
        drop(queue);
        drop(pool);
        assert_eq!(executed.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn poll_counter_advances() {
        let (pool, queue) = small_pool(2);
        let shared = Arc::new(GraphShared::new(8));
        shared.arm(2);

        let executed = Arc::new(AtomicUsize::new(0));
        for i in 0..2 {
            let probe = Arc::clone(&executed);
            let body = Box::pin(async move {
                probe.fetch_add(1, Ordering::SeqCst);
            });
            pool.submit(Task::new(
                TaskId::new(i),
                body,
                Arc::clone(&shared),
                queue.clone(),
            ));
        }

        wait_for(&executed, 2);
        assert!(pool.polls() >= 2);
    }

    #[test]
    fn stale_pops_do_not_count_as_polls() {
        let (pool, queue) = small_pool(1);
        let shared = Arc::new(GraphShared::new(8));
        shared.arm(2);

        let retired = Task::new(
            TaskId::new(0),
            Box::pin(async {}),
            Arc::clone(&shared),
            queue.clone(),
        );
        // Complete the body here, then feed the spent handle to the pool.
        assert!(retired.poll());
        pool.submit(retired);

        let executed = Arc::new(AtomicUsize::new(0));
        let probe = Arc::clone(&executed);
        let body = Box::pin(async move {
            probe.fetch_add(1, Ordering::SeqCst);
        });
        pool.submit(Task::new(TaskId::new(1), body, shared, queue));

        // Join the worker so the counter is final: of the two pops, only
        // the live body may count.
        let counters = Arc::clone(&pool.counters);
        drop(pool);
        assert_eq!(executed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.polls.load(Ordering::SeqCst), 1);
    }
}
