//! # taskgraph
//!
//! A coroutine-style task graph scheduler over a fixed pool of worker
//! threads.
//!
//! A [`Graph`] holds one suspendable task body per [`TaskId`]. Bodies are
//! plain `async` blocks driven by the graph's own executor: they synchronize
//! through one-shot broadcast signals instead of locks, waiting on upstream
//! tasks with [`TaskContext::wait`] and announcing mid-body milestones with
//! [`TaskContext::signal`]. [`Graph::run`] schedules the whole batch and
//! blocks until it drains; [`Graph::reset`] recycles the graph, worker pool
//! included, for the next cycle. Once-per-frame reuse is the intended shape.
//!
//! Suspension is cheap: a waiting body parks its waker on the signal and
//! frees its worker thread, so N workers can service arbitrarily deep graphs
//! as long as the wait relation stays acyclic. A panicking body never stops
//! the batch; siblings still finish, and the first captured panic resumes
//! from `run` on the calling thread with its original payload.
//!
//! ```
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//! use taskgraph::{Graph, TaskId};
//!
//! const LOAD: TaskId = TaskId::new(0);
//! const PHYSICS: TaskId = TaskId::new(1);
//! const AI: TaskId = TaskId::new(2);
//! const RENDER: TaskId = TaskId::new(3);
//!
//! let progress = Arc::new(AtomicU32::new(0));
//! let mut graph = Graph::new(0, 4);
//!
//! let p = Arc::clone(&progress);
//! graph.add(LOAD, move |_ctx| async move {
//!     p.fetch_add(1, Ordering::SeqCst);
//! });
//! let p = Arc::clone(&progress);
//! graph.add(PHYSICS, move |ctx| async move {
//!     ctx.wait(LOAD).await;
//!     p.fetch_add(1, Ordering::SeqCst);
//! });
//! let p = Arc::clone(&progress);
//! graph.add(AI, move |ctx| async move {
//!     ctx.wait(LOAD).await;
//!     p.fetch_add(1, Ordering::SeqCst);
//! });
//! let p = Arc::clone(&progress);
//! graph.add(RENDER, move |ctx| async move {
//!     ctx.wait(PHYSICS).await;
//!     ctx.wait(AI).await;
//!     p.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! graph.run();
//! assert_eq!(progress.load(Ordering::SeqCst), 4);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduler: signals, task cells, the worker pool, and the graph.
pub mod core;
/// Configuration models for graphs and worker pools.
pub mod config;
/// Shared utilities.
pub mod util;

pub use config::GraphConfig;
pub use self::core::{Graph, GraphStats, SchedulerError, TaskContext, TaskId};
