//! Core scheduler: signals, task cells, the worker pool, and the graph.

pub mod context;
pub mod error;
pub mod graph;
pub(crate) mod pool;
pub(crate) mod signal;
pub(crate) mod task;

pub use context::TaskContext;
pub use error::SchedulerError;
pub use graph::{Graph, GraphStats, TaskId};
