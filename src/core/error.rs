//! Error types for graph construction.

use thiserror::Error;

/// Errors produced while building a graph from configuration.
///
/// Task-level failures never appear here: a panicking task body is captured
/// by the scheduler and re-raised from [`Graph::run`](crate::Graph::run) on
/// the calling thread. Misuse of the API (out-of-range ids, duplicate
/// registration) is a programming error and panics instead.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
