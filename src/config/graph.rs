//! Graph and worker pool configuration structures.

use serde::{Deserialize, Serialize};

/// Configuration for a [`Graph`](crate::Graph) and its worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Number of worker threads. `0` selects one thread per logical CPU.
    pub worker_threads: usize,
    /// Capacity of the signal table. Task ids must be below this value.
    pub max_signals: usize,
    /// Stack size in bytes for worker threads. `None` uses the platform default.
    pub thread_stack_size: Option<usize>,
    /// Prefix for worker thread names; workers are named `{prefix}-{index}`.
    pub thread_name_prefix: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            max_signals: 64,
            thread_stack_size: None,
            thread_name_prefix: "graph-worker".into(),
        }
    }
}

impl GraphConfig {
    /// Create a configuration with the given worker count and signal capacity.
    #[must_use]
    pub fn new(worker_threads: usize, max_signals: usize) -> Self {
        Self {
            worker_threads,
            max_signals,
            ..Self::default()
        }
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_signals == 0 {
            return Err("max_signals must be greater than 0".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0 when set".into());
        }
        if self.thread_name_prefix.is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        Ok(())
    }

    /// Parse a graph configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
