//! Configuration models for graphs and worker pools.

pub mod graph;

pub use graph::GraphConfig;
