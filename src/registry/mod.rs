//! Dynamic Prometheus metric registry.
//!
//! Metric names and label signatures are not known until traffic arrives,
//! so collectors are registered lazily the first time each distinct
//! `(metric name, label-name signature)` is observed, and reused for every
//! later observation that shares it.

mod collector;

pub use collector::{DynamicRegistry, RegistryHandle};
