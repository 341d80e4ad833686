//! nginx-request-exporter
//!
//! Ingests nginx access logs delivered over RFC3164 syslog, derives request
//! counters and latency histograms from a configurable rule engine, and
//! exposes them to Prometheus over HTTP.
//!
//! Three long-running tasks: the syslog receiver decodes datagrams onto a
//! bounded channel; the ingest task is the sole writer to the metric
//! registry; the HTTP task serves scrapes read-only. See [`ingest`] for the
//! pipeline and [`registry`] for the dynamic metric registry.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod http;
pub mod ingest;
pub mod parser;
pub mod registry;
pub mod syslog;

pub mod prelude {
    pub use crate::cli::Cli;
    pub use crate::config::Config;
    pub use crate::error::{ConfigError, ExporterError};
    pub use crate::ingest::Ingest;
    pub use crate::registry::{DynamicRegistry, RegistryHandle};
}
