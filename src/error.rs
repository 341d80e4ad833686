//! Fatal, process-level errors: the ones that prevent startup rather than
//! the per-message errors handled inline by the ingest pipeline.

use std::io;
use std::path::PathBuf;

/// Errors encountered loading and merging the YAML configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors that abort the process during startup.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to bind syslog listener on {address}: {source}")]
    SyslogBind {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to bind HTTP listener on {address}: {source}")]
    HttpBind {
        address: String,
        #[source]
        source: io::Error,
    },
}
