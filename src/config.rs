//! Runtime configuration: a base built from CLI flags and defaults,
//! overridden field-by-field by an optional YAML file.

use std::path::Path;

use serde::Deserialize;

use crate::cli::Cli;
use crate::core::{HistogramRule, LabelConfig};
use crate::error::ConfigError;

/// The exporter's fully-resolved configuration, after merging the YAML
/// file (if any) over the CLI/default base.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_address: String,
    pub telemetry_path: String,
    pub syslog_address: String,
    pub buckets: Vec<f64>,
    pub device_type: Option<LabelConfig>,
    pub prefix: Option<LabelConfig>,
    pub histogram_rules: Vec<HistogramRule>,
}

/// The shape of the on-disk YAML file. Every field is optional: an absent
/// field leaves the base `Config` untouched, while a present-but-empty
/// `buckets: []` is a deliberate override (hence `Option<Vec<f64>>` rather
/// than a bare `Vec<f64>`).
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    listen_address: Option<String>,
    telemetry_path: Option<String>,
    syslog_address: Option<String>,
    buckets: Option<Vec<f64>>,
    device_type: Option<LabelConfig>,
    prefix: Option<LabelConfig>,
    histogram_rules: Option<Vec<HistogramRule>>,
}

impl Config {
    /// The base configuration implied by CLI flags (and their defaults),
    /// before any YAML file is merged over it.
    pub fn from_cli(cli: &Cli) -> Config {
        Config {
            listen_address: cli.listen_address.clone(),
            telemetry_path: cli.telemetry_path.clone(),
            syslog_address: cli.syslog_address.clone(),
            buckets: cli.buckets.clone(),
            device_type: None,
            prefix: None,
            histogram_rules: Vec::new(),
        }
    }

    /// Read and parse `path` as YAML, then merge it over `self` with file
    /// values winning field-by-field; fields absent from the file leave
    /// `self` untouched.
    pub fn merge_from_file(self, path: &Path) -> Result<Config, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig =
            serde_yaml::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(self.merge(file))
    }

    fn merge(self, file: FileConfig) -> Config {
        Config {
            listen_address: file.listen_address.unwrap_or(self.listen_address),
            telemetry_path: file.telemetry_path.unwrap_or(self.telemetry_path),
            syslog_address: file.syslog_address.unwrap_or(self.syslog_address),
            buckets: file.buckets.unwrap_or(self.buckets),
            device_type: file.device_type.or(self.device_type),
            prefix: file.prefix.or(self.prefix),
            histogram_rules: file.histogram_rules.unwrap_or(self.histogram_rules),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            listen_address: ":9147".to_string(),
            telemetry_path: "/metrics".to_string(),
            syslog_address: "127.0.0.1:9514".to_string(),
            buckets: vec![0.1, 0.5, 1.0],
            device_type: None,
            prefix: None,
            histogram_rules: Vec::new(),
        }
    }

    #[test]
    fn absent_file_fields_leave_base_untouched() {
        let merged = base().merge(FileConfig::default());
        assert_eq!(merged.listen_address, ":9147");
        assert_eq!(merged.buckets, vec![0.1, 0.5, 1.0]);
    }

    #[test]
    fn present_field_overrides_base() {
        let file = FileConfig {
            listen_address: Some(":9999".to_string()),
            ..FileConfig::default()
        };
        let merged = base().merge(file);
        assert_eq!(merged.listen_address, ":9999");
        assert_eq!(merged.telemetry_path, "/metrics");
    }

    #[test]
    fn present_but_empty_buckets_overrides_base_buckets() {
        let file = FileConfig {
            buckets: Some(Vec::new()),
            ..FileConfig::default()
        };
        let merged = base().merge(file);
        assert!(merged.buckets.is_empty());
    }

    #[test]
    fn device_type_is_replaced_wholesale_when_present() {
        let file = FileConfig {
            device_type: Some(LabelConfig {
                default: "web".to_string(),
                rules: None,
            }),
            ..FileConfig::default()
        };
        let merged = base().merge(file);
        assert_eq!(merged.device_type.unwrap().default, "web");
    }
}
