//! Integration tests for loading and merging the on-disk YAML config over
//! the CLI/default base, exercised through real temp files.

use std::io::Write;

use nginx_request_exporter::config::Config;

fn base() -> Config {
    Config {
        listen_address: ":9147".to_string(),
        telemetry_path: "/metrics".to_string(),
        syslog_address: "127.0.0.1:9514".to_string(),
        buckets: vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        device_type: None,
        prefix: None,
        histogram_rules: Vec::new(),
    }
}

fn write_temp_yaml(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents.as_bytes()).expect("failed to write temp file");
    file
}

#[test]
fn file_with_only_listen_address_leaves_everything_else_at_base() {
    let file = write_temp_yaml("listen_address: \":9999\"\n");
    let merged = base().merge_from_file(file.path()).expect("merge should succeed");

    assert_eq!(merged.listen_address, ":9999");
    assert_eq!(merged.telemetry_path, "/metrics");
    assert_eq!(merged.syslog_address, "127.0.0.1:9514");
    assert_eq!(merged.buckets.len(), 11);
}

#[test]
fn file_with_device_type_and_histogram_rules_parses_nested_structures() {
    let yaml = r#"
device_type:
  default: web
  rules:
    - value: ios
      regex: iPhone
histogram_rules:
  - metric: time
    name: request_time
    labels:
      host: www.example.com
"#;
    let file = write_temp_yaml(yaml);
    let merged = base().merge_from_file(file.path()).expect("merge should succeed");

    let device_type = merged.device_type.expect("device_type should be set");
    assert_eq!(device_type.default, "web");
    assert_eq!(device_type.rules.unwrap().len(), 1);
    assert_eq!(merged.histogram_rules.len(), 1);
    assert_eq!(merged.histogram_rules[0].name, "request_time");
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let file = write_temp_yaml("listen_address: [this is not a string\n");
    let result = base().merge_from_file(file.path());
    assert!(result.is_err());
}

#[test]
fn missing_file_is_a_read_error() {
    let result = base().merge_from_file(std::path::Path::new("/nonexistent/path/config.yaml"));
    assert!(result.is_err());
}
