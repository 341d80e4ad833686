//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

const DEFAULT_LISTEN_ADDRESS: &str = ":9147";
const DEFAULT_TELEMETRY_PATH: &str = "/metrics";
const DEFAULT_SYSLOG_ADDRESS: &str = "127.0.0.1:9514";
const DEFAULT_GRACEFUL_TIMEOUT: &str = "10s";

fn parse_buckets(src: &str) -> Result<f64, String> {
    src.parse::<f64>()
        .map_err(|_| format!("invalid bucket boundary: {src}"))
}

fn parse_duration(src: &str) -> Result<std::time::Duration, String> {
    humantime_like_duration(src).ok_or_else(|| format!("invalid duration: {src}"))
}

/// A tiny `"10s"`/`"1m"`/`"500ms"` duration parser; the exporter only ever
/// needs to parse its own `--graceful-timeout` flag, so a dependency on a
/// full duration-parsing crate isn't pulled in for this alone.
fn humantime_like_duration(src: &str) -> Option<std::time::Duration> {
    let src = src.trim();
    let split_at = src.find(|c: char| !c.is_ascii_digit() && c != '.')?;
    let (number, unit) = src.split_at(split_at);
    let value: f64 = number.parse().ok()?;
    let seconds = match unit {
        "ns" => value / 1_000_000_000.0,
        "us" | "\u{b5}s" => value / 1_000_000.0,
        "ms" => value / 1_000.0,
        "s" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        _ => return None,
    };
    Some(std::time::Duration::from_secs_f64(seconds))
}

/// Prometheus exporter that ingests nginx access logs delivered over
/// syslog and exposes request counters and latency histograms.
#[derive(Debug, Parser)]
#[command(name = "nginx-request-exporter", version, about)]
pub struct Cli {
    /// Path to config file.
    #[arg(short = 'C', long = "config", env = "NGX_REQUEST_EXPORTER_CONFIG_PATH", required = true)]
    pub config: PathBuf,

    /// Address to listen on for scrapes.
    #[arg(
        short = 'l',
        long = "listen-address",
        env = "NGX_REQUEST_EXPORTER_LISTEN_ADDRESS",
        default_value = DEFAULT_LISTEN_ADDRESS
    )]
    pub listen_address: String,

    /// Path for exposing metrics.
    #[arg(
        short = 'p',
        long = "telemetry-path",
        env = "NGX_REQUEST_EXPORTER_TELEMETRY_PATH",
        default_value = DEFAULT_TELEMETRY_PATH
    )]
    pub telemetry_path: String,

    /// Address for syslog.
    #[arg(
        long = "syslog-address",
        env = "NGX_REQUEST_EXPORTER_SYSLOG_ADDRESS",
        default_value = DEFAULT_SYSLOG_ADDRESS
    )]
    pub syslog_address: String,

    /// Buckets for histogram.
    #[arg(
        long = "buckets",
        env = "NGX_REQUEST_EXPORTER_BUCKETS",
        value_delimiter = ',',
        value_parser = parse_buckets,
        default_value = "0.005,0.01,0.025,0.05,0.1,0.25,0.5,1,2.5,5,10"
    )]
    pub buckets: Vec<f64>,

    /// Timeout for graceful shutdown.
    #[arg(
        long = "graceful-timeout",
        env = "NGX_REQUEST_EXPORTER_GRACEFUL_TIMEOUT",
        default_value = DEFAULT_GRACEFUL_TIMEOUT,
        value_parser = parse_duration
    )]
    pub graceful_timeout: std::time::Duration,

    /// Negotiate gzip response encoding on the scrape endpoint.
    #[arg(long = "gzip", env = "NGX_REQUEST_EXPORTER_GZIP")]
    pub gzip: bool,

    /// Log level. 0 = off, 1 = error, 2 = warn, 3 = info, 4+ = debug.
    #[arg(short = 'v', env = "NGX_REQUEST_EXPORTER_LOG_LEVEL", default_value_t = 0)]
    pub verbosity: u8,
}

impl Cli {
    /// The `tracing_subscriber::EnvFilter` directive implied by `-v`,
    /// unless `RUST_LOG` is set (which always wins).
    pub fn log_directive(&self) -> &'static str {
        match self.verbosity {
            0 => "off",
            1 => "error",
            2 => "warn",
            3 => "info",
            _ => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_buckets_match_the_documented_series() {
        let cli = Cli::parse_from(["nginx-request-exporter", "-C", "cfg.yaml"]);
        assert_eq!(
            cli.buckets,
            vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
        );
    }

    #[test]
    fn duration_parses_seconds_and_minutes() {
        assert_eq!(
            humantime_like_duration("10s"),
            Some(std::time::Duration::from_secs(10))
        );
        assert_eq!(
            humantime_like_duration("2m"),
            Some(std::time::Duration::from_secs(120))
        );
    }

    #[test]
    fn verbosity_maps_to_directives() {
        let cases = [(0u8, "off"), (1, "error"), (2, "warn"), (3, "info"), (9, "debug")];
        for (level, expected) in cases {
            let cli = Cli::parse_from([
                "nginx-request-exporter",
                "-C",
                "cfg.yaml",
                "-v",
                &level.to_string(),
            ]);
            assert_eq!(cli.log_directive(), expected);
        }
    }
}
