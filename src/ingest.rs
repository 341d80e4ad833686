//! The ingest pipeline: validates, parses, enriches, and records each
//! syslog message in order, one at a time. The single writer to the
//! metric registry.

use prometheus_client::metrics::counter::Counter;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::core::{match_histogram_rules, parse_rule, LabelSet};
use crate::parser::parse_message;
use crate::registry::DynamicRegistry;
use crate::syslog::SyslogPart;

/// Owns the registry and the config's label/rule tables; drains the
/// channel handed to it by the syslog receiver.
pub struct Ingest {
    registry: DynamicRegistry,
    config: Config,
    messages_total: Counter<u64>,
    parse_failures_total: Counter<u64>,
}

impl Ingest {
    pub fn new(config: Config) -> Self {
        let registry = DynamicRegistry::new();
        let messages_total = registry.register_fixed_counter(
            "exporter_syslog_messages",
            "Total number of syslog messages received",
        );
        let parse_failures_total = registry.register_fixed_counter(
            "exporter_syslog_parse_failure",
            "Total number of syslog messages rejected during validation or parsing",
        );
        Self {
            registry,
            config,
            messages_total,
            parse_failures_total,
        }
    }

    pub fn registry_handle(&self) -> crate::registry::RegistryHandle {
        self.registry.handle()
    }

    /// Drain `rx` until the syslog receiver's sending half is dropped
    /// (graceful shutdown) or the channel closes.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<SyslogPart>) {
        while let Some(part) = rx.recv().await {
            self.process(part);
        }
    }

    /// Process a single decoded syslog message, per the five ingest steps.
    pub fn process(&mut self, part: SyslogPart) {
        self.messages_total.inc();

        // Step 1: validate tag/hostname/content.
        if part.tag != "nginx" || part.hostname.is_empty() || part.content.is_empty() {
            tracing::warn!(tag = %part.tag, hostname = %part.hostname, "rejecting syslog message: failed validation");
            self.parse_failures_total.inc();
            return;
        }

        // Step 2: parse the content.
        let (metrics, mut labels) = match parse_message(&part.content) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(%error, "dropping message: failed to parse content");
                self.parse_failures_total.inc();
                return;
            }
        };

        self.enrich(&mut labels);

        // Step 5: record each parsed metric.
        for metric in metrics {
            for histogram_match in match_histogram_rules(&metric.name, &labels, &self.config.histogram_rules) {
                self.registry.record_histogram(
                    &histogram_match.name,
                    &histogram_match.labels,
                    metric.value,
                    &self.config.buckets,
                );
            }
            self.registry.record_counter(&labels);
        }
    }

    /// Steps 3 and 4: derive `device_type` from `user_agent` and `prefix`
    /// from `request_uri`, deleting the source labels unconditionally.
    fn enrich(&self, labels: &mut LabelSet) {
        if let Some(user_agent) = labels.get("user_agent") {
            if let Some(device_type_config) = &self.config.device_type {
                let derived = parse_rule(
                    user_agent,
                    &device_type_config.default,
                    device_type_config.rules.as_ref(),
                );
                labels.set("device_type", derived);
            }
        }
        labels.delete("user_agent");

        if let Some(request_uri) = labels.get("request_uri") {
            if let Some(prefix_config) = &self.config.prefix {
                let derived = parse_rule(request_uri, &prefix_config.default, prefix_config.rules.as_ref());
                labels.set("prefix", derived);
            }
        }
        labels.delete("request_uri");
    }
}
