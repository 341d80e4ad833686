//! Dynamic, label-keyed metric registry.
//!
//! The set of metric names and label signatures that will ever be observed
//! is not known at startup — it emerges from traffic. Collectors are
//! created lazily on first observation and reused (routed to) on every
//! later observation under the same `(collector_kind, metric_name,
//! label-name signature)` key. A request to reuse a key under a divergent
//! definition (different histogram buckets) is the "already registered
//! with a different definition" case and is rejected without mutating the
//! registry, mirroring the classic Prometheus client "AlreadyRegisteredError"
//! contract.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

use crate::core::LabelSet;

const NAMESPACE_PREFIX: &str = "nginx_request";

/// `prometheus_client`'s `Counter` unconditionally appends `_total` to its
/// family name at render time (OpenMetrics requires every counter sample to
/// end in `_total`; confirmed by the corpus's own
/// `examples/other_examples/119a9aae_apache-incubator-opendal__core-src-layers-prometheus_client.rs.rs:316-320`,
/// which registers under a name one `_total` short of the desired output
/// for the same reason). `exporter_syslog_messages` and
/// `exporter_syslog_parse_failure` are named without any `_total` suffix in
/// spec.md §6, so the auto-appended suffix is stripped back out of the
/// rendered text for exactly these two always-on counters.
const BARE_COUNTER_NAMES: &[&str] = &["exporter_syslog_messages", "exporter_syslog_parse_failure"];

/// Undo `Counter`'s automatic `_total` suffix for the families named in
/// [`BARE_COUNTER_NAMES`], across every line it appears in (`# HELP`,
/// `# TYPE`, and the sample line itself).
fn strip_spurious_total_suffix(buffer: String) -> String {
    let mut buffer = buffer;
    for bare in BARE_COUNTER_NAMES {
        let suffixed = format!("{NAMESPACE_PREFIX}_{bare}_total");
        let unsuffixed = format!("{NAMESPACE_PREFIX}_{bare}");
        buffer = buffer.replace(&suffixed, &unsuffixed);
    }
    buffer
}

/// The two collector shapes the registry routes observations to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CollectorKind {
    Counter,
    Histogram,
}

/// `(collector_kind, metric_name, label-name signature)` — the registry's
/// primary key. The label-name signature is always stored sorted so that
/// two label sets differing only in field order route to the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegistryKey {
    kind: CollectorKind,
    metric_name: String,
    label_names: Vec<String>,
}

enum Collector {
    Counter(Family<Vec<(String, String)>, Counter<u64>>),
    Histogram {
        family: Family<Vec<(String, String)>, Histogram>,
        buckets: Vec<f64>,
    },
}

struct RegistryEntry {
    collector: Collector,
}

/// A cheaply-clonable handle to the underlying `prometheus_client` registry,
/// used by the HTTP scrape shell to render text exposition output. It is
/// read-only from the handle's point of view.
#[derive(Clone)]
pub struct RegistryHandle {
    inner: Arc<RwLock<Registry>>,
}

impl RegistryHandle {
    /// Render the current registry contents in Prometheus text-exposition
    /// format.
    pub fn render(&self) -> String {
        let registry = self.inner.read().expect("registry lock poisoned");
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &registry)
            .expect("encoding to a String cannot fail");
        strip_spurious_total_suffix(buffer)
    }
}

/// The single-writer metric registry. Only the ingest task is expected to
/// call the `record_*` methods; the HTTP scrape shell only ever reads via a
/// [`RegistryHandle`].
pub struct DynamicRegistry {
    client: Arc<RwLock<Registry>>,
    entries: HashMap<RegistryKey, RegistryEntry>,
}

impl DynamicRegistry {
    pub fn new() -> Self {
        Self {
            client: Arc::new(RwLock::new(Registry::with_prefix(NAMESPACE_PREFIX))),
            entries: HashMap::new(),
        }
    }

    /// A read-only handle suitable for handing to the HTTP scrape shell.
    pub fn handle(&self) -> RegistryHandle {
        RegistryHandle {
            inner: self.client.clone(),
        }
    }

    /// Register (or reuse) a process-lifetime counter with a fixed,
    /// zero-label schema, such as `exporter_syslog_messages`.
    pub fn register_fixed_counter(&self, name: &str, help: &str) -> Counter<u64> {
        let counter = Counter::default();
        self.client
            .write()
            .expect("registry lock poisoned")
            .register(name, help, counter.clone());
        counter
    }

    /// Increment the `requests_total` counter-vec for `labels`, registering
    /// it on first observation. Registered under the bare name `requests`
    /// (not `requests_total`): `Counter`'s encoder appends `_total`
    /// unconditionally, so registering under the already-suffixed name
    /// would render as `nginx_request_requests_total_total`.
    pub fn record_counter(&mut self, labels: &LabelSet) {
        let sorted = sorted_pairs(labels);
        let label_names: Vec<String> = sorted.iter().map(|(k, _)| k.clone()).collect();

        let key = RegistryKey {
            kind: CollectorKind::Counter,
            metric_name: "requests_total".to_string(),
            label_names: label_names.clone(),
        };

        let family = match self.entries.get(&key) {
            Some(entry) => match &entry.collector {
                Collector::Counter(family) => family.clone(),
                Collector::Histogram { .. } => unreachable!("kind is part of the key"),
            },
            None => {
                let family: Family<Vec<(String, String)>, Counter<u64>> = Family::default();
                self.client.write().expect("registry lock poisoned").register(
                    "requests",
                    "Nginx request log value for requests_total",
                    family.clone(),
                );
                self.entries.insert(
                    key,
                    RegistryEntry {
                        collector: Collector::Counter(family.clone()),
                    },
                );
                family
            }
        };

        family.get_or_create(&sorted).inc();
    }

    /// Observe `value` in the histogram `name` under `labels`, registering
    /// it on first observation with `buckets`. If an entry already exists
    /// for this `(name, label signature)` with a *different* bucket set,
    /// the observation is rejected and logged, per the register-or-reuse
    /// contract.
    pub fn record_histogram(
        &mut self,
        name: &str,
        labels: &LabelSet,
        value: f64,
        buckets: &[f64],
    ) {
        let sorted = sorted_pairs(labels);
        let label_names: Vec<String> = sorted.iter().map(|(k, _)| k.clone()).collect();

        let key = RegistryKey {
            kind: CollectorKind::Histogram,
            metric_name: name.to_string(),
            label_names: label_names.clone(),
        };

        let family = match self.entries.get(&key) {
            Some(entry) => match &entry.collector {
                Collector::Histogram {
                    family,
                    buckets: existing_buckets,
                } => {
                    if existing_buckets.as_slice() != buckets {
                        tracing::error!(
                            metric = %name,
                            "histogram already registered with a different bucket set, skipping observation"
                        );
                        return;
                    }
                    family.clone()
                }
                Collector::Counter(_) => unreachable!("kind is part of the key"),
            },
            None => {
                let owned_buckets = buckets.to_vec();
                let bucket_boundaries = owned_buckets.clone();
                let family: Family<Vec<(String, String)>, Histogram> =
                    Family::new_with_constructor(move || {
                        Histogram::new(bucket_boundaries.clone().into_iter())
                    });
                self.client.write().expect("registry lock poisoned").register(
                    name,
                    format!("Nginx request log value for {name}"),
                    family.clone(),
                );
                self.entries.insert(
                    key,
                    RegistryEntry {
                        collector: Collector::Histogram {
                            family: family.clone(),
                            buckets: owned_buckets,
                        },
                    },
                );
                family
            }
        };

        family.get_or_create(&sorted).observe(value);
    }
}

impl Default for DynamicRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `labels` sorted by name, as an owned `Vec<(String, String)>` suitable
/// for `Family::get_or_create` and stable regardless of the incoming
/// message's field order.
fn sorted_pairs(labels: &LabelSet) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
}
