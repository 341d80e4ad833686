//! Backend-agnostic data model: label sets, observations, and the rule
//! engine that derives labels and histogram classifications from them.

pub mod histogram_rules;
pub mod labels;
pub mod metric;
pub mod rules;

pub use histogram_rules::{match_histogram_rules, HistogramMatch, HistogramRule};
pub use labels::LabelSet;
pub use metric::Observation;
pub use rules::{parse_rule, LabelConfig, Rule, RuleList};
