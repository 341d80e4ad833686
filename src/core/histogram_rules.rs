//! Multi-label histogram classification.
//!
//! A [`HistogramRule`] matches a label set iff every one of its configured
//! `(label_name, pattern)` entries is present in the incoming label set and
//! matches. A successful match produces a fresh, sorted [`LabelSet`] whose
//! name signature is deterministic and independent of incoming label
//! order, so the registry can key on it.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::labels::LabelSet;

/// `(metric, name, labels)`: classify observations of `metric` into a
/// histogram named `name`, with one entry per label that must be present
/// and match its regex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramRule {
    pub metric: String,
    pub name: String,
    /// `BTreeMap` so iteration is already in sorted name order, matching
    /// the registry's requirement for a deterministic label signature.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// A single histogram match: the rule's target histogram name, and the
/// derived (sorted) label set to observe it under.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramMatch {
    pub name: String,
    pub labels: LabelSet,
}

/// Evaluate every rule in `rules` against `incoming`, skipping rules whose
/// `metric` doesn't match `metric_name`. Returns one [`HistogramMatch`] per
/// rule that fully matches; a rule with no `labels` entries matches every
/// label set, trivially.
///
/// Regex compilation errors are logged and treated as a non-match for that
/// rule.
pub fn match_histogram_rules(
    metric_name: &str,
    incoming: &LabelSet,
    rules: &[HistogramRule],
) -> Vec<HistogramMatch> {
    let mut matches = Vec::new();

    for rule in rules {
        if rule.metric != metric_name {
            continue;
        }

        if let Some(derived) = try_match_rule(rule, incoming) {
            matches.push(HistogramMatch {
                name: rule.name.clone(),
                labels: derived,
            });
        }
    }

    matches
}

fn try_match_rule(rule: &HistogramRule, incoming: &LabelSet) -> Option<LabelSet> {
    let mut derived = LabelSet::new();

    for (name, pattern) in &rule.labels {
        let value = incoming.get(name)?;

        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(err) => {
                tracing::error!(pattern = %pattern, error = %err, "invalid histogram rule regex, treating as non-match");
                return None;
            }
        };

        if !re.is_match(value) {
            return None;
        }

        derived.set(name.clone(), value.to_string());
    }

    Some(derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> LabelSet {
        LabelSet::from_pairs(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    fn rules() -> Vec<HistogramRule> {
        vec![
            HistogramRule {
                metric: "time".into(),
                name: "a".into(),
                labels: BTreeMap::from([
                    ("host".into(), "www.example.com".into()),
                    ("status".into(), "200".into()),
                ]),
            },
            HistogramRule {
                metric: "time".into(),
                name: "b".into(),
                labels: BTreeMap::from([
                    ("host".into(), "www.example.com".into()),
                    ("scheme".into(), "https".into()),
                ]),
            },
            HistogramRule {
                metric: "time".into(),
                name: "c".into(),
                labels: BTreeMap::from([
                    ("host".into(), "www.example.com".into()),
                    ("status".into(), "200".into()),
                    ("foo".into(), "bar".into()),
                ]),
            },
        ]
    }

    #[test]
    fn two_rules_match_one_requires_absent_label() {
        let incoming = labels(&[
            ("host", "www.example.com"),
            ("status", "200"),
            ("scheme", "https"),
        ]);
        let matches = match_histogram_rules("time", &incoming, &rules());

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].name, "a");
        assert_eq!(matches[0].labels.names(), &["host".to_string(), "status".to_string()]);
        assert_eq!(matches[1].name, "b");
    }

    #[test]
    fn no_match_when_labels_dont_match() {
        let incoming = labels(&[
            ("host", "nomatch.example.com"),
            ("status", "404"),
            ("scheme", "http"),
        ]);
        let matches = match_histogram_rules("time", &incoming, &rules());
        assert!(matches.is_empty());
    }

    #[test]
    fn rule_for_different_metric_does_not_participate() {
        let incoming = labels(&[("host", "www.example.com"), ("status", "200")]);
        let rules = vec![HistogramRule {
            metric: "size".into(),
            name: "a".into(),
            labels: BTreeMap::from([("host".into(), "www.example.com".into())]),
        }];
        assert!(match_histogram_rules("time", &incoming, &rules).is_empty());
    }

    #[test]
    fn rule_with_no_labels_matches_every_label_set() {
        let incoming = labels(&[("host", "anything")]);
        let rules = vec![HistogramRule {
            metric: "time".into(),
            name: "everything".into(),
            labels: BTreeMap::new(),
        }];
        let matches = match_histogram_rules("time", &incoming, &rules);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].labels.is_empty());
    }

    #[test]
    fn invalid_regex_is_treated_as_non_match() {
        let rules = vec![HistogramRule {
            metric: "time".into(),
            name: "bad".into(),
            labels: BTreeMap::from([("host".into(), "(".into())]),
        }];
        let incoming = labels(&[("host", "www.example.com")]);
        assert!(match_histogram_rules("time", &incoming, &rules).is_empty());
    }
}
