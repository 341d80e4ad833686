//! Single-value rule evaluation (`device_type`, `prefix`).
//!
//! A [`Rule`] maps a regex match against some source string to a label
//! value. [`RuleList`]s are evaluated first-match-wins; a [`LabelConfig`]
//! pairs a rule list with the default value to fall back on.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single classification rule: match `regex` against the source string,
/// and if it matches, the derived label value is `value`.
///
/// When `regex` is absent, the effective pattern is an anchored prefix
/// match of `value` itself (`^value`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

impl Rule {
    pub fn new(value: impl Into<String>, regex: Option<String>) -> Self {
        Self {
            value: value.into(),
            regex,
        }
    }

    /// The regex this rule actually matches against: `regex` unanchored if
    /// present, otherwise an anchored prefix match of `value`.
    fn effective_pattern(&self) -> String {
        match &self.regex {
            Some(r) if !r.is_empty() => r.clone(),
            _ => format!("^{}", self.value),
        }
    }
}

/// An ordered list of [`Rule`]s, evaluated first-match-wins.
pub type RuleList = Vec<Rule>;

/// Pairs a default value with an optional rule list driving a derived
/// label (`device_type` from `user_agent`, `prefix` from `request_uri`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default)]
    pub default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleList>,
}

/// Evaluate `rules` against `src` in order, returning the `value` of the
/// first matching rule, or `default` if none match (or `rules` is absent).
///
/// Regex compilation errors are logged and treated as a non-match for that
/// rule; evaluation continues with the next rule.
pub fn parse_rule(src: &str, default: &str, rules: Option<&RuleList>) -> String {
    let Some(rules) = rules else {
        return default.to_string();
    };

    for rule in rules {
        let pattern = rule.effective_pattern();
        match Regex::new(&pattern) {
            Ok(re) => {
                if re.is_match(src) {
                    return rule.value.clone();
                }
            }
            Err(err) => {
                tracing::error!(pattern = %pattern, error = %err, "invalid rule regex, treating as non-match");
            }
        }
    }
    default.to_string()
}
