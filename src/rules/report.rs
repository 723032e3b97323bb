//! Rule-table artifact and the companion listing
//!
//! The artifact is truncated to the top-K rules per direction; the listing
//! can show everything so the truncation never hides what was computed.

use super::inference::{InferredRule, RuleInference};
use crate::store::{write_json_atomic, StoreError};
use serde_json::{Map, Value};
use std::path::Path;

/// Tags shown in the listing's frequency section
pub const LISTED_TAGS: usize = 60;

/// `{tag_synergies: {"a+b": weight}, tag_counters: {"victim+counter": weight}}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTable {
    pub tag_synergies: Vec<(String, i64)>,
    pub tag_counters: Vec<(String, i64)>,
}

impl RuleTable {
    /// Keep the first `top` rules of each direction, highest average first
    pub fn from_inference(inference: &RuleInference, top: usize) -> Self {
        Self {
            tag_synergies: weights(&inference.synergies, top),
            tag_counters: weights(&inference.counters, top),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut table = Map::new();
        table.insert("tag_synergies".to_string(), weight_map(&self.tag_synergies));
        table.insert("tag_counters".to_string(), weight_map(&self.tag_counters));
        Value::Object(table)
    }

    pub fn write(&self, path: &Path) -> Result<(), StoreError> {
        write_json_atomic(path, &self.to_json())
    }
}

fn weights(rules: &[InferredRule], top: usize) -> Vec<(String, i64)> {
    rules.iter().take(top).map(|r| (r.key.clone(), r.weight)).collect()
}

fn weight_map(entries: &[(String, i64)]) -> Value {
    let map: Map<String, Value> = entries
        .iter()
        .map(|(key, weight)| (key.clone(), Value::from(*weight)))
        .collect();
    Value::Object(map)
}

/// Plain-text, tab-separated listing of one inference run.
///
/// `limit` caps each rule section; `None` lists everything.
pub fn render_listing(inference: &RuleInference, limit: Option<usize>, min_samples: u32) -> String {
    let mut out = String::new();

    out.push_str(&format!("heroes\t{}\n", inference.heroes));
    out.push_str(&format!("tags_unique\t{}\n", inference.tag_frequency.len()));

    out.push_str(&format!("\n== Tags (top {}) ==\n", LISTED_TAGS));
    for (tag, count) in inference.tag_frequency.iter().take(LISTED_TAGS) {
        out.push_str(&format!("{}\t{}\n", tag, count));
    }

    render_rules(&mut out, "tag_synergies", &inference.synergies, limit, min_samples);
    render_rules(&mut out, "tag_counters", &inference.counters, limit, min_samples);
    out
}

fn render_rules(out: &mut String, title: &str, rules: &[InferredRule], limit: Option<usize>, min_samples: u32) {
    let shown = limit.unwrap_or(rules.len()).min(rules.len());
    let scope = match limit {
        Some(top) => format!("top {}", top),
        None => "all".to_string(),
    };

    out.push_str(&format!(
        "\n== Inferred {} ({}, min={}, {} total) ==\n",
        title,
        scope,
        min_samples,
        rules.len()
    ));
    for rule in &rules[..shown] {
        out.push_str(&format!(
            "{}\tavg={:.2}\tsamples={}\tweight={}\n",
            rule.key, rule.avg, rule.samples, rule.weight
        ));
    }
}
