//! Tag-pair rule inference over persisted hero records
//!
//! ## Synergy (unordered pairs)
//!
//! For each hero H and each ally A with explicit synergy `s > 0`, every pair
//! of distinct tags (tag of H, tag of A) accumulates `s` under the key
//! `min+max` (sorted, so direction is irrelevant).
//!
//! ## Counter (ordered pairs)
//!
//! For each victim H and each hero C with explicit counter score `c < 0`,
//! every pair of distinct tags (tag of H, tag of C) accumulates `|c|` under
//! `victimTag+counterTag`: "enemy has victimTag, pick counterTag".
//!
//! Pairs seen fewer than `min_samples` times are dropped. Survivors get
//! `weight = clamp(round(avg * factor), min, max)`, ties to even.

use crate::store::HeroRecord;
use std::collections::{BTreeMap, HashMap};

/// Tags, explicit scores and name of one persisted hero
#[derive(Debug, Clone, PartialEq)]
pub struct HeroProfile {
    pub name: String,
    pub tags: Vec<String>,
    /// Ally name -> score, record order
    pub synergies: Vec<(String, f64)>,
    /// Opponent name -> score, record order
    pub counters: Vec<(String, f64)>,
}

impl HeroProfile {
    /// Read the fields inference needs; `None` for records without a name.
    ///
    /// Non-string tags and non-numeric scores are ignored rather than fatal.
    pub fn from_record(record: &HeroRecord) -> Option<Self> {
        let name = record.get("name")?.as_str()?.to_string();

        let tags = record
            .get("tags")
            .and_then(|t| t.as_array())
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            name,
            tags,
            synergies: numeric_entries(record, "explicit_synergies"),
            counters: numeric_entries(record, "explicit_counters"),
        })
    }
}

fn numeric_entries(record: &HeroRecord, field: &str) -> Vec<(String, f64)> {
    record
        .get(field)
        .and_then(|v| v.as_object())
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_f64().map(|score| (k.clone(), score)))
                .collect()
        })
        .unwrap_or_default()
}

/// Maps a percentage-point average onto the small integer rule scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightScale {
    pub factor: f64,
    pub min: i64,
    pub max: i64,
}

impl Default for WeightScale {
    fn default() -> Self {
        Self {
            factor: 2.0,
            min: 4,
            max: 24,
        }
    }
}

impl WeightScale {
    /// Ties round to even: an average of 5.25 scales to 10.5 and weighs 10
    pub fn weight(&self, avg: f64) -> i64 {
        ((avg * self.factor).round_ties_even() as i64).clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceParams {
    pub min_samples: u32,
    pub scale: WeightScale,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            min_samples: 10,
            scale: WeightScale::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferredRule {
    pub key: String,
    pub avg: f64,
    pub samples: u32,
    pub weight: i64,
}

/// Full, untruncated result of one inference run
#[derive(Debug, Clone, Default)]
pub struct RuleInference {
    pub heroes: usize,
    /// Tag -> number of heroes carrying it, most common first
    pub tag_frequency: Vec<(String, usize)>,
    /// Highest average first
    pub synergies: Vec<InferredRule>,
    /// Highest average first
    pub counters: Vec<InferredRule>,
}

#[derive(Debug, Default)]
struct PairAccumulator {
    pairs: HashMap<String, (f64, u32)>,
}

impl PairAccumulator {
    fn add(&mut self, key: String, value: f64) {
        let entry = self.pairs.entry(key).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    fn into_rules(self, params: &InferenceParams) -> Vec<InferredRule> {
        let mut rules: Vec<InferredRule> = self
            .pairs
            .into_iter()
            .filter(|(_, (_, samples))| *samples >= params.min_samples)
            .map(|(key, (sum, samples))| {
                let avg = sum / samples as f64;
                InferredRule {
                    key,
                    avg,
                    samples,
                    weight: params.scale.weight(avg),
                }
            })
            .collect();

        rules.sort_by(|a, b| {
            b.avg
                .total_cmp(&a.avg)
                .then(b.samples.cmp(&a.samples))
                .then(b.key.cmp(&a.key))
        });
        rules
    }
}

/// Derive synergy and counter tag-pair rules from hero profiles.
///
/// Explicit entries naming a hero absent from `profiles` are stale and
/// skipped.
pub fn infer_rules(profiles: &[HeroProfile], params: &InferenceParams) -> RuleInference {
    let heroes: BTreeMap<&str, &HeroProfile> = profiles.iter().map(|p| (p.name.as_str(), p)).collect();

    let mut tag_counts: HashMap<&str, usize> = HashMap::new();
    for hero in heroes.values() {
        for tag in &hero.tags {
            *tag_counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }

    let mut synergy = PairAccumulator::default();
    let mut counter = PairAccumulator::default();

    for hero in heroes.values() {
        for (ally_name, score) in &hero.synergies {
            if *score <= 0.0 {
                continue;
            }
            let Some(ally) = heroes.get(ally_name.as_str()) else {
                continue;
            };
            for t1 in &hero.tags {
                for t2 in &ally.tags {
                    if t1 == t2 {
                        continue;
                    }
                    let (a, b) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
                    synergy.add(format!("{}+{}", a, b), *score);
                }
            }
        }

        for (counter_name, score) in &hero.counters {
            if *score >= 0.0 {
                continue;
            }
            let Some(counter_hero) = heroes.get(counter_name.as_str()) else {
                continue;
            };
            for victim_tag in &hero.tags {
                for counter_tag in &counter_hero.tags {
                    if victim_tag == counter_tag {
                        continue;
                    }
                    counter.add(format!("{}+{}", victim_tag, counter_tag), score.abs());
                }
            }
        }
    }

    let mut tag_frequency: Vec<(String, usize)> = tag_counts
        .into_iter()
        .map(|(tag, count)| (tag.to_string(), count))
        .collect();
    tag_frequency.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    RuleInference {
        heroes: heroes.len(),
        tag_frequency,
        synergies: synergy.into_rules(params),
        counters: counter.into_rules(params),
    }
}
