//! Hero dataset writer
//!
//! Two outputs per run:
//! - a roster snapshot (every hero, sorted by name) for inspection and diffing
//! - in-place updates of the per-hero records, touching only owned fields
//!
//! Owned fields: `name`, `primary_attribute`, `roles`, `positions`,
//! `explicit_counters`, `explicit_synergies`. Everything else is preserved.

use super::{write_json_atomic, HeroRecord, HeroStore, StoreError};
use crate::pipeline::types::{Hero, PositionStats, RankedHero, Roster};
use crate::stratz::HeroId;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct SnapshotEntry<'a> {
    id: HeroId,
    name: &'a str,
    primary_attr: &'a str,
    roles: Vec<&'static str>,
    positions: BTreeMap<&'static str, &'a PositionStats>,
    counters: Vec<CounterEntry<'a>>,
    synergies: Vec<SynergyEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct CounterEntry<'a> {
    hero: &'a str,
    counter_score: f64,
}

#[derive(Debug, Serialize)]
struct SynergyEntry<'a> {
    hero: &'a str,
    synergy_score: f64,
}

impl<'a> SnapshotEntry<'a> {
    fn from_hero(hero: &'a Hero) -> Self {
        Self {
            id: hero.id,
            name: &hero.name,
            primary_attr: hero.primary_attribute.display_name(),
            roles: hero.roles.iter().map(|r| r.as_str()).collect(),
            positions: hero.positions.iter().map(|(slot, s)| (slot.as_str(), s)).collect(),
            counters: hero
                .matchups
                .counters
                .iter()
                .map(|c| CounterEntry {
                    hero: &c.hero,
                    counter_score: c.score,
                })
                .collect(),
            synergies: hero
                .matchups
                .synergies
                .iter()
                .map(|s| SynergyEntry {
                    hero: &s.hero,
                    synergy_score: s.score,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct WriteSummary {
    pub updated: usize,
    /// Roster heroes with no record file
    pub missing: Vec<String>,
    /// Records that could not be read or written
    pub failed: Vec<String>,
}

pub struct HeroDatasetWriter {
    store: HeroStore,
    snapshot_path: Option<PathBuf>,
}

impl HeroDatasetWriter {
    pub fn new(store: HeroStore, snapshot_path: Option<PathBuf>) -> Self {
        Self {
            store,
            snapshot_path,
        }
    }

    /// Write the merged roster as one JSON array sorted by hero name
    pub fn write_snapshot(&self, roster: &Roster) -> Result<Option<&Path>, StoreError> {
        let Some(path) = self.snapshot_path.as_deref() else {
            return Ok(None);
        };

        let mut entries: Vec<SnapshotEntry> = roster.heroes.values().map(SnapshotEntry::from_hero).collect();
        entries.sort_by(|a, b| a.name.cmp(b.name).then(a.id.cmp(&b.id)));

        write_json_atomic(path, &entries)?;
        log::info!("💾 Roster snapshot written: {} ({} heroes)", path.display(), entries.len());
        Ok(Some(path))
    }

    /// Overwrite owned fields of every roster hero's record.
    ///
    /// Each record is read, patched and replaced on its own; one bad record
    /// does not stop the others.
    pub fn update_records(&self, roster: &Roster) -> WriteSummary {
        let mut summary = WriteSummary::default();

        for hero in roster.heroes.values() {
            let Some(path) = self.store.locate(&hero.name) else {
                log::warn!("⚠️  No record file for {}", hero.name);
                summary.missing.push(hero.name.clone());
                continue;
            };

            match self.update_one(path, hero) {
                Ok(()) => summary.updated += 1,
                Err(e) => {
                    log::error!("❌ Failed to update {} ({}): {}", hero.name, path.display(), e);
                    summary.failed.push(hero.name.clone());
                }
            }
        }

        summary
    }

    fn update_one(&self, path: &Path, hero: &Hero) -> Result<(), StoreError> {
        let mut record = self.store.load(path)?;
        apply_owned_fields(&mut record, hero)?;
        self.store.save(path, &record)
    }
}

/// Overwrite the pipeline-owned fields of `record` with `hero`'s data
pub fn apply_owned_fields(record: &mut HeroRecord, hero: &Hero) -> Result<(), StoreError> {
    record.insert("name".to_string(), Value::String(hero.name.clone()));
    record.insert(
        "primary_attribute".to_string(),
        Value::String(hero.primary_attribute.record_value()),
    );
    record.insert(
        "roles".to_string(),
        Value::Array(
            hero.roles
                .iter()
                .map(|r| Value::String(r.as_str().to_string()))
                .collect(),
        ),
    );
    record.insert("positions".to_string(), serde_json::to_value(&hero.positions)?);
    record.insert("explicit_counters".to_string(), ranked_map(&hero.matchups.counters));
    record.insert("explicit_synergies".to_string(), ranked_map(&hero.matchups.synergies));
    Ok(())
}

/// Ranked list as a JSON object, keeping rank order
fn ranked_map(entries: &[RankedHero]) -> Value {
    let mut map = serde_json::Map::new();
    for entry in entries {
        let score = serde_json::Number::from_f64(entry.score)
            .map(Value::Number)
            .unwrap_or(Value::Null);
        map.insert(entry.hero.clone(), score);
    }
    Value::Object(map)
}
