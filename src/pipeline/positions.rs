//! Per-position pick and win rates
//!
//! Five sequential calls, one per slot. Counts are tallied as each slot
//! arrives, but rates are only derived in [`PositionTally::finish`] because a
//! hero's pick rate needs its total across all five slots.

use super::types::{PositionSlot, PositionStats, Roster};
use crate::stratz::queries::{PositionRow, PositionsData, QUERY_POSITIONS};
use crate::stratz::{HeroId, RateLimitedClient};
use std::collections::BTreeMap;

pub type HeroPositions = BTreeMap<PositionSlot, PositionStats>;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SlotCount {
    matches: u64,
    wins: u64,
}

#[derive(Debug, Default)]
pub struct PositionTally {
    counts: BTreeMap<HeroId, BTreeMap<PositionSlot, SlotCount>>,
}

impl PositionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one slot's rows. Heroes outside the roster are ignored.
    pub fn record(&mut self, slot: PositionSlot, rows: &[PositionRow], roster: &Roster) -> usize {
        let mut kept = 0;
        for row in rows {
            if !roster.contains(row.hero_id) {
                continue;
            }
            let count = self
                .counts
                .entry(row.hero_id)
                .or_default()
                .entry(slot)
                .or_default();
            count.matches += row.match_count.unwrap_or(0);
            count.wins += row.win_count.unwrap_or(0);
            kept += 1;
        }
        kept
    }

    /// Derive rates once every slot has been recorded.
    ///
    /// `pick_rate = slot matches / hero's total matches * 100`,
    /// `win_rate = slot wins / slot matches * 100`. Heroes with no matches at
    /// all get no entry, and empty slots are omitted rather than zero-filled.
    pub fn finish(self) -> BTreeMap<HeroId, HeroPositions> {
        let mut result = BTreeMap::new();

        for (hero_id, slots) in self.counts {
            let total: u64 = slots.values().map(|c| c.matches).sum();
            if total == 0 {
                continue;
            }

            let positions: HeroPositions = slots
                .into_iter()
                .filter(|(_, c)| c.matches > 0)
                .map(|(slot, c)| {
                    let stats = PositionStats {
                        pick_count: c.matches,
                        pick_rate: c.matches as f64 * 100.0 / total as f64,
                        win_rate: c.wins as f64 * 100.0 / c.matches as f64,
                    };
                    (slot, stats)
                })
                .collect();

            result.insert(hero_id, positions);
        }

        result
    }
}

#[derive(Debug, Default)]
pub struct PositionReport {
    pub positions: BTreeMap<HeroId, HeroPositions>,
    /// Slots whose call failed; their heroes simply lack that slot
    pub failed_slots: Vec<PositionSlot>,
}

pub async fn aggregate_positions(client: &RateLimitedClient, roster: &Roster) -> PositionReport {
    let mut tally = PositionTally::new();
    let mut failed_slots = Vec::new();

    for slot in PositionSlot::all() {
        log::info!("   ├─ Loading {}...", slot.as_str());
        let context = format!("Positions {}", slot.as_str());
        let variables = serde_json::json!({ "pos": [slot.api_code()] });

        match client.request::<PositionsData>(QUERY_POSITIONS, variables, &context).await {
            Ok(data) => {
                let rows = data
                    .hero_stats
                    .and_then(|s| s.win_week)
                    .unwrap_or_default();
                let kept = tally.record(slot, &rows, roster);
                log::debug!("{}: {} rows ({} in roster)", slot.as_str(), rows.len(), kept);
            }
            Err(e) => {
                log::warn!("⚠️  Position stage: {} unavailable this run: {}", slot.as_str(), e);
                failed_slots.push(slot);
            }
        }
    }

    let positions = tally.finish();
    log::info!("   └─ Rates derived for {} heroes", positions.len());

    PositionReport {
        positions,
        failed_slots,
    }
}
