//! Pipeline Engine - stage orchestration for one run
//!
//! ```text
//! load_roster()            (1 call)
//!     ↓
//! aggregate_positions()    (5 sequential calls, join before rates)
//!     ↓
//! MatchupAggregator::run() (N heroes over a bounded worker pool)
//!     ↓
//! HeroDatasetWriter        (snapshot + per-hero records)
//! ```
//!
//! Nothing is persisted until every fetch stage has finished, so an
//! interrupted run leaves the store exactly as it was.

use super::constants::load_roster;
use super::matchups::MatchupAggregator;
use super::positions::aggregate_positions;
use super::types::{PositionSlot, Roster};
use crate::store::{HeroDatasetWriter, StoreError, WriteSummary};
use crate::stratz::{ApiError, HeroId, RateLimitedClient};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub enum PipelineError {
    /// Without a roster no later stage can run
    Roster(ApiError),
    EmptyRoster,
    Store(StoreError),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        PipelineError::Store(err)
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Roster(e) => write!(f, "Roster fetch failed: {}", e),
            PipelineError::EmptyRoster => write!(f, "Roster fetch returned no heroes"),
            PipelineError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

/// What the fetch stages produced, before anything is written
#[derive(Debug, Default)]
pub struct StageReport {
    pub heroes_with_positions: usize,
    pub failed_slots: Vec<PositionSlot>,
    pub degraded_heroes: Vec<String>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub roster_size: usize,
    pub stages: StageReport,
    pub snapshot_written: bool,
    pub write: WriteSummary,
}

impl RunSummary {
    /// True when no unit of work degraded
    pub fn is_complete(&self) -> bool {
        self.stages.failed_slots.is_empty()
            && self.stages.degraded_heroes.is_empty()
            && self.snapshot_written
            && self.write.missing.is_empty()
            && self.write.failed.is_empty()
    }

    pub fn log(&self) {
        log::info!("📊 Run summary (started {})", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
        log::info!("   ├─ Duration: {:.1}s", self.elapsed.as_secs_f64());
        log::info!("   ├─ Roster: {} heroes", self.roster_size);
        log::info!("   ├─ With position data: {}", self.stages.heroes_with_positions);
        log::info!("   ├─ Position slots unavailable: {}", self.stages.failed_slots.len());
        log::info!("   ├─ Matchups degraded: {}", self.stages.degraded_heroes.len());
        log::info!("   ├─ Records updated: {}", self.write.updated);
        log::info!("   ├─ Records missing: {}", self.write.missing.len());
        log::info!("   └─ Records failed: {}", self.write.failed.len());

        for name in &self.stages.degraded_heroes {
            log::warn!("   ↳ retry matchups for: {}", name);
        }
    }
}

pub struct PipelineEngine {
    client: Arc<RateLimitedClient>,
    workers: usize,
    matchup_take: u32,
}

impl PipelineEngine {
    pub fn new(client: Arc<RateLimitedClient>, workers: usize, matchup_take: u32) -> Self {
        Self {
            client,
            workers,
            matchup_take,
        }
    }

    /// Run the three fetch stages and return the merged in-memory roster
    pub async fn collect(&self) -> Result<(Roster, StageReport), PipelineError> {
        log::info!("1️⃣  Loading hero roster...");
        let mut roster = load_roster(&self.client).await.map_err(PipelineError::Roster)?;
        if roster.is_empty() {
            return Err(PipelineError::EmptyRoster);
        }
        log::info!("   └─ {} heroes", roster.len());

        log::info!("2️⃣  Loading position stats (all brackets)...");
        let positions = aggregate_positions(&self.client, &roster).await;
        let heroes_with_positions = positions.positions.len();
        for (hero_id, slots) in positions.positions {
            if let Some(hero) = roster.heroes.get_mut(&hero_id) {
                hero.positions = slots;
            }
        }

        log::info!("3️⃣  Loading matchups ({} workers)...", self.workers);
        let names = Arc::new(roster.name_table());
        let hero_ids: Vec<HeroId> = roster.heroes.keys().copied().collect();
        let aggregator = MatchupAggregator::new(self.client.clone(), names, self.workers, self.matchup_take);
        let mut results = aggregator.run(&hero_ids).await;

        for (hero_id, hero) in roster.heroes.iter_mut() {
            if let Some(matchups) = results.table.remove(hero_id) {
                hero.matchups = matchups;
            }
        }

        let degraded_heroes = results
            .failed
            .iter()
            .filter_map(|id| roster.heroes.get(id).map(|h| h.name.clone()))
            .collect();

        Ok((
            roster,
            StageReport {
                heroes_with_positions,
                failed_slots: positions.failed_slots,
                degraded_heroes,
            },
        ))
    }

    /// Full run: fetch everything, then write snapshot and records
    pub async fn run(&self, writer: &HeroDatasetWriter) -> Result<RunSummary, PipelineError> {
        let started_at = Utc::now();
        let start = Instant::now();

        let (roster, stages) = self.collect().await?;

        log::info!("4️⃣  Writing hero dataset...");
        let snapshot_written = match writer.write_snapshot(&roster) {
            Ok(_) => true,
            Err(e) => {
                log::error!("❌ Failed to write roster snapshot: {}", e);
                false
            }
        };
        let write = writer.update_records(&roster);

        Ok(RunSummary {
            started_at,
            elapsed: start.elapsed(),
            roster_size: roster.len(),
            stages,
            snapshot_written,
            write,
        })
    }
}
