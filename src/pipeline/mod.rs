//! # Hero Stats Pipeline
//!
//! Turns raw API match statistics into per-hero positions, counters and
//! synergies.
//!
//! ## Stages
//!
//! 1. `constants` - roster, attributes, roles (authoritative id -> name table)
//! 2. `positions` - pick/win rate per position slot, sequential
//! 3. `matchups` - counters and synergies per hero, bounded worker pool
//! 4. `store::writer` - snapshot and record updates (outside this module)
//!
//! `engine` wires the stages together. Each run overwrites; nothing is merged
//! incrementally across runs.

pub mod constants;
pub mod engine;
pub mod matchups;
pub mod positions;
pub mod types;

pub use engine::{PipelineEngine, PipelineError, RunSummary, StageReport};
pub use matchups::{reduce_matchups, MatchupAggregator, MatchupResults};
pub use positions::{PositionReport, PositionTally};
pub use types::{Hero, HeroMatchups, PositionSlot, PositionStats, PrimaryAttribute, RankedHero, Role, Roster};
