//! Core data structures for the hero stats pipeline

use crate::stratz::HeroId;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

/// Hero id -> display name, read-only once the roster is loaded
pub type NameTable = HashMap<HeroId, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryAttribute {
    Strength,
    Agility,
    Intelligence,
    Universal,
    /// Unrecognised code, kept capitalised rather than dropped
    Other(String),
}

impl PrimaryAttribute {
    /// Map an API attribute code (`str`, `agi`, `int`, `all`)
    pub fn from_code(raw: &str) -> Self {
        match raw {
            "str" => PrimaryAttribute::Strength,
            "agi" => PrimaryAttribute::Agility,
            "int" => PrimaryAttribute::Intelligence,
            "all" => PrimaryAttribute::Universal,
            other => PrimaryAttribute::Other(capitalize(other)),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            PrimaryAttribute::Strength => "Strength",
            PrimaryAttribute::Agility => "Agility",
            PrimaryAttribute::Intelligence => "Intelligence",
            PrimaryAttribute::Universal => "Universal",
            PrimaryAttribute::Other(s) => s,
        }
    }

    /// Lowercase form stored in hero records
    pub fn record_value(&self) -> String {
        self.display_name().to_lowercase()
    }
}

fn capitalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Carry,
    Durable,
    Support,
    Disabler,
    Initiator,
    Nuker,
    Escaper,
}

impl Role {
    /// Normalise an API role identifier; unknown roles yield `None`
    pub fn from_id(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "carry" => Some(Role::Carry),
            "durable" => Some(Role::Durable),
            "support" => Some(Role::Support),
            "disabler" => Some(Role::Disabler),
            "initiator" => Some(Role::Initiator),
            "nuker" => Some(Role::Nuker),
            "escaper" | "escape" => Some(Role::Escaper),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Carry => "carry",
            Role::Durable => "durable",
            Role::Support => "support",
            Role::Disabler => "disabler",
            Role::Initiator => "initiator",
            Role::Nuker => "nuker",
            Role::Escaper => "escaper",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionSlot {
    Pos1,
    Pos2,
    Pos3,
    Pos4,
    Pos5,
}

impl PositionSlot {
    pub fn all() -> [PositionSlot; 5] {
        [
            PositionSlot::Pos1,
            PositionSlot::Pos2,
            PositionSlot::Pos3,
            PositionSlot::Pos4,
            PositionSlot::Pos5,
        ]
    }

    /// `MatchPlayerPositionType` enum value
    pub fn api_code(&self) -> &'static str {
        match self {
            PositionSlot::Pos1 => "POSITION_1",
            PositionSlot::Pos2 => "POSITION_2",
            PositionSlot::Pos3 => "POSITION_3",
            PositionSlot::Pos4 => "POSITION_4",
            PositionSlot::Pos5 => "POSITION_5",
        }
    }

    /// Key used in hero records
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSlot::Pos1 => "pos_1",
            PositionSlot::Pos2 => "pos_2",
            PositionSlot::Pos3 => "pos_3",
            PositionSlot::Pos4 => "pos_4",
            PositionSlot::Pos5 => "pos_5",
        }
    }
}

impl Serialize for PositionSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionStats {
    pub pick_count: u64,
    #[serde(serialize_with = "serialize_percent")]
    pub pick_rate: f64,
    #[serde(serialize_with = "serialize_percent")]
    pub win_rate: f64,
}

/// One decimal place with a trailing `%`, e.g. `40.0%`
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

fn serialize_percent<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_percent(*value))
}

/// Two decimals, ties to even (`0.125` -> `0.12`, `0.375` -> `0.38`)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// One entry of a ranked counters or synergies list
#[derive(Debug, Clone, PartialEq)]
pub struct RankedHero {
    pub hero: String,
    /// Rounded to two decimals
    pub score: f64,
}

impl RankedHero {
    pub fn new(hero: String, raw_score: f64) -> Self {
        Self {
            hero,
            score: round2(raw_score),
        }
    }
}

/// Reduced matchup data for one hero
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeroMatchups {
    /// Most negative score first
    pub counters: Vec<RankedHero>,
    /// Highest averaged synergy first
    pub synergies: Vec<RankedHero>,
}

/// In-memory hero assembled across the pipeline stages
#[derive(Debug, Clone)]
pub struct Hero {
    pub id: HeroId,
    pub name: String,
    pub primary_attribute: PrimaryAttribute,
    pub roles: Vec<Role>,
    /// Absent slots mean "no data", never zero
    pub positions: BTreeMap<PositionSlot, PositionStats>,
    pub matchups: HeroMatchups,
}

/// Authoritative roster produced by the constants stage
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub heroes: BTreeMap<HeroId, Hero>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.heroes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heroes.is_empty()
    }

    pub fn contains(&self, id: HeroId) -> bool {
        self.heroes.contains_key(&id)
    }

    pub fn name_table(&self) -> NameTable {
        self.heroes
            .iter()
            .map(|(id, hero)| (*id, hero.name.clone()))
            .collect()
    }
}
