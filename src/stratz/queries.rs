//! GraphQL documents and response shapes for the stats API
//!
//! ## Endpoint
//!
//! `POST https://api.stratz.com/graphql` with a bearer token.
//! Every field below is optional on the wire; the reducers decide what a
//! missing value means.

use serde::Deserialize;

pub type HeroId = u32;

/// Query A: full roster with attribute and role ids
pub const QUERY_HEROES: &str = r#"
query {
  constants {
    heroes {
      id
      displayName
      stats { primaryAttribute }
      roles { roleId }
    }
  }
}
"#;

/// Query B: weekly win/match counts per hero for the given position slots
pub const QUERY_POSITIONS: &str = r#"
query GetPosStats($pos: [MatchPlayerPositionType]) {
  heroStats {
    winWeek(positionIds: $pos) {
      heroId
      matchCount
      winCount
    }
  }
}
"#;

/// Query C: pairwise matchups for one hero, one page of `take` rows
pub const QUERY_MATCHUP: &str = r#"
query GetMatchup($hid: Short!, $take: Int) {
  heroStats {
    matchUp(heroId: $hid, take: $take) {
      heroId
      vs { heroId2 matchCount winCount }
      with { heroId2 matchCount winCount synergy }
    }
  }
}
"#;

// ---------------------------------------------------------------------------
// Query A
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ConstantsData {
    pub constants: Option<ConstantsHeroes>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstantsHeroes {
    #[serde(default)]
    pub heroes: Vec<ConstantsHero>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstantsHero {
    pub id: HeroId,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub stats: Option<ConstantsHeroStats>,
    #[serde(default)]
    pub roles: Option<Vec<ConstantsRole>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstantsHeroStats {
    #[serde(rename = "primaryAttribute")]
    pub primary_attribute: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstantsRole {
    /// Enum name on the current schema, integer on older ones
    #[serde(rename = "roleId")]
    pub role_id: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Query B
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PositionsData {
    #[serde(rename = "heroStats")]
    pub hero_stats: Option<PositionsHeroStats>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionsHeroStats {
    #[serde(rename = "winWeek", default)]
    pub win_week: Option<Vec<PositionRow>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionRow {
    #[serde(rename = "heroId")]
    pub hero_id: HeroId,
    /// `null` and missing both count as zero
    #[serde(rename = "matchCount", default)]
    pub match_count: Option<u64>,
    #[serde(rename = "winCount", default)]
    pub win_count: Option<u64>,
}

// ---------------------------------------------------------------------------
// Query C
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchupData {
    #[serde(rename = "heroStats")]
    pub hero_stats: Option<MatchupHeroStats>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchupHeroStats {
    #[serde(rename = "matchUp", default)]
    pub match_up: Option<Vec<MatchupRecord>>,
}

/// One page entry; a hero may appear in several (per bracket buckets)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchupRecord {
    #[serde(rename = "heroId")]
    pub hero_id: Option<HeroId>,
    #[serde(default)]
    pub vs: Option<Vec<VsRow>>,
    #[serde(default)]
    pub with: Option<Vec<WithRow>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VsRow {
    #[serde(rename = "heroId2")]
    pub hero_id2: Option<HeroId>,
    #[serde(rename = "matchCount")]
    pub match_count: Option<u64>,
    #[serde(rename = "winCount")]
    pub win_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WithRow {
    #[serde(rename = "heroId2")]
    pub hero_id2: Option<HeroId>,
    #[serde(rename = "matchCount")]
    pub match_count: Option<u64>,
    #[serde(rename = "winCount")]
    pub win_count: Option<u64>,
    pub synergy: Option<f64>,
}
