//! Tag-pair rule generation over the persisted hero dataset.
//!
//! Runs as its own batch job, after `fetch_hero_stats` has written the
//! explicit counters and synergies back into the records.

pub mod inference;
pub mod report;

pub use inference::{infer_rules, HeroProfile, InferenceParams, InferredRule, RuleInference, WeightScale};
pub use report::{render_listing, RuleTable};

use crate::store::{HeroStore, StoreError};

/// Load every record in `store` and keep the ones carrying a name
pub fn load_profiles(store: &HeroStore) -> Result<Vec<HeroProfile>, StoreError> {
    Ok(store
        .load_all()?
        .iter()
        .filter_map(HeroProfile::from_record)
        .collect())
}
