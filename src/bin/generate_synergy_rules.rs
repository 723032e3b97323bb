//! Generate Synergy Rules - tag-pair weights from the persisted hero records
//!
//! Usage:
//!   cargo run --release --bin generate_synergy_rules -- [--top N] [--min N] [--write PATH] [--list-all]
//!
//! The listing goes to stdout; the rule table is only written with --write.
//!
//! Environment variables:
//!   HERO_DATA_DIR - Per-hero JSON records (default: data/heroes)

use dotenv::dotenv;
use herostats::config::RulesConfig;
use herostats::rules::{infer_rules, load_profiles, render_listing, InferenceParams, RuleTable};
use herostats::store::HeroStore;
use log::{info, warn};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = RulesConfig::from_env(&args)?;

    let store = HeroStore::open(&config.hero_data_dir)?;
    let profiles = load_profiles(&store)?;
    if profiles.is_empty() {
        warn!("⚠️  No hero records in {}", config.hero_data_dir.display());
    }

    let params = InferenceParams {
        min_samples: config.min_samples,
        ..InferenceParams::default()
    };
    let inference = infer_rules(&profiles, &params);
    info!(
        "🧮 Inferred {} synergy and {} counter rules from {} heroes",
        inference.synergies.len(),
        inference.counters.len(),
        inference.heroes
    );

    let limit = if config.list_all { None } else { Some(config.top) };
    print!("{}", render_listing(&inference, limit, config.min_samples));

    if let Some(path) = &config.write {
        let path = if path.is_absolute() {
            path.clone()
        } else {
            env::current_dir()?.join(path)
        };
        RuleTable::from_inference(&inference, config.top).write(&path)?;
        println!("\nWrote: {}", path.display());
    }

    Ok(())
}
