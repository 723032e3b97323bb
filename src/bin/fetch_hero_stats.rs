//! Fetch Hero Stats - roster, positions and matchups into the hero records
//!
//! Usage:
//!   cargo run --release --bin fetch_hero_stats -- [token] [workers]
//!
//! Environment variables:
//!   STRATZ_TOKEN - API token (required unless passed as first argument)
//!   STRATZ_API_URL - GraphQL endpoint (default: https://api.stratz.com/graphql)
//!   MAX_WORKERS - Concurrent matchup fetches (default: 5)
//!   MAX_WAIT_SECS - Backoff budget per request (default: 60)
//!   HERO_DATA_DIR - Per-hero JSON records (default: data/heroes)
//!   STRATZ_SNAPSHOT_PATH - Roster snapshot (default: data/dota_heroes_stratz.json)
//!
//! Exit status: 0 when everything succeeded, 2 when the run finished with
//! degraded units (see the summary), 1 on fatal errors.

use dotenv::dotenv;
use herostats::config::PipelineConfig;
use herostats::pipeline::PipelineEngine;
use herostats::store::{HeroDatasetWriter, HeroStore};
use herostats::stratz::{RateLimitedClient, ReqwestTransport, TokioSleeper};
use log::{info, warn};
use std::env;
use std::sync::Arc;

const EXIT_DEGRADED: i32 = 2;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = PipelineConfig::from_env()?;
    let args: Vec<String> = env::args().skip(1).collect();
    config.apply_args(&args);
    let token = config.require_token()?;

    info!("🚀 Hero stats fetch");
    info!("   ├─ Endpoint: {}", config.api_url);
    info!("   ├─ Workers: {}", config.max_workers);
    info!("   ├─ Wait budget: {}s per request", config.max_wait.as_secs());
    info!("   ├─ Matchup rows per hero: {}", config.matchup_take);
    info!("   └─ Records: {}", config.hero_data_dir.display());

    let store = HeroStore::open(&config.hero_data_dir)?;
    if store.is_empty() {
        warn!("⚠️  No hero records found in {}", config.hero_data_dir.display());
    }
    let writer = HeroDatasetWriter::new(store, Some(config.snapshot_path.clone()));

    let transport = ReqwestTransport::new(&config.api_url, token, config.request_timeout)?;
    let client = Arc::new(RateLimitedClient::new(
        Arc::new(transport),
        Arc::new(TokioSleeper),
        config.retry_policy(),
    ));

    let engine = PipelineEngine::new(client, config.max_workers, config.matchup_take);
    let summary = engine.run(&writer).await?;
    summary.log();

    if !summary.is_complete() {
        warn!("⚠️  Run finished with degraded results; re-run to fill the gaps");
        std::process::exit(EXIT_DEGRADED);
    }

    info!("✅ Done");
    Ok(())
}
