//! Matchup reduction and the bounded worker pool that drives it
//!
//! ## Reduction (per hero)
//!
//! ```text
//! MatchupRecord pages
//!     ↓ group vs rows by opponent (sum wins, sum matches)
//!     ↓ drop pairs with matches <= 30
//!     ↓ score = winrate% - 50, ascending, top 10   → counters
//!
//!     ↓ group with rows by ally (mean of non-null synergy)
//!     ↓ descending, top 10                          → synergies
//! ```
//!
//! ## Fan-out
//!
//! A fixed number of workers pull hero ids from a shared queue. Each worker
//! owns its fetch and reduction and hands the finished result to a single
//! collector over a channel. The collector is the only writer of the results
//! table and inserts each hero at most once.

use super::types::{HeroMatchups, NameTable, RankedHero};
use crate::stratz::queries::{MatchupData, MatchupRecord, QUERY_MATCHUP};
use crate::stratz::{ApiError, HeroId, RateLimitedClient};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Pairs with this many games or fewer are noise
pub const MIN_PAIR_MATCHES: u64 = 30;

/// Length of each ranked list
pub const TOP_N: usize = 10;

/// Summed head-to-head counts against one opponent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct VersusAggregate {
    wins: u64,
    matches: u64,
}

/// Running mean of the API synergy value with one ally
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SynergyAggregate {
    sum: f64,
    samples: u32,
}

/// Reduce every page returned for `hero_id` into ranked lists.
///
/// Opponents or allies missing from `names` are skipped: the roster is the
/// source of truth.
pub fn reduce_matchups(hero_id: HeroId, records: &[MatchupRecord], names: &NameTable) -> HeroMatchups {
    let mut versus: BTreeMap<HeroId, VersusAggregate> = BTreeMap::new();
    let mut with: BTreeMap<HeroId, SynergyAggregate> = BTreeMap::new();

    let is_other = |id: Option<HeroId>| id.filter(|id| *id != 0 && *id != hero_id);

    for record in records {
        for row in record.vs.iter().flatten() {
            let Some(opponent) = is_other(row.hero_id2) else {
                continue;
            };
            let agg = versus.entry(opponent).or_default();
            agg.wins += row.win_count.unwrap_or(0);
            agg.matches += row.match_count.unwrap_or(0);
        }

        for row in record.with.iter().flatten() {
            let Some(ally) = is_other(row.hero_id2) else {
                continue;
            };
            // Null synergy counts toward neither the sum nor the divisor
            if let Some(synergy) = row.synergy {
                let agg = with.entry(ally).or_default();
                agg.sum += synergy;
                agg.samples += 1;
            }
        }
    }

    HeroMatchups {
        counters: rank_counters(&versus, names),
        synergies: rank_synergies(&with, names),
    }
}

fn rank_counters(versus: &BTreeMap<HeroId, VersusAggregate>, names: &NameTable) -> Vec<RankedHero> {
    let mut scored: Vec<(&String, f64)> = versus
        .iter()
        .filter(|(_, agg)| agg.matches > MIN_PAIR_MATCHES)
        .filter_map(|(id, agg)| {
            let name = names.get(id)?;
            let win_rate = agg.wins as f64 * 100.0 / agg.matches as f64;
            Some((name, win_rate - 50.0))
        })
        .collect();

    // Stable sort over id-ordered input keeps ties deterministic
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.truncate(TOP_N);

    scored
        .into_iter()
        .map(|(name, score)| RankedHero::new(name.clone(), score))
        .collect()
}

fn rank_synergies(with: &BTreeMap<HeroId, SynergyAggregate>, names: &NameTable) -> Vec<RankedHero> {
    let mut scored: Vec<(&String, f64)> = with
        .iter()
        .filter(|(_, agg)| agg.samples > 0)
        .filter_map(|(id, agg)| Some((names.get(id)?, agg.sum / agg.samples as f64)))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(TOP_N);

    scored
        .into_iter()
        .map(|(name, score)| RankedHero::new(name.clone(), score))
        .collect()
}

/// Fetch and reduce one hero's matchups
pub async fn fetch_hero_matchups(
    client: &RateLimitedClient,
    names: &NameTable,
    hero_id: HeroId,
    take: u32,
) -> Result<HeroMatchups, ApiError> {
    let context = names
        .get(&hero_id)
        .cloned()
        .unwrap_or_else(|| hero_id.to_string());
    let variables = serde_json::json!({ "hid": hero_id, "take": take });

    let data: MatchupData = client.request(QUERY_MATCHUP, variables, &context).await?;
    let records = data
        .hero_stats
        .and_then(|s| s.match_up)
        .unwrap_or_default();

    Ok(reduce_matchups(hero_id, &records, names))
}

#[derive(Debug, Default)]
pub struct MatchupResults {
    /// Exactly one entry per requested hero
    pub table: HashMap<HeroId, HeroMatchups>,
    /// Heroes that degraded to empty lists, ascending
    pub failed: Vec<HeroId>,
}

pub struct MatchupAggregator {
    client: Arc<RateLimitedClient>,
    names: Arc<NameTable>,
    workers: usize,
    take: u32,
}

impl MatchupAggregator {
    pub fn new(client: Arc<RateLimitedClient>, names: Arc<NameTable>, workers: usize, take: u32) -> Self {
        Self {
            client,
            names,
            workers,
            take,
        }
    }

    /// Process every hero through the pool and collect the results table.
    ///
    /// A hero whose fetch fails (or whose worker dies) gets empty lists and is
    /// reported in `failed`; other heroes are unaffected.
    pub async fn run(&self, hero_ids: &[HeroId]) -> MatchupResults {
        let total = hero_ids.len();
        if total == 0 {
            return MatchupResults::default();
        }

        let (job_tx, job_rx) = mpsc::channel::<HeroId>(total);
        for id in hero_ids {
            // Capacity equals job count, so this never waits
            if job_tx.send(*id).await.is_err() {
                break;
            }
        }
        drop(job_tx);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let worker_count = self.workers.clamp(1, total);
        let (result_tx, mut result_rx) =
            mpsc::channel::<(HeroId, Result<HeroMatchups, ApiError>)>(worker_count * 2);

        for worker_id in 0..worker_count {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let client = self.client.clone();
            let names = self.names.clone();
            let take = self.take;

            tokio::spawn(async move {
                loop {
                    let next = { jobs.lock().await.recv().await };
                    let Some(hero_id) = next else {
                        break;
                    };
                    let outcome = fetch_hero_matchups(&client, &names, hero_id, take).await;
                    if results.send((hero_id, outcome)).await.is_err() {
                        break;
                    }
                }
                log::debug!("Matchup worker {} finished", worker_id);
            });
        }
        drop(result_tx);

        let mut table: HashMap<HeroId, HeroMatchups> = HashMap::with_capacity(total);
        let mut failed = Vec::new();
        let mut completed = 0usize;

        while let Some((hero_id, outcome)) = result_rx.recv().await {
            completed += 1;
            let name = self.hero_name(hero_id);

            let matchups = match outcome {
                Ok(matchups) => matchups,
                Err(e) => {
                    let hint = if e.is_permanent() { "fix the request" } else { "re-run later" };
                    log::warn!("⚠️  Matchup stage: {} degraded to empty lists ({}): {}", name, hint, e);
                    failed.push(hero_id);
                    HeroMatchups::default()
                }
            };

            match table.entry(hero_id) {
                Entry::Vacant(slot) => {
                    slot.insert(matchups);
                }
                Entry::Occupied(_) => {
                    log::error!("❌ Duplicate matchup result for {}, keeping the first", name);
                }
            }

            if completed % 5 == 0 || completed == total {
                log::info!("   [{}/{}] {}", completed, total, name);
            }
        }

        // A worker that panicked never reported its hero
        for id in hero_ids {
            if let Entry::Vacant(slot) = table.entry(*id) {
                log::warn!("⚠️  Matchup stage: no result for {}", self.hero_name(*id));
                slot.insert(HeroMatchups::default());
                failed.push(*id);
            }
        }

        failed.sort_unstable();
        failed.dedup();
        MatchupResults { table, failed }
    }

    fn hero_name(&self, hero_id: HeroId) -> String {
        self.names
            .get(&hero_id)
            .cloned()
            .unwrap_or_else(|| hero_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stratz::client::{GraphqlRequest, GraphqlTransport, Sleeper, TransportError, TransportResponse};
    use crate::stratz::queries::{VsRow, WithRow};
    use crate::stratz::RetryPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn names(ids: &[HeroId]) -> NameTable {
        ids.iter().map(|id| (*id, format!("Hero {}", id))).collect()
    }

    fn vs(opponent: HeroId, matches: u64, wins: u64) -> VsRow {
        VsRow {
            hero_id2: Some(opponent),
            match_count: Some(matches),
            win_count: Some(wins),
        }
    }

    fn with(ally: HeroId, synergy: Option<f64>) -> WithRow {
        WithRow {
            hero_id2: Some(ally),
            match_count: Some(100),
            win_count: Some(50),
            synergy,
        }
    }

    fn record(vs_rows: Vec<VsRow>, with_rows: Vec<WithRow>) -> MatchupRecord {
        MatchupRecord {
            hero_id: Some(1),
            vs: Some(vs_rows),
            with: Some(with_rows),
        }
    }

    #[test]
    fn test_counter_score_and_sample_threshold() {
        let names = names(&[1, 2, 3]);
        let records = vec![record(vec![vs(2, 100, 40), vs(3, 20, 2)], vec![])];

        let result = reduce_matchups(1, &records, &names);
        assert_eq!(result.counters.len(), 1);
        assert_eq!(result.counters[0].hero, "Hero 2");
        assert_eq!(result.counters[0].score, -10.0);
    }

    #[test]
    fn test_threshold_is_strictly_greater_than_thirty() {
        let names = names(&[1, 2, 3]);
        let records = vec![record(vec![vs(2, 30, 10), vs(3, 31, 10)], vec![])];

        let result = reduce_matchups(1, &records, &names);
        let heroes: Vec<&str> = result.counters.iter().map(|c| c.hero.as_str()).collect();
        assert_eq!(heroes, vec!["Hero 3"]);
    }

    #[test]
    fn test_counts_are_summed_across_pages() {
        let names = names(&[1, 2]);
        // 20 games each page: too few alone, enough together
        let records = vec![
            record(vec![vs(2, 20, 8)], vec![]),
            record(vec![vs(2, 20, 8)], vec![]),
        ];

        let result = reduce_matchups(1, &records, &names);
        assert_eq!(result.counters.len(), 1);
        assert_eq!(result.counters[0].score, -10.0);
    }

    #[test]
    fn test_synergy_average_excludes_nulls() {
        let names = names(&[1, 2]);
        let records = vec![
            record(vec![], vec![with(2, Some(5.0))]),
            record(vec![], vec![with(2, None)]),
            record(vec![], vec![with(2, Some(15.0))]),
        ];

        let result = reduce_matchups(1, &records, &names);
        assert_eq!(result.synergies.len(), 1);
        assert_eq!(result.synergies[0].score, 10.0);
    }

    #[test]
    fn test_all_null_synergy_ally_is_absent() {
        let names = names(&[1, 2]);
        let records = vec![record(vec![], vec![with(2, None), with(2, None)])];

        let result = reduce_matchups(1, &records, &names);
        assert!(result.synergies.is_empty());
    }

    #[test]
    fn test_top_n_truncation_sorted_ascending() {
        let ids: Vec<HeroId> = (1..=16).collect();
        let names = names(&ids);
        // Opponents 2..=16 with win counts 30..=44 out of 100
        let rows: Vec<VsRow> = (2..=16).map(|id| vs(id, 100, 28 + id as u64)).collect();
        let records = vec![record(rows, vec![])];

        let result = reduce_matchups(1, &records, &names);
        assert_eq!(result.counters.len(), TOP_N);
        assert!(result.counters.windows(2).all(|w| w[0].score <= w[1].score));
        assert_eq!(result.counters[0].hero, "Hero 2");
        assert_eq!(result.counters[0].score, -20.0);
        assert_eq!(result.counters[9].score, -11.0);
    }

    #[test]
    fn test_synergies_sorted_descending_and_truncated() {
        let ids: Vec<HeroId> = (1..=13).collect();
        let names = names(&ids);
        let rows: Vec<WithRow> = (2..=13).map(|id| with(id, Some(id as f64))).collect();
        let records = vec![record(vec![], rows)];

        let result = reduce_matchups(1, &records, &names);
        assert_eq!(result.synergies.len(), TOP_N);
        assert_eq!(result.synergies[0].hero, "Hero 13");
        assert_eq!(result.synergies[9].hero, "Hero 4");
    }

    #[test]
    fn test_self_zero_and_unknown_ids_are_skipped() {
        let names = names(&[1, 2]);
        let records = vec![record(
            vec![vs(1, 100, 10), vs(0, 100, 10), vs(77, 100, 10), vs(2, 100, 60)],
            vec![with(1, Some(9.0)), with(77, Some(9.0))],
        )];

        let result = reduce_matchups(1, &records, &names);
        assert_eq!(result.counters.len(), 1);
        assert_eq!(result.counters[0].hero, "Hero 2");
        assert_eq!(result.counters[0].score, 10.0);
        assert!(result.synergies.is_empty());
    }

    /// Serves a fixed matchup page per hero; hero 3 gets a GraphQL error
    struct PoolTransport {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl GraphqlTransport for PoolTransport {
        async fn post(&self, request: &GraphqlRequest) -> Result<TransportResponse, TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let hid = request.variables["hid"].as_u64().unwrap_or(0);
            let body = if hid == 3 {
                r#"{"errors": [{"message": "boom"}]}"#.to_string()
            } else {
                let opponent = if hid == 1 { 2 } else { 1 };
                serde_json::json!({"data": {"heroStats": {"matchUp": [{
                    "heroId": hid,
                    "vs": [{"heroId2": opponent, "matchCount": 100, "winCount": 45}],
                    "with": [{"heroId2": opponent, "matchCount": 100, "winCount": 55, "synergy": 4.5}]
                }]}}})
                .to_string()
            };

            Ok(TransportResponse {
                status: 200,
                retry_after: None,
                body,
            })
        }
    }

    struct NoSleep;

    #[async_trait]
    impl Sleeper for NoSleep {
        async fn sleep(&self, _duration: Duration) {}
    }

    #[tokio::test]
    async fn test_pool_fills_table_once_per_hero() {
        let transport = Arc::new(PoolTransport {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let client = Arc::new(RateLimitedClient::new(
            transport.clone(),
            Arc::new(NoSleep),
            RetryPolicy::default(),
        ));
        let ids: Vec<HeroId> = (1..=8).collect();
        let aggregator = MatchupAggregator::new(client, Arc::new(names(&ids)), 3, 150);

        let results = aggregator.run(&ids).await;

        assert_eq!(results.table.len(), 8);
        assert_eq!(results.failed, vec![3]);
        assert_eq!(results.table[&3], HeroMatchups::default());
        assert_eq!(results.table[&1].counters[0].hero, "Hero 2");
        assert_eq!(results.table[&1].counters[0].score, -5.0);
        assert_eq!(results.table[&5].synergies[0].score, 4.5);
        assert!(transport.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_pool_with_no_heroes() {
        let transport = Arc::new(PoolTransport {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let client = Arc::new(RateLimitedClient::new(transport, Arc::new(NoSleep), RetryPolicy::default()));
        let aggregator = MatchupAggregator::new(client, Arc::new(NameTable::new()), 5, 150);

        let results = aggregator.run(&[]).await;
        assert!(results.table.is_empty());
        assert!(results.failed.is_empty());
    }
}
