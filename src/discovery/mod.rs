//! Candidate discovery, enrichment and filtering.
//!
//! A pure pipeline from `(discovery settings, external feeds)` to an
//! ordered list of tradeable candidates. Feed and enrichment failures
//! degrade independently and are tallied for the run record; nothing in
//! here can abort a tick.

pub mod normalize;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::adapters::{DiscoveryFeed, MarketDetailProvider, TRENDING_FALLBACK_SORTS};
use crate::domain::{Candidate, EnrichedCandidate, FeedKind};
use crate::strategy::schema::{DiscoveryFilters, DiscoverySettings};

use normalize::{pick_path, to_num, to_str};

/// Per-feed slice taken before dedup.
const FEED_SLICE: usize = 50;
/// Enrichment is bounded to the first N deduped candidates to bound
/// external calls per tick.
const ENRICH_LIMIT: usize = 25;
/// At most this many enrichment failures are sampled into the run record.
const FAIL_SAMPLE_LIMIT: usize = 5;

const CHAIN_PATHS: &[&str] = &["chainId", "chain", "token.chainId", "pair.chainId"];
const MINT_PATHS: &[&str] = &[
    "tokenAddress",
    "address",
    "token.address",
    "baseToken.address",
    "token0",
    "mint",
    "mintAddress",
];

/// Why candidates were rejected, by filter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterTally {
    pub market_cap_min: u32,
    pub market_cap_max: u32,
    pub volume24h_min: u32,
    pub token_age_min_sec: u32,
    pub token_age_max_sec: u32,
    pub missing_creator: u32,
    pub missing_metric: u32,
}

/// Diagnostic tally for one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryDebug {
    pub tried: u32,
    pub detail_ok: u32,
    pub detail_fail: u32,
    pub detail_fail_samples: Vec<FailSample>,
    pub filtered_by: FilterTally,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailSample {
    pub mint: String,
    pub err: String,
}

/// Pipeline output: deduped raw candidates, enriched survivors, tallies.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    pub discovered: Vec<Candidate>,
    pub enriched: Vec<EnrichedCandidate>,
    pub debug: DiscoveryDebug,
}

/// Discovery pipeline over injected feed and detail collaborators.
pub struct DiscoveryPipeline<'a> {
    feed: &'a dyn DiscoveryFeed,
    detail: &'a dyn MarketDetailProvider,
}

impl<'a> DiscoveryPipeline<'a> {
    pub fn new(feed: &'a dyn DiscoveryFeed, detail: &'a dyn MarketDetailProvider) -> Self {
        Self { feed, detail }
    }

    /// Feeds to collect from, in fixed priority order.
    fn enabled_feeds(settings: &DiscoverySettings) -> Vec<FeedKind> {
        let s = &settings.sources;
        let mut feeds = Vec::new();
        if s.boosts_top {
            feeds.push(FeedKind::BoostsTop);
        }
        if s.boosts_latest {
            feeds.push(FeedKind::BoostsLatest);
        }
        if s.ads_latest {
            feeds.push(FeedKind::AdsLatest);
        }
        if s.trending {
            feeds.push(FeedKind::Trending);
        }
        if settings.use_new_listings {
            feeds.push(FeedKind::NewListings);
        }
        feeds
    }

    /// The trending feed's default ordering is unreliable, so it is queried
    /// as an ordered fallback list: each sort is tried in turn and the
    /// first non-empty result short-circuits.
    async fn list_trending(&self) -> Vec<Value> {
        for &sort in TRENDING_FALLBACK_SORTS {
            match self.feed.list_sorted(FeedKind::Trending, sort).await {
                Ok(items) if !items.is_empty() => return items,
                Ok(_) => continue,
                Err(e) => {
                    debug!(sort, error = %e, "trending sort failed");
                    continue;
                }
            }
        }
        self.feed
            .list(FeedKind::NewListings)
            .await
            .unwrap_or_default()
    }

    /// Collect raw payloads, extract ids, filter by chain, dedupe by mint
    /// (first-seen source wins).
    async fn collect(&self, settings: &DiscoverySettings) -> Vec<Candidate> {
        let chain_filter = settings
            .filters
            .chain_id
            .as_ref()
            .map(|c| c.to_ascii_lowercase());

        let mut out = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for kind in Self::enabled_feeds(settings) {
            let items = if kind == FeedKind::Trending {
                self.list_trending().await
            } else {
                match self.feed.list(kind).await {
                    Ok(items) => items,
                    Err(e) => {
                        // A failing source degrades to empty; it never
                        // aborts the tick.
                        warn!(feed = %kind, error = %e, "discovery feed failed");
                        Vec::new()
                    }
                }
            };

            for raw in items.iter().take(FEED_SLICE) {
                let Some(mint) = to_str(pick_path(raw, MINT_PATHS)) else {
                    continue;
                };
                let chain_id = to_str(pick_path(raw, CHAIN_PATHS));

                if let (Some(want), Some(got)) = (&chain_filter, &chain_id) {
                    if !got.eq_ignore_ascii_case(want) {
                        continue;
                    }
                }
                if !seen.insert(mint.clone()) {
                    continue;
                }
                out.push(Candidate {
                    mint,
                    chain_id,
                    source: kind,
                });
            }
        }
        out
    }

    async fn enrich(
        &self,
        settings: &DiscoverySettings,
        candidates: &[Candidate],
        now: DateTime<Utc>,
        debug: &mut DiscoveryDebug,
    ) -> Vec<EnrichedCandidate> {
        let chain_default = settings
            .filters
            .chain_id
            .clone()
            .unwrap_or_else(|| "solana".to_string());

        let mut enriched = Vec::new();
        for c in candidates.iter().take(ENRICH_LIMIT) {
            debug.tried += 1;

            let detail = match self.detail.asset_detail(&c.mint).await {
                Ok(d) => {
                    debug.detail_ok += 1;
                    d
                }
                Err(e) => {
                    // One candidate's failure excludes only that candidate.
                    debug.detail_fail += 1;
                    if debug.detail_fail_samples.len() < FAIL_SAMPLE_LIMIT {
                        debug.detail_fail_samples.push(FailSample {
                            mint: c.mint.clone(),
                            err: e.to_string(),
                        });
                    }
                    continue;
                }
            };

            let chain = c.chain_id.as_deref().unwrap_or(&chain_default);
            let metrics = self
                .detail
                .pool_metrics(chain, &c.mint)
                .await
                .unwrap_or_default();

            let age_sec = metrics
                .pair_created_at_ms
                .map(|ms| (now.timestamp_millis() - ms) / 1000)
                .or_else(|| detail.created_ts.map(|ts| now.timestamp() - ts));

            enriched.push(EnrichedCandidate {
                mint: c.mint.clone(),
                source: c.source,
                creator: detail.creator.unwrap_or_default(),
                created_ts: detail.created_ts,
                age_sec,
                volume24h: metrics.volume24h,
                market_cap: metrics.market_cap,
                complete: detail.complete,
            });
        }
        enriched
    }

    /// Run the full pipeline. Output keeps feed-priority order; selection
    /// among survivors is the orchestrator's concern.
    pub async fn run(&self, settings: &DiscoverySettings, now: DateTime<Utc>) -> DiscoveryOutcome {
        let discovered = self.collect(settings).await;
        let mut debug = DiscoveryDebug::default();
        let enriched = self.enrich(settings, &discovered, now, &mut debug).await;
        let filtered = enriched
            .into_iter()
            .filter(|x| passes_filters(x, &settings.filters, &mut debug.filtered_by))
            .collect();

        DiscoveryOutcome {
            discovered,
            enriched: filtered,
            debug,
        }
    }
}

/// Apply configured bounds. A candidate missing a metric that has a
/// configured bound is rejected; a missing creator always rejects.
fn passes_filters(x: &EnrichedCandidate, f: &DiscoveryFilters, tally: &mut FilterTally) -> bool {
    if x.creator.is_empty() {
        tally.missing_creator += 1;
        return false;
    }

    if (f.market_cap_min.is_some() || f.market_cap_max.is_some()) && x.market_cap.is_none() {
        tally.missing_metric += 1;
        return false;
    }
    if f.volume24h_min.is_some() && x.volume24h.is_none() {
        tally.missing_metric += 1;
        return false;
    }

    if let (Some(min), Some(mc)) = (f.market_cap_min, x.market_cap) {
        if mc < min {
            tally.market_cap_min += 1;
            return false;
        }
    }
    if let (Some(max), Some(mc)) = (f.market_cap_max, x.market_cap) {
        if mc > max {
            tally.market_cap_max += 1;
            return false;
        }
    }
    if let (Some(min), Some(vol)) = (f.volume24h_min, x.volume24h) {
        if vol < min {
            tally.volume24h_min += 1;
            return false;
        }
    }
    if let Some(min_age) = f.token_age_min_sec {
        if x.age_sec.is_none_or(|age| age < min_age) {
            tally.token_age_min_sec += 1;
            return false;
        }
    }
    if let Some(max_age) = f.token_age_max_sec {
        if x.age_sec.is_none_or(|age| age > max_age) {
            tally.token_age_max_sec += 1;
            return false;
        }
    }
    true
}
