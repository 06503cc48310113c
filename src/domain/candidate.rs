use serde::{Deserialize, Serialize};
use std::fmt;

/// Discovery feed, in fixed priority order.
///
/// The order of the variants is the order feeds are collected in; survivors
/// of the filter keep that ordering, so earlier feeds win entry selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    BoostsTop,
    BoostsLatest,
    AdsLatest,
    Trending,
    NewListings,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoostsTop => "boosts_top",
            Self::BoostsLatest => "boosts_latest",
            Self::AdsLatest => "ads_latest",
            Self::Trending => "trending",
            Self::NewListings => "new_listings",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw discovered token before enrichment. Per-tick only, never persisted.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub mint: String,
    pub chain_id: Option<String>,
    pub source: FeedKind,
}

/// A candidate after enrichment with venue detail and pool metrics.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedCandidate {
    pub mint: String,
    pub source: FeedKind,
    pub creator: String,
    /// Listing creation time (unix seconds), when the venue reports one.
    pub created_ts: Option<i64>,
    /// Age derived from pair creation or listing time.
    pub age_sec: Option<i64>,
    pub volume24h: Option<f64>,
    pub market_cap: Option<f64>,
    /// True once the bonding curve has migrated to a pooled market.
    pub complete: bool,
}
