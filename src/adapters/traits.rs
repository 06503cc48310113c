use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{FeedKind, Venue};
use crate::error::Result;
use crate::pricing::{CurveState, PoolReserves};

/// Wallet identity. Signing stays with the implementation; the core only
/// forwards the address into balance reads and orders.
pub trait WalletIdentity: Send + Sync {
    fn address(&self) -> &str;
}

#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Available balance in lamports.
    async fn available_lamports(&self, address: &str) -> Result<u64>;
}

/// Sort orders tried in sequence for the trending feed, first non-empty
/// result wins.
pub const TRENDING_FALLBACK_SORTS: &[&str] = &[
    "market_cap",
    "usd_market_cap",
    "reply_count",
    "last_trade_timestamp",
];

/// A discovery feed returning raw, schemaless candidate payloads.
///
/// Feeds fail independently: an `Err` from one feed never aborts the tick,
/// the pipeline records it and moves on.
#[async_trait]
pub trait DiscoveryFeed: Send + Sync {
    async fn list(&self, kind: FeedKind) -> Result<Vec<Value>>;

    /// Feed listing with an explicit sort hint, for feeds whose default
    /// ordering is unreliable. The default implementation ignores the hint.
    async fn list_sorted(&self, kind: FeedKind, _sort: &str) -> Result<Vec<Value>> {
        self.list(kind).await
    }
}

/// Venue-specific token detail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetDetail {
    pub creator: Option<String>,
    /// Listing creation time, unix seconds.
    pub created_ts: Option<i64>,
    /// True once the bonding curve has migrated to the pooled market.
    pub complete: bool,
}

/// Pool-level trading metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolMetrics {
    pub volume24h: Option<f64>,
    pub market_cap: Option<f64>,
    /// Pair creation time, unix milliseconds.
    pub pair_created_at_ms: Option<i64>,
}

/// Reserve snapshot of the pooled market, both sides read together so buy
/// and sell quotes derive from one consistent view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub base_reserve: u64,
    pub quote_reserve: u64,
}

impl PoolSnapshot {
    /// Reserves oriented for a buy (quote in, base out).
    pub fn buy_side(&self) -> PoolReserves {
        PoolReserves {
            reserve_in: self.quote_reserve,
            reserve_out: self.base_reserve,
        }
    }

    /// Reserves oriented for a sell (base in, quote out).
    pub fn sell_side(&self) -> PoolReserves {
        PoolReserves {
            reserve_in: self.base_reserve,
            reserve_out: self.quote_reserve,
        }
    }
}

/// Venue metadata and fresh reserve snapshots for quoting.
#[async_trait]
pub trait MarketDetailProvider: Send + Sync {
    async fn asset_detail(&self, mint: &str) -> Result<AssetDetail>;

    async fn pool_metrics(&self, chain_id: &str, mint: &str) -> Result<PoolMetrics>;

    /// Current bonding-curve account state.
    async fn curve_state(&self, mint: &str) -> Result<CurveState>;

    /// Current pooled-market reserves.
    async fn pool_snapshot(&self, mint: &str) -> Result<PoolSnapshot>;
}

/// An entry order with its contractual slippage bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyOrder {
    pub mint: String,
    pub venue: Venue,
    pub creator: String,
    pub spend_lamports: u64,
    /// Minimum acceptable token output, quoted by the pricing engine.
    pub min_out: u64,
    pub fee_to: Option<String>,
    pub fee_bps: Option<u32>,
}

/// A sell-the-whole-position order. The executor knows the held balance,
/// so the slippage bound is expressed as a tolerance it must enforce when
/// deriving the minimum output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellOrder {
    pub mint: String,
    pub venue: Venue,
    pub creator: String,
    pub slippage_bps: u32,
    pub fee_to: Option<String>,
    pub fee_bps: Option<u32>,
}

/// Settled order reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub sig: Option<String>,
}

/// Simulated sell-everything outcome, used for PnL estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellQuote {
    pub expected_lamports: u64,
}

/// Order placement. Implementations own transaction construction,
/// broadcast and transport retries; the core records outcomes and never
/// retries in-tick.
///
/// A sell against a wallet that no longer holds the token must fail with
/// [`crate::error::MintrunnerError::NothingToSell`] so the orchestrator can
/// reconcile the position as already closed.
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    async fn buy(&self, order: &BuyOrder) -> Result<Settlement>;

    async fn sell(&self, order: &SellOrder) -> Result<Settlement>;

    /// Simulate selling the entire held balance without broadcasting.
    async fn quote_sell_all(&self, order: &SellOrder) -> Result<SellQuote>;
}
