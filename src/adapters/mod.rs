//! External collaborator contracts.
//!
//! The tick runtime owns no transport: wallets, balance reads, discovery
//! feeds, venue detail and order placement are all injected behind these
//! traits. Implementations live with the caller (RPC clients, HTTP feeds,
//! transaction builders); the core only sees the contracts.

pub mod traits;

pub use traits::{
    AssetDetail, BalanceSource, BuyOrder, DiscoveryFeed, MarketDetailProvider, PoolMetrics,
    PoolSnapshot, SellOrder, SellQuote, Settlement, TradeExecutor, WalletIdentity,
    TRENDING_FALLBACK_SORTS,
};
