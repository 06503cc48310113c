pub mod adapters;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod pricing;
pub mod strategy;
pub mod supervisor;

pub use adapters::{
    AssetDetail, BalanceSource, BuyOrder, DiscoveryFeed, MarketDetailProvider, PoolMetrics,
    PoolSnapshot, SellOrder, SellQuote, Settlement, TradeExecutor, WalletIdentity,
};
pub use config::AppConfig;
pub use discovery::{DiscoveryDebug, DiscoveryOutcome, DiscoveryPipeline};
pub use domain::{
    idempotency_key, ActionKind, Candidate, EnrichedCandidate, FeedKind, IdempotencyEntry,
    Position, RuntimeState, Venue,
};
pub use error::{MintrunnerError, Result};
pub use logging::init_logging;
pub use persistence::{FileStore, LockGuard, StrategyRepository};
pub use pricing::{min_out_after_slippage, CurveState, PoolReserves};
pub use strategy::{
    build_strategy, collect_status, create_strategy, list_strategies, set_enabled, ForceOverride,
    Preset, StrategyConfig, StrategyOverrides, TickAction, TickOrchestrator, TickReport,
};
pub use supervisor::{check_strategy, Recommendation, WatchdogConfig, WatchdogReport};
