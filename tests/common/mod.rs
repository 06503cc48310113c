//! Shared test doubles for orchestrator-level tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use mintrunner::adapters::{
    AssetDetail, BalanceSource, BuyOrder, DiscoveryFeed, MarketDetailProvider, PoolMetrics,
    PoolSnapshot, SellOrder, SellQuote, Settlement, TradeExecutor, WalletIdentity,
};
use mintrunner::domain::FeedKind;
use mintrunner::error::{MintrunnerError, Result};
use mintrunner::persistence::StrategyRepository;
use mintrunner::pricing::CurveState;
use mintrunner::strategy::{StrategyConfig, TickOrchestrator};

pub struct FakeWallet;

impl WalletIdentity for FakeWallet {
    fn address(&self) -> &str {
        "FakeWalletAddress11111111111111111111111111"
    }
}

pub struct FakeBalance {
    pub lamports: AtomicU64,
    pub fail: AtomicBool,
    pub calls: AtomicU32,
}

impl FakeBalance {
    pub fn new(lamports: u64) -> Self {
        Self {
            lamports: AtomicU64::new(lamports),
            fail: AtomicBool::new(false),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl BalanceSource for FakeBalance {
    async fn available_lamports(&self, _address: &str) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(MintrunnerError::MarketDataUnavailable(
                "balance read failed".to_string(),
            ));
        }
        Ok(self.lamports.load(Ordering::SeqCst))
    }
}

pub struct FakeFeed {
    items: Mutex<HashMap<FeedKind, Vec<Value>>>,
    pub calls: AtomicU32,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Surface `mint` via the top-priority feed.
    pub fn add_candidate(&self, mint: &str) {
        self.items
            .lock()
            .unwrap()
            .entry(FeedKind::BoostsTop)
            .or_default()
            .push(json!({"chainId": "solana", "tokenAddress": mint}));
    }

    pub fn clear(&self) {
        self.items.lock().unwrap().clear();
    }
}

#[async_trait]
impl DiscoveryFeed for FakeFeed {
    async fn list(&self, kind: FeedKind) -> Result<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }
}

pub struct FakeDetail {
    details: Mutex<HashMap<String, AssetDetail>>,
    metrics: Mutex<HashMap<String, PoolMetrics>>,
    curves: Mutex<HashMap<String, CurveState>>,
    pools: Mutex<HashMap<String, PoolSnapshot>>,
}

impl FakeDetail {
    pub fn new() -> Self {
        Self {
            details: Mutex::new(HashMap::new()),
            metrics: Mutex::new(HashMap::new()),
            curves: Mutex::new(HashMap::new()),
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Register a token with sane curve/pool snapshots so it enriches and
    /// quotes cleanly.
    pub fn add_token(&self, mint: &str, creator: &str, complete: bool) {
        self.details.lock().unwrap().insert(
            mint.to_string(),
            AssetDetail {
                creator: Some(creator.to_string()),
                created_ts: None,
                complete,
            },
        );
        self.metrics.lock().unwrap().insert(
            mint.to_string(),
            PoolMetrics {
                volume24h: Some(600_000.0),
                market_cap: Some(150_000.0),
                pair_created_at_ms: None,
            },
        );
        self.curves.lock().unwrap().insert(
            mint.to_string(),
            CurveState {
                virtual_token_reserves: 1_073_000_000_000_000,
                virtual_sol_reserves: 30_000_000_000,
                real_token_reserves: 793_100_000_000_000,
                complete,
            },
        );
        self.pools.lock().unwrap().insert(
            mint.to_string(),
            PoolSnapshot {
                base_reserve: 1_000_000_000_000,
                quote_reserve: 50_000_000_000,
            },
        );
    }
}

#[async_trait]
impl MarketDetailProvider for FakeDetail {
    async fn asset_detail(&self, mint: &str) -> Result<AssetDetail> {
        self.details
            .lock()
            .unwrap()
            .get(mint)
            .cloned()
            .ok_or_else(|| MintrunnerError::MarketDataUnavailable(format!("no detail: {mint}")))
    }

    async fn pool_metrics(&self, _chain_id: &str, mint: &str) -> Result<PoolMetrics> {
        self.metrics
            .lock()
            .unwrap()
            .get(mint)
            .cloned()
            .ok_or_else(|| MintrunnerError::MarketDataUnavailable(format!("no metrics: {mint}")))
    }

    async fn curve_state(&self, mint: &str) -> Result<CurveState> {
        self.curves
            .lock()
            .unwrap()
            .get(mint)
            .copied()
            .ok_or_else(|| MintrunnerError::MarketDataUnavailable(format!("no curve: {mint}")))
    }

    async fn pool_snapshot(&self, mint: &str) -> Result<PoolSnapshot> {
        self.pools
            .lock()
            .unwrap()
            .get(mint)
            .copied()
            .ok_or_else(|| MintrunnerError::MarketDataUnavailable(format!("no pool: {mint}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellBehavior {
    Succeed,
    NothingToSell,
    Fail,
}

pub struct FakeExecutor {
    /// Ordered log of submissions: "buy:<mint>" / "sell:<mint>".
    pub ops: Mutex<Vec<String>>,
    pub buys: Mutex<Vec<BuyOrder>>,
    pub sells: Mutex<Vec<SellOrder>>,
    pub sell_behavior: Mutex<SellBehavior>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            buys: Mutex::new(Vec::new()),
            sells: Mutex::new(Vec::new()),
            sell_behavior: Mutex::new(SellBehavior::Succeed),
        }
    }

    pub fn set_sell_behavior(&self, behavior: SellBehavior) {
        *self.sell_behavior.lock().unwrap() = behavior;
    }

    pub fn op_log(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeExecutor for FakeExecutor {
    async fn buy(&self, order: &BuyOrder) -> Result<Settlement> {
        self.ops.lock().unwrap().push(format!("buy:{}", order.mint));
        self.buys.lock().unwrap().push(order.clone());
        Ok(Settlement {
            sig: Some(format!("sig-buy-{}", order.mint)),
        })
    }

    async fn sell(&self, order: &SellOrder) -> Result<Settlement> {
        self.ops
            .lock()
            .unwrap()
            .push(format!("sell:{}", order.mint));
        self.sells.lock().unwrap().push(order.clone());
        match *self.sell_behavior.lock().unwrap() {
            SellBehavior::Succeed => Ok(Settlement {
                sig: Some(format!("sig-sell-{}", order.mint)),
            }),
            SellBehavior::NothingToSell => Err(MintrunnerError::NothingToSell {
                mint: order.mint.clone(),
                reason: "no token balance".to_string(),
            }),
            SellBehavior::Fail => Err(MintrunnerError::Execution(
                "rpc send failed".to_string(),
            )),
        }
    }

    async fn quote_sell_all(&self, _order: &SellOrder) -> Result<SellQuote> {
        Ok(SellQuote {
            expected_lamports: 50_000_000,
        })
    }
}

/// A full orchestrator over fakes and a temp data root.
pub struct TestBed {
    _dir: tempfile::TempDir,
    pub repo: StrategyRepository,
    pub balance: Arc<FakeBalance>,
    pub feed: Arc<FakeFeed>,
    pub detail: Arc<FakeDetail>,
    pub executor: Arc<FakeExecutor>,
    pub orchestrator: TickOrchestrator,
}

impl TestBed {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = StrategyRepository::open(dir.path());
        let balance = Arc::new(FakeBalance::new(2_000_000_000)); // 2 SOL
        let feed = Arc::new(FakeFeed::new());
        let detail = Arc::new(FakeDetail::new());
        let executor = Arc::new(FakeExecutor::new());

        let orchestrator = TickOrchestrator::new(
            repo.clone(),
            Arc::new(FakeWallet),
            balance.clone(),
            feed.clone(),
            detail.clone(),
            executor.clone(),
        );

        Self {
            _dir: dir,
            repo,
            balance,
            feed,
            detail,
            executor,
            orchestrator,
        }
    }

    /// Base config with open filters: chain-gated but no numeric bounds,
    /// so registered tokens pass straight through.
    pub fn config(id: &str) -> StrategyConfig {
        StrategyConfig::base(id)
    }

    pub fn save_config(&self, config: &StrategyConfig) {
        self.repo.save(&config.id, config).unwrap();
    }
}
