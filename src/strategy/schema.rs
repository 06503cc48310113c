//! Strategy configuration documents and presets.
//!
//! A strategy is a versioned JSON policy created once by an operator and
//! read-only to the tick loop. Presets seed defaults fill-if-absent: an
//! explicit override applied before the preset is never overwritten.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MintrunnerError, Result};

/// Risk preset seeding strategy defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Conservative,
    Aggressive,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = MintrunnerError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(MintrunnerError::UnknownPreset(other.to_string())),
        }
    }
}

/// Spending limits and exposure caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budgets {
    /// Skip the whole tick when the wallet balance is below this.
    pub min_sol_balance: Decimal,
    /// SOL spent per entry.
    pub buy_sol_per_trade: Decimal,
    pub max_open_positions: u32,
    pub max_buys_per_hour: u32,
    pub max_loss_sol_per_day: Decimal,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            min_sol_balance: dec!(0.5),
            buy_sol_per_trade: dec!(0.1),
            max_open_positions: 5,
            max_buys_per_hour: 20,
            max_loss_sol_per_day: dec!(1.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlippageSettings {
    /// Hard ceiling on buy-side slippage, percent.
    pub max_pct: u32,
}

impl Default for SlippageSettings {
    fn default() -> Self {
        Self { max_pct: 30 }
    }
}

/// Transaction fee knobs forwarded to the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSettings {
    pub max_sol: Decimal,
    pub cu_limit: u32,
    pub cu_price: u64,
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            max_sol: dec!(0.05),
            cu_limit: 250_000,
            cu_price: 666_666,
        }
    }
}

/// Which discovery feeds are enabled. Collection order is fixed by
/// `FeedKind`, not by this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySources {
    pub boosts_top: bool,
    pub boosts_latest: bool,
    pub ads_latest: bool,
    pub trending: bool,
}

impl Default for DiscoverySources {
    fn default() -> Self {
        Self {
            boosts_top: true,
            boosts_latest: true,
            ads_latest: true,
            trending: true,
        }
    }
}

/// Numeric candidate filters. `None` means the bound is not applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryFilters {
    pub chain_id: Option<String>,
    pub market_cap_min: Option<f64>,
    pub market_cap_max: Option<f64>,
    pub volume24h_min: Option<f64>,
    pub token_age_min_sec: Option<i64>,
    pub token_age_max_sec: Option<i64>,
}

impl Default for DiscoveryFilters {
    fn default() -> Self {
        Self {
            chain_id: Some("solana".to_string()),
            market_cap_min: None,
            market_cap_max: None,
            volume24h_min: None,
            token_age_min_sec: None,
            token_age_max_sec: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// The raw new-listings feed is noisy; strictly opt-in.
    #[serde(default)]
    pub use_new_listings: bool,
    #[serde(default)]
    pub sources: DiscoverySources,
    #[serde(default)]
    pub filters: DiscoveryFilters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSettings {
    pub dry_run: bool,
    /// Slippage tolerance applied to quoted outputs, basis points.
    pub slippage_bps: u32,
    /// Optional SOL fee cut recipient, forwarded to the executor.
    pub fee_to: Option<String>,
    pub fee_bps: Option<u32>,
    /// Time-based exit horizon; `None` disables exits.
    pub exit_after_sec: Option<i64>,
    /// Re-entry suppression after a sell; `None` disables cooldowns.
    pub cooldown_after_sell_sec: Option<i64>,
    /// Per-order executor timeout; `None` leaves timeouts to the
    /// executor's own transport policy.
    #[serde(default)]
    pub order_timeout_ms: Option<u64>,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            slippage_bps: 500,
            fee_to: None,
            fee_bps: Some(30),
            exit_after_sec: None,
            cooldown_after_sell_sec: None,
            order_timeout_ms: None,
        }
    }
}

/// A complete per-strategy policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub id: String,
    pub kind: String,
    pub enabled: bool,
    /// Intended scheduler interval; informational to the tick itself.
    pub tick_sec: u64,
    pub wallet: String,
    pub risk_profile: Preset,
    #[serde(default)]
    pub budgets: Budgets,
    #[serde(default)]
    pub slippage: SlippageSettings,
    #[serde(default)]
    pub fees: FeeSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub execution: ExecutionSettings,
}

impl StrategyConfig {
    /// Base defaults before preset application.
    pub fn base(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "auto_trade".to_string(),
            enabled: true,
            tick_sec: 60,
            wallet: "default".to_string(),
            risk_profile: Preset::Conservative,
            budgets: Budgets::default(),
            slippage: SlippageSettings::default(),
            fees: FeeSettings::default(),
            discovery: DiscoverySettings::default(),
            execution: ExecutionSettings::default(),
        }
    }

    /// Base defaults with a preset applied and no explicit overrides.
    pub fn with_preset(id: impl Into<String>, preset: Preset) -> Self {
        let mut cfg = Self::base(id);
        cfg.apply_preset(preset, false);
        cfg
    }

    /// Apply a preset fill-if-absent.
    ///
    /// Only fields the caller has not already set are touched; the tick
    /// interval is adjusted only when `tick_sec_overridden` is false.
    pub fn apply_preset(&mut self, preset: Preset, tick_sec_overridden: bool) {
        self.risk_profile = preset;
        let f = &mut self.discovery.filters;
        let x = &mut self.execution;

        match preset {
            Preset::Aggressive => {
                if !tick_sec_overridden {
                    self.tick_sec = self.tick_sec.min(30);
                }
                // No age floor by default: aggressive trades fresh listings.
                f.market_cap_min.get_or_insert(100_000.0);
                f.market_cap_max.get_or_insert(300_000.0);
                f.volume24h_min.get_or_insert(500_000.0);
                x.exit_after_sec.get_or_insert(10 * 60);
                x.cooldown_after_sell_sec.get_or_insert(30 * 60);
            }
            Preset::Conservative => {
                if !tick_sec_overridden {
                    self.tick_sec = self.tick_sec.max(60);
                }
                f.token_age_min_sec.get_or_insert(2 * 24 * 60 * 60);
                f.volume24h_min.get_or_insert(0.0);
                x.exit_after_sec.get_or_insert(24 * 60 * 60);
                x.cooldown_after_sell_sec.get_or_insert(6 * 60 * 60);
            }
        }
    }
}

/// Parse a raw operator override, silently keeping the current value when
/// the input is absent or unparseable. Permissive by design: a bad numeric
/// flag leaves the preset default in place rather than failing the create.
pub fn parse_or_keep<T: FromStr>(current: T, raw: Option<&str>) -> T {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(current)
}

/// Like [`parse_or_keep`] for optional fields: a parseable input sets the
/// bound, anything else leaves the current value untouched.
pub fn parse_or_keep_opt<T: FromStr>(current: Option<T>, raw: Option<&str>) -> Option<T> {
    match raw.and_then(|s| s.trim().parse().ok()) {
        Some(v) => Some(v),
        None => current,
    }
}

/// Raw operator overrides for strategy creation, applied before the preset.
#[derive(Debug, Clone, Default)]
pub struct StrategyOverrides {
    pub tick_sec: Option<String>,
    pub min_sol: Option<String>,
    pub buy_sol: Option<String>,
    pub max_pos: Option<String>,
    pub market_cap_min: Option<String>,
    pub market_cap_max: Option<String>,
    pub volume24h_min: Option<String>,
    pub token_age_min_sec: Option<String>,
    pub token_age_max_sec: Option<String>,
    pub exit_after_sec: Option<String>,
    pub cooldown_after_sell_sec: Option<String>,
    pub use_new_listings: bool,
    pub dry_run: bool,
    pub disabled: bool,
}

/// Build a strategy document: defaults, then explicit overrides, then the
/// preset filling whatever is still absent.
pub fn build_strategy(id: &str, preset: Preset, ov: &StrategyOverrides) -> StrategyConfig {
    let mut cfg = StrategyConfig::base(id);

    cfg.tick_sec = parse_or_keep(cfg.tick_sec, ov.tick_sec.as_deref());
    let tick_overridden = ov
        .tick_sec
        .as_deref()
        .is_some_and(|s| s.trim().parse::<u64>().is_ok());

    cfg.budgets.min_sol_balance = parse_or_keep(cfg.budgets.min_sol_balance, ov.min_sol.as_deref());
    cfg.budgets.buy_sol_per_trade = parse_or_keep(cfg.budgets.buy_sol_per_trade, ov.buy_sol.as_deref());
    cfg.budgets.max_open_positions = parse_or_keep(cfg.budgets.max_open_positions, ov.max_pos.as_deref());

    let f = &mut cfg.discovery.filters;
    f.market_cap_min = parse_or_keep_opt(f.market_cap_min, ov.market_cap_min.as_deref());
    f.market_cap_max = parse_or_keep_opt(f.market_cap_max, ov.market_cap_max.as_deref());
    f.volume24h_min = parse_or_keep_opt(f.volume24h_min, ov.volume24h_min.as_deref());
    f.token_age_min_sec = parse_or_keep_opt(f.token_age_min_sec, ov.token_age_min_sec.as_deref());
    f.token_age_max_sec = parse_or_keep_opt(f.token_age_max_sec, ov.token_age_max_sec.as_deref());

    let x = &mut cfg.execution;
    x.exit_after_sec = parse_or_keep_opt(x.exit_after_sec, ov.exit_after_sec.as_deref());
    x.cooldown_after_sell_sec =
        parse_or_keep_opt(x.cooldown_after_sell_sec, ov.cooldown_after_sell_sec.as_deref());

    cfg.discovery.use_new_listings = ov.use_new_listings;
    x.dry_run = ov.dry_run;
    cfg.enabled = !ov.disabled;

    cfg.apply_preset(preset, tick_overridden);
    cfg
}
