//! Operator status view: strategies, open positions, estimated PnL.
//!
//! PnL is an estimate from a sell-everything simulation against fresh
//! reserve snapshots; a failing quote degrades to a recorded error for
//! that position, never a failed status call.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::{SellOrder, TradeExecutor};
use crate::domain::Venue;
use crate::error::Result;
use crate::persistence::StrategyRepository;
use crate::strategy::schema::Preset;
use crate::strategy::tick::lamports_to_sol;

/// Slippage tolerance used for the simulated sell-all quote.
const STATUS_QUOTE_SLIPPAGE_BPS: u32 = 1_000;

#[derive(Debug, Clone, Serialize)]
pub struct PositionStatus {
    pub mint: String,
    pub creator: String,
    pub venue: Venue,
    pub opened_at: DateTime<Utc>,
    pub buy_sig: Option<String>,
    pub buy_sol: Decimal,
    /// Estimated proceeds of selling everything now.
    pub expected_sol: Option<Decimal>,
    pub pnl_sol: Option<Decimal>,
    pub quote_err: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyStatus {
    pub id: String,
    pub enabled: bool,
    pub risk_profile: Preset,
    pub tick_sec: u64,
    pub last_ok_at: Option<DateTime<Utc>>,
    pub positions: Vec<PositionStatus>,
}

/// Collect status for one strategy, or all of them.
pub async fn collect_status(
    repo: &StrategyRepository,
    executor: &dyn TradeExecutor,
    id: Option<&str>,
) -> Result<Vec<StrategyStatus>> {
    let ids = match id {
        Some(id) => vec![id.to_string()],
        None => repo.list()?,
    };

    let mut out = Vec::new();
    for id in ids {
        let Some(config) = repo.try_load(&id)? else {
            continue;
        };
        let state = repo.load_state(&id)?;

        let mut positions = Vec::new();
        if let Some(state) = &state {
            for (mint, p) in &state.positions {
                let order = SellOrder {
                    mint: mint.clone(),
                    venue: p.venue,
                    creator: p.creator.clone(),
                    slippage_bps: STATUS_QUOTE_SLIPPAGE_BPS,
                    fee_to: None,
                    fee_bps: None,
                };
                let (expected_sol, quote_err) = match executor.quote_sell_all(&order).await {
                    Ok(quote) => (Some(lamports_to_sol(quote.expected_lamports)), None),
                    Err(e) => (None, Some(e.to_string())),
                };
                positions.push(PositionStatus {
                    mint: mint.clone(),
                    creator: p.creator.clone(),
                    venue: p.venue,
                    opened_at: p.opened_at,
                    buy_sig: p.buy_sig.clone(),
                    buy_sol: p.buy_sol,
                    pnl_sol: expected_sol.map(|e| e - p.buy_sol),
                    expected_sol,
                    quote_err,
                });
            }
        }

        out.push(StrategyStatus {
            id,
            enabled: config.enabled,
            risk_profile: config.risk_profile,
            tick_sec: config.tick_sec,
            last_ok_at: state.and_then(|s| s.last_ok_at),
            positions,
        });
    }
    Ok(out)
}
