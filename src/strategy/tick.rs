//! The per-tick state machine.
//!
//! One invocation = one short-lived unit of work: acquire the strategy
//! lock, load policy and state, guard budgets, discover candidates,
//! evaluate exits then at most one entry, persist, release. Every trade
//! action is guarded by a minute-bucketed idempotency key so an
//! overlapping or crash-retried invocation cannot double-submit, and the
//! lock guard releases on every exit path including errors.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::{
    BalanceSource, BuyOrder, DiscoveryFeed, MarketDetailProvider, SellOrder, TradeExecutor,
    WalletIdentity,
};
use crate::discovery::{DiscoveryDebug, DiscoveryOutcome, DiscoveryPipeline};
use crate::domain::{
    idempotency_key, ActionKind, EnrichedCandidate, FeedKind, IdempotencyEntry, Position,
    RuntimeState, Venue,
};
use crate::error::{MintrunnerError, Result};
use crate::persistence::StrategyRepository;
use crate::pricing::{min_out_after_slippage, quote_out, DEFAULT_TOTAL_FEE_BPS};
use crate::strategy::schema::StrategyConfig;

/// Exits prioritize completion over price; the sell-side tolerance is
/// pinned rather than taken from the buy-side config.
const SELL_SLIPPAGE_BPS: u32 = 1_000;

const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

pub(crate) fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL)
}

/// Bound one executor call by the configured order timeout. A timeout is
/// recorded as a failed action for that asset only; the tick continues.
async fn call_executor<T>(
    timeout_ms: Option<u64>,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match timeout_ms {
        Some(ms) => match tokio::time::timeout(std::time::Duration::from_millis(ms), fut).await {
            Ok(res) => res,
            Err(_) => Err(MintrunnerError::Execution(format!(
                "order timed out after {ms}ms"
            ))),
        },
        None => fut.await,
    }
}

fn sol_to_lamports(sol: Decimal) -> u64 {
    (sol * Decimal::from(LAMPORTS_PER_SOL))
        .trunc()
        .to_u64()
        .unwrap_or(0)
}

/// Operator-supplied override that trades one specific token directly,
/// bypassing discovery but not idempotency, budgets or locking.
#[derive(Debug, Clone)]
pub struct ForceOverride {
    pub mint: String,
    pub venue: Option<Venue>,
    pub creator: Option<String>,
    pub complete: bool,
}

/// One recorded action inside a tick.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TickAction {
    Buy {
        mint: String,
        venue: Venue,
        sol: Decimal,
        min_out: u64,
        sig: Option<String>,
    },
    BuyFailed {
        mint: String,
        error: String,
    },
    Sell {
        mint: String,
        venue: Venue,
        sig: Option<String>,
    },
    SellFailed {
        mint: String,
        error: String,
    },
    PositionAlreadyClosed {
        mint: String,
        note: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredSummary {
    pub mint: String,
    pub source: FeedKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForcedSummary {
    pub mint: String,
    pub venue: Venue,
    pub complete: bool,
}

/// Structured summary of one tick, appended to the runs log.
#[derive(Debug, Serialize)]
pub struct TickReport {
    pub ok: bool,
    pub id: String,
    pub t: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sol_balance: Option<Decimal>,
    pub discovered: Vec<DiscoveredSummary>,
    pub enriched: Vec<EnrichedCandidate>,
    pub actions: Vec<TickAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DiscoveryDebug>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced: Option<ForcedSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TickReport {
    fn skipped(id: &str, now: DateTime<Utc>, reason: &str) -> Self {
        Self {
            ok: true,
            id: id.to_string(),
            t: now,
            skipped: Some(reason.to_string()),
            sol_balance: None,
            discovered: Vec::new(),
            enriched: Vec::new(),
            actions: Vec::new(),
            debug: None,
            forced: None,
            note: None,
        }
    }
}

/// The tick state machine over injected collaborators.
pub struct TickOrchestrator {
    repo: StrategyRepository,
    wallet: Arc<dyn WalletIdentity>,
    balance: Arc<dyn BalanceSource>,
    feed: Arc<dyn DiscoveryFeed>,
    detail: Arc<dyn MarketDetailProvider>,
    executor: Arc<dyn TradeExecutor>,
}

impl TickOrchestrator {
    pub fn new(
        repo: StrategyRepository,
        wallet: Arc<dyn WalletIdentity>,
        balance: Arc<dyn BalanceSource>,
        feed: Arc<dyn DiscoveryFeed>,
        detail: Arc<dyn MarketDetailProvider>,
        executor: Arc<dyn TradeExecutor>,
    ) -> Self {
        Self {
            repo,
            wallet,
            balance,
            feed,
            detail,
            executor,
        }
    }

    /// Run one tick for `id`.
    ///
    /// Returns `Err(LockBusy)` without side effects when another
    /// invocation holds the strategy; callers treat that as a clean no-op.
    pub async fn run_tick(&self, id: &str, force: Option<ForceOverride>) -> Result<TickReport> {
        self.run_tick_at(id, force, Utc::now()).await
    }

    /// [`run_tick`](Self::run_tick) with an explicit tick time, for
    /// deterministic replay and tests.
    pub async fn run_tick_at(
        &self,
        id: &str,
        force: Option<ForceOverride>,
        now: DateTime<Utc>,
    ) -> Result<TickReport> {
        StrategyRepository::validate_id(id)?;

        // Held for the whole tick; released on drop, so every early return
        // and error path below leaves no lock file behind.
        let _lock = self.repo.lock(id)?;

        let config = self.repo.load(id)?;
        if !config.enabled {
            info!(id, "strategy disabled, skipping tick");
            return Ok(TickReport::skipped(id, now, "disabled"));
        }

        let mut state = self
            .repo
            .load_state(id)?
            .unwrap_or_else(|| RuntimeState::new(id, now));
        state.last_tick_at = Some(now);

        // Budget guard: below the floor, a tick does nothing external at
        // all. Still a successful tick, not an error.
        let lamports = self
            .balance
            .available_lamports(self.wallet.address())
            .await?;
        let sol_balance = lamports_to_sol(lamports);
        if sol_balance < config.budgets.min_sol_balance {
            info!(id, %sol_balance, "balance below minimum, skipping tick");
            let mut report = TickReport::skipped(id, now, "min_sol_balance");
            report.sol_balance = Some(sol_balance);
            state.last_ok_at = Some(now);
            self.repo.save_state(id, &state)?;
            self.repo.append_run(id, &report)?;
            return Ok(report);
        }

        if let Some(force) = force {
            return self.run_forced(id, &config, &mut state, force, sol_balance, now).await;
        }

        let pipeline = DiscoveryPipeline::new(self.feed.as_ref(), self.detail.as_ref());
        let DiscoveryOutcome {
            discovered,
            enriched,
            debug,
        } = pipeline.run(&config.discovery, now).await;

        let mut actions = Vec::new();
        self.evaluate_exits(id, &config, &mut state, now, &mut actions)
            .await?;
        self.evaluate_entry(id, &config, &mut state, &enriched, now, &mut actions)
            .await?;

        let report = TickReport {
            ok: true,
            id: id.to_string(),
            t: now,
            skipped: None,
            sol_balance: Some(sol_balance),
            discovered: discovered
                .iter()
                .take(30)
                .map(|c| DiscoveredSummary {
                    mint: c.mint.clone(),
                    source: c.source,
                })
                .collect(),
            enriched: enriched.into_iter().take(10).collect(),
            actions,
            debug: Some(debug),
            forced: None,
            note: Some(if config.execution.dry_run {
                "dry-run enabled".to_string()
            } else {
                "at most one new position per tick".to_string()
            }),
        };

        state.last_ok_at = Some(now);
        self.repo.save_state(id, &state)?;
        self.repo.append_run(id, &report)?;
        Ok(report)
    }

    /// Close every position whose age passed the exit horizon.
    ///
    /// Failures stay recorded per-position and leave the position open for
    /// the next tick; a "nothing to sell" outcome reconciles the position
    /// as already closed.
    async fn evaluate_exits(
        &self,
        id: &str,
        config: &StrategyConfig,
        state: &mut RuntimeState,
        now: DateTime<Utc>,
        actions: &mut Vec<TickAction>,
    ) -> Result<()> {
        let Some(exit_after_sec) = config.execution.exit_after_sec else {
            return Ok(());
        };
        if config.execution.dry_run {
            return Ok(());
        }

        let due: Vec<String> = state
            .positions
            .iter()
            .filter(|(_, p)| p.age_sec(now) >= exit_after_sec)
            .map(|(mint, _)| mint.clone())
            .collect();

        for mint in due {
            let key = idempotency_key(ActionKind::Sell, &mint, now);
            if state.idempotency.contains_key(&key) {
                continue;
            }
            let position = state.positions[&mint].clone();

            let order = SellOrder {
                mint: mint.clone(),
                venue: position.venue,
                creator: position.creator.clone(),
                slippage_bps: SELL_SLIPPAGE_BPS,
                fee_to: config.execution.fee_to.clone(),
                fee_bps: config.execution.fee_bps,
            };

            match call_executor(config.execution.order_timeout_ms, self.executor.sell(&order)).await
            {
                Ok(settlement) => {
                    info!(id, %mint, venue = %position.venue, "position exited");
                    state.idempotency.insert(
                        key,
                        IdempotencyEntry {
                            t: now,
                            sig: settlement.sig.clone(),
                        },
                    );
                    self.set_cooldown(config, state, &mint, now);
                    state.positions.remove(&mint);
                    actions.push(TickAction::Sell {
                        mint: mint.clone(),
                        venue: position.venue,
                        sig: settlement.sig.clone(),
                    });
                    self.repo.append_event(
                        id,
                        &serde_json::json!({
                            "t": now,
                            "id": id,
                            "level": "info",
                            "event": "SELL",
                            "venue": position.venue,
                            "mint": mint,
                            "sig": settlement.sig,
                        }),
                    )?;
                }
                Err(e) if e.is_nothing_to_sell() => {
                    // State drift (manual sale, partial prior success):
                    // reconcile, do not fail.
                    warn!(id, %mint, "nothing to sell, reconciling position as closed");
                    self.set_cooldown(config, state, &mint, now);
                    state.positions.remove(&mint);
                    actions.push(TickAction::PositionAlreadyClosed {
                        mint,
                        note: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(id, %mint, error = %e, "exit failed, leaving position open");
                    actions.push(TickAction::SellFailed {
                        mint,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Open at most one new position from the filtered candidates.
    ///
    /// First eligible wins in feed-priority order; there is no scoring.
    async fn evaluate_entry(
        &self,
        id: &str,
        config: &StrategyConfig,
        state: &mut RuntimeState,
        candidates: &[EnrichedCandidate],
        now: DateTime<Utc>,
        actions: &mut Vec<TickAction>,
    ) -> Result<()> {
        if config.execution.dry_run {
            return Ok(());
        }
        if state.open_position_count() >= config.budgets.max_open_positions as usize {
            return Ok(());
        }
        let buy_sol = config.budgets.buy_sol_per_trade;
        if buy_sol <= Decimal::ZERO {
            return Ok(());
        }

        let Some(pick) = candidates
            .iter()
            .find(|c| !state.positions.contains_key(&c.mint) && !state.in_cooldown(&c.mint, now))
        else {
            return Ok(());
        };

        let key = idempotency_key(ActionKind::Buy, &pick.mint, now);
        if state.idempotency.contains_key(&key) {
            return Ok(());
        }

        match self
            .try_buy(
                id,
                config,
                &pick.mint,
                &pick.creator,
                pick.complete,
                pick.source.to_string(),
                buy_sol,
                now,
            )
            .await
        {
            Ok((position, action)) => {
                state.idempotency.insert(
                    key,
                    IdempotencyEntry {
                        t: now,
                        sig: position.buy_sig.clone(),
                    },
                );
                state.positions.insert(pick.mint.clone(), position);
                actions.push(action);
            }
            Err(e) => {
                warn!(id, mint = %pick.mint, error = %e, "entry failed");
                actions.push(TickAction::BuyFailed {
                    mint: pick.mint.clone(),
                    error: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Quote and submit a buy, returning the new position and its action
    /// record.
    #[allow(clippy::too_many_arguments)]
    async fn try_buy(
        &self,
        id: &str,
        config: &StrategyConfig,
        mint: &str,
        creator: &str,
        complete: bool,
        source: String,
        buy_sol: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(Position, TickAction)> {
        let spend = sol_to_lamports(buy_sol);

        // The fee cut is transferred out of the spend, so quoting uses the
        // net amount that actually reaches the venue.
        let fee = match (&config.execution.fee_to, config.execution.fee_bps) {
            (Some(_), Some(bps)) => (spend as u128 * bps as u128 / 10_000) as u64,
            _ => 0,
        };
        let net_spend = spend - fee;
        if net_spend == 0 {
            return Err(MintrunnerError::Validation(
                "fee leaves nothing to spend".to_string(),
            ));
        }

        let slippage_bps = config
            .execution
            .slippage_bps
            .min(config.slippage.max_pct * 100);

        let (venue, min_out) = self.quote_entry(mint, complete, net_spend, slippage_bps).await?;

        let order = BuyOrder {
            mint: mint.to_string(),
            venue,
            creator: creator.to_string(),
            spend_lamports: spend,
            min_out,
            fee_to: config.execution.fee_to.clone(),
            fee_bps: config.execution.fee_bps,
        };

        let settlement =
            call_executor(config.execution.order_timeout_ms, self.executor.buy(&order)).await?;
        info!(id, mint, %venue, %buy_sol, "position opened");

        self.repo.append_event(
            id,
            &serde_json::json!({
                "t": now,
                "id": id,
                "level": "info",
                "event": "BUY",
                "venue": venue,
                "mint": mint,
                "sol": buy_sol,
                "sig": settlement.sig,
            }),
        )?;

        let position = Position {
            mint: mint.to_string(),
            creator: creator.to_string(),
            venue,
            opened_at: now,
            buy_sol,
            buy_sig: settlement.sig.clone(),
            source,
            complete: venue == Venue::Pool,
        };
        let action = TickAction::Buy {
            mint: mint.to_string(),
            venue,
            sol: buy_sol,
            min_out,
            sig: settlement.sig,
        };
        Ok((position, action))
    }

    /// Quote an entry from a fresh reserve snapshot, routing by the
    /// completion flag. A curve that completed since enrichment re-routes
    /// to the pooled market instead of failing.
    async fn quote_entry(
        &self,
        mint: &str,
        complete: bool,
        net_spend: u64,
        slippage_bps: u32,
    ) -> Result<(Venue, u64)> {
        if !complete {
            match self.detail.curve_state(mint).await {
                Ok(curve) => match curve.buy_quote(net_spend) {
                    Ok(expected) => {
                        return Ok((Venue::Bonding, min_out_after_slippage(expected, slippage_bps)))
                    }
                    Err(MintrunnerError::CurveComplete) => {}
                    Err(e) => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }

        let snapshot = self.detail.pool_snapshot(mint).await?;
        let expected = quote_out(snapshot.buy_side(), net_spend, DEFAULT_TOTAL_FEE_BPS)?;
        Ok((Venue::Pool, min_out_after_slippage(expected, slippage_bps)))
    }

    fn set_cooldown(
        &self,
        config: &StrategyConfig,
        state: &mut RuntimeState,
        mint: &str,
        now: DateTime<Utc>,
    ) {
        if let Some(cooldown_sec) = config.execution.cooldown_after_sell_sec {
            if cooldown_sec > 0 {
                state
                    .cooldowns
                    .insert(mint.to_string(), now + Duration::seconds(cooldown_sec));
            }
        }
    }

    /// Operational-test path: trade one caller-supplied token directly.
    /// Discovery and selection are bypassed; locking, budgets and
    /// idempotency are not.
    async fn run_forced(
        &self,
        id: &str,
        config: &StrategyConfig,
        state: &mut RuntimeState,
        force: ForceOverride,
        sol_balance: Decimal,
        now: DateTime<Utc>,
    ) -> Result<TickReport> {
        let venue = force
            .venue
            .unwrap_or(Venue::from_complete(force.complete));
        let complete = venue == Venue::Pool || force.complete;
        let creator = force.creator.unwrap_or_default();
        if venue == Venue::Bonding && creator.is_empty() {
            return Err(MintrunnerError::Validation(
                "force override requires a creator when venue is bonding".to_string(),
            ));
        }

        let mint = force.mint;
        let mut actions = Vec::new();

        if !config.execution.dry_run {
            // Exit first if the forced position is open and due.
            if let Some(exit_after_sec) = config.execution.exit_after_sec {
                if let Some(position) = state.positions.get(&mint).cloned() {
                    if position.age_sec(now) >= exit_after_sec {
                        let key = idempotency_key(ActionKind::Sell, &mint, now);
                        if !state.idempotency.contains_key(&key) {
                            let order = SellOrder {
                                mint: mint.clone(),
                                venue: position.venue,
                                creator: position.creator.clone(),
                                slippage_bps: SELL_SLIPPAGE_BPS,
                                fee_to: config.execution.fee_to.clone(),
                                fee_bps: config.execution.fee_bps,
                            };
                            let settlement = call_executor(
                                config.execution.order_timeout_ms,
                                self.executor.sell(&order),
                            )
                            .await?;
                            state.idempotency.insert(
                                key,
                                IdempotencyEntry {
                                    t: now,
                                    sig: settlement.sig.clone(),
                                },
                            );
                            self.set_cooldown(config, state, &mint, now);
                            state.positions.remove(&mint);
                            actions.push(TickAction::Sell {
                                mint: mint.clone(),
                                venue: position.venue,
                                sig: settlement.sig,
                            });
                        }
                    }
                }
            }

            // Enter if not already open.
            if !state.positions.contains_key(&mint)
                && config.budgets.buy_sol_per_trade > Decimal::ZERO
            {
                let key = idempotency_key(ActionKind::Buy, &mint, now);
                if !state.idempotency.contains_key(&key) {
                    match self
                        .try_buy(
                            id,
                            config,
                            &mint,
                            &creator,
                            complete,
                            "force_mint".to_string(),
                            config.budgets.buy_sol_per_trade,
                            now,
                        )
                        .await
                    {
                        Ok((position, action)) => {
                            state.idempotency.insert(
                                key,
                                IdempotencyEntry {
                                    t: now,
                                    sig: position.buy_sig.clone(),
                                },
                            );
                            state.positions.insert(mint.clone(), position);
                            actions.push(action);
                        }
                        Err(e) => {
                            actions.push(TickAction::BuyFailed {
                                mint: mint.clone(),
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        let report = TickReport {
            ok: true,
            id: id.to_string(),
            t: now,
            skipped: None,
            sol_balance: Some(sol_balance),
            discovered: Vec::new(),
            enriched: Vec::new(),
            actions,
            debug: None,
            forced: Some(ForcedSummary {
                mint,
                venue,
                complete,
            }),
            note: Some("force override tick".to_string()),
        };

        state.last_ok_at = Some(now);
        self.repo.save_state(id, &state)?;
        self.repo.append_run(id, &report)?;
        Ok(report)
    }
}
