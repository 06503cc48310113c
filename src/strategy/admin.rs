//! Operator actions on strategy documents.
//!
//! Strategies are created once and afterwards mutated only by explicit
//! enable/disable (or recreation); the tick loop itself never writes the
//! policy document.

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::persistence::StrategyRepository;

use super::schema::{build_strategy, Preset, StrategyConfig, StrategyOverrides};

/// One row of the strategy listing.
#[derive(Debug, Clone, Serialize)]
pub struct StrategySummary {
    pub id: String,
    pub enabled: bool,
    pub risk_profile: Preset,
    pub tick_sec: u64,
}

/// Create (or recreate) a strategy document from a preset and overrides.
pub fn create_strategy(
    repo: &StrategyRepository,
    id: &str,
    preset: Preset,
    overrides: &StrategyOverrides,
) -> Result<StrategyConfig> {
    StrategyRepository::validate_id(id)?;
    let config = build_strategy(id, preset, overrides);
    repo.save(id, &config)?;
    info!(id, preset = %preset, "strategy created");
    Ok(config)
}

/// Flip the enabled flag. A disabled strategy turns its ticks into clean
/// no-ops without touching positions or state.
pub fn set_enabled(repo: &StrategyRepository, id: &str, enabled: bool) -> Result<StrategyConfig> {
    let mut config = repo.load(id)?;
    config.enabled = enabled;
    repo.save(id, &config)?;
    info!(id, enabled, "strategy toggled");
    Ok(config)
}

/// Summaries for every strategy under the root.
pub fn list_strategies(repo: &StrategyRepository) -> Result<Vec<StrategySummary>> {
    let mut out = Vec::new();
    for id in repo.list()? {
        if let Some(config) = repo.try_load(&id)? {
            out.push(StrategySummary {
                id,
                enabled: config.enabled,
                risk_profile: config.risk_profile,
                tick_sec: config.tick_sec,
            });
        }
    }
    Ok(out)
}
