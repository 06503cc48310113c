//! Strategy module
//!
//! The per-strategy policy documents and the tick state machine that
//! executes them. Configuration is immutable inside a tick; all durable
//! mutation flows through the orchestrator while it holds the strategy
//! lock.

pub mod admin;
pub mod schema;
pub mod status;
pub mod tick;

pub use admin::{create_strategy, list_strategies, set_enabled, StrategySummary};
pub use schema::{build_strategy, Preset, StrategyConfig, StrategyOverrides};
pub use status::{collect_status, PositionStatus, StrategyStatus};
pub use tick::{ForceOverride, TickAction, TickOrchestrator, TickReport};
