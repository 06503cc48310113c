//! Supervisor Layer for Liveness Monitoring
//!
//! The watchdog is a pure read-only check over persisted state and lock
//! metadata: it recommends a restart, it never performs one, and it is
//! safe to run while a tick is active.

pub mod watchdog;

pub use watchdog::{check_strategy, Recommendation, WatchdogConfig, WatchdogReport};
