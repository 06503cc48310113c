//! Persistence Layer for State Management and Recovery
//!
//! Flat-file persistence for crash-safe strategy execution:
//! - Atomic key→JSON writes (temp file + rename, never a partial read)
//! - Append-only JSONL logs for audit trails
//! - Advisory per-strategy locks via exclusive file creation
//!
//! Everything lives under one root directory and stays inspectable and
//! editable as plain text for operational recovery.

pub mod repository;
pub mod store;

pub use repository::StrategyRepository;
pub use store::{FileStore, LockGuard};
