use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the trading runtime
#[derive(Error, Debug)]
pub enum MintrunnerError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Strategy not found: {0}")]
    StrategyNotFound(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    // Locking errors
    #[error("Lock busy: {}", .0.display())]
    LockBusy(PathBuf),

    // Pricing errors
    #[error("Bonding curve complete; trade on the pooled market instead")]
    CurveComplete,

    #[error("Pool has empty reserves")]
    EmptyReserves,

    // Execution errors
    #[error("Nothing to sell for {mint}: {reason}")]
    NothingToSell { mint: String, reason: String },

    #[error("Trade execution failed: {0}")]
    Execution(String),

    // Market data errors
    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl MintrunnerError {
    /// Whether this error means the sold asset no longer exists in the
    /// wallet. The orchestrator reclassifies these as an already-closed
    /// position instead of a failed exit.
    pub fn is_nothing_to_sell(&self) -> bool {
        matches!(self, Self::NothingToSell { .. })
    }
}

/// Result type alias for MintrunnerError
pub type Result<T> = std::result::Result<T, MintrunnerError>;
