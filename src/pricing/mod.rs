//! AMM-aware price quoting.
//!
//! Two venue models, both on integer fixed-point arithmetic so repeated
//! quoting never drifts: the bonding curve (pre-migration) and the pooled
//! constant-product market (post-migration). Reserves are read fresh for
//! every quote; nothing here caches across ticks.

pub mod bonding;
pub mod pool;

pub use bonding::CurveState;
pub use pool::{quote_out, PoolReserves, DEFAULT_TOTAL_FEE_BPS};

/// Apply a slippage tolerance in basis points to a quoted output.
///
/// The result is the contractual minimum passed to the trade executor; it
/// is never looser than the configured tolerance.
pub fn min_out_after_slippage(amount_out: u64, slippage_bps: u32) -> u64 {
    let amount = amount_out as u128;
    let keep = 10_000u128.saturating_sub(slippage_bps as u128);
    ((amount * keep) / 10_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slippage_bound_floors() {
        assert_eq!(min_out_after_slippage(10_000, 500), 9_500);
        assert_eq!(min_out_after_slippage(999, 100), 989); // floor(999*0.99)
        assert_eq!(min_out_after_slippage(0, 500), 0);
        // Tolerances above 100% clamp to zero rather than underflow.
        assert_eq!(min_out_after_slippage(10_000, 20_000), 0);
    }
}
