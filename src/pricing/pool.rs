//! Pooled constant-product quoting.
//!
//! The pooled venue publishes no official fee schedule, so the total fee
//! defaults to the observed 120 bps (LP 20 + protocol 5 + creator 95) and
//! is only used to set a safer minimum output than 1.

use serde::{Deserialize, Serialize};

use crate::error::{MintrunnerError, Result};

/// Observed total swap fee for the pooled venue.
pub const DEFAULT_TOTAL_FEE_BPS: u32 = 120;

/// Reserve snapshot for one swap direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolReserves {
    pub reserve_in: u64,
    pub reserve_out: u64,
}

/// Expected output of a constant-product swap, fee applied on the input.
///
/// `dy = floor(y * dx' / (x + dx'))` where `dx' = dx - floor(dx*fee/10000)`.
pub fn quote_out(reserves: PoolReserves, amount_in: u64, total_fee_bps: u32) -> Result<u64> {
    if reserves.reserve_in == 0 || reserves.reserve_out == 0 {
        return Err(MintrunnerError::EmptyReserves);
    }
    if amount_in == 0 {
        return Ok(0);
    }

    let dx = amount_in as u128;
    let fee = (dx * total_fee_bps as u128) / 10_000;
    let dx_after_fee = dx - fee;
    if dx_after_fee == 0 {
        return Ok(0);
    }

    let x = reserves.reserve_in as u128;
    let y = reserves.reserve_out as u128;
    Ok(((y * dx_after_fee) / (x + dx_after_fee)) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::min_out_after_slippage;

    #[test]
    fn quote_matches_constant_product() {
        let r = PoolReserves {
            reserve_in: 1_000_000_000,
            reserve_out: 5_000_000_000,
        };
        // fee 120 bps on 100_000_000 in: dx' = 100_000_000 - 1_200_000
        let out = quote_out(r, 100_000_000, DEFAULT_TOTAL_FEE_BPS).unwrap();
        let dx = 100_000_000u128 - 1_200_000;
        let expected = (5_000_000_000u128 * dx / (1_000_000_000u128 + dx)) as u64;
        assert_eq!(out, expected);
    }

    #[test]
    fn both_directions_from_one_snapshot() {
        // Buy direction (quote -> base) and sell direction (base -> quote)
        // are the same function with reserves swapped.
        let buy = quote_out(
            PoolReserves {
                reserve_in: 1_000,
                reserve_out: 9_000,
            },
            100,
            0,
        )
        .unwrap();
        let sell = quote_out(
            PoolReserves {
                reserve_in: 9_000,
                reserve_out: 1_000,
            },
            buy,
            0,
        )
        .unwrap();
        assert!(sell <= 100, "no free round trip: {sell}");
    }

    #[test]
    fn min_out_tightens_with_slippage() {
        let r = PoolReserves {
            reserve_in: 1_000_000,
            reserve_out: 1_000_000,
        };
        let out = quote_out(r, 10_000, DEFAULT_TOTAL_FEE_BPS).unwrap();
        let bound = min_out_after_slippage(out, 500);
        assert!(bound < out);
        assert_eq!(bound, (out as u128 * 9_500 / 10_000) as u64);
    }

    #[test]
    fn empty_reserves_are_an_error() {
        let r = PoolReserves {
            reserve_in: 0,
            reserve_out: 1,
        };
        assert!(matches!(
            quote_out(r, 10, 0),
            Err(MintrunnerError::EmptyReserves)
        ));
    }
}
