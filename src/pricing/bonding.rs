//! Bonding-curve pricing.
//!
//! Price is a deterministic function of two virtual reserves until the
//! curve completes and trading migrates to the pooled market. Quoting a
//! completed curve is a venue-state error, not a price of zero.

use serde::{Deserialize, Serialize};

use crate::error::{MintrunnerError, Result};

/// Snapshot of a bonding curve account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CurveState {
    pub virtual_token_reserves: u64,
    pub virtual_sol_reserves: u64,
    /// Tokens actually held by the curve; a buy can never receive more.
    pub real_token_reserves: u64,
    pub complete: bool,
}

impl CurveState {
    /// Tokens received for `sol_in` lamports.
    ///
    /// `tokens = vT - floor(vT*vS / (vS + in)) - 1`, clamped to the real
    /// reserve.
    pub fn buy_quote(&self, sol_in: u64) -> Result<u64> {
        if self.complete {
            return Err(MintrunnerError::CurveComplete);
        }
        if sol_in == 0 {
            return Ok(0);
        }

        let v_tok = self.virtual_token_reserves as u128;
        let v_sol = self.virtual_sol_reserves as u128;
        let amount = sol_in as u128;

        let n = v_sol * v_tok;
        let i = v_sol + amount;
        let r = n / i + 1;
        let s = v_tok.saturating_sub(r) as u64;

        Ok(s.min(self.real_token_reserves))
    }

    /// Net lamports received for selling `token_in` tokens, after the
    /// protocol fee in basis points.
    ///
    /// `gross = floor(in*vS / (vT + in))`, `net = gross - floor(gross*fee/10000)`.
    pub fn sell_quote(&self, token_in: u64, fee_bps: u32) -> Result<u64> {
        if self.complete {
            return Err(MintrunnerError::CurveComplete);
        }
        if token_in == 0 {
            return Ok(0);
        }

        let v_tok = self.virtual_token_reserves as u128;
        let v_sol = self.virtual_sol_reserves as u128;
        let amount = token_in as u128;

        let gross = (amount * v_sol) / (v_tok + amount);
        let fee = (gross * fee_bps as u128) / 10_000;
        Ok((gross - fee) as u64)
    }
}
