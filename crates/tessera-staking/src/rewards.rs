//! # Reward Calculation
//!
//! Simple (non-compounding) interest on each stake record.
//!
//! ```text
//! reward = floor(amount * reward_rate_bps * elapsed_secs / (SECONDS_PER_YEAR * 10_000))
//! ```
//!
//! Flooring means the pool never pays out more than the nominal rate; the
//! fractional remainder is forfeited when `last_claim_at` moves forward.

use tessera_core::math::mul3_div_floor;
use tessera_core::{PoolError, Result, BPS_DENOMINATOR, SECONDS_PER_YEAR};

/// Reward earned by `amount` at `rate_bps` over `elapsed_secs`
pub fn accrued_reward(amount: u128, rate_bps: u128, elapsed_secs: u64) -> Result<u128> {
    if amount == 0 || rate_bps == 0 || elapsed_secs == 0 {
        return Ok(0);
    }
    let denominator = SECONDS_PER_YEAR as u128 * BPS_DENOMINATOR;
    mul3_div_floor(amount, rate_bps, elapsed_secs as u128, denominator)
        .ok_or_else(|| PoolError::InvalidAmount("reward exceeds representable range".into()))
}

/// Effective annual yield in bps for a position of `amount`
///
/// With simple interest this is the configured rate, except that tiny
/// positions lose yield to flooring over a full year.
pub fn apy_bps(amount: u128, rate_bps: u128) -> u128 {
    if amount == 0 {
        return 0;
    }
    match accrued_reward(amount, rate_bps, SECONDS_PER_YEAR) {
        Ok(reward) => reward.saturating_mul(BPS_DENOMINATOR) / amount,
        Err(_) => rate_bps,
    }
}
