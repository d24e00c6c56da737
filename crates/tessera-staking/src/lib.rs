//! # Tessera Staking - Stake Ledger & Reward Accrual
//!
//! Owns every stake position and the pool aggregate.
//!
//! ## Key Features
//!
//! - **Positions, not balances**: each `stake()` opens its own record with
//!   its own claim clock
//! - **Simple-interest rewards**: `amount * rate_bps * elapsed / (year * 10_000)`,
//!   floored, computed in 256-bit intermediates
//! - **Exact totals**: `total_staked` always equals the sum of active records
//!
//! ## Reward Example
//!
//! | Stake | Rate | Elapsed | Reward |
//! |-------|------|---------|--------|
//! | 1,000,000 | 500 bps | 365 days | 50,000 |
//! | 1,000,000 | 500 bps | 1 day | 136 |
//! | 1,000 | 500 bps | 1 hour | 0 |

pub mod ledger;
pub mod rewards;

pub use ledger::{StakeLedger, StakeRecord, UnstakeReceipt};
pub use rewards::{accrued_reward, apy_bps};
