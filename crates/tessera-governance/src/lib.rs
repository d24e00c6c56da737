//! # Tessera Governance - Stake-Weighted Proposals
//!
//! Proposals change the pool itself: a governed parameter, a feature flag,
//! or an emergency directive. Voting weight is the voter's active stake at
//! vote time.
//!
//! ## Proposal Lifecycle
//!
//! ```text
//!   create ──► Active ──finalize──► Passed ──execute──► Executed
//!                 │                    │
//!                 └──────► Rejected    └──(too late)──► Expired
//! ```
//!
//! | Window | Starts | Length |
//! |--------|--------|--------|
//! | Voting | `created_at` | `voting_period_days` |
//! | Execution delay | `voting_deadline` | `execution_delay_days` |
//! | Execution | `earliest_execution_at` | `expiry_window_days` |
//!
//! All three windows are snapshotted when the proposal is created. Quorum is
//! not: it is measured against the live pool total when voting is finalized.

pub mod engine;
pub mod proposal;

pub use engine::GovernanceEngine;
pub use proposal::{EmergencyDirective, FinalizeOutcome, Proposal, VoteRecord};
