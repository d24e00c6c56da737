//! Error types for Tessera pool operations

use crate::params::ParamKey;
use thiserror::Error;

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors a pool command can report
///
/// A command that returns one of these has committed nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    // === Stake Ledger ===
    /// Zero amount, or amount below the current minimum stake
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Caller's active stake is too small for the requested action
    #[error("Insufficient stake: need {required}, have {available}")]
    InsufficientStake { required: u128, available: u128 },

    /// Caller does not own the stake record
    #[error("Caller does not own stake record {0}")]
    NotStaker(u64),

    /// Stake record was already unstaked
    #[error("Stake record {0} is inactive")]
    RecordInactive(u64),

    // === Governance ===
    /// Proposal does not exist
    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    /// Proposal no longer accepts votes
    #[error("Proposal {0} is not open for voting")]
    ProposalExpired(u64),

    /// Proposal already left the Active state (or is terminal)
    #[error("Proposal {0} is already finalized")]
    AlreadyFinalized(u64),

    /// Voting window has not closed yet
    #[error("Voting on proposal {id} is open until {deadline}")]
    VotingStillOpen { id: u64, deadline: u64 },

    /// Turnout below quorum; reported on finalize outcomes, never returned
    #[error("Quorum not met: need {required}, have {received}")]
    QuorumNotMet { required: u128, received: u128 },

    /// Proposal is not yet executable
    #[error("Proposal {id} is not executable before {earliest}")]
    ExecutionDelayNotElapsed { id: u64, earliest: u64 },

    // === Admin Registry ===
    /// Caller lacks the capability for this action
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Admin already registered
    #[error("Admin already registered: {0}")]
    DuplicateAdmin(String),

    /// Admin not registered
    #[error("Admin not found: {0}")]
    AdminNotFound(String),

    // === Parameter Store ===
    /// Value outside the hard-coded bounds for the parameter
    #[error("Parameter {param} value {value} outside [{min}, {max}]")]
    ParameterOutOfRange {
        param: ParamKey,
        value: u128,
        min: u128,
        max: u128,
    },

    // === External collaborators ===
    /// Treasury refused a transfer; the whole command is aborted
    #[error("Treasury rejected transfer: {0}")]
    TreasuryRejected(String),
}

impl PoolError {
    /// Stable numeric code for API and CLI responses
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidAmount(_) => 1001,
            Self::InsufficientStake { .. } => 1002,
            Self::NotStaker(_) => 1003,
            Self::RecordInactive(_) => 1004,
            Self::ProposalNotFound(_) => 2001,
            Self::ProposalExpired(_) => 2002,
            Self::AlreadyFinalized(_) => 2003,
            Self::VotingStillOpen { .. } => 2004,
            Self::QuorumNotMet { .. } => 2005,
            Self::ExecutionDelayNotElapsed { .. } => 2006,
            Self::PermissionDenied(_) => 3001,
            Self::DuplicateAdmin(_) => 3002,
            Self::AdminNotFound(_) => 3003,
            Self::ParameterOutOfRange { .. } => 4001,
            Self::TreasuryRejected(_) => 5001,
        }
    }

    /// Check if retrying the same command later could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::VotingStillOpen { .. }
                | Self::ExecutionDelayNotElapsed { .. }
                | Self::TreasuryRejected(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(PoolError::InvalidAmount("zero".into()).code(), 1001);
        assert_eq!(PoolError::ProposalNotFound(7).code(), 2001);
        assert_eq!(PoolError::DuplicateAdmin("a".into()).code(), 3002);
    }

    #[test]
    fn test_error_display() {
        let err = PoolError::ParameterOutOfRange {
            param: ParamKey::RewardRateBps,
            value: 10_001,
            min: 0,
            max: 10_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("reward_rate_bps"));
        assert!(msg.contains("10001"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(PoolError::ExecutionDelayNotElapsed { id: 1, earliest: 10 }.is_recoverable());
        assert!(!PoolError::NotStaker(1).is_recoverable());
    }
}
