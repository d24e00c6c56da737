//! Events emitted by committed commands
//!
//! Components push events into an [`EventSink`] only after validation has
//! passed. The host facade buffers them per command and publishes the buffer
//! if, and only if, the whole command committed.

use crate::params::{ParamKey, ParameterChange};
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Every observable state change
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolEvent {
    Staked {
        owner: Address,
        stake_id: StakeId,
        amount: u128,
    },
    Unstaked {
        owner: Address,
        stake_id: StakeId,
        amount: u128,
    },
    RewardClaimed {
        owner: Address,
        stake_id: StakeId,
        amount: u128,
    },
    ProposalCreated {
        id: ProposalId,
        proposer: Address,
        kind: ProposalKind,
    },
    VoteCast {
        proposal_id: ProposalId,
        voter: Address,
        support: bool,
        weight: u128,
    },
    /// Unstaking removed weight from a live vote
    VoteInvalidated {
        proposal_id: ProposalId,
        voter: Address,
        weight: u128,
    },
    ProposalFinalized {
        id: ProposalId,
        status: ProposalStatus,
    },
    ProposalExecuted {
        id: ProposalId,
        status: ProposalStatus,
    },
    AdminAdded {
        address: Address,
        role: Role,
    },
    AdminRemoved {
        address: Address,
    },
    AdminRoleUpdated {
        address: Address,
        role: Role,
    },
    PermissionGranted {
        address: Address,
        permission: Permission,
    },
    PermissionRevoked {
        address: Address,
        permission: Permission,
    },
    ParameterUpdated {
        param: ParamKey,
        old: u128,
        new: u128,
        version: u64,
    },
}

impl PoolEvent {
    /// Short event name for logs and metrics labels
    pub fn name(&self) -> &'static str {
        match self {
            Self::Staked { .. } => "staked",
            Self::Unstaked { .. } => "unstaked",
            Self::RewardClaimed { .. } => "reward_claimed",
            Self::ProposalCreated { .. } => "proposal_created",
            Self::VoteCast { .. } => "vote_cast",
            Self::VoteInvalidated { .. } => "vote_invalidated",
            Self::ProposalFinalized { .. } => "proposal_finalized",
            Self::ProposalExecuted { .. } => "proposal_executed",
            Self::AdminAdded { .. } => "admin_added",
            Self::AdminRemoved { .. } => "admin_removed",
            Self::AdminRoleUpdated { .. } => "admin_role_updated",
            Self::PermissionGranted { .. } => "permission_granted",
            Self::PermissionRevoked { .. } => "permission_revoked",
            Self::ParameterUpdated { .. } => "parameter_updated",
        }
    }
}

impl From<ParameterChange> for PoolEvent {
    fn from(change: ParameterChange) -> Self {
        Self::ParameterUpdated {
            param: change.param,
            old: change.old,
            new: change.new,
            version: change.version,
        }
    }
}

/// Destination for events produced by a command
pub trait EventSink {
    fn emit(&mut self, event: PoolEvent);
}

impl EventSink for Vec<PoolEvent> {
    fn emit(&mut self, event: PoolEvent) {
        self.push(event);
    }
}

/// Sink that drops everything, for read-mostly callers and tests
#[derive(Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: PoolEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_change_converts() {
        let change = ParameterChange {
            param: ParamKey::MinStake,
            old: 1_000,
            new: 2_000,
            version: 3,
            changed_at: 99,
        };
        let event = PoolEvent::from(change);
        assert_eq!(
            event,
            PoolEvent::ParameterUpdated {
                param: ParamKey::MinStake,
                old: 1_000,
                new: 2_000,
                version: 3,
            }
        );
        assert_eq!(event.name(), "parameter_updated");
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<PoolEvent> = Vec::new();
        sink.emit(PoolEvent::AdminRemoved {
            address: Address::ZERO,
        });
        assert_eq!(sink.len(), 1);
    }
}
