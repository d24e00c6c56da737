//! Proposal and vote records

use serde::{Deserialize, Serialize};
use tessera_core::prelude::*;

/// A governance proposal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposal handle
    pub id: ProposalId,

    /// Who opened it
    pub proposer: Address,

    pub title: String,
    pub description: String,

    /// What executing it changes
    pub kind: ProposalKind,

    /// Weight in favour
    pub votes_for: u128,

    /// Weight against
    pub votes_against: u128,

    pub created_at: Timestamp,

    /// Votes are accepted strictly before this
    pub voting_deadline: Timestamp,

    /// Execution is allowed from here
    pub earliest_execution_at: Timestamp,

    /// Execution is allowed up to and including this
    pub expires_at: Timestamp,

    pub status: ProposalStatus,
}

impl Proposal {
    /// Total weight cast on either side
    pub fn turnout(&self) -> u128 {
        self.votes_for.saturating_add(self.votes_against)
    }

    /// Whether votes are still accepted at `now`
    pub fn is_open(&self, now: Timestamp) -> bool {
        self.status == ProposalStatus::Active && now < self.voting_deadline
    }

    pub(crate) fn add_weight(&mut self, support: bool, weight: u128) {
        if support {
            self.votes_for = self.votes_for.saturating_add(weight);
        } else {
            self.votes_against = self.votes_against.saturating_add(weight);
        }
    }

    pub(crate) fn remove_weight(&mut self, support: bool, weight: u128) {
        if support {
            self.votes_for = self.votes_for.saturating_sub(weight);
        } else {
            self.votes_against = self.votes_against.saturating_sub(weight);
        }
    }
}

/// One voter's live vote on one proposal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub proposal_id: ProposalId,
    pub voter: Address,

    /// Weight counted in the tally
    pub stake_weight: u128,

    pub support: bool,

    /// Stake records that made up the weight, with their amounts
    pub backing: Vec<(StakeId, u128)>,

    pub cast_at: Timestamp,
}

/// Emergency action recorded by an executed proposal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyDirective {
    pub proposal_id: ProposalId,
    pub action: String,
    pub executed_at: Timestamp,
}

/// Result of closing the voting window
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeOutcome {
    pub id: ProposalId,

    /// Passed or Rejected
    pub status: ProposalStatus,

    pub votes_for: u128,
    pub votes_against: u128,

    /// Turnout needed, from the live pool total
    pub required_quorum: u128,

    pub quorum_met: bool,
}

impl FinalizeOutcome {
    /// Total weight cast
    pub fn turnout(&self) -> u128 {
        self.votes_for.saturating_add(self.votes_against)
    }

    /// Why the proposal did not pass on quorum, if that was the reason
    pub fn rejection_reason(&self) -> Option<PoolError> {
        if self.quorum_met {
            None
        } else {
            Some(PoolError::QuorumNotMet {
                required: self.required_quorum,
                received: self.turnout(),
            })
        }
    }
}
