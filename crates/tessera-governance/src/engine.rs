//! Governance engine
//!
//! Holds every proposal and live vote. Reads stake weight from the
//! [`StakeLedger`] and writes parameters through the same
//! [`ParameterStore::set`] the admin path uses.

use crate::proposal::{EmergencyDirective, FinalizeOutcome, Proposal, VoteRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tessera_core::math::mul_div_ceil;
use tessera_core::prelude::*;
use tessera_staking::StakeLedger;

/// Proposal and vote state
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GovernanceEngine {
    proposals: BTreeMap<ProposalId, Proposal>,

    /// Live votes per proposal, one per voter
    votes: BTreeMap<ProposalId, BTreeMap<Address, VoteRecord>>,

    next_id: u64,

    /// Flags set by executed Feature proposals
    features: BTreeMap<String, bool>,

    /// Directives recorded by executed Emergency proposals
    emergency_log: Vec<EmergencyDirective>,
}

impl GovernanceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a proposal and cast the proposer's vote in favour
    #[allow(clippy::too_many_arguments)]
    pub fn create_proposal(
        &mut self,
        proposer: Address,
        title: impl Into<String>,
        description: impl Into<String>,
        kind: ProposalKind,
        now: Timestamp,
        ledger: &StakeLedger,
        params: &ParameterStore,
        sink: &mut dyn EventSink,
    ) -> Result<ProposalId> {
        let backing = ledger.active_positions(&proposer);
        let weight: u128 = backing.iter().map(|(_, amount)| amount).sum();
        let min_stake = params.get(ParamKey::MinStake);
        if weight < min_stake {
            return Err(PoolError::InsufficientStake {
                required: min_stake,
                available: weight,
            });
        }
        if let ProposalKind::Parameter { param, value } = &kind {
            param.validate(*value)?;
        }

        let current = params.params();
        let voting_deadline = now.saturating_add(current.voting_period_secs());
        let earliest_execution_at = voting_deadline.saturating_add(current.execution_delay_secs());
        let expires_at = earliest_execution_at.saturating_add(current.expiry_window_secs());

        let id = ProposalId(self.next_id);
        self.next_id += 1;

        let mut proposal = Proposal {
            id,
            proposer,
            title: title.into(),
            description: description.into(),
            kind: kind.clone(),
            votes_for: 0,
            votes_against: 0,
            created_at: now,
            voting_deadline,
            earliest_execution_at,
            expires_at,
            status: ProposalStatus::Active,
        };
        proposal.add_weight(true, weight);
        self.proposals.insert(id, proposal);
        self.votes.entry(id).or_default().insert(
            proposer,
            VoteRecord {
                proposal_id: id,
                voter: proposer,
                stake_weight: weight,
                support: true,
                backing,
                cast_at: now,
            },
        );

        tracing::info!(%id, %proposer, kind = kind.label(), voting_deadline, "proposal created");
        sink.emit(PoolEvent::ProposalCreated { id, proposer, kind });
        sink.emit(PoolEvent::VoteCast {
            proposal_id: id,
            voter: proposer,
            support: true,
            weight,
        });
        Ok(id)
    }

    /// Cast or replace a vote
    ///
    /// A replacement moves the old weight off its side before adding the new
    /// weight, so a voter is never counted twice.
    pub fn vote(
        &mut self,
        id: ProposalId,
        voter: Address,
        support: bool,
        now: Timestamp,
        ledger: &StakeLedger,
        sink: &mut dyn EventSink,
    ) -> Result<u128> {
        let proposal = self.proposals.get(&id).ok_or(PoolError::ProposalNotFound(id.0))?;
        if !proposal.is_open(now) {
            return Err(PoolError::ProposalExpired(id.0));
        }
        let backing = ledger.active_positions(&voter);
        let weight: u128 = backing.iter().map(|(_, amount)| amount).sum();
        if weight == 0 {
            return Err(PoolError::InsufficientStake {
                required: 1,
                available: 0,
            });
        }

        let ballots = self.votes.entry(id).or_default();
        let previous = ballots.insert(
            voter,
            VoteRecord {
                proposal_id: id,
                voter,
                stake_weight: weight,
                support,
                backing,
                cast_at: now,
            },
        );
        if let Some(proposal) = self.proposals.get_mut(&id) {
            if let Some(old) = &previous {
                proposal.remove_weight(old.support, old.stake_weight);
            }
            proposal.add_weight(support, weight);
        }

        tracing::debug!(%id, %voter, support, weight, replaced = previous.is_some(), "vote cast");
        sink.emit(PoolEvent::VoteCast {
            proposal_id: id,
            voter,
            support,
            weight,
        });
        Ok(weight)
    }

    /// Close voting and decide Passed or Rejected
    ///
    /// Missing quorum is not an error: the proposal is Rejected and the
    /// outcome carries the reason.
    pub fn finalize(
        &mut self,
        id: ProposalId,
        now: Timestamp,
        ledger: &StakeLedger,
        params: &ParameterStore,
        sink: &mut dyn EventSink,
    ) -> Result<FinalizeOutcome> {
        let proposal = self.proposals.get(&id).ok_or(PoolError::ProposalNotFound(id.0))?;
        if proposal.status != ProposalStatus::Active {
            return Err(PoolError::AlreadyFinalized(id.0));
        }
        if now < proposal.voting_deadline {
            return Err(PoolError::VotingStillOpen {
                id: id.0,
                deadline: proposal.voting_deadline,
            });
        }

        let required_quorum = mul_div_ceil(
            ledger.total_staked(),
            params.get(ParamKey::QuorumBps),
            BPS_DENOMINATOR,
        )
        .ok_or_else(|| PoolError::InvalidAmount("quorum overflow".into()))?;
        let quorum_met = proposal.turnout() >= required_quorum;
        let status = if quorum_met && proposal.votes_for > proposal.votes_against {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Rejected
        };
        let outcome = FinalizeOutcome {
            id,
            status,
            votes_for: proposal.votes_for,
            votes_against: proposal.votes_against,
            required_quorum,
            quorum_met,
        };

        self.transition(id, status);
        tracing::info!(
            %id,
            %status,
            votes_for = outcome.votes_for,
            votes_against = outcome.votes_against,
            required_quorum,
            "proposal finalized"
        );
        sink.emit(PoolEvent::ProposalFinalized { id, status });
        Ok(outcome)
    }

    /// Apply a passed proposal, or mark it Expired if its window closed
    pub fn execute(
        &mut self,
        id: ProposalId,
        now: Timestamp,
        params: &mut ParameterStore,
        sink: &mut dyn EventSink,
    ) -> Result<ProposalStatus> {
        let proposal = self.proposals.get(&id).ok_or(PoolError::ProposalNotFound(id.0))?;
        if proposal.status.is_terminal() {
            return Err(PoolError::AlreadyFinalized(id.0));
        }
        if proposal.status == ProposalStatus::Active || now < proposal.earliest_execution_at {
            return Err(PoolError::ExecutionDelayNotElapsed {
                id: id.0,
                earliest: proposal.earliest_execution_at,
            });
        }

        if now > proposal.expires_at {
            let expires_at = proposal.expires_at;
            self.transition(id, ProposalStatus::Expired);
            tracing::info!(%id, expires_at, "proposal expired unexecuted");
            sink.emit(PoolEvent::ProposalExecuted {
                id,
                status: ProposalStatus::Expired,
            });
            return Ok(ProposalStatus::Expired);
        }

        match proposal.kind.clone() {
            ProposalKind::Parameter { param, value } => {
                let change = params.set(param, value, now)?;
                sink.emit(change.into());
            }
            ProposalKind::Feature { flag, enabled } => {
                tracing::info!(%id, %flag, enabled, "feature flag set");
                self.features.insert(flag, enabled);
            }
            ProposalKind::Emergency { action } => {
                tracing::warn!(%id, %action, "emergency directive recorded");
                self.emergency_log.push(EmergencyDirective {
                    proposal_id: id,
                    action,
                    executed_at: now,
                });
            }
        }

        self.transition(id, ProposalStatus::Executed);
        tracing::info!(%id, "proposal executed");
        sink.emit(PoolEvent::ProposalExecuted {
            id,
            status: ProposalStatus::Executed,
        });
        Ok(ProposalStatus::Executed)
    }

    /// Remove an unstaked record's weight from every live vote it backs
    ///
    /// Only Active proposals are touched; finalized tallies are history.
    /// Returns the (proposal, weight removed) pairs.
    pub fn release_stake(
        &mut self,
        stake_id: StakeId,
        owner: Address,
        sink: &mut dyn EventSink,
    ) -> Vec<(ProposalId, u128)> {
        let mut released = Vec::new();

        for (id, proposal) in self.proposals.iter_mut() {
            if proposal.status != ProposalStatus::Active {
                continue;
            }
            let Some(ballots) = self.votes.get_mut(id) else {
                continue;
            };
            let Some(vote) = ballots.get_mut(&owner) else {
                continue;
            };
            let Some(pos) = vote.backing.iter().position(|(sid, _)| *sid == stake_id) else {
                continue;
            };

            let (_, amount) = vote.backing.remove(pos);
            let removed = amount.min(vote.stake_weight);
            vote.stake_weight -= removed;
            proposal.remove_weight(vote.support, removed);
            if vote.stake_weight == 0 {
                ballots.remove(&owner);
            }

            tracing::debug!(%id, voter = %owner, %stake_id, weight = removed, "vote weight released");
            sink.emit(PoolEvent::VoteInvalidated {
                proposal_id: *id,
                voter: owner,
                weight: removed,
            });
            released.push((*id, removed));
        }

        released
    }

    fn transition(&mut self, id: ProposalId, next: ProposalStatus) {
        if let Some(proposal) = self.proposals.get_mut(&id) {
            debug_assert!(proposal.status.can_transition_to(next));
            proposal.status = next;
        }
    }

    // === Queries ===

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    /// Proposals still in the Active state
    pub fn active_proposals(&self) -> Vec<&Proposal> {
        self.proposals
            .values()
            .filter(|p| p.status == ProposalStatus::Active)
            .collect()
    }

    pub fn vote_of(&self, id: ProposalId, voter: &Address) -> Option<&VoteRecord> {
        self.votes.get(&id).and_then(|ballots| ballots.get(voter))
    }

    /// Live votes on one proposal
    pub fn votes_on(&self, id: ProposalId) -> impl Iterator<Item = &VoteRecord> {
        self.votes.get(&id).into_iter().flat_map(|ballots| ballots.values())
    }

    /// Flag value, false if never set
    pub fn feature_enabled(&self, flag: &str) -> bool {
        self.features.get(flag).copied().unwrap_or(false)
    }

    pub fn features(&self) -> &BTreeMap<String, bool> {
        &self.features
    }

    pub fn emergency_log(&self) -> &[EmergencyDirective] {
        &self.emergency_log
    }

    /// True when every Active proposal's tallies equal the sum of its live
    /// votes by side
    pub fn tallies_consistent(&self) -> bool {
        self.proposals
            .values()
            .filter(|p| p.status == ProposalStatus::Active)
            .all(|p| {
                let (mut yes, mut no) = (0u128, 0u128);
                for vote in self.votes_on(p.id) {
                    if vote.support {
                        yes += vote.stake_weight;
                    } else {
                        no += vote.stake_weight;
                    }
                }
                yes == p.votes_for && no == p.votes_against
            })
    }
}
