//! # Stake Ledger
//!
//! Arena of stake records keyed by [`StakeId`], plus the pool aggregate.
//!
//! ## Record Lifecycle
//!
//! | Operation | Effect on record | Effect on pool |
//! |-----------|------------------|----------------|
//! | `stake` | created, active | `total_staked += amount` |
//! | `claim_rewards` | `last_claim_at = now` | reward paid from reserve |
//! | `unstake` | inactive (kept for audit) | `total_staked -= amount`, principal from escrow, reward from reserve |
//!
//! Every operation validates and talks to the treasury before touching its
//! own state, so an error leaves the ledger unchanged.

use crate::rewards::accrued_reward;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tessera_core::prelude::*;

/// One stake position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    /// Record handle
    pub id: StakeId,

    /// Owner address
    pub owner: Address,

    /// Staked amount (never zero while active)
    pub amount: u128,

    /// Stake timestamp
    pub created_at: Timestamp,

    /// Rewards accrue from here
    pub last_claim_at: Timestamp,

    /// False once unstaked
    pub active: bool,

    /// Total rewards paid on this record
    pub rewards_claimed: u128,
}

impl StakeRecord {
    /// Voting weight of this record
    pub fn voting_power(&self) -> u128 {
        if self.active {
            self.amount
        } else {
            0
        }
    }

    /// Reward accrued since the last claim at `rate_bps`
    pub fn pending_reward(&self, now: Timestamp, rate_bps: u128) -> Result<u128> {
        if !self.active {
            return Ok(0);
        }
        accrued_reward(self.amount, rate_bps, now.saturating_sub(self.last_claim_at))
    }
}

/// What `unstake` paid out
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeReceipt {
    pub stake_id: StakeId,
    pub owner: Address,
    /// Principal returned
    pub amount: u128,
    /// Reward flushed before deactivation
    pub reward: u128,
}

/// Stake ledger
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StakeLedger {
    /// All records, active and inactive
    records: BTreeMap<StakeId, StakeRecord>,

    /// Next record handle
    next_id: u64,

    /// Sum of active record amounts
    total_staked: u128,

    /// Rewards paid per owner, across all their records
    rewards_paid: BTreeMap<Address, u128>,
}

impl StakeLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new stake position
    pub fn stake(
        &mut self,
        owner: Address,
        amount: u128,
        now: Timestamp,
        params: &ParameterStore,
        treasury: &mut dyn Treasury,
        sink: &mut dyn EventSink,
    ) -> Result<StakeId> {
        if amount == 0 {
            return Err(PoolError::InvalidAmount("stake amount is zero".into()));
        }
        let min_stake = params.get(ParamKey::MinStake);
        if amount < min_stake {
            return Err(PoolError::InvalidAmount(format!(
                "stake {} below minimum {}",
                amount, min_stake
            )));
        }
        let total = self
            .total_staked
            .checked_add(amount)
            .ok_or_else(|| PoolError::InvalidAmount("pool total would overflow".into()))?;

        treasury.transfer_in(&owner, amount)?;

        let id = StakeId(self.next_id);
        self.next_id += 1;
        self.records.insert(
            id,
            StakeRecord {
                id,
                owner,
                amount,
                created_at: now,
                last_claim_at: now,
                active: true,
                rewards_claimed: 0,
            },
        );
        self.total_staked = total;

        tracing::debug!(%owner, %id, amount, total_staked = total, "stake opened");
        sink.emit(PoolEvent::Staked {
            owner,
            stake_id: id,
            amount,
        });
        Ok(id)
    }

    /// Close a position, paying back principal and any pending reward
    pub fn unstake(
        &mut self,
        id: StakeId,
        caller: Address,
        now: Timestamp,
        params: &ParameterStore,
        treasury: &mut dyn Treasury,
        sink: &mut dyn EventSink,
    ) -> Result<UnstakeReceipt> {
        let record = self.owned_active(id, caller)?;
        let amount = record.amount;
        let reward = record.pending_reward(now, params.get(ParamKey::RewardRateBps))?;
        let payout = Payout {
            principal: amount,
            reward,
        };
        if payout.total().is_none() {
            return Err(PoolError::InvalidAmount("payout would overflow".into()));
        }

        treasury.transfer_out(&caller, payout)?;

        if let Some(record) = self.records.get_mut(&id) {
            record.active = false;
            record.last_claim_at = record.last_claim_at.max(now);
            record.rewards_claimed = record.rewards_claimed.saturating_add(reward);
        }
        self.total_staked -= amount;
        self.credit_rewards(caller, reward);

        tracing::debug!(owner = %caller, %id, amount, reward, total_staked = self.total_staked, "stake closed");
        if reward > 0 {
            sink.emit(PoolEvent::RewardClaimed {
                owner: caller,
                stake_id: id,
                amount: reward,
            });
        }
        sink.emit(PoolEvent::Unstaked {
            owner: caller,
            stake_id: id,
            amount,
        });

        Ok(UnstakeReceipt {
            stake_id: id,
            owner: caller,
            amount,
            reward,
        })
    }

    /// Pay out the reward accrued on one position
    ///
    /// A second call at the same `now` pays zero and still succeeds.
    pub fn claim_rewards(
        &mut self,
        id: StakeId,
        caller: Address,
        now: Timestamp,
        params: &ParameterStore,
        treasury: &mut dyn Treasury,
        sink: &mut dyn EventSink,
    ) -> Result<u128> {
        let record = self.owned_active(id, caller)?;
        let reward = record.pending_reward(now, params.get(ParamKey::RewardRateBps))?;

        if reward > 0 {
            treasury.transfer_out(&caller, Payout::reward(reward))?;
        }

        if let Some(record) = self.records.get_mut(&id) {
            record.last_claim_at = record.last_claim_at.max(now);
            record.rewards_claimed = record.rewards_claimed.saturating_add(reward);
        }
        self.credit_rewards(caller, reward);

        if reward > 0 {
            tracing::debug!(owner = %caller, %id, reward, "rewards claimed");
            sink.emit(PoolEvent::RewardClaimed {
                owner: caller,
                stake_id: id,
                amount: reward,
            });
        }
        Ok(reward)
    }

    fn owned_active(&self, id: StakeId, caller: Address) -> Result<&StakeRecord> {
        let record = self
            .records
            .get(&id)
            .filter(|r| r.owner == caller)
            .ok_or(PoolError::NotStaker(id.0))?;
        if !record.active {
            return Err(PoolError::RecordInactive(id.0));
        }
        Ok(record)
    }

    fn credit_rewards(&mut self, owner: Address, reward: u128) {
        if reward > 0 {
            let paid = self.rewards_paid.entry(owner).or_insert(0);
            *paid = paid.saturating_add(reward);
        }
    }

    // === Queries ===

    /// Sum of all active stake
    pub fn total_staked(&self) -> u128 {
        self.total_staked
    }

    /// Active stake held by `owner` across all records
    pub fn stake_of(&self, owner: &Address) -> u128 {
        self.records
            .values()
            .filter(|r| r.active && r.owner == *owner)
            .map(|r| r.amount)
            .sum()
    }

    /// Voting weight of a single record (0 if inactive or unknown)
    pub fn voting_power(&self, id: StakeId) -> u128 {
        self.records.get(&id).map(StakeRecord::voting_power).unwrap_or(0)
    }

    /// Get a record
    pub fn record(&self, id: StakeId) -> Option<&StakeRecord> {
        self.records.get(&id)
    }

    /// All records of an owner, active and inactive
    pub fn records_of(&self, owner: &Address) -> Vec<&StakeRecord> {
        self.records.values().filter(|r| r.owner == *owner).collect()
    }

    /// Active (record, amount) pairs backing an owner's voting weight
    pub fn active_positions(&self, owner: &Address) -> Vec<(StakeId, u128)> {
        self.records
            .values()
            .filter(|r| r.active && r.owner == *owner)
            .map(|r| (r.id, r.amount))
            .collect()
    }

    /// All active records
    pub fn active_records(&self) -> impl Iterator<Item = &StakeRecord> {
        self.records.values().filter(|r| r.active)
    }

    /// Reward claimable right now on one record
    pub fn pending_reward(&self, id: StakeId, now: Timestamp, params: &ParameterStore) -> Result<u128> {
        match self.records.get(&id) {
            Some(record) => record.pending_reward(now, params.get(ParamKey::RewardRateBps)),
            None => Ok(0),
        }
    }

    /// Total rewards paid to `owner`
    pub fn rewards_paid(&self, owner: &Address) -> u128 {
        self.rewards_paid.get(owner).copied().unwrap_or(0)
    }

    /// Recompute the pool total from the records
    ///
    /// Always equal to [`Self::total_staked`]; exposed for invariant checks.
    pub fn recompute_total(&self) -> u128 {
        self.active_records().map(|r| r.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{InMemoryTreasury, NullSink, SECONDS_PER_YEAR};

    const RICH: u128 = 1_000_000_000_000;

    fn setup() -> (StakeLedger, ParameterStore, InMemoryTreasury, Address) {
        let alice = Address::from_label("alice");
        let mut treasury = InMemoryTreasury::new();
        treasury.deposit(alice, RICH).unwrap();
        treasury.fund_reserve(RICH).unwrap();
        (StakeLedger::new(), ParameterStore::default(), treasury, alice)
    }

    #[test]
    fn test_stake_updates_totals() {
        let (mut ledger, params, mut treasury, alice) = setup();
        let mut events = Vec::new();

        let id = ledger
            .stake(alice, 5_000, 0, &params, &mut treasury, &mut events)
            .unwrap();

        assert_eq!(ledger.total_staked(), 5_000);
        assert_eq!(ledger.stake_of(&alice), 5_000);
        assert_eq!(ledger.voting_power(id), 5_000);
        assert_eq!(treasury.balance_of(&alice), RICH - 5_000);
        assert_eq!(
            events,
            vec![PoolEvent::Staked {
                owner: alice,
                stake_id: id,
                amount: 5_000
            }]
        );
    }

    #[test]
    fn test_below_minimum_rejected() {
        let (mut ledger, params, mut treasury, alice) = setup();

        let result = ledger.stake(alice, 999, 0, &params, &mut treasury, &mut NullSink);
        assert!(matches!(result, Err(PoolError::InvalidAmount(_))));

        let result = ledger.stake(alice, 0, 0, &params, &mut treasury, &mut NullSink);
        assert!(matches!(result, Err(PoolError::InvalidAmount(_))));
        assert_eq!(ledger.total_staked(), 0);
    }

    #[test]
    fn test_treasury_refusal_leaves_ledger_unchanged() {
        let (mut ledger, params, mut treasury, _) = setup();
        let broke = Address::from_label("broke");

        let result = ledger.stake(broke, 5_000, 0, &params, &mut treasury, &mut NullSink);
        assert!(matches!(result, Err(PoolError::TreasuryRejected(_))));
        assert_eq!(ledger.total_staked(), 0);
        assert!(ledger.records_of(&broke).is_empty());
    }

    #[test]
    fn test_stake_then_unstake_roundtrip() {
        let (mut ledger, params, mut treasury, alice) = setup();
        let id = ledger
            .stake(alice, 5_000, 100, &params, &mut treasury, &mut NullSink)
            .unwrap();

        let receipt = ledger
            .unstake(id, alice, 100, &params, &mut treasury, &mut NullSink)
            .unwrap();

        assert_eq!(receipt.amount, 5_000);
        assert_eq!(receipt.reward, 0);
        assert_eq!(ledger.total_staked(), 0);
        assert_eq!(treasury.balance_of(&alice), RICH);
        assert_eq!(ledger.voting_power(id), 0);
    }

    #[test]
    fn test_unstake_checks_owner_and_state() {
        let (mut ledger, params, mut treasury, alice) = setup();
        let bob = Address::from_label("bob");
        let id = ledger
            .stake(alice, 5_000, 0, &params, &mut treasury, &mut NullSink)
            .unwrap();

        let result = ledger.unstake(id, bob, 0, &params, &mut treasury, &mut NullSink);
        assert_eq!(result.unwrap_err(), PoolError::NotStaker(id.0));

        ledger
            .unstake(id, alice, 0, &params, &mut treasury, &mut NullSink)
            .unwrap();
        let result = ledger.unstake(id, alice, 0, &params, &mut treasury, &mut NullSink);
        assert_eq!(result.unwrap_err(), PoolError::RecordInactive(id.0));

        let result = ledger.unstake(StakeId(42), alice, 0, &params, &mut treasury, &mut NullSink);
        assert_eq!(result.unwrap_err(), PoolError::NotStaker(42));
    }

    #[test]
    fn test_one_year_reward() {
        let (mut ledger, params, mut treasury, alice) = setup();
        let id = ledger
            .stake(alice, 1_000_000, 0, &params, &mut treasury, &mut NullSink)
            .unwrap();

        let reward = ledger
            .claim_rewards(id, alice, SECONDS_PER_YEAR, &params, &mut treasury, &mut NullSink)
            .unwrap();

        assert_eq!(reward, 50_000);
        assert_eq!(ledger.rewards_paid(&alice), 50_000);
        assert_eq!(ledger.record(id).unwrap().last_claim_at, SECONDS_PER_YEAR);
    }

    #[test]
    fn test_claim_is_idempotent_at_same_instant() {
        let (mut ledger, params, mut treasury, alice) = setup();
        let id = ledger
            .stake(alice, 1_000_000, 0, &params, &mut treasury, &mut NullSink)
            .unwrap();

        let mut events = Vec::new();
        let first = ledger
            .claim_rewards(id, alice, 86_400, &params, &mut treasury, &mut events)
            .unwrap();
        let second = ledger
            .claim_rewards(id, alice, 86_400, &params, &mut treasury, &mut events)
            .unwrap();

        assert!(first > 0);
        assert_eq!(second, 0);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_unstake_flushes_pending_reward() {
        let (mut ledger, params, mut treasury, alice) = setup();
        let id = ledger
            .stake(alice, 1_000_000, 0, &params, &mut treasury, &mut NullSink)
            .unwrap();

        let mut events = Vec::new();
        let receipt = ledger
            .unstake(id, alice, SECONDS_PER_YEAR, &params, &mut treasury, &mut events)
            .unwrap();

        assert_eq!(receipt.reward, 50_000);
        assert_eq!(treasury.balance_of(&alice), RICH + 50_000);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name(), "reward_claimed");
        assert_eq!(events[1].name(), "unstaked");
    }

    #[test]
    fn test_exhausted_reserve_aborts_claim() {
        let alice = Address::from_label("alice");
        let mut treasury = InMemoryTreasury::new();
        treasury.deposit(alice, 1_000_000).unwrap();
        let params = ParameterStore::default();
        let mut ledger = StakeLedger::new();
        let id = ledger
            .stake(alice, 1_000_000, 0, &params, &mut treasury, &mut NullSink)
            .unwrap();

        // reserve is empty; the reward leg fails and takes the principal leg with it
        let result = ledger.unstake(id, alice, SECONDS_PER_YEAR, &params, &mut treasury, &mut NullSink);
        assert!(matches!(result, Err(PoolError::TreasuryRejected(_))));
        assert!(ledger.record(id).unwrap().active);
        assert_eq!(ledger.total_staked(), 1_000_000);
    }

    #[test]
    fn test_claims_cannot_spend_other_stakers_principal() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut treasury = InMemoryTreasury::new();
        treasury.deposit(alice, 1_000_000).unwrap();
        treasury.deposit(bob, 1_000_000).unwrap();
        let params = ParameterStore::default();
        let mut ledger = StakeLedger::new();
        let a = ledger
            .stake(alice, 1_000_000, 0, &params, &mut treasury, &mut NullSink)
            .unwrap();
        let b = ledger
            .stake(bob, 1_000_000, 0, &params, &mut treasury, &mut NullSink)
            .unwrap();

        let result = ledger.claim_rewards(a, alice, SECONDS_PER_YEAR, &params, &mut treasury, &mut NullSink);
        assert!(matches!(result, Err(PoolError::TreasuryRejected(_))));
        assert_eq!(treasury.escrow_balance(), 2_000_000);
        assert_eq!(treasury.balance_of(&alice), 0);
        assert_eq!(ledger.record(a).unwrap().last_claim_at, 0);

        treasury.fund_reserve(50_000).unwrap();
        let receipt = ledger
            .unstake(b, bob, SECONDS_PER_YEAR, &params, &mut treasury, &mut NullSink)
            .unwrap();
        assert_eq!(receipt.amount, 1_000_000);
        assert_eq!(receipt.reward, 50_000);
        assert_eq!(treasury.balance_of(&bob), 1_050_000);
        assert_eq!(treasury.escrow_balance(), 1_000_000);
        assert_eq!(treasury.reserve_balance(), 0);
    }

    #[test]
    fn test_stake_of_sums_active_records() {
        let (mut ledger, params, mut treasury, alice) = setup();
        let a = ledger
            .stake(alice, 2_000, 0, &params, &mut treasury, &mut NullSink)
            .unwrap();
        ledger
            .stake(alice, 3_000, 0, &params, &mut treasury, &mut NullSink)
            .unwrap();
        ledger
            .unstake(a, alice, 0, &params, &mut treasury, &mut NullSink)
            .unwrap();

        assert_eq!(ledger.stake_of(&alice), 3_000);
        assert_eq!(ledger.active_positions(&alice).len(), 1);
        assert_eq!(ledger.records_of(&alice).len(), 2);
        assert_eq!(ledger.recompute_total(), ledger.total_staked());
    }
}
