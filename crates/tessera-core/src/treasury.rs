//! Treasury collaborator
//!
//! The ledger never holds balances itself. It asks a [`Treasury`] to pull
//! principal in on stake and to pay principal and rewards out on unstake and
//! claim. A refused transfer aborts the whole command.

use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Transfer failures reported by a treasury
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreasuryError {
    #[error("insufficient balance for {owner}: need {required}, have {available}")]
    InsufficientBalance {
        owner: Address,
        required: u128,
        available: u128,
    },

    #[error("escrow short of principal: need {required}, have {available}")]
    EscrowShortfall { required: u128, available: u128 },

    #[error("reward reserve exhausted: need {required}, have {available}")]
    ReserveExhausted { required: u128, available: u128 },

    #[error("balance overflow")]
    Overflow,
}

impl From<TreasuryError> for crate::error::PoolError {
    fn from(err: TreasuryError) -> Self {
        crate::error::PoolError::TreasuryRejected(err.to_string())
    }
}

/// One outgoing transfer, split by source account
///
/// Principal leaves escrow, reward leaves the reserve. Both legs succeed or
/// neither does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Payout {
    pub principal: u128,
    pub reward: u128,
}

impl Payout {
    /// Reward-only payout, as paid by a claim
    pub fn reward(amount: u128) -> Self {
        Self {
            principal: 0,
            reward: amount,
        }
    }

    /// Combined amount credited to the owner
    pub fn total(&self) -> Option<u128> {
        self.principal.checked_add(self.reward)
    }
}

/// Balance interface debited by `stake` and credited by `unstake`/`claim`
pub trait Treasury {
    /// Move `amount` from `owner` into escrow
    fn transfer_in(&mut self, owner: &Address, amount: u128) -> Result<(), TreasuryError>;

    /// Return principal from escrow and pay reward from the reserve
    fn transfer_out(&mut self, owner: &Address, payout: Payout) -> Result<(), TreasuryError>;
}

/// Simple balance book: per-owner wallets, principal escrow and a reward reserve
///
/// Escrow only ever holds staked principal, so rewards can never be paid out
/// of another staker's stake.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InMemoryTreasury {
    balances: BTreeMap<Address, u128>,
    escrow: u128,
    reserve: u128,
}

impl InMemoryTreasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an owner's wallet from outside the pool
    pub fn deposit(&mut self, owner: Address, amount: u128) -> Result<(), TreasuryError> {
        let balance = self.balances.entry(owner).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(TreasuryError::Overflow)?;
        Ok(())
    }

    /// Add to the reward reserve
    pub fn fund_reserve(&mut self, amount: u128) -> Result<(), TreasuryError> {
        self.reserve = self.reserve.checked_add(amount).ok_or(TreasuryError::Overflow)?;
        Ok(())
    }

    pub fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Principal currently held for stakers
    pub fn escrow_balance(&self) -> u128 {
        self.escrow
    }

    /// Funds left for reward payouts
    pub fn reserve_balance(&self) -> u128 {
        self.reserve
    }
}

impl Treasury for InMemoryTreasury {
    fn transfer_in(&mut self, owner: &Address, amount: u128) -> Result<(), TreasuryError> {
        let available = self.balance_of(owner);
        if available < amount {
            return Err(TreasuryError::InsufficientBalance {
                owner: *owner,
                required: amount,
                available,
            });
        }
        let escrow = self.escrow.checked_add(amount).ok_or(TreasuryError::Overflow)?;
        self.balances.insert(*owner, available - amount);
        self.escrow = escrow;
        Ok(())
    }

    fn transfer_out(&mut self, owner: &Address, payout: Payout) -> Result<(), TreasuryError> {
        if self.escrow < payout.principal {
            return Err(TreasuryError::EscrowShortfall {
                required: payout.principal,
                available: self.escrow,
            });
        }
        if self.reserve < payout.reward {
            return Err(TreasuryError::ReserveExhausted {
                required: payout.reward,
                available: self.reserve,
            });
        }
        let balance = payout
            .total()
            .and_then(|total| self.balance_of(owner).checked_add(total))
            .ok_or(TreasuryError::Overflow)?;
        self.escrow -= payout.principal;
        self.reserve -= payout.reward;
        self.balances.insert(*owner, balance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_in_and_out() {
        let alice = Address::from_label("alice");
        let mut treasury = InMemoryTreasury::new();
        treasury.deposit(alice, 500).unwrap();

        treasury.transfer_in(&alice, 300).unwrap();
        assert_eq!(treasury.balance_of(&alice), 200);
        assert_eq!(treasury.escrow_balance(), 300);

        let payout = Payout {
            principal: 300,
            reward: 0,
        };
        treasury.transfer_out(&alice, payout).unwrap();
        assert_eq!(treasury.balance_of(&alice), 500);
        assert_eq!(treasury.escrow_balance(), 0);
    }

    #[test]
    fn test_failed_transfer_changes_nothing() {
        let alice = Address::from_label("alice");
        let mut treasury = InMemoryTreasury::new();
        treasury.deposit(alice, 10).unwrap();

        assert!(matches!(
            treasury.transfer_in(&alice, 11),
            Err(TreasuryError::InsufficientBalance { .. })
        ));
        assert!(matches!(
            treasury.transfer_out(&alice, Payout::reward(1)),
            Err(TreasuryError::ReserveExhausted { .. })
        ));
        assert_eq!(treasury.balance_of(&alice), 10);
        assert_eq!(treasury.escrow_balance(), 0);
        assert_eq!(treasury.reserve_balance(), 0);
    }

    #[test]
    fn test_rewards_never_touch_escrow() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut treasury = InMemoryTreasury::new();
        treasury.deposit(alice, 1_000).unwrap();
        treasury.deposit(bob, 1_000).unwrap();
        treasury.transfer_in(&alice, 1_000).unwrap();
        treasury.transfer_in(&bob, 1_000).unwrap();

        // escrow holds 2_000 but the reserve is empty
        assert!(matches!(
            treasury.transfer_out(&alice, Payout::reward(50)),
            Err(TreasuryError::ReserveExhausted { .. })
        ));

        // a principal leg that fits still fails whole if the reward leg cannot be paid
        let payout = Payout {
            principal: 1_000,
            reward: 50,
        };
        assert!(treasury.transfer_out(&bob, payout).is_err());
        assert_eq!(treasury.escrow_balance(), 2_000);

        treasury.fund_reserve(50).unwrap();
        treasury.transfer_out(&bob, payout).unwrap();
        assert_eq!(treasury.balance_of(&bob), 1_050);
        assert_eq!(treasury.escrow_balance(), 1_000);
        assert_eq!(treasury.reserve_balance(), 0);
    }
}
