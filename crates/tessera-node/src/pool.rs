//! Staking pool facade
//!
//! Every command runs against the pool state with a fresh event buffer.
//! Components validate before they mutate, so a failed command leaves the
//! state untouched and its buffer is dropped. A committed command's events
//! go to the journal, the broadcast channel and the log, in that order.

use crate::config::{ConfigError, PoolConfig};
use crate::journal::{EventJournal, JournalEntry};
use crate::metrics::PoolMetrics;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tessera_admin::{AdminRegistry, AdminUser};
use tessera_core::prelude::*;
use tessera_core::{ParameterChange, Permission, Role};
use tessera_governance::{EmergencyDirective, FinalizeOutcome, GovernanceEngine, Proposal, VoteRecord};
use tessera_staking::{StakeLedger, StakeRecord, UnstakeReceipt};
use tokio::sync::broadcast;

/// Broadcast channel capacity; slow subscribers lag past this
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Durable pool state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolState<T> {
    pub params: ParameterStore,
    pub ledger: StakeLedger,
    pub admins: AdminRegistry,
    pub governance: GovernanceEngine,
    pub journal: EventJournal,
    pub treasury: T,
}

impl<T> PoolState<T> {
    pub fn new(params: ParameterStore, treasury: T) -> Self {
        Self {
            params,
            ledger: StakeLedger::new(),
            admins: AdminRegistry::new(),
            governance: GovernanceEngine::new(),
            journal: EventJournal::new(),
            treasury,
        }
    }
}

/// Staking pool host
pub struct StakingPool<T> {
    state: PoolState<T>,
    events_tx: broadcast::Sender<JournalEntry>,
    metrics: Option<PoolMetrics>,
}

impl<T: Treasury> StakingPool<T> {
    /// Create a pool from genesis parameters
    pub fn new(params: GovernanceParameters, genesis_at: Timestamp, treasury: T) -> Result<Self> {
        let store = ParameterStore::new(params, genesis_at)?;
        Ok(Self::from_state(PoolState::new(store, treasury)))
    }

    /// Create a pool from configuration
    pub fn from_config(config: &PoolConfig, treasury: T) -> std::result::Result<Self, ConfigError> {
        let mut state = PoolState::new(config.parameter_store()?, treasury);
        state.journal = EventJournal::with_retention(config.storage.journal_retention);
        let mut pool = Self::from_state(state);
        if config.metrics.enabled {
            match PoolMetrics::new(&config.metrics.namespace) {
                Ok(metrics) => pool = pool.with_metrics(metrics),
                Err(e) => tracing::warn!(error = %e, "metrics disabled"),
            }
        }
        Ok(pool)
    }

    /// Resume from previously persisted state
    pub fn from_state(state: PoolState<T>) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state,
            events_tx,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: PoolMetrics) -> Self {
        metrics.observe(
            self.state.ledger.total_staked(),
            self.state.governance.active_proposals().len(),
        );
        self.metrics = Some(metrics);
        self
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<JournalEntry> {
        self.events_tx.subscribe()
    }

    pub fn state(&self) -> &PoolState<T> {
        &self.state
    }

    pub fn into_state(self) -> PoolState<T> {
        self.state
    }

    pub fn treasury(&self) -> &T {
        &self.state.treasury
    }

    /// Direct treasury access for host-side funding
    pub fn treasury_mut(&mut self) -> &mut T {
        &mut self.state.treasury
    }

    /// Bound the journal; 0 keeps every entry
    pub fn set_journal_retention(&mut self, retention: usize) {
        self.state.journal.set_retention(retention);
    }

    pub fn metrics(&self) -> Option<&PoolMetrics> {
        self.metrics.as_ref()
    }

    // === Stake Ledger ===

    pub fn stake(&mut self, owner: Address, amount: u128, now: Timestamp) -> Result<StakeId> {
        self.run("stake", now, |s, sink| {
            s.ledger
                .stake(owner, amount, now, &s.params, &mut s.treasury, sink)
        })
    }

    /// Close a position and drop its weight from every live vote
    pub fn unstake(&mut self, id: StakeId, caller: Address, now: Timestamp) -> Result<UnstakeReceipt> {
        self.run("unstake", now, |s, sink| {
            let receipt = s
                .ledger
                .unstake(id, caller, now, &s.params, &mut s.treasury, sink)?;
            s.governance.release_stake(id, caller, sink);
            Ok(receipt)
        })
    }

    pub fn claim_rewards(&mut self, id: StakeId, caller: Address, now: Timestamp) -> Result<u128> {
        self.run("claim_rewards", now, |s, sink| {
            s.ledger
                .claim_rewards(id, caller, now, &s.params, &mut s.treasury, sink)
        })
    }

    // === Governance ===

    pub fn create_proposal(
        &mut self,
        proposer: Address,
        title: impl Into<String>,
        description: impl Into<String>,
        kind: ProposalKind,
        now: Timestamp,
    ) -> Result<ProposalId> {
        let (title, description) = (title.into(), description.into());
        self.run("create_proposal", now, |s, sink| {
            s.governance
                .create_proposal(proposer, title, description, kind, now, &s.ledger, &s.params, sink)
        })
    }

    pub fn vote(&mut self, id: ProposalId, voter: Address, support: bool, now: Timestamp) -> Result<u128> {
        self.run("vote", now, |s, sink| {
            s.governance.vote(id, voter, support, now, &s.ledger, sink)
        })
    }

    pub fn finalize(&mut self, id: ProposalId, now: Timestamp) -> Result<FinalizeOutcome> {
        let outcome = self.run("finalize", now, |s, sink| {
            s.governance.finalize(id, now, &s.ledger, &s.params, sink)
        })?;
        if let Some(reason) = outcome.rejection_reason() {
            tracing::info!(%id, %reason, "proposal rejected");
        }
        Ok(outcome)
    }

    pub fn execute(&mut self, id: ProposalId, now: Timestamp) -> Result<ProposalStatus> {
        self.run("execute", now, |s, sink| {
            s.governance.execute(id, now, &mut s.params, sink)
        })
    }

    // === Admin Registry ===

    pub fn add_admin(&mut self, caller: Address, address: Address, role: Role, now: Timestamp) -> Result<()> {
        self.run("add_admin", now, |s, sink| {
            s.admins.add_admin(caller, address, role, now, sink)
        })
    }

    pub fn remove_admin(&mut self, caller: Address, address: Address, now: Timestamp) -> Result<()> {
        self.run("remove_admin", now, |s, sink| {
            s.admins.remove_admin(caller, address, sink)
        })
    }

    pub fn update_admin_role(
        &mut self,
        caller: Address,
        address: Address,
        role: Role,
        now: Timestamp,
    ) -> Result<()> {
        self.run("update_admin_role", now, |s, sink| {
            s.admins.update_admin_role(caller, address, role, sink)
        })
    }

    pub fn grant_permission(
        &mut self,
        caller: Address,
        address: Address,
        perm: Permission,
        now: Timestamp,
    ) -> Result<()> {
        self.run("grant_permission", now, |s, sink| {
            s.admins.grant_permission(caller, address, perm, sink)
        })
    }

    pub fn revoke_permission(
        &mut self,
        caller: Address,
        address: Address,
        perm: Permission,
        now: Timestamp,
    ) -> Result<()> {
        self.run("revoke_permission", now, |s, sink| {
            s.admins.revoke_permission(caller, address, perm, sink)
        })
    }

    /// Admin path to the parameter writer
    pub fn update_parameter(
        &mut self,
        caller: Address,
        param: ParamKey,
        value: u128,
        now: Timestamp,
    ) -> Result<ParameterChange> {
        self.run("update_parameter", now, |s, sink| {
            s.admins
                .update_parameter(caller, param, value, now, &mut s.params, sink)
        })
    }

    fn run<R>(
        &mut self,
        command: &'static str,
        now: Timestamp,
        op: impl FnOnce(&mut PoolState<T>, &mut Vec<PoolEvent>) -> Result<R>,
    ) -> Result<R> {
        let mut buffer = Vec::new();
        match op(&mut self.state, &mut buffer) {
            Ok(value) => {
                self.publish(now, buffer);
                if let Some(metrics) = &self.metrics {
                    metrics.record_command(command, "ok");
                }
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(command, code = e.code(), error = %e, "command rejected");
                if let Some(metrics) = &self.metrics {
                    metrics.record_command(command, &e.code().to_string());
                }
                Err(e)
            }
        }
    }

    fn publish(&mut self, now: Timestamp, events: Vec<PoolEvent>) {
        if events.is_empty() {
            return;
        }
        let entries = self.state.journal.append(now, events);
        for entry in entries {
            tracing::debug!(seq = entry.seq, event = entry.event.name(), "event published");
            if let Some(metrics) = &self.metrics {
                metrics.record_event(entry.event.name());
            }
            // no subscribers is fine
            let _ = self.events_tx.send(entry);
        }
        if let Some(metrics) = &self.metrics {
            metrics.observe(
                self.state.ledger.total_staked(),
                self.state.governance.active_proposals().len(),
            );
        }
    }

    // === Queries ===

    pub fn get_parameter(&self, param: ParamKey) -> u128 {
        self.state.params.get(param)
    }

    pub fn parameters(&self) -> &GovernanceParameters {
        self.state.params.params()
    }

    pub fn parameter_version(&self) -> u64 {
        self.state.params.version()
    }

    pub fn parameter_history(&self) -> &[ParameterChange] {
        self.state.params.history()
    }

    pub fn total_staked(&self) -> u128 {
        self.state.ledger.total_staked()
    }

    pub fn stake_of(&self, owner: &Address) -> u128 {
        self.state.ledger.stake_of(owner)
    }

    pub fn voting_power(&self, id: StakeId) -> u128 {
        self.state.ledger.voting_power(id)
    }

    pub fn record(&self, id: StakeId) -> Option<&StakeRecord> {
        self.state.ledger.record(id)
    }

    pub fn records_of(&self, owner: &Address) -> Vec<&StakeRecord> {
        self.state.ledger.records_of(owner)
    }

    pub fn pending_reward(&self, id: StakeId, now: Timestamp) -> Result<u128> {
        self.state.ledger.pending_reward(id, now, &self.state.params)
    }

    pub fn rewards_paid(&self, owner: &Address) -> u128 {
        self.state.ledger.rewards_paid(owner)
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.state.governance.proposal(id)
    }

    pub fn active_proposals(&self) -> Vec<&Proposal> {
        self.state.governance.active_proposals()
    }

    pub fn vote_of(&self, id: ProposalId, voter: &Address) -> Option<&VoteRecord> {
        self.state.governance.vote_of(id, voter)
    }

    pub fn feature_enabled(&self, flag: &str) -> bool {
        self.state.governance.feature_enabled(flag)
    }

    pub fn emergency_log(&self) -> &[EmergencyDirective] {
        self.state.governance.emergency_log()
    }

    pub fn admin(&self, address: &Address) -> Option<&AdminUser> {
        self.state.admins.admin(address)
    }

    pub fn is_admin(&self, address: &Address) -> bool {
        self.state.admins.is_admin(address)
    }

    pub fn has_permission(&self, address: &Address, perm: Permission) -> bool {
        self.state.admins.has_permission(address, perm)
    }

    pub fn journal(&self) -> &EventJournal {
        &self.state.journal
    }

    /// Pool total matches the records and every live tally matches its votes
    pub fn invariants_hold(&self) -> bool {
        self.state.ledger.recompute_total() == self.state.ledger.total_staked()
            && self.state.governance.tallies_consistent()
    }
}

/// Pool behind a global lock, for multi-threaded hosts
pub struct SharedPool<T> {
    inner: Arc<Mutex<StakingPool<T>>>,
}

impl<T> Clone for SharedPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Treasury> SharedPool<T> {
    pub fn new(pool: StakingPool<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    /// Run `f` with exclusive access; one command at a time
    pub fn with<R>(&self, f: impl FnOnce(&mut StakingPool<T>) -> R) -> R {
        let mut pool = self.inner.lock();
        f(&mut pool)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JournalEntry> {
        self.inner.lock().subscribe()
    }
}
