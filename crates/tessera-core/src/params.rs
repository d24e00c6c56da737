//! # Parameter Store
//!
//! Holds the pool's economic parameters and is the only place they are
//! written. Both the admin path and the governance path go through
//! [`ParameterStore::set`], which validates the *value* against fixed bounds
//! and never looks at the caller. Who may call it is decided by the caller
//! side (permission check or passed proposal).
//!
//! ## Bounds
//!
//! | Parameter | Min | Max | Default |
//! |-----------|-----|-----|---------|
//! | taker_fee_bps | 0 | 1000 | 30 |
//! | maker_fee_bps | 0 | 1000 | 10 |
//! | min_stake | 1 | u128::MAX | 1000 |
//! | reward_rate_bps | 0 | 10000 | 500 |
//! | voting_period_days | 1 | 3650 | 7 |
//! | execution_delay_days | 1 | 3650 | 2 |
//! | quorum_bps | 1 | 10000 | 1000 |
//! | expiry_window_days | 1 | 3650 | 14 |

use crate::error::{PoolError, Result};
use crate::types::{Timestamp, SECONDS_PER_DAY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest window any day-denominated parameter may span (10 years)
pub const MAX_WINDOW_DAYS: u128 = 3650;

/// Governed parameter names
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    /// Fee charged to takers, in bps
    TakerFeeBps,
    /// Rebate paid to makers, in bps
    MakerFeeBps,
    /// Smallest amount a single stake record may hold
    MinStake,
    /// Annual reward rate, in bps
    RewardRateBps,
    /// Length of the voting window
    VotingPeriodDays,
    /// Wait between voting deadline and earliest execution
    ExecutionDelayDays,
    /// Minimum turnout as a share of total stake, in bps
    QuorumBps,
    /// How long a passed proposal stays executable
    ExpiryWindowDays,
}

impl ParamKey {
    /// Every governed parameter, in display order
    pub const ALL: [ParamKey; 8] = [
        Self::TakerFeeBps,
        Self::MakerFeeBps,
        Self::MinStake,
        Self::RewardRateBps,
        Self::VotingPeriodDays,
        Self::ExecutionDelayDays,
        Self::QuorumBps,
        Self::ExpiryWindowDays,
    ];

    /// Inclusive (min, max) bounds
    pub fn bounds(&self) -> (u128, u128) {
        match self {
            Self::TakerFeeBps | Self::MakerFeeBps => (0, 1_000),
            Self::MinStake => (1, u128::MAX),
            Self::RewardRateBps => (0, 10_000),
            Self::VotingPeriodDays | Self::ExecutionDelayDays | Self::ExpiryWindowDays => {
                (1, MAX_WINDOW_DAYS)
            }
            Self::QuorumBps => (1, 10_000),
        }
    }

    /// Check a candidate value against the bounds
    pub fn validate(&self, value: u128) -> Result<()> {
        let (min, max) = self.bounds();
        if value < min || value > max {
            return Err(PoolError::ParameterOutOfRange {
                param: *self,
                value,
                min,
                max,
            });
        }
        Ok(())
    }

    /// Snake-case name used in config files, events and the CLI
    pub fn name(&self) -> &'static str {
        match self {
            Self::TakerFeeBps => "taker_fee_bps",
            Self::MakerFeeBps => "maker_fee_bps",
            Self::MinStake => "min_stake",
            Self::RewardRateBps => "reward_rate_bps",
            Self::VotingPeriodDays => "voting_period_days",
            Self::ExecutionDelayDays => "execution_delay_days",
            Self::QuorumBps => "quorum_bps",
            Self::ExpiryWindowDays => "expiry_window_days",
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| format!("unknown parameter: {}", s))
    }
}

/// Current parameter values
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParameters {
    #[serde(default = "default_taker_fee_bps")]
    pub taker_fee_bps: u16,

    #[serde(default = "default_maker_fee_bps")]
    pub maker_fee_bps: u16,

    #[serde(default = "default_min_stake", deserialize_with = "amount::deserialize")]
    pub min_stake: u128,

    #[serde(default = "default_reward_rate_bps")]
    pub reward_rate_bps: u16,

    #[serde(default = "default_voting_period_days")]
    pub voting_period_days: u32,

    #[serde(default = "default_execution_delay_days")]
    pub execution_delay_days: u32,

    #[serde(default = "default_quorum_bps")]
    pub quorum_bps: u16,

    #[serde(default = "default_expiry_window_days")]
    pub expiry_window_days: u32,
}

fn default_taker_fee_bps() -> u16 {
    30
}

fn default_maker_fee_bps() -> u16 {
    10
}

/// Amount fields in config files
///
/// Text formats carry integers as 64-bit values, so larger amounts are
/// written as decimal strings there. Binary formats use native u128.
mod amount {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Int(u64),
        Decimal(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        if !deserializer.is_human_readable() {
            return u128::deserialize(deserializer);
        }
        match Text::deserialize(deserializer)? {
            Text::Int(value) => Ok(value as u128),
            Text::Decimal(s) => s.parse().map_err(D::Error::custom),
        }
    }
}

fn default_min_stake() -> u128 {
    1_000
}

fn default_reward_rate_bps() -> u16 {
    500 // 5% APY
}

fn default_voting_period_days() -> u32 {
    7
}

fn default_execution_delay_days() -> u32 {
    2
}

fn default_quorum_bps() -> u16 {
    1_000 // 10% of total stake
}

fn default_expiry_window_days() -> u32 {
    14
}

impl Default for GovernanceParameters {
    fn default() -> Self {
        Self {
            taker_fee_bps: default_taker_fee_bps(),
            maker_fee_bps: default_maker_fee_bps(),
            min_stake: default_min_stake(),
            reward_rate_bps: default_reward_rate_bps(),
            voting_period_days: default_voting_period_days(),
            execution_delay_days: default_execution_delay_days(),
            quorum_bps: default_quorum_bps(),
            expiry_window_days: default_expiry_window_days(),
        }
    }
}

impl GovernanceParameters {
    /// Read one parameter as a raw value
    pub fn get(&self, key: ParamKey) -> u128 {
        match key {
            ParamKey::TakerFeeBps => self.taker_fee_bps as u128,
            ParamKey::MakerFeeBps => self.maker_fee_bps as u128,
            ParamKey::MinStake => self.min_stake,
            ParamKey::RewardRateBps => self.reward_rate_bps as u128,
            ParamKey::VotingPeriodDays => self.voting_period_days as u128,
            ParamKey::ExecutionDelayDays => self.execution_delay_days as u128,
            ParamKey::QuorumBps => self.quorum_bps as u128,
            ParamKey::ExpiryWindowDays => self.expiry_window_days as u128,
        }
    }

    /// Check every field against its bounds
    pub fn validate(&self) -> Result<()> {
        ParamKey::ALL
            .iter()
            .try_for_each(|key| key.validate(self.get(*key)))
    }

    // Callers validate first; every narrowed field has max <= 10_000.
    fn assign(&mut self, key: ParamKey, value: u128) {
        match key {
            ParamKey::TakerFeeBps => self.taker_fee_bps = value as u16,
            ParamKey::MakerFeeBps => self.maker_fee_bps = value as u16,
            ParamKey::MinStake => self.min_stake = value,
            ParamKey::RewardRateBps => self.reward_rate_bps = value as u16,
            ParamKey::VotingPeriodDays => self.voting_period_days = value as u32,
            ParamKey::ExecutionDelayDays => self.execution_delay_days = value as u32,
            ParamKey::QuorumBps => self.quorum_bps = value as u16,
            ParamKey::ExpiryWindowDays => self.expiry_window_days = value as u32,
        }
    }

    /// Voting window in seconds
    pub fn voting_period_secs(&self) -> u64 {
        self.voting_period_days as u64 * SECONDS_PER_DAY
    }

    /// Execution delay in seconds
    pub fn execution_delay_secs(&self) -> u64 {
        self.execution_delay_days as u64 * SECONDS_PER_DAY
    }

    /// Expiry window in seconds
    pub fn expiry_window_secs(&self) -> u64 {
        self.expiry_window_days as u64 * SECONDS_PER_DAY
    }
}

/// Audit entry for one accepted write
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterChange {
    pub param: ParamKey,
    pub old: u128,
    pub new: u128,
    /// Store version after this write
    pub version: u64,
    pub changed_at: Timestamp,
}

/// Versioned parameter store with a single validated writer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterStore {
    params: GovernanceParameters,
    version: u64,
    updated_at: Timestamp,
    history: Vec<ParameterChange>,
}

impl ParameterStore {
    /// Create a store from genesis values, rejecting any out-of-bounds field
    pub fn new(params: GovernanceParameters, genesis_at: Timestamp) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            version: 0,
            updated_at: genesis_at,
            history: Vec::new(),
        })
    }

    /// Read one parameter
    pub fn get(&self, key: ParamKey) -> u128 {
        self.params.get(key)
    }

    /// All current values
    pub fn params(&self) -> &GovernanceParameters {
        &self.params
    }

    /// Number of accepted writes since genesis
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Time of the last accepted write (genesis time if none)
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Every accepted write, oldest first
    pub fn history(&self) -> &[ParameterChange] {
        &self.history
    }

    /// Write one parameter
    ///
    /// Validates only the value. Callers decide whether the write is allowed.
    pub fn set(&mut self, key: ParamKey, value: u128, now: Timestamp) -> Result<ParameterChange> {
        key.validate(value)?;

        let old = self.params.get(key);
        self.params.assign(key, value);
        self.version += 1;
        self.updated_at = now;

        let change = ParameterChange {
            param: key,
            old,
            new: value,
            version: self.version,
            changed_at: now,
        };
        self.history.push(change.clone());

        tracing::debug!(param = %key, old, new = value, version = self.version, "parameter updated");
        Ok(change)
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self {
            params: GovernanceParameters::default(),
            version: 0,
            updated_at: 0,
            history: Vec::new(),
        }
    }
}
