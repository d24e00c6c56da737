//! Core type definitions for Tessera
//!
//! Identities and handles are opaque: the core compares them and never
//! verifies them cryptographically. That is the host's job.

use crate::params::ParamKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seconds since the Unix epoch, supplied by the host on every call
pub type Timestamp = u64;

/// One day in seconds
pub const SECONDS_PER_DAY: u64 = 24 * 3600;

/// One reward year in seconds (365 days, no leap handling)
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// Basis-point denominator (10_000 bps = 100%)
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Address - opaque 32-byte identity for stakers, voters and admins
///
/// Serialized as a hex string so it can key JSON maps.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address {
    bytes: [u8; 32],
}

impl Address {
    /// Create an address from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Derive an address from a human label (BLAKE3 of the label)
    ///
    /// Handy for operators and tests that want memorable identities.
    pub fn from_label(label: &str) -> Self {
        Self {
            bytes: *blake3::hash(label.as_bytes()).as_bytes(),
        }
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse from a 64-character hex string (optional `0x` prefix)
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self { bytes })
    }

    /// Zero address
    pub const ZERO: Self = Self { bytes: [0u8; 32] };
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Handle of a stake position in the ledger arena
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct StakeId(pub u64);

impl fmt::Display for StakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stake#{}", self.0)
    }
}

/// Handle of a governance proposal
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ProposalId(pub u64);

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proposal#{}", self.0)
    }
}

/// Admin role hierarchy (ordered: User < Admin < SuperAdmin)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User = 0,
    Admin = 1,
    SuperAdmin = 2,
}

impl Role {
    /// Get role name
    pub fn name(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "super_admin" | "superadmin" => Ok(Self::SuperAdmin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Discrete capabilities checked by the admin registry
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewDashboard,
    ManageUsers,
    ExecuteFunctions,
    ManageParams,
    ManageAdmins,
}

impl Permission {
    /// Every permission, lowest bit first
    pub const ALL: [Permission; 5] = [
        Self::ViewDashboard,
        Self::ManageUsers,
        Self::ExecuteFunctions,
        Self::ManageParams,
        Self::ManageAdmins,
    ];

    /// Bit used in a permission set
    pub fn bit(&self) -> u8 {
        1 << (*self as u8)
    }

    /// Get permission name
    pub fn name(&self) -> &'static str {
        match self {
            Self::ViewDashboard => "view_dashboard",
            Self::ManageUsers => "manage_users",
            Self::ExecuteFunctions => "execute_functions",
            Self::ManageParams => "manage_params",
            Self::ManageAdmins => "manage_admins",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown permission: {}", s))
    }
}

/// What a proposal changes when executed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    /// Write one governed parameter through the shared writer
    Parameter { param: ParamKey, value: u128 },
    /// Flip a named feature flag
    Feature { flag: String, enabled: bool },
    /// Record an emergency directive for the host to act on
    Emergency { action: String },
}

impl ProposalKind {
    /// Short label for logs and events
    pub fn label(&self) -> &'static str {
        match self {
            Self::Parameter { .. } => "parameter",
            Self::Feature { .. } => "feature",
            Self::Emergency { .. } => "emergency",
        }
    }
}

/// Proposal lifecycle state
///
/// Transitions only move forward: Active -> Passed | Rejected,
/// Passed -> Executed | Expired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Active,
    Passed,
    Rejected,
    Executed,
    Expired,
}

impl ProposalStatus {
    /// No further mutation is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Executed | Self::Expired)
    }

    /// Position in the lifecycle, used to check forward-only transitions
    pub fn rank(&self) -> u8 {
        match self {
            Self::Active => 0,
            Self::Passed | Self::Rejected => 1,
            Self::Executed | Self::Expired => 2,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Passed)
                | (Self::Active, Self::Rejected)
                | (Self::Passed, Self::Executed)
                | (Self::Passed, Self::Expired)
        )
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::Passed => "passed",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
            Self::Expired => "expired",
        };
        f.write_str(name)
    }
}
