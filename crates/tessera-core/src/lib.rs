//! # Tessera Core
//!
//! Shared building blocks for the Tessera staking pool:
//! - `Address`, `StakeId`, `ProposalId` - opaque handles
//! - `PoolError` - the closed error taxonomy every command reports from
//! - `PoolEvent` / `EventSink` - what committed commands emit
//! - `ParameterStore` - the single validated writer for economic parameters
//! - `Treasury` - the balance collaborator debited and credited by the ledger
//!
//! ## Layering
//!
//! ```text
//!   ┌──────────────────────┐
//!   │  Governance Engine   │ ── reads stake weight, writes params on execute
//!   ├──────────┬───────────┤
//!   │  Admin   │   Stake   │
//!   │ Registry │  Ledger   │
//!   ├──────────┴───────────┤
//!   │   Parameter Store    │ ── validates values, never callers
//!   └──────────────────────┘
//! ```
//!
//! Nothing in this crate reads a clock. Every time-sensitive call takes
//! `now` from the host.

pub mod error;
pub mod events;
pub mod math;
pub mod params;
pub mod treasury;
pub mod types;

pub use error::*;
pub use events::*;
pub use params::*;
pub use treasury::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{PoolError, Result};
    pub use crate::events::{EventSink, PoolEvent};
    pub use crate::params::{GovernanceParameters, ParamKey, ParameterStore};
    pub use crate::treasury::{Payout, Treasury};
    pub use crate::types::*;
}
