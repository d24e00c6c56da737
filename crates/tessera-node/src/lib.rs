//! # Tessera Node
//!
//! Host side of the staking pool: composes the four components behind one
//! command facade and owns everything the components leave to the host.
//!
//! | Concern | Module |
//! |---------|--------|
//! | Commands and queries | [`pool`] |
//! | Published events | [`journal`] |
//! | Durable state | [`storage`] |
//! | Prometheus counters | [`metrics`] |
//! | File + env configuration | [`config`] |

pub mod config;
pub mod journal;
pub mod metrics;
pub mod pool;
pub mod storage;

pub use config::{ConfigError, PoolConfig};
pub use journal::{EventJournal, JournalEntry, DEFAULT_JOURNAL_RETENTION};
pub use metrics::PoolMetrics;
pub use pool::{PoolState, SharedPool, StakingPool};
pub use storage::{SnapshotStore, StorageError};
