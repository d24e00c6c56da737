//! Tessera CLI
//!
//! Operates a staking pool stored in a snapshot file. Every invocation loads
//! the snapshot, runs one command and writes the snapshot back if the
//! command committed.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tessera_core::prelude::*;
use tessera_core::{InMemoryTreasury, Permission};
use tessera_node::{PoolConfig, PoolState, SnapshotStore, StakingPool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type Pool = StakingPool<InMemoryTreasury>;

#[derive(Parser)]
#[command(name = "tessera")]
#[command(version)]
#[command(about = "Tessera - staking pool with stake-weighted parameter governance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "tessera.toml")]
    config: PathBuf,

    /// Snapshot file (overrides the configured path)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Acting identity: 64-char hex address or a label
    #[arg(long = "as", global = true, default_value = "operator")]
    identity: String,

    /// Command time in Unix seconds (defaults to the wall clock)
    #[arg(long, global = true)]
    now: Option<u64>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty pool from the genesis configuration
    Init {
        /// Overwrite an existing snapshot
        #[arg(long)]
        force: bool,
    },

    /// Credit the acting identity's wallet, or the reward reserve
    Fund {
        amount: u128,

        /// Fund the reward reserve instead of a wallet
        #[arg(long)]
        reserve: bool,
    },

    /// Open a stake position
    Stake { amount: u128 },

    /// Close a stake position
    Unstake { stake_id: u64 },

    /// Claim rewards on a stake position
    Claim { stake_id: u64 },

    /// Open a governance proposal
    Propose {
        #[command(subcommand)]
        kind: ProposeCommands,

        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Vote on a proposal
    Vote {
        proposal_id: u64,

        /// Vote against instead of in favour
        #[arg(long)]
        against: bool,
    },

    /// Close voting on a proposal
    Finalize { proposal_id: u64 },

    /// Execute a passed proposal
    Execute { proposal_id: u64 },

    /// Admin registry
    Admin {
        #[command(subcommand)]
        admin: AdminCommands,
    },

    /// Governed parameters
    Param {
        #[command(subcommand)]
        param: ParamCommands,
    },

    /// Pool summary, or one proposal
    Show {
        /// Show this proposal instead of the summary
        #[arg(long)]
        proposal: Option<u64>,
    },

    /// Print journaled events
    Events {
        /// Only events after this sequence number
        #[arg(long, default_value = "0")]
        since: u64,
    },
}

#[derive(Subcommand)]
enum ProposeCommands {
    /// Change one governed parameter
    Param { key: ParamKey, value: u128 },
    /// Set a feature flag
    Feature {
        flag: String,
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Record an emergency directive
    Emergency { action: String },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Register an admin (the first admin registers itself)
    Add { address: String, role: Role },
    /// Remove an admin
    Remove { address: String },
    /// Change an admin's role
    Role { address: String, role: Role },
    /// Grant a permission
    Grant { address: String, permission: Permission },
    /// Revoke a granted permission
    Revoke { address: String, permission: Permission },
}

#[derive(Subcommand)]
enum ParamCommands {
    /// Read one parameter
    Get { key: ParamKey },
    /// Write one parameter (requires manage_params)
    Set { key: ParamKey, value: u128 },
    /// Print every accepted write
    History,
    /// Print all current values
    List,
}

fn init_logging(verbose: bool, config: &PoolConfig) {
    let default_level = if verbose { "debug" } else { config.logging.level.as_str() };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = config.logging.is_json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
        }))
        .init();
}

/// Hex address if it parses as one, otherwise a label
fn resolve(identity: &str) -> Address {
    Address::from_hex(identity).unwrap_or_else(|_| Address::from_label(identity))
}

fn wall_clock() -> anyhow::Result<Timestamp> {
    let secs = chrono::Utc::now().timestamp();
    u64::try_from(secs).context("system clock is before the Unix epoch")
}

fn format_time(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| chrono::DateTime::<chrono::Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

fn load_pool(store: &SnapshotStore) -> anyhow::Result<Pool> {
    let state: PoolState<InMemoryTreasury> = store
        .load()
        .with_context(|| format!("reading {}", store.path().display()))?
        .with_context(|| {
            format!(
                "no pool at {} (run `tessera init` first)",
                store.path().display()
            )
        })?;
    Ok(StakingPool::from_state(state))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct Summary<'a> {
    identity: String,
    wallet: u128,
    staked: u128,
    rewards_paid: u128,
    total_staked: u128,
    escrow: u128,
    reserve: u128,
    parameters: &'a GovernanceParameters,
    parameter_version: u64,
    active_proposals: Vec<u64>,
    admin: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = PoolConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    init_logging(cli.verbose, &config);

    let store = SnapshotStore::new(
        cli.snapshot
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.storage.snapshot_path)),
    )
    .with_fsync(config.storage.fsync);
    let me = resolve(&cli.identity);
    let now = match cli.now {
        Some(now) => now,
        None => wall_clock()?,
    };

    if let Commands::Init { force } = cli.command {
        if store.exists() && !force {
            bail!(
                "{} already exists (use --force to replace it)",
                store.path().display()
            );
        }
        let pool = StakingPool::from_config(&config, InMemoryTreasury::new())?;
        store.save(pool.state())?;
        tracing::info!(path = %store.path().display(), "pool initialised");
        println!("Pool created at {}", store.path().display());
        return Ok(());
    }

    let read_only = matches!(
        cli.command,
        Commands::Show { .. }
            | Commands::Events { .. }
            | Commands::Param {
                param: ParamCommands::Get { .. } | ParamCommands::History | ParamCommands::List
            }
    );
    let mut pool = load_pool(&store)?;
    pool.set_journal_retention(config.storage.journal_retention);

    match cli.command {
        Commands::Init { .. } => {}

        Commands::Fund { amount, reserve } => {
            if reserve {
                pool.treasury_mut().fund_reserve(amount)?;
                println!("Reserve funded: {}", pool.treasury().reserve_balance());
            } else {
                pool.treasury_mut().deposit(me, amount)?;
                println!("Wallet {}: {}", me, pool.treasury().balance_of(&me));
            }
        }

        Commands::Stake { amount } => {
            let id = pool.stake(me, amount, now)?;
            println!("Opened {} with {}", id, amount);
        }

        Commands::Unstake { stake_id } => {
            let receipt = pool.unstake(StakeId(stake_id), me, now)?;
            println!(
                "Closed {}: principal {}, reward {}",
                receipt.stake_id, receipt.amount, receipt.reward
            );
        }

        Commands::Claim { stake_id } => {
            let reward = pool.claim_rewards(StakeId(stake_id), me, now)?;
            println!("Claimed {}", reward);
        }

        Commands::Propose {
            kind,
            title,
            description,
        } => {
            let kind = match kind {
                ProposeCommands::Param { key, value } => ProposalKind::Parameter { param: key, value },
                ProposeCommands::Feature { flag, enabled } => ProposalKind::Feature { flag, enabled },
                ProposeCommands::Emergency { action } => ProposalKind::Emergency { action },
            };
            let id = pool.create_proposal(me, title, description, kind, now)?;
            if let Some(proposal) = pool.proposal(id) {
                println!(
                    "Proposal {} open until {}",
                    id.0,
                    format_time(proposal.voting_deadline)
                );
            }
        }

        Commands::Vote {
            proposal_id,
            against,
        } => {
            let weight = pool.vote(ProposalId(proposal_id), me, !against, now)?;
            println!(
                "Voted {} on {} with weight {}",
                if against { "against" } else { "for" },
                proposal_id,
                weight
            );
        }

        Commands::Finalize { proposal_id } => {
            let outcome = pool.finalize(ProposalId(proposal_id), now)?;
            println!(
                "Proposal {} {}: for {}, against {}, quorum {}",
                proposal_id, outcome.status, outcome.votes_for, outcome.votes_against, outcome.required_quorum
            );
            if let Some(reason) = outcome.rejection_reason() {
                println!("  {}", reason);
            }
        }

        Commands::Execute { proposal_id } => {
            let status = pool.execute(ProposalId(proposal_id), now)?;
            println!("Proposal {} {}", proposal_id, status);
        }

        Commands::Admin { admin } => match admin {
            AdminCommands::Add { address, role } => {
                pool.add_admin(me, resolve(&address), role, now)?;
                println!("Added {} as {}", resolve(&address), role);
            }
            AdminCommands::Remove { address } => {
                pool.remove_admin(me, resolve(&address), now)?;
                println!("Removed {}", resolve(&address));
            }
            AdminCommands::Role { address, role } => {
                pool.update_admin_role(me, resolve(&address), role, now)?;
                println!("{} is now {}", resolve(&address), role);
            }
            AdminCommands::Grant {
                address,
                permission,
            } => {
                pool.grant_permission(me, resolve(&address), permission, now)?;
                println!("Granted {} to {}", permission, resolve(&address));
            }
            AdminCommands::Revoke {
                address,
                permission,
            } => {
                pool.revoke_permission(me, resolve(&address), permission, now)?;
                println!("Revoked {} from {}", permission, resolve(&address));
            }
        },

        Commands::Param { param } => match param {
            ParamCommands::Get { key } => println!("{} = {}", key, pool.get_parameter(key)),
            ParamCommands::Set { key, value } => {
                let change = pool.update_parameter(me, key, value, now)?;
                println!("{}: {} -> {} (version {})", key, change.old, change.new, change.version);
            }
            ParamCommands::History => {
                for change in pool.parameter_history() {
                    println!(
                        "v{} {} {}: {} -> {}",
                        change.version,
                        format_time(change.changed_at),
                        change.param,
                        change.old,
                        change.new
                    );
                }
            }
            ParamCommands::List => {
                for key in ParamKey::ALL {
                    println!("{} = {}", key, pool.get_parameter(key));
                }
            }
        },

        Commands::Show { proposal } => match proposal {
            Some(id) => {
                let proposal = pool
                    .proposal(ProposalId(id))
                    .with_context(|| format!("proposal {} not found", id))?;
                print_json(proposal)?;
            }
            None => {
                let summary = Summary {
                    identity: me.to_hex(),
                    wallet: pool.treasury().balance_of(&me),
                    staked: pool.stake_of(&me),
                    rewards_paid: pool.rewards_paid(&me),
                    total_staked: pool.total_staked(),
                    escrow: pool.treasury().escrow_balance(),
                    reserve: pool.treasury().reserve_balance(),
                    parameters: pool.parameters(),
                    parameter_version: pool.parameter_version(),
                    active_proposals: pool.active_proposals().iter().map(|p| p.id.0).collect(),
                    admin: pool.admin(&me).map(|a| format!("{} {}", a.role, a.permissions)),
                };
                print_json(&summary)?;
            }
        },

        Commands::Events { since } => {
            for entry in pool.journal().since(since) {
                println!(
                    "#{} {} {}",
                    entry.seq,
                    format_time(entry.at),
                    serde_json::to_string(&entry.event)?
                );
            }
        }
    }

    if !read_only {
        store.save(pool.state())?;
    }
    Ok(())
}
