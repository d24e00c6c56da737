//! End-to-end pool scenarios

use tessera_core::prelude::*;
use tessera_core::{InMemoryTreasury, Permission, SECONDS_PER_DAY, SECONDS_PER_YEAR};
use tessera_node::{PoolState, SnapshotStore, StakingPool};

const DAY: u64 = SECONDS_PER_DAY;
const RESERVE: u128 = 1_000_000_000_000;

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

fn pool(funded: &[(&str, u128)]) -> StakingPool<InMemoryTreasury> {
    let mut treasury = InMemoryTreasury::new();
    for (who, amount) in funded {
        treasury.deposit(addr(who), *amount).unwrap();
    }
    treasury.fund_reserve(RESERVE).unwrap();
    StakingPool::new(GovernanceParameters::default(), 0, treasury).unwrap()
}

fn rate_proposal(value: u128) -> ProposalKind {
    ProposalKind::Parameter {
        param: ParamKey::RewardRateBps,
        value,
    }
}

#[test]
fn one_year_at_five_percent_pays_fifty_thousand() {
    let mut pool = pool(&[("alice", 1_000_000)]);
    let id = pool.stake(addr("alice"), 1_000_000, 0).unwrap();

    let reward = pool.claim_rewards(id, addr("alice"), SECONDS_PER_YEAR).unwrap();
    assert_eq!(reward, 50_000);
    assert_eq!(pool.rewards_paid(&addr("alice")), 50_000);
    assert_eq!(pool.treasury().balance_of(&addr("alice")), 50_000);

    // same instant again pays nothing
    assert_eq!(pool.claim_rewards(id, addr("alice"), SECONDS_PER_YEAR).unwrap(), 0);
}

#[test]
fn opposition_with_double_weight_rejects() {
    let mut pool = pool(&[("alice", 1_000), ("bob", 2_000)]);
    pool.stake(addr("alice"), 1_000, 0).unwrap();
    pool.stake(addr("bob"), 2_000, 0).unwrap();

    let id = pool
        .create_proposal(addr("alice"), "raise rate", "to 8%", rate_proposal(800), 0)
        .unwrap();
    pool.vote(id, addr("bob"), false, DAY).unwrap();

    let outcome = pool.finalize(id, 7 * DAY).unwrap();
    assert_eq!(outcome.status, ProposalStatus::Rejected);
    assert_eq!(outcome.votes_for, 1_000);
    assert_eq!(outcome.votes_against, 2_000);
    assert!(matches!(
        pool.execute(id, 9 * DAY),
        Err(PoolError::AlreadyFinalized(_))
    ));
}

#[test]
fn changed_vote_moves_weight_to_new_side() {
    let mut pool = pool(&[("alice", 1_000), ("carol", 3_000)]);
    pool.stake(addr("alice"), 1_000, 0).unwrap();
    pool.stake(addr("carol"), 3_000, 0).unwrap();
    let id = pool
        .create_proposal(addr("alice"), "t", "d", rate_proposal(600), 0)
        .unwrap();

    pool.vote(id, addr("carol"), true, 10).unwrap();
    pool.vote(id, addr("carol"), false, 20).unwrap();

    let proposal = pool.proposal(id).unwrap();
    assert_eq!(proposal.votes_for, 1_000);
    assert_eq!(proposal.votes_against, 3_000);
    let vote = pool.vote_of(id, &addr("carol")).unwrap();
    assert!(!vote.support);
    assert_eq!(vote.stake_weight, 3_000);
}

#[test]
fn execution_waits_for_delay_and_applies_once() {
    let mut pool = pool(&[("alice", 5_000)]);
    pool.stake(addr("alice"), 5_000, 0).unwrap();
    let id = pool
        .create_proposal(addr("alice"), "t", "d", rate_proposal(800), 0)
        .unwrap();
    pool.finalize(id, 7 * DAY).unwrap();

    assert!(matches!(
        pool.execute(id, 9 * DAY - 1),
        Err(PoolError::ExecutionDelayNotElapsed { .. })
    ));
    assert_eq!(pool.execute(id, 9 * DAY).unwrap(), ProposalStatus::Executed);
    assert_eq!(pool.get_parameter(ParamKey::RewardRateBps), 800);
    assert_eq!(pool.parameter_version(), 1);

    assert!(matches!(
        pool.execute(id, 9 * DAY + 1),
        Err(PoolError::AlreadyFinalized(_))
    ));
    assert_eq!(pool.parameter_version(), 1);
}

#[test]
fn stake_then_unstake_refunds_exactly() {
    let mut pool = pool(&[("alice", 7_777)]);
    let before = pool.total_staked();
    let id = pool.stake(addr("alice"), 7_777, 100).unwrap();

    let receipt = pool.unstake(id, addr("alice"), 100).unwrap();
    assert_eq!(receipt.amount, 7_777);
    assert_eq!(receipt.reward, 0);
    assert_eq!(pool.total_staked(), before);
    assert_eq!(pool.treasury().balance_of(&addr("alice")), 7_777);
    assert!(matches!(
        pool.unstake(id, addr("alice"), 101),
        Err(PoolError::RecordInactive(_))
    ));
}

#[test]
fn reward_rate_boundary() {
    let mut pool = pool(&[]);
    pool.add_admin(addr("root"), addr("root"), Role::SuperAdmin, 0).unwrap();

    assert!(matches!(
        pool.update_parameter(addr("root"), ParamKey::RewardRateBps, 10_001, 1),
        Err(PoolError::ParameterOutOfRange { .. })
    ));
    pool.update_parameter(addr("root"), ParamKey::RewardRateBps, 10_000, 1)
        .unwrap();
    assert_eq!(pool.get_parameter(ParamKey::RewardRateBps), 10_000);
}

#[test]
fn admin_hierarchy_end_to_end() {
    let mut pool = pool(&[]);
    pool.add_admin(addr("root"), addr("root"), Role::SuperAdmin, 0).unwrap();
    pool.add_admin(addr("root"), addr("ops"), Role::Admin, 1).unwrap();

    assert!(pool.is_admin(&addr("ops")));
    assert!(matches!(
        pool.add_admin(addr("ops"), addr("x"), Role::User, 2),
        Err(PoolError::PermissionDenied(_))
    ));

    pool.grant_permission(addr("root"), addr("ops"), Permission::ManageAdmins, 3)
        .unwrap();
    pool.add_admin(addr("ops"), addr("x"), Role::User, 4).unwrap();
    assert!(matches!(
        pool.remove_admin(addr("ops"), addr("root"), 5),
        Err(PoolError::PermissionDenied(_))
    ));

    pool.update_admin_role(addr("root"), addr("ops"), Role::User, 6)
        .unwrap();
    assert!(!pool.has_permission(&addr("ops"), Permission::ManageAdmins));
    assert!(matches!(
        pool.add_admin(addr("ops"), addr("y"), Role::User, 7),
        Err(PoolError::PermissionDenied(_))
    ));
}

#[test]
fn late_execution_expires() {
    let mut pool = pool(&[("alice", 1_000)]);
    pool.stake(addr("alice"), 1_000, 0).unwrap();
    let id = pool
        .create_proposal(
            addr("alice"),
            "enable rebates",
            "",
            ProposalKind::Feature {
                flag: "maker_rebates".into(),
                enabled: true,
            },
            0,
        )
        .unwrap();
    pool.finalize(id, 7 * DAY).unwrap();

    let status = pool.execute(id, 9 * DAY + 14 * DAY + 1).unwrap();
    assert_eq!(status, ProposalStatus::Expired);
    assert!(!pool.feature_enabled("maker_rebates"));
    assert_eq!(pool.proposal(id).unwrap().status, ProposalStatus::Expired);
}

#[test]
fn snapshot_round_trip_preserves_pool() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("pool.snap")).with_fsync(false);

    let mut pool = pool(&[("alice", 10_000), ("bob", 10_000)]);
    pool.add_admin(addr("root"), addr("root"), Role::SuperAdmin, 0).unwrap();
    pool.stake(addr("alice"), 4_000, 0).unwrap();
    let bob_stake = pool.stake(addr("bob"), 6_000, 0).unwrap();
    let id = pool
        .create_proposal(addr("alice"), "t", "d", rate_proposal(700), 0)
        .unwrap();
    pool.vote(id, addr("bob"), true, 1).unwrap();
    store.save(pool.state()).unwrap();

    let state: PoolState<InMemoryTreasury> = store.load().unwrap().unwrap();
    let mut restored = StakingPool::from_state(state);
    assert_eq!(restored.total_staked(), 10_000);
    assert_eq!(restored.proposal(id).unwrap().votes_for, 10_000);
    assert_eq!(restored.journal().last_seq(), pool.journal().last_seq());
    assert!(restored.is_admin(&addr("root")));

    // the restored pool keeps working, journal numbering continues
    let seq = restored.journal().last_seq();
    restored.unstake(bob_stake, addr("bob"), 2).unwrap();
    assert_eq!(restored.journal().since(seq)[0].seq, seq + 1);
    assert_eq!(restored.proposal(id).unwrap().votes_for, 4_000);
    assert!(restored.invariants_hold());
}

#[test]
fn unfunded_reserve_leaves_principal_redeemable() {
    let mut treasury = InMemoryTreasury::new();
    treasury.deposit(addr("alice"), 1_000_000).unwrap();
    treasury.deposit(addr("bob"), 1_000_000).unwrap();
    let mut pool = StakingPool::new(GovernanceParameters::default(), 0, treasury).unwrap();
    let alice_stake = pool.stake(addr("alice"), 1_000_000, 0).unwrap();
    let bob_stake = pool.stake(addr("bob"), 1_000_000, 0).unwrap();

    assert!(matches!(
        pool.claim_rewards(alice_stake, addr("alice"), SECONDS_PER_YEAR),
        Err(PoolError::TreasuryRejected(_))
    ));
    assert_eq!(pool.treasury().escrow_balance(), 2_000_000);

    pool.treasury_mut().fund_reserve(50_000).unwrap();
    let receipt = pool.unstake(bob_stake, addr("bob"), SECONDS_PER_YEAR).unwrap();
    assert_eq!(receipt.amount + receipt.reward, 1_050_000);
    assert_eq!(pool.stake_of(&addr("bob")), 0);
    assert_eq!(pool.treasury().escrow_balance(), 1_000_000);
}

#[test]
fn rejected_commands_leave_state_byte_identical() {
    let mut pool = pool(&[("alice", 5_000), ("bob", 5_000)]);
    pool.add_admin(addr("root"), addr("root"), Role::SuperAdmin, 0).unwrap();
    let stake = pool.stake(addr("alice"), 5_000, 0).unwrap();
    let id = pool
        .create_proposal(addr("alice"), "t", "d", rate_proposal(800), 0)
        .unwrap();
    let before = bincode::serialize(pool.state()).unwrap();

    assert!(pool.vote(id, addr("bob"), false, 1).is_err());
    assert!(pool.finalize(id, DAY).is_err());
    assert!(pool.execute(id, DAY).is_err());
    assert!(pool.add_admin(addr("bob"), addr("bob"), Role::Admin, 1).is_err());
    assert!(pool.add_admin(addr("root"), addr("root"), Role::Admin, 1).is_err());
    assert!(pool
        .update_parameter(addr("root"), ParamKey::RewardRateBps, 10_001, 1)
        .is_err());
    assert!(pool.update_parameter(addr("bob"), ParamKey::RewardRateBps, 600, 1).is_err());
    assert!(pool.unstake(stake, addr("bob"), 1).is_err());
    assert!(pool.claim_rewards(stake, addr("bob"), 1).is_err());

    assert_eq!(bincode::serialize(pool.state()).unwrap(), before);
}
