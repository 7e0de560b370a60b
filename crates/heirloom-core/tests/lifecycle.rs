//! End-to-end tests for the estate lifecycle through the public `Custodian`.
//!
//! Time is driven by a `ManualClock`, balances by `InMemoryCustody`, and the
//! strategy executor only records the signals it receives.

use heirloom_core::{
    Beneficiary, ContactHash, Custodian, EstateError, EstateId, EstatePhase, InMemoryCustody,
    Limits, LockType, ManualClock, MultisigId, Principal, ProposalAction, ProposalId, RiskSettings,
    StrategyExecutor, DAY_SECS,
};

const T0: i64 = 1_700_000_000;
const INACTIVITY: i64 = 180 * DAY_SECS;
const GRACE: i64 = 30 * DAY_SECS;
const REASON: &str = "seed phrase may be exposed";
const SEED: &str = "correct horse battery staple";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Signal {
    Pause(EstateId),
    Resume(EstateId, RiskSettings),
}

#[derive(Debug, Default)]
struct RecordingStrategy {
    signals: Vec<Signal>,
}

impl StrategyExecutor for RecordingStrategy {
    fn pause(&mut self, estate: EstateId) {
        self.signals.push(Signal::Pause(estate));
    }

    fn resume(&mut self, estate: EstateId, settings: &RiskSettings) {
        self.signals.push(Signal::Resume(estate, settings.clone()));
    }
}

type TestCustodian = Custodian<ManualClock, InMemoryCustody, RecordingStrategy>;

fn setup_with(limits: Limits) -> (TestCustodian, ManualClock) {
    let clock = ManualClock::new(T0);
    let custodian = Custodian::new(
        clock.clone(),
        InMemoryCustody::new(),
        RecordingStrategy::default(),
        limits,
    )
    .unwrap();
    (custodian, clock)
}

fn setup() -> (TestCustodian, ManualClock) {
    setup_with(Limits::default())
}

fn owner() -> Principal {
    Principal::new("owner")
}

fn alice() -> Principal {
    Principal::new("alice")
}

fn bob() -> Principal {
    Principal::new("bob")
}

fn signer(i: usize) -> Principal {
    Principal::new(format!("guardian{}", i))
}

fn heirs() -> Vec<Beneficiary> {
    vec![
        Beneficiary::new("alice", 60, "daughter", "alice@example.com"),
        Beneficiary::new("bob", 40, "son", "bob@example.com"),
    ]
}

fn create_estate(c: &mut TestCustodian) -> EstateId {
    c.create_estate(
        &owner(),
        INACTIVITY,
        GRACE,
        ContactHash::digest("owner@example.com"),
    )
    .unwrap()
}

/// Estate governed by an `n`-signer multisig with the given threshold.
fn governed_estate(c: &mut TestCustodian, n: usize, threshold: usize) -> (EstateId, MultisigId) {
    let estate = create_estate(c);
    let signers = (0..n).map(signer).collect();
    let ms = c.initialize_multisig(&owner(), signers, threshold).unwrap();
    c.attach_multisig(&owner(), estate, ms).unwrap();
    (estate, ms)
}

/// Create, approve up to `threshold` and execute a proposal.
fn pass_proposal(
    c: &mut TestCustodian,
    ms: MultisigId,
    estate: EstateId,
    threshold: usize,
    action: ProposalAction,
) -> ProposalId {
    let pid = c.create_proposal(&signer(0), ms, estate, action).unwrap();
    for i in 1..threshold {
        c.approve_proposal(&signer(i), pid).unwrap();
    }
    c.execute_proposal(&Principal::new("anyone"), pid).unwrap();
    pid
}

#[test]
fn test_full_inheritance_lifecycle() {
    let (mut c, clock) = setup();
    let estate = create_estate(&mut c);
    c.update_beneficiaries(&owner(), estate, heirs()).unwrap();
    c.custody_mut().deposit(estate, 1_000_000);

    // owner checks in halfway; the deadline moves with it
    clock.advance(90 * DAY_SECS);
    c.check_in(&owner(), estate).unwrap();
    let deadline = c.estate(estate).unwrap().inheritance_deadline();
    assert_eq!(deadline, c.now() + INACTIVITY + GRACE);

    clock.set(deadline);
    assert_eq!(
        c.trigger_inheritance(&Principal::new("watchdog"), estate),
        Err(EstateError::NotYetClaimable { deadline })
    );
    assert_eq!(
        c.claim_inheritance(&alice(), estate, 0).unwrap_err(),
        EstateError::NotClaimable
    );

    clock.set(deadline + 1);
    c.trigger_inheritance(&Principal::new("watchdog"), estate)
        .unwrap();
    assert_eq!(
        c.trigger_inheritance(&Principal::new("watchdog"), estate),
        Err(EstateError::AlreadyClaimable)
    );
    assert_eq!(c.check_in(&owner(), estate), Err(EstateError::EstateClaimable));
    assert_eq!(
        c.update_beneficiaries(&owner(), estate, heirs()),
        Err(EstateError::EstateClaimable)
    );

    // bob claims first; shares are still computed against the full balance
    assert_eq!(
        c.claim_inheritance(&alice(), estate, 1).unwrap_err(),
        EstateError::NotAuthorizedBeneficiary(alice())
    );
    let bob_claim = c.claim_inheritance(&bob(), estate, 1).unwrap();
    assert_eq!(bob_claim.amount, 400_000);
    let alice_claim = c.claim_inheritance(&alice(), estate, 0).unwrap();
    assert_eq!(alice_claim.amount, 600_000);
    assert_eq!(alice_claim.share_percentage, 60);
    assert!(alice_claim.claimed);

    assert_eq!(
        c.claim_inheritance(&alice(), estate, 0).unwrap_err(),
        EstateError::AlreadyClaimed(alice())
    );
    assert_eq!(c.estate(estate).unwrap().total_claims, 2);
    assert_eq!(c.custody().payouts().len(), 2);

    c.close_estate(&Principal::new("anyone"), estate).unwrap();
    assert_eq!(c.estate(estate).unwrap().phase(), EstatePhase::Closed);
}

#[test]
fn test_shares_are_empty_or_total_100() {
    let (mut c, _clock) = setup();
    let estate = create_estate(&mut c);
    assert_eq!(c.estate(estate).unwrap().share_total(), 0);

    let mut short = heirs();
    short[1].share = 39;
    assert!(matches!(
        c.update_beneficiaries(&owner(), estate, short),
        Err(EstateError::InvalidShares(_))
    ));
    assert_eq!(c.estate(estate).unwrap().share_total(), 0);

    c.update_beneficiaries(&owner(), estate, heirs()).unwrap();
    let eleven: Vec<_> = (0..11)
        .map(|i| Beneficiary::new(format!("h{}", i), 9, "", "x"))
        .collect();
    assert!(matches!(
        c.update_beneficiaries(&owner(), estate, eleven),
        Err(EstateError::TooManyBeneficiaries { .. })
    ));
    assert_eq!(c.estate(estate).unwrap().share_total(), 100);
    assert_eq!(
        c.update_beneficiaries(&alice(), estate, heirs()),
        Err(EstateError::Unauthorized)
    );
}

#[test]
fn test_create_estate_rejects_invalid_periods() {
    let (mut c, _clock) = setup();
    let hash = ContactHash::digest("owner@example.com");
    assert!(matches!(
        c.create_estate(&owner(), 3600, GRACE, hash),
        Err(EstateError::InvalidPeriod { which: "inactivity", .. })
    ));
    assert!(matches!(
        c.create_estate(&owner(), INACTIVITY, 0, hash),
        Err(EstateError::InvalidPeriod { which: "grace", .. })
    ));
    assert!(c.events().is_empty());
}

#[test]
fn test_second_approval_by_same_signer_fails() {
    let (mut c, _clock) = setup();
    let (estate, ms) = governed_estate(&mut c, 3, 2);
    let pid = c
        .create_proposal(&signer(0), ms, estate, ProposalAction::ForceUnlock)
        .unwrap();

    assert_eq!(c.approve_proposal(&signer(1), pid), Ok(2));
    assert_eq!(
        c.approve_proposal(&signer(1), pid),
        Err(EstateError::AlreadyApproved(signer(1)))
    );
    assert_eq!(
        c.approve_proposal(&Principal::new("eve"), pid),
        Err(EstateError::NotASigner(Principal::new("eve")))
    );
}

#[test]
fn test_execution_requires_threshold_and_happens_once() {
    let (mut c, _clock) = setup();
    let (estate, ms) = governed_estate(&mut c, 5, 3);
    let action = ProposalAction::UpdateBeneficiaries {
        beneficiaries: heirs(),
    };
    let pid = c.create_proposal(&signer(0), ms, estate, action).unwrap();
    c.approve_proposal(&signer(1), pid).unwrap();

    assert_eq!(
        c.execute_proposal(&signer(0), pid),
        Err(EstateError::InsufficientApprovals { have: 2, need: 3 })
    );
    assert!(c.estate(estate).unwrap().beneficiaries.is_empty());

    c.approve_proposal(&signer(2), pid).unwrap();
    c.execute_proposal(&signer(4), pid).unwrap();
    assert_eq!(c.estate(estate).unwrap().beneficiaries, heirs());
    assert!(c.proposal(pid).unwrap().executed);

    assert_eq!(
        c.execute_proposal(&signer(4), pid),
        Err(EstateError::ProposalExecuted)
    );
    assert_eq!(
        c.approve_proposal(&signer(3), pid),
        Err(EstateError::ProposalExecuted)
    );
}

#[test]
fn test_proposal_against_foreign_estate_rejected() {
    let (mut c, _clock) = setup();
    let (_estate, ms) = governed_estate(&mut c, 3, 2);
    let other = create_estate(&mut c);

    assert_eq!(
        c.create_proposal(&signer(0), ms, other, ProposalAction::ForceUnlock),
        Err(EstateError::MultisigNotAttached)
    );
}

#[test]
fn test_invalid_payload_rejected_at_creation() {
    let (mut c, _clock) = setup();
    let (estate, ms) = governed_estate(&mut c, 3, 2);

    let mut bad = heirs();
    bad[0].share = 0;
    assert!(matches!(
        c.create_proposal(
            &signer(0),
            ms,
            estate,
            ProposalAction::UpdateBeneficiaries { beneficiaries: bad }
        ),
        Err(EstateError::InvalidShares(_))
    ));
    assert!(matches!(
        c.create_proposal(
            &signer(0),
            ms,
            estate,
            ProposalAction::EmergencyLock {
                reason: "short".into()
            }
        ),
        Err(EstateError::InvalidLockReason { .. })
    ));
}

#[test]
fn test_lock_cooldown_runs_from_unlock() {
    let limits = Limits {
        min_unlock_delay_secs: 10,
        ..Limits::default()
    };
    let cooldown = limits.lock_cooldown_secs;
    let (mut c, clock) = setup_with(limits);
    let estate = create_estate(&mut c);

    assert_eq!(
        c.initiate_emergency_lock(&owner(), estate, LockType::UserInitiated, REASON, SEED),
        Ok(1)
    );
    clock.set(T0 + 10);
    c.attempt_emergency_unlock(&owner(), estate, SEED).unwrap();

    clock.set(T0 + 10 + cooldown - 1);
    assert_eq!(
        c.initiate_emergency_lock(&owner(), estate, LockType::UserInitiated, REASON, SEED),
        Err(EstateError::CooldownActive {
            retry_at: T0 + 10 + cooldown
        })
    );

    clock.set(T0 + 10 + cooldown);
    assert_eq!(
        c.initiate_emergency_lock(&owner(), estate, LockType::UserInitiated, REASON, SEED),
        Ok(2)
    );
}

#[test]
fn test_lock_blocks_owner_and_inheritance() {
    let (mut c, clock) = setup();
    let estate = create_estate(&mut c);
    c.initiate_emergency_lock(&owner(), estate, LockType::SecurityBreach, REASON, SEED)
        .unwrap();

    assert_eq!(
        c.initiate_emergency_lock(&owner(), estate, LockType::SecurityBreach, REASON, SEED),
        Err(EstateError::LockAlreadyActive)
    );
    assert_eq!(c.check_in(&owner(), estate), Err(EstateError::EstateLocked));
    assert_eq!(
        c.update_beneficiaries(&owner(), estate, heirs()),
        Err(EstateError::EstateLocked)
    );

    clock.advance(INACTIVITY + GRACE + 1);
    assert_eq!(
        c.trigger_inheritance(&Principal::new("watchdog"), estate),
        Err(EstateError::EstateLocked)
    );
}

#[test]
fn test_lock_then_unlock_round_trip() {
    let (mut c, clock) = setup();
    let estate = create_estate(&mut c);
    let lock_count = c
        .initiate_emergency_lock(&owner(), estate, LockType::UserInitiated, REASON, SEED)
        .unwrap();

    let dwell = c.limits().min_unlock_delay_secs;
    clock.advance(dwell - 1);
    assert_eq!(
        c.attempt_emergency_unlock(&owner(), estate, SEED),
        Err(EstateError::TooEarly {
            retry_at: T0 + dwell
        })
    );

    clock.advance(1);
    let unlocked = c.attempt_emergency_unlock(&owner(), estate, SEED).unwrap();
    assert_eq!(unlocked.lock_duration_secs, dwell);

    assert!(!c.estate(estate).unwrap().is_locked);
    let state = c.lock_state(estate).unwrap();
    assert_eq!(state.unlock_timestamp, Some(T0 + dwell));
    assert_eq!(state.lock_count, lock_count);
    assert!(!state.active);

    assert_eq!(
        c.attempt_emergency_unlock(&owner(), estate, SEED),
        Err(EstateError::LockNotActive)
    );
}

#[test]
fn test_attempt_ceiling_then_governance_override() {
    let (mut c, clock) = setup();
    let (estate, ms) = governed_estate(&mut c, 3, 2);
    c.initiate_emergency_lock(&owner(), estate, LockType::SuspiciousActivity, REASON, SEED)
        .unwrap();
    clock.advance(c.limits().min_unlock_delay_secs);

    for attempt in 1..=5u8 {
        assert_eq!(
            c.attempt_emergency_unlock(&owner(), estate, "guess"),
            Err(EstateError::InvalidVerification {
                remaining: 5 - attempt
            })
        );
        assert_eq!(c.lock_state(estate).unwrap().failed_unlock_attempts, attempt);
    }
    assert_eq!(
        c.attempt_emergency_unlock(&owner(), estate, SEED),
        Err(EstateError::MaxAttemptsExceeded)
    );
    assert_eq!(c.lock_state(estate).unwrap().failed_unlock_attempts, 5);
    let failures = c
        .events()
        .iter()
        .filter(|e| e.action.name() == "unlock_failed")
        .count();
    assert_eq!(failures, 5);

    let pid = pass_proposal(&mut c, ms, estate, 2, ProposalAction::ForceUnlock);
    // execution only authorizes; the estate stays locked until a signer acts
    assert!(c.estate(estate).unwrap().is_locked);

    assert_eq!(
        c.force_unlock_by_multisig(&owner(), estate, pid),
        Err(EstateError::NotASigner(owner()))
    );
    c.force_unlock_by_multisig(&signer(2), estate, pid).unwrap();

    assert!(!c.estate(estate).unwrap().is_locked);
    assert_eq!(c.lock_state(estate).unwrap().failed_unlock_attempts, 0);

    // the same proposal cannot clear a later lock
    clock.advance(c.limits().lock_cooldown_secs);
    c.initiate_emergency_lock(&owner(), estate, LockType::UserInitiated, REASON, SEED)
        .unwrap();
    assert!(matches!(
        c.force_unlock_by_multisig(&signer(1), estate, pid),
        Err(EstateError::InvalidProposal(_))
    ));
}

#[test]
fn test_force_unlock_rejects_unexecuted_or_mismatched_proposals() {
    let (mut c, _clock) = setup();
    let (estate, ms) = governed_estate(&mut c, 3, 2);
    let wrong_kind = pass_proposal(
        &mut c,
        ms,
        estate,
        2,
        ProposalAction::UpdateBeneficiaries {
            beneficiaries: heirs(),
        },
    );
    c.initiate_emergency_lock(&owner(), estate, LockType::UserInitiated, REASON, SEED)
        .unwrap();

    let pending = c
        .create_proposal(&signer(0), ms, estate, ProposalAction::ForceUnlock)
        .unwrap();
    assert!(matches!(
        c.force_unlock_by_multisig(&signer(0), estate, pending),
        Err(EstateError::InvalidProposal(_))
    ));
    assert!(matches!(
        c.force_unlock_by_multisig(&signer(0), estate, wrong_kind),
        Err(EstateError::InvalidProposal(_))
    ));
    assert!(c.estate(estate).unwrap().is_locked);
}

#[test]
fn test_multisig_lock_only_clears_through_governance() {
    let (mut c, clock) = setup();
    let (estate, ms) = governed_estate(&mut c, 3, 2);

    assert_eq!(
        c.initiate_emergency_lock(&owner(), estate, LockType::MultisigInitiated, REASON, SEED),
        Err(EstateError::Unauthorized)
    );

    pass_proposal(
        &mut c,
        ms,
        estate,
        2,
        ProposalAction::EmergencyLock {
            reason: "guardians suspect key theft".into(),
        },
    );
    let state = c.lock_state(estate).unwrap();
    assert!(state.active);
    assert_eq!(state.lock_type, LockType::MultisigInitiated);
    assert_eq!(state.locked_by, ms.to_string());

    clock.advance(c.limits().min_unlock_delay_secs);
    assert_eq!(
        c.attempt_emergency_unlock(&owner(), estate, SEED),
        Err(EstateError::Unauthorized)
    );

    let pid = pass_proposal(&mut c, ms, estate, 2, ProposalAction::EmergencyUnlock);
    c.force_unlock_by_multisig(&signer(1), estate, pid).unwrap();
    assert!(!c.estate(estate).unwrap().is_locked);
}

#[test]
fn test_trading_signals_follow_lock_state() {
    let (mut c, clock) = setup();
    let (estate, ms) = governed_estate(&mut c, 3, 2);
    let settings = RiskSettings::balanced();

    pass_proposal(
        &mut c,
        ms,
        estate,
        2,
        ProposalAction::EnableTrading {
            risk_settings: settings.clone(),
        },
    );
    assert!(c.estate(estate).unwrap().trading_enabled);

    let dup = c
        .create_proposal(
            &signer(0),
            ms,
            estate,
            ProposalAction::EnableTrading {
                risk_settings: settings.clone(),
            },
        )
        .unwrap();
    c.approve_proposal(&signer(1), dup).unwrap();
    assert_eq!(
        c.execute_proposal(&signer(1), dup),
        Err(EstateError::TradingAlreadyEnabled)
    );
    assert!(!c.proposal(dup).unwrap().executed);

    c.initiate_emergency_lock(&owner(), estate, LockType::UserInitiated, REASON, SEED)
        .unwrap();
    clock.advance(c.limits().min_unlock_delay_secs);
    c.attempt_emergency_unlock(&owner(), estate, SEED).unwrap();

    pass_proposal(&mut c, ms, estate, 2, ProposalAction::DisableTrading);
    assert!(!c.estate(estate).unwrap().trading_enabled);

    assert_eq!(
        c.strategy().signals,
        vec![
            Signal::Resume(estate, settings.clone()),
            Signal::Pause(estate),
            Signal::Resume(estate, settings),
            Signal::Pause(estate),
        ]
    );
}

#[test]
fn test_recovery_timelock_ordering() {
    let (mut c, clock) = setup();
    let estate = create_estate(&mut c);
    c.update_beneficiaries(&owner(), estate, heirs()).unwrap();

    clock.advance(INACTIVITY + GRACE + 1);
    c.trigger_inheritance(&Principal::new("watchdog"), estate)
        .unwrap();
    let claimable_since = c.estate(estate).unwrap().claimable_since.unwrap();

    let rescuer = Principal::new("rescuer");
    let fee = c.limits().min_recovery_fee;
    let eligible_at = claimable_since + c.limits().recovery_eligibility_delay_secs;

    clock.set(eligible_at - 1);
    assert_eq!(
        c.initiate_recovery(&rescuer, estate, fee),
        Err(EstateError::RecoveryTooEarly {
            retry_at: eligible_at
        })
    );

    clock.set(eligible_at);
    c.initiate_recovery(&rescuer, estate, fee).unwrap();
    assert_eq!(
        c.initiate_recovery(&Principal::new("other"), estate, fee),
        Err(EstateError::RecoveryAlreadyInitiated)
    );

    let ready = eligible_at + c.limits().recovery_timelock_secs;
    clock.set(ready - 1);
    assert_eq!(
        c.execute_recovery(&rescuer, estate),
        Err(EstateError::TimelockNotExpired { retry_at: ready })
    );
    assert_eq!(
        c.execute_recovery(&Principal::new("other"), estate),
        Err(EstateError::Unauthorized)
    );

    clock.set(ready);
    c.execute_recovery(&rescuer, estate).unwrap();

    let recovered = c.estate(estate).unwrap();
    assert_eq!(recovered.owner, rescuer);
    assert!(!recovered.is_claimable);
    assert!(!recovered.is_locked);
    assert_eq!(recovered.last_active_at, ready);
    assert!(recovered.beneficiaries.is_empty());

    assert_eq!(
        c.execute_recovery(&rescuer, estate),
        Err(EstateError::RecoveryAlreadyExecuted)
    );
    assert!(c.recovery_for(estate).unwrap().executed);

    // the new owner runs an ordinary lifecycle from here
    c.check_in(&rescuer, estate).unwrap();
    assert_eq!(c.check_in(&owner(), estate), Err(EstateError::Unauthorized));
}

#[test]
fn test_claimed_estate_cannot_be_recovered() {
    let (mut c, clock) = setup();
    let estate = create_estate(&mut c);
    c.update_beneficiaries(
        &owner(),
        estate,
        vec![Beneficiary::new("alice", 100, "daughter", "alice@example.com")],
    )
    .unwrap();
    c.custody_mut().deposit(estate, 500);

    clock.advance(INACTIVITY + GRACE + 1);
    c.trigger_inheritance(&alice(), estate).unwrap();
    c.claim_inheritance(&alice(), estate, 0).unwrap();
    c.close_estate(&alice(), estate).unwrap();

    clock.advance(c.limits().recovery_eligibility_delay_secs);
    let fee = c.limits().min_recovery_fee;
    assert_eq!(
        c.initiate_recovery(&Principal::new("rescuer"), estate, fee),
        Err(EstateError::EstateClosed)
    );
}

#[test]
fn test_recovery_pending_when_heirs_claim_and_close() {
    let (mut c, clock) = setup();
    let estate = create_estate(&mut c);
    c.update_beneficiaries(
        &owner(),
        estate,
        vec![Beneficiary::new("alice", 100, "daughter", "alice@example.com")],
    )
    .unwrap();
    c.custody_mut().deposit(estate, 500);

    clock.advance(INACTIVITY + GRACE + 1);
    c.trigger_inheritance(&alice(), estate).unwrap();
    clock.advance(c.limits().recovery_eligibility_delay_secs);

    let rescuer = Principal::new("rescuer");
    let fee = c.limits().min_recovery_fee;
    c.initiate_recovery(&rescuer, estate, fee).unwrap();

    // the timelock leaves the heirs time to claim first
    c.claim_inheritance(&alice(), estate, 0).unwrap();
    c.close_estate(&alice(), estate).unwrap();

    clock.advance(c.limits().recovery_timelock_secs);
    let events_before = c.events().len();
    assert_eq!(
        c.execute_recovery(&rescuer, estate),
        Err(EstateError::EstateClosed)
    );

    let closed = c.estate(estate).unwrap();
    assert_eq!(closed.owner, owner());
    assert_eq!(closed.phase(), EstatePhase::Closed);
    assert_eq!(closed.generation, 0);
    assert!(!c.recovery_for(estate).unwrap().executed);
    assert_eq!(c.events().len(), events_before);
}

#[test]
fn test_owner_lock_does_not_freeze_claims() {
    let (mut c, clock) = setup();
    let estate = create_estate(&mut c);
    c.update_beneficiaries(&owner(), estate, heirs()).unwrap();
    c.custody_mut().deposit(estate, 1_000);

    clock.advance(INACTIVITY + GRACE + 1);
    c.trigger_inheritance(&Principal::new("watchdog"), estate)
        .unwrap();
    c.initiate_emergency_lock(&owner(), estate, LockType::UserInitiated, REASON, SEED)
        .unwrap();

    let record = c.claim_inheritance(&alice(), estate, 0).unwrap();
    assert_eq!(record.amount, 600);

    // a fresh lock after the cooldown still leaves claims open
    clock.advance(c.limits().min_unlock_delay_secs);
    c.attempt_emergency_unlock(&owner(), estate, SEED).unwrap();
    clock.advance(c.limits().lock_cooldown_secs);
    c.initiate_emergency_lock(&owner(), estate, LockType::SecurityBreach, REASON, SEED)
        .unwrap();

    let record = c.claim_inheritance(&bob(), estate, 1).unwrap();
    assert_eq!(record.amount, 400);
    assert!(c.estate(estate).unwrap().is_locked);
    c.close_estate(&bob(), estate).unwrap();
}
