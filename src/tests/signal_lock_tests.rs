//! tests/signal_lock_tests.rs

use std::time::Duration;

use crate::services::signal_lock::SignalLock;

const TTL: Duration = Duration::from_secs(60);

#[test]
fn lock_key_groups_five_second_window() {
    let a = SignalLock::lock_key("transaction_recorded", "Transaction", 7, Some(1), 1_700_000_001);
    let b = SignalLock::lock_key("transaction_recorded", "Transaction", 7, Some(1), 1_700_000_004);
    let c = SignalLock::lock_key("transaction_recorded", "Transaction", 7, Some(1), 1_700_000_005);

    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn lock_key_depends_on_every_part() {
    let base = SignalLock::lock_key("new_goal", "SavingsGoal", 3, Some(9), 100);

    assert_ne!(base, SignalLock::lock_key("new_goal", "SavingsGoal", 3, None, 100));
    assert_ne!(base, SignalLock::lock_key("new_goal", "SavingsGoal", 4, Some(9), 100));
    assert_ne!(base, SignalLock::lock_key("goal_reached", "SavingsGoal", 3, Some(9), 100));

    let hex = base.strip_prefix("signal_lock_").expect("prefijo");
    assert_eq!(hex.len(), 64);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn second_acquire_fails_until_guard_dropped() {
    let lock = SignalLock::new();
    let guard = lock.acquire("k", TTL).expect("primer acquire");
    assert!(lock.acquire("k", TTL).is_none());

    drop(guard);
    assert!(lock.acquire("k", TTL).is_some());
}

#[test]
fn expired_entry_counts_as_absent() {
    let lock = SignalLock::new();
    let _stale = lock.acquire("k", Duration::ZERO).expect("primer acquire");
    assert!(lock.acquire("k", TTL).is_some());
}

#[test]
fn clones_share_the_same_map() {
    let lock = SignalLock::new();
    let other = lock.clone();
    let key = SignalLock::lock_key("transfer_made", "Transfer", 1, Some(1), 0);
    let guard = lock.acquire(&key, TTL).expect("guard");

    assert_eq!(guard.key(), key);
    assert!(other.acquire(&key, TTL).is_none());
    assert!(other.guard("transfer_made", "Transfer", 2, Some(1), TTL).is_some());
}
