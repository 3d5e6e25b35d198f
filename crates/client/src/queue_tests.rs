// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{Duration, TimeZone, Utc};

use super::{SyncQueueEntry, SyncStatus};

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).single().unwrap_or_default()
}

#[test]
fn starts_pending() {
    let entry = SyncQueueEntry::new("cid-1".to_owned(), t0());
    assert_eq!(entry.status, SyncStatus::Pending);
    assert_eq!(entry.attempts, 0);
    assert!(!entry.sms_sent);
}

#[test]
fn failure_returns_to_pending_until_budget_spent() {
    let mut entry = SyncQueueEntry::new("cid-1".to_owned(), t0());
    for attempt in 1..5 {
        entry.record_failure(t0() + Duration::seconds(attempt), 5);
        assert_eq!(entry.status, SyncStatus::Pending, "attempt {attempt}");
    }
    entry.record_failure(t0() + Duration::seconds(5), 5);
    assert_eq!(entry.status, SyncStatus::Failed);
    assert_eq!(entry.attempts, 5);
}

#[test]
fn success_is_terminal_synced() {
    let mut entry = SyncQueueEntry::new("cid-1".to_owned(), t0());
    entry.record_failure(t0(), 5);
    entry.record_success(t0() + Duration::seconds(30));
    assert_eq!(entry.status, SyncStatus::Synced);
    assert_eq!(entry.last_attempt_at, Some(t0() + Duration::seconds(30)));
}

#[test]
fn sms_eligibility_requires_age_and_unsent() {
    let age = Duration::minutes(5);
    let mut entry = SyncQueueEntry::new("cid-1".to_owned(), t0());

    // Too fresh.
    assert!(!entry.sms_eligible(t0() + Duration::minutes(4), age));
    // Old enough, pending.
    assert!(entry.sms_eligible(t0() + Duration::minutes(6), age));

    // Failed entries stay eligible.
    for _ in 0..5 {
        entry.record_failure(t0() + Duration::minutes(1), 5);
    }
    assert_eq!(entry.status, SyncStatus::Failed);
    assert!(entry.sms_eligible(t0() + Duration::minutes(6), age));

    // But only once.
    entry.sms_sent = true;
    assert!(!entry.sms_eligible(t0() + Duration::minutes(6), age));
}

#[test]
fn synced_entries_never_sms() {
    let mut entry = SyncQueueEntry::new("cid-1".to_owned(), t0());
    entry.record_success(t0());
    assert!(!entry.sms_eligible(t0() + Duration::hours(1), Duration::minutes(5)));
}
