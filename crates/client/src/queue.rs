// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound sync-queue entry and its state machine.
//!
//! ```text
//!             +---------+  pick up   +-----------+
//!   create -> | pending | ---------> | in_flight |
//!             +---------+            +-----+-----+
//!                  ^                       |
//!   failure &      |                       | success (created or duplicate)
//!   attempts < max |                       v
//!                  |                  +--------+
//!                  +------------+     | synced |
//!                               |     +--------+
//!              failure &        |
//!              attempts >= max  v
//!                            +--------+
//!                            | failed |  (SMS fallback eligible)
//!                            +--------+
//! ```
//!
//! `failed` is terminal for HTTP: the attempt budget is spent and only the
//! SMS channel remains. An entry that goes over SMS while still `pending`
//! keeps its HTTP attempts; the server's `client_id` uniqueness absorbs
//! whichever transport lands first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    InFlight,
    Synced,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncQueueEntry {
    pub passage_client_id: String,
    pub status: SyncStatus,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub sms_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl SyncQueueEntry {
    pub fn new(passage_client_id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            passage_client_id,
            status: SyncStatus::Pending,
            attempts: 0,
            last_attempt_at: None,
            sms_sent: false,
            created_at,
        }
    }

    /// Transition after a failed push attempt: back to `pending` until the
    /// attempt budget is spent, then `failed`.
    pub fn record_failure(&mut self, now: DateTime<Utc>, max_attempts: u32) {
        self.attempts += 1;
        self.last_attempt_at = Some(now);
        self.status =
            if self.attempts >= max_attempts { SyncStatus::Failed } else { SyncStatus::Pending };
    }

    /// Transition after a successful push (created or duplicate).
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.attempts += 1;
        self.last_attempt_at = Some(now);
        self.status = SyncStatus::Synced;
    }

    /// Transition after a definitive refusal (malformed payload, policy).
    /// Retrying an identical request cannot succeed, so the attempt budget
    /// is not consumed one slot at a time.
    pub fn record_rejection(&mut self, now: DateTime<Utc>) {
        self.attempts += 1;
        self.last_attempt_at = Some(now);
        self.status = SyncStatus::Failed;
    }

    /// Whether this entry may be handed to the SMS channel: still unsynced,
    /// old enough that HTTP has clearly had its chance, and not sent before.
    pub fn sms_eligible(&self, now: DateTime<Utc>, min_age: chrono::Duration) -> bool {
        matches!(self.status, SyncStatus::Pending | SyncStatus::Failed)
            && !self.sms_sent
            && self.created_at < now - min_age
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
