// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort local pair detection.
//!
//! Runs on every local record against the inbound cache of
//! opposite-checkpost passages. A hit produces an immediate on-device
//! alert; the authoritative violation is still minted by the server when
//! the passage is intaken, and both surface as the same UI event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use chowki_core::{Passage, Segment, ViolationKind};

use crate::store::LocalStore;

/// On-device alert for the UI layer. Never leaves the device.
#[derive(Debug, Clone, Serialize)]
pub struct LocalAlert {
    pub kind: ViolationKind,
    pub plate_number: String,
    pub travel_time_minutes: f64,
    pub threshold_minutes: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
}

pub struct LocalMatcher {
    segment: Segment,
    my_checkpost_id: String,
    alert_tx: broadcast::Sender<LocalAlert>,
}

impl LocalMatcher {
    pub fn new(segment: Segment, my_checkpost_id: String) -> Self {
        let (alert_tx, _) = broadcast::channel(32);
        Self { segment, my_checkpost_id, alert_tx }
    }

    /// Subscribe the UI to locally detected violations.
    pub fn subscribe(&self) -> broadcast::Receiver<LocalAlert> {
        self.alert_tx.subscribe()
    }

    /// Check a just-recorded passage against the cache. Emits and returns
    /// an alert when the pair classifies as a violation.
    pub async fn check(&self, store: &LocalStore, local: &Passage) -> Option<LocalAlert> {
        let candidate = store
            .cached_opposite_candidate(
                &local.plate_number,
                &local.segment_id,
                &self.my_checkpost_id,
            )
            .await?;

        // Same role assignment as the server: earlier is entry, ties by id.
        let (entry_time, exit_time) = if (local.recorded_at, local.id)
            < (candidate.recorded_at, candidate.id)
        {
            (local.recorded_at, candidate.recorded_at)
        } else {
            (candidate.recorded_at, local.recorded_at)
        };
        let travel_minutes = (exit_time - entry_time).num_milliseconds() as f64 / 60_000.0;
        let kind = self.segment.classify(travel_minutes)?;

        let alert = LocalAlert {
            kind,
            plate_number: local.plate_number.clone(),
            travel_time_minutes: travel_minutes,
            threshold_minutes: self.segment.threshold_minutes(kind),
            entry_time,
            exit_time,
        };
        let _ = self.alert_tx.send(alert.clone());
        Some(alert)
    }
}

#[cfg(test)]
#[path = "local_match_tests.rs"]
mod tests;
