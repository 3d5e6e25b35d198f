// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic overstay scanner.
//!
//! Finds unmatched entries past their segment's maximum travel time and
//! raises at most one proactive alert per entry. The read phase and each
//! alert insert are separate short transactions; uniqueness on the entry
//! passage makes repeated or overlapping runs harmless.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::{AlertInsertOutcome, Store};

/// Outcome counters for one scanner pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub examined: usize,
    pub created: usize,
    pub skipped: usize,
}

/// One scanner pass over at most `batch` overdue entries.
pub async fn run_once(store: &Store, now: chrono::DateTime<Utc>, batch: usize) -> ScanStats {
    let overdue = store.scan_overdue_unmatched_entries(now, batch).await;
    let mut stats = ScanStats { examined: overdue.len(), ..ScanStats::default() };
    for entry in &overdue {
        match store.insert_overstay_alert(entry).await {
            AlertInsertOutcome::Created => {
                stats.created += 1;
                info!(
                    passage_id = %entry.passage.id,
                    plate = %entry.passage.plate_number,
                    segment = %entry.passage.segment_id,
                    expected_exit_by = %entry.expected_exit_by,
                    "overstay alert raised"
                );
            }
            AlertInsertOutcome::AlreadyExists | AlertInsertOutcome::Superseded => {
                stats.skipped += 1;
            }
        }
    }
    stats
}

/// Spawn the scanner loop. Runs until `shutdown` is cancelled.
pub fn spawn(
    store: Arc<Store>,
    interval: std::time::Duration,
    batch: usize,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.cancelled() => break,
            }
            let started = std::time::Instant::now();
            let stats = run_once(&store, Utc::now(), batch).await;
            if stats.created > 0 {
                info!(
                    created = stats.created,
                    skipped = stats.skipped,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "overstay scan complete"
                );
            } else {
                debug!(examined = stats.examined, "overstay scan found nothing new");
            }
            if stats.examined == batch {
                // A full batch means there may be more; don't wait a whole
                // interval to drain the backlog.
                warn!(batch, "overstay scan hit batch limit, backlog pending");
            }
        }
    })
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
