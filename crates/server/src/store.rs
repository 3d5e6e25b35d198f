// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable passage log, violation table, and overstay-alert table.
//!
//! All mutation goes through this store; the exclusive write guard on
//! [`Tables`] is the transaction boundary. Passage insert and the matcher
//! run under one guard, so the reciprocal link fields, the violation row,
//! and alert resolution commit atomically — concurrent inserters of the
//! same pair cannot both claim a candidate, which is the claim-write
//! equivalent of row-level skip-locked selection.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use chowki_core::{OverstayAlert, Passage, PassageSource, VehicleType, Violation};

use crate::directory::Directory;
use crate::matcher::{self, MatchResult};

/// Intake payload for a passage, before the server assigns identity.
#[derive(Debug, Clone)]
pub struct NewPassage {
    pub client_id: String,
    pub plate_number: String,
    pub plate_number_raw: Option<String>,
    pub vehicle_type: VehicleType,
    pub checkpost_id: String,
    pub segment_id: String,
    pub recorded_at: DateTime<Utc>,
    pub ranger_id: String,
    pub source: PassageSource,
    pub photo_ref: Option<String>,
}

/// Result of [`Store::insert_passage`]. Duplicate is success-equivalent.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Created {
        passage: Passage,
        violation: Option<Violation>,
        resolved_alerts: usize,
    },
    Duplicate {
        existing_id: Uuid,
    },
}

/// Result of [`Store::insert_overstay_alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertInsertOutcome {
    Created,
    /// An alert for this entry already exists; repeated and concurrent
    /// scanner runs treat this as success.
    AlreadyExists,
    /// The entry was matched between the scan read and this insert; an
    /// alert would be born stale, so none is created.
    Superseded,
}

/// Validation failures at the store boundary. These abort the insert before
/// any table is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    UnknownSegment(String),
    UnknownCheckpost(String),
    CheckpostNotOnSegment { checkpost_id: String, segment_id: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSegment(id) => write!(f, "unknown segment: {id}"),
            Self::UnknownCheckpost(id) => write!(f, "unknown checkpost: {id}"),
            Self::CheckpostNotOnSegment { checkpost_id, segment_id } => {
                write!(f, "checkpost {checkpost_id} is not on segment {segment_id}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// An unmatched entry past its segment's maximum travel time.
#[derive(Debug, Clone)]
pub struct OverdueEntry {
    pub passage: Passage,
    pub expected_exit_by: DateTime<Utc>,
}

#[derive(Default)]
pub(crate) struct Tables {
    pub(crate) passages: HashMap<Uuid, Passage>,
    pub(crate) by_client_id: HashMap<String, Uuid>,
    pub(crate) violations: HashMap<Uuid, Violation>,
    pub(crate) violation_by_entry: HashMap<Uuid, Uuid>,
    pub(crate) alerts: HashMap<Uuid, OverstayAlert>,
    pub(crate) alert_by_entry: HashMap<Uuid, Uuid>,
}

impl Tables {
    /// Record a violation, enforcing at most one per entry passage.
    /// Returns `false` when the entry already has one.
    pub(crate) fn record_violation(&mut self, violation: Violation) -> bool {
        if self.violation_by_entry.contains_key(&violation.entry_passage_id) {
            return false;
        }
        self.violation_by_entry.insert(violation.entry_passage_id, violation.id);
        self.violations.insert(violation.id, violation);
        true
    }

    /// Resolve every unresolved alert for the given plate on the given
    /// segment. Returns how many were resolved.
    pub(crate) fn resolve_overstay_alerts(
        &mut self,
        plate_number: &str,
        segment_id: &str,
        exit_passage_id: Uuid,
        now: DateTime<Utc>,
    ) -> usize {
        let mut resolved = 0;
        for alert in self.alerts.values_mut() {
            if !alert.resolved
                && alert.plate_number == plate_number
                && alert.segment_id == segment_id
            {
                alert.resolved = true;
                alert.resolved_at = Some(now);
                alert.resolved_by_passage_id = Some(exit_passage_id);
                resolved += 1;
            }
        }
        resolved
    }
}

/// The single shared mutable resource of the server.
pub struct Store {
    directory: Arc<Directory>,
    tables: RwLock<Tables>,
}

impl Store {
    pub fn new(directory: Arc<Directory>) -> Self {
        Self { directory, tables: RwLock::new(Tables::default()) }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Intake a passage.
    ///
    /// Enforces `client_id` uniqueness (duplicate submissions short-circuit
    /// and never re-enter the matcher) and runs the matcher synchronously
    /// under the same write guard. Validation failures leave the store
    /// untouched.
    pub async fn insert_passage(&self, new: NewPassage) -> Result<InsertOutcome, StoreError> {
        let mut t = self.tables.write().await;

        if let Some(&existing_id) = t.by_client_id.get(&new.client_id) {
            return Ok(InsertOutcome::Duplicate { existing_id });
        }

        let segment = self
            .directory
            .segment(&new.segment_id)
            .ok_or_else(|| StoreError::UnknownSegment(new.segment_id.clone()))?
            .clone();
        let checkpost = self
            .directory
            .checkpost(&new.checkpost_id)
            .ok_or_else(|| StoreError::UnknownCheckpost(new.checkpost_id.clone()))?;
        if checkpost.segment_id != new.segment_id {
            return Err(StoreError::CheckpostNotOnSegment {
                checkpost_id: new.checkpost_id.clone(),
                segment_id: new.segment_id.clone(),
            });
        }

        let now = Utc::now();
        let passage = Passage {
            id: Uuid::new_v4(),
            client_id: new.client_id,
            plate_number: new.plate_number,
            plate_number_raw: new.plate_number_raw,
            vehicle_type: new.vehicle_type,
            checkpost_id: new.checkpost_id,
            segment_id: new.segment_id,
            recorded_at: new.recorded_at,
            server_received_at: Some(now),
            ranger_id: new.ranger_id,
            source: new.source,
            matched_passage_id: None,
            is_entry: None,
            photo_ref: new.photo_ref,
        };
        let id = passage.id;
        t.by_client_id.insert(passage.client_id.clone(), id);
        t.passages.insert(id, passage.clone());

        let MatchResult { violation, resolved_alerts, .. } =
            matcher::run(&mut t, id, &segment, now);

        // Re-read so the returned copy carries any link fields the matcher set.
        let passage = t.passages.get(&id).cloned().unwrap_or(passage);
        Ok(InsertOutcome::Created { passage, violation, resolved_alerts })
    }

    pub async fn get_passage(&self, id: Uuid) -> Option<Passage> {
        self.tables.read().await.passages.get(&id).cloned()
    }

    /// Table sizes for the health endpoint.
    pub async fn counts(&self) -> (usize, usize, usize) {
        let t = self.tables.read().await;
        (t.passages.len(), t.violations.len(), t.alerts.len())
    }

    pub async fn get_passage_by_client_id(&self, client_id: &str) -> Option<Passage> {
        let t = self.tables.read().await;
        t.by_client_id.get(client_id).and_then(|id| t.passages.get(id)).cloned()
    }

    /// Inbound-pull query: unmatched passages on `segment_id` recorded at a
    /// checkpost other than `my_checkpost_id`, at or after `cutoff`, newest
    /// first, at most `limit`.
    pub async fn list_unmatched_opposite(
        &self,
        segment_id: &str,
        my_checkpost_id: &str,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Vec<Passage> {
        let t = self.tables.read().await;
        let mut out: Vec<Passage> = t
            .passages
            .values()
            .filter(|p| {
                p.segment_id == segment_id
                    && p.checkpost_id != my_checkpost_id
                    && p.matched_passage_id.is_none()
                    && p.recorded_at >= cutoff
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.id.cmp(&a.id)));
        out.truncate(limit);
        out
    }

    pub async fn list_violations(&self, segment_id: Option<&str>) -> Vec<Violation> {
        let t = self.tables.read().await;
        let mut out: Vec<Violation> = t
            .violations
            .values()
            .filter(|v| segment_id.is_none_or(|s| v.segment_id == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        out
    }

    pub async fn list_alerts(&self, segment_id: Option<&str>) -> Vec<OverstayAlert> {
        let t = self.tables.read().await;
        let mut out: Vec<OverstayAlert> = t
            .alerts
            .values()
            .filter(|a| segment_id.is_none_or(|s| a.segment_id == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.entry_time.cmp(&b.entry_time).then(a.id.cmp(&b.id)));
        out
    }

    /// Scanner read phase: unmatched passages past their segment's maximum
    /// travel time with no alert yet, oldest first, at most `batch`.
    pub async fn scan_overdue_unmatched_entries(
        &self,
        now: DateTime<Utc>,
        batch: usize,
    ) -> Vec<OverdueEntry> {
        let t = self.tables.read().await;
        let mut out: Vec<OverdueEntry> = t
            .passages
            .values()
            .filter(|p| p.matched_passage_id.is_none() && !t.alert_by_entry.contains_key(&p.id))
            .filter_map(|p| {
                let segment = self.directory.segment(&p.segment_id)?;
                let deadline = p.recorded_at + minutes(segment.max_travel_time_minutes());
                (deadline < now)
                    .then(|| OverdueEntry { passage: p.clone(), expected_exit_by: deadline })
            })
            .collect();
        out.sort_by(|a, b| {
            a.passage
                .recorded_at
                .cmp(&b.passage.recorded_at)
                .then(a.passage.id.cmp(&b.passage.id))
        });
        out.truncate(batch);
        out
    }

    /// Scanner write phase, one short transaction per entry. Re-checks the
    /// scan predicate under the write guard: the entry may have gained an
    /// alert or a match since the read.
    pub async fn insert_overstay_alert(&self, entry: &OverdueEntry) -> AlertInsertOutcome {
        let mut t = self.tables.write().await;
        let entry_id = entry.passage.id;
        if t.alert_by_entry.contains_key(&entry_id) {
            return AlertInsertOutcome::AlreadyExists;
        }
        match t.passages.get(&entry_id) {
            Some(p) if p.matched_passage_id.is_none() => {}
            _ => return AlertInsertOutcome::Superseded,
        }
        let alert = OverstayAlert {
            id: Uuid::new_v4(),
            entry_passage_id: entry_id,
            segment_id: entry.passage.segment_id.clone(),
            plate_number: entry.passage.plate_number.clone(),
            vehicle_type: entry.passage.vehicle_type,
            entry_time: entry.passage.recorded_at,
            expected_exit_by: entry.expected_exit_by,
            resolved: false,
            resolved_at: None,
            resolved_by_passage_id: None,
        };
        t.alert_by_entry.insert(entry_id, alert.id);
        t.alerts.insert(alert.id, alert);
        AlertInsertOutcome::Created
    }
}

/// Fractional minutes as a chrono duration, millisecond precision.
pub(crate) fn minutes(m: f64) -> Duration {
    Duration::milliseconds((m * 60_000.0) as i64)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
