// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pair matching and violation generation.
//!
//! Runs synchronously inside the passage-insert transaction: the caller
//! holds the exclusive write guard on the tables, so claiming a candidate
//! (setting its `matched_passage_id`) is race-free and a candidate can be
//! claimed at most once. The violation table's uniqueness on the entry
//! passage is kept as a backstop on top of that.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use chowki_core::{Segment, Violation};

use crate::store::Tables;

/// What one matcher run did.
#[derive(Debug, Clone, Default)]
pub(crate) struct MatchResult {
    /// Id of the counterpart passage, when a pair was formed.
    pub(crate) matched_with: Option<Uuid>,
    pub(crate) violation: Option<Violation>,
    pub(crate) resolved_alerts: usize,
}

/// Attempt to pair the freshly inserted passage `incoming_id`.
///
/// Candidate: same plate, same segment, opposite checkpost, still
/// unmatched; latest `recorded_at` wins, ties broken by id so repeated
/// runs over the same data pick the same candidate. No candidate means the
/// passage simply stays unmatched.
pub(crate) fn run(
    t: &mut Tables,
    incoming_id: Uuid,
    segment: &Segment,
    now: DateTime<Utc>,
) -> MatchResult {
    let Some(incoming) = t.passages.get(&incoming_id).cloned() else {
        return MatchResult::default();
    };

    let candidate = t
        .passages
        .values()
        .filter(|c| {
            c.plate_number == incoming.plate_number
                && c.segment_id == incoming.segment_id
                && c.checkpost_id != incoming.checkpost_id
                && c.matched_passage_id.is_none()
                && c.id != incoming.id
        })
        .max_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)))
        .cloned();
    let Some(candidate) = candidate else {
        return MatchResult::default();
    };

    // Entry is the earlier sighting; equal timestamps fall back to id
    // order, so the outcome never depends on insertion order.
    let (entry_id, exit_id) = match incoming.recorded_at.cmp(&candidate.recorded_at) {
        Ordering::Less => (incoming.id, candidate.id),
        Ordering::Greater => (candidate.id, incoming.id),
        Ordering::Equal => {
            if incoming.id < candidate.id {
                (incoming.id, candidate.id)
            } else {
                (candidate.id, incoming.id)
            }
        }
    };

    if let Some(entry) = t.passages.get_mut(&entry_id) {
        entry.matched_passage_id = Some(exit_id);
        entry.is_entry = Some(true);
    }
    if let Some(exit) = t.passages.get_mut(&exit_id) {
        exit.matched_passage_id = Some(entry_id);
        exit.is_entry = Some(false);
    }

    let (entry, exit) = if entry_id == incoming.id {
        (&incoming, &candidate)
    } else {
        (&candidate, &incoming)
    };
    let travel_minutes =
        (exit.recorded_at - entry.recorded_at).num_milliseconds() as f64 / 60_000.0;

    let violation = segment.classify(travel_minutes).map(|kind| {
        // Zero-length intervals clamp to one second so the snapshot stays
        // finite.
        let travel_hours = (travel_minutes / 60.0).max(1.0 / 3600.0);
        Violation {
            id: Uuid::new_v4(),
            entry_passage_id: entry_id,
            exit_passage_id: exit_id,
            segment_id: segment.id.clone(),
            kind,
            plate_number: incoming.plate_number.clone(),
            vehicle_type: incoming.vehicle_type,
            entry_time: entry.recorded_at,
            exit_time: exit.recorded_at,
            travel_time_minutes: travel_minutes,
            threshold_minutes: segment.threshold_minutes(kind),
            calculated_speed_kmh: segment.distance_km / travel_hours,
            speed_limit_kmh: segment.max_speed_kmh,
            distance_km: segment.distance_km,
            created_at: now,
        }
    });
    let violation = violation.filter(|v| t.record_violation(v.clone()));

    let resolved_alerts =
        t.resolve_overstay_alerts(&incoming.plate_number, &incoming.segment_id, exit_id, now);

    MatchResult { matched_with: Some(candidate.id), violation, resolved_alerts }
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
