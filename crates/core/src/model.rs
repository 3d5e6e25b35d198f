// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity types for the passage-tracking domain.
//!
//! A `Passage` is a single recorded sighting at one checkpost. The server
//! pairs two passages for the same plate from opposite checkposts of a
//! segment; the earlier one becomes the entry, the later the exit, and the
//! travel time between them is classified against the segment's derived
//! thresholds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::vehicle::VehicleType;

/// How a passage reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassageSource {
    App,
    Sms,
}

/// A recorded vehicle sighting at a checkpost.
///
/// Append-only once stored: substantive fields never change. The only
/// mutations ever applied are the match-time link fields
/// (`matched_passage_id`, `is_entry`), set reciprocally on both halves of a
/// pair inside one store transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: Uuid,
    /// Idempotency key, generated once at capture and preserved across
    /// retries and transports. Globally unique: the server keeps at most one
    /// passage per `client_id`.
    pub client_id: String,
    /// Canonical ASCII-uppercase plate, see [`crate::plate`].
    pub plate_number: String,
    /// Original OCR text, kept for audit only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_number_raw: Option<String>,
    pub vehicle_type: VehicleType,
    pub checkpost_id: String,
    pub segment_id: String,
    /// Instant of the camera shutter (device clock, UTC). Authoritative for
    /// speed math.
    pub recorded_at: DateTime<Utc>,
    /// Instant of server intake. `None` while the record is client-local.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_received_at: Option<DateTime<Utc>>,
    pub ranger_id: String,
    pub source: PassageSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_passage_id: Option<Uuid>,
    /// Set at match time: `true` on the earlier passage of the pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_entry: Option<bool>,
    /// Opaque reference to an out-of-band photo upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
}

/// A stretch of road between two checkposts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub name: String,
    pub distance_km: f64,
    pub max_speed_kmh: f64,
    pub min_speed_kmh: f64,
}

/// Rule breach detected from a matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Speeding,
    Overstay,
}

impl Segment {
    /// Fastest legal traversal, in minutes.
    pub fn min_travel_time_minutes(&self) -> f64 {
        self.distance_km / self.max_speed_kmh * 60.0
    }

    /// Slowest expected traversal, in minutes.
    pub fn max_travel_time_minutes(&self) -> f64 {
        self.distance_km / self.min_speed_kmh * 60.0
    }

    /// Classify a traversal against this segment's thresholds.
    ///
    /// Faster than `min_travel_time_minutes` is speeding, slower than
    /// `max_travel_time_minutes` is an overstay, anything between is clean.
    pub fn classify(&self, travel_minutes: f64) -> Option<ViolationKind> {
        if travel_minutes < self.min_travel_time_minutes() {
            Some(ViolationKind::Speeding)
        } else if travel_minutes > self.max_travel_time_minutes() {
            Some(ViolationKind::Overstay)
        } else {
            None
        }
    }

    /// Threshold snapshot to stamp into a violation of the given kind.
    pub fn threshold_minutes(&self, kind: ViolationKind) -> f64 {
        match kind {
            ViolationKind::Speeding => self.min_travel_time_minutes(),
            ViolationKind::Overstay => self.max_travel_time_minutes(),
        }
    }
}

/// One end of a segment. Every segment has exactly two, at position
/// indexes 0 and 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpost {
    pub id: String,
    /// Short wire code used in SMS frames, e.g. `BNP-A`.
    pub code: String,
    pub segment_id: String,
    pub position_index: u8,
}

/// Immutable record of a detected violation.
///
/// `threshold_minutes`, `speed_limit_kmh`, and `distance_km` are snapshots
/// of the segment at detection time; later segment changes never rewrite
/// past violations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub id: Uuid,
    pub entry_passage_id: Uuid,
    pub exit_passage_id: Uuid,
    pub segment_id: String,
    pub kind: ViolationKind,
    pub plate_number: String,
    pub vehicle_type: VehicleType,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub travel_time_minutes: f64,
    pub threshold_minutes: f64,
    pub calculated_speed_kmh: f64,
    pub speed_limit_kmh: f64,
    pub distance_km: f64,
    pub created_at: DateTime<Utc>,
}

/// Proactive alert for an unmatched entry past the segment's maximum travel
/// time. At most one per entry passage; resolved when the exit finally
/// arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverstayAlert {
    pub id: Uuid,
    pub entry_passage_id: Uuid,
    pub segment_id: String,
    pub plate_number: String,
    pub vehicle_type: VehicleType,
    pub entry_time: DateTime<Utc>,
    pub expected_exit_by: DateTime<Utc>,
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by_passage_id: Option<Uuid>,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
