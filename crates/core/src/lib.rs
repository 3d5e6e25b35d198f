// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain model shared by the chowki client and the chowkihub server:
//! passages, segments, violations, the SMS V1 wire codec, plate
//! canonicalization, and deterministic client-id derivation.

pub mod ids;
pub mod model;
pub mod plate;
pub mod sms;
pub mod vehicle;

pub use ids::sms_client_id;
pub use model::{
    Checkpost, OverstayAlert, Passage, PassageSource, Segment, Violation, ViolationKind,
};
pub use plate::{canonical_plate, is_canonical_plate};
pub use sms::{SmsDecodeError, SmsEncodeError, SmsPassageV1};
pub use vehicle::VehicleType;
