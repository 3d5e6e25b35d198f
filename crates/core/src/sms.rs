// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SMS V1 wire codec.
//!
//! A single passage is carried in one pipe-delimited ASCII record:
//!
//! ```text
//! V1|<checkpost_code>|<plate>|<vehicle_code>|<unix_seconds>|<ranger_phone_suffix>
//! ```
//!
//! Exactly six fields; the delimiter may not appear inside a field. The
//! serialized frame must fit in a single 160-byte GSM message using only
//! characters from the GSM-7 basic set. The vehicle-code table lives on
//! [`VehicleType`] and is part of this contract; changing it requires a
//! version bump.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::vehicle::VehicleType;

pub const SMS_VERSION: &str = "V1";
pub const MAX_FRAME_BYTES: usize = 160;
const FIELD_COUNT: usize = 6;

/// Decoded payload of a V1 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsPassageV1 {
    pub checkpost_code: String,
    pub plate_number: String,
    pub vehicle_type: VehicleType,
    pub recorded_at: DateTime<Utc>,
    pub ranger_phone_suffix: String,
}

/// Why a frame failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmsDecodeError {
    /// Wrong field count or empty field.
    Malformed,
    /// First field is not `V1`.
    UnsupportedVersion(String),
    UnknownVehicleCode(String),
    /// Non-integer seconds, out-of-range instant, or a timestamp further in
    /// the future than the allowed clock skew.
    InvalidTimestamp(String),
}

impl fmt::Display for SmsDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed frame"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported version: {v}"),
            Self::UnknownVehicleCode(c) => write!(f, "unknown vehicle code: {c}"),
            Self::InvalidTimestamp(t) => write!(f, "invalid timestamp: {t}"),
        }
    }
}

impl std::error::Error for SmsDecodeError {}

/// Why a passage could not be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmsEncodeError {
    /// A field contains the `|` delimiter.
    DelimiterInField(&'static str),
    /// A field contains a character outside the GSM-7 basic set.
    NotGsm7(&'static str),
    /// The serialized frame exceeds 160 bytes.
    FrameTooLong(usize),
}

impl fmt::Display for SmsEncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DelimiterInField(field) => write!(f, "delimiter in field: {field}"),
            Self::NotGsm7(field) => write!(f, "non GSM-7 character in field: {field}"),
            Self::FrameTooLong(len) => write!(f, "frame too long: {len} bytes"),
        }
    }
}

impl std::error::Error for SmsEncodeError {}

/// Whether `ch` survives a single-segment GSM-7 message unescaped.
///
/// The basic set covers printable ASCII except `[ ] { } \ ^ ~` (escape
/// sequences) and a few symbols we simply refuse rather than escape.
fn is_gsm7_basic(ch: char) -> bool {
    matches!(ch, ' '..='~') && !matches!(ch, '[' | ']' | '{' | '}' | '\\' | '^' | '~' | '`')
}

fn check_field(name: &'static str, value: &str) -> Result<(), SmsEncodeError> {
    if value.contains('|') {
        return Err(SmsEncodeError::DelimiterInField(name));
    }
    if !value.chars().all(is_gsm7_basic) {
        return Err(SmsEncodeError::NotGsm7(name));
    }
    Ok(())
}

impl SmsPassageV1 {
    /// Serialize to the pipe-delimited wire form.
    pub fn encode(&self) -> Result<String, SmsEncodeError> {
        check_field("checkpost_code", &self.checkpost_code)?;
        check_field("plate_number", &self.plate_number)?;
        check_field("ranger_phone_suffix", &self.ranger_phone_suffix)?;

        let frame = format!(
            "{SMS_VERSION}|{}|{}|{}|{}|{}",
            self.checkpost_code,
            self.plate_number,
            self.vehicle_type.sms_code(),
            self.recorded_at.timestamp(),
            self.ranger_phone_suffix,
        );
        if frame.len() > MAX_FRAME_BYTES {
            return Err(SmsEncodeError::FrameTooLong(frame.len()));
        }
        Ok(frame)
    }

    /// Parse a wire frame.
    ///
    /// `now` and `clock_skew_tolerance` bound how far in the future the
    /// embedded timestamp may lie; device clocks drift, but an obviously
    /// future sighting is rejected.
    pub fn decode(
        frame: &str,
        now: DateTime<Utc>,
        clock_skew_tolerance: Duration,
    ) -> Result<Self, SmsDecodeError> {
        let fields: Vec<&str> = frame.trim().split('|').collect();
        if fields.len() != FIELD_COUNT {
            return Err(SmsDecodeError::Malformed);
        }
        if fields[0] != SMS_VERSION {
            return Err(SmsDecodeError::UnsupportedVersion(fields[0].to_owned()));
        }
        if fields.iter().any(|f| f.is_empty()) {
            return Err(SmsDecodeError::Malformed);
        }

        let vehicle_type = VehicleType::from_sms_code(fields[3])
            .ok_or_else(|| SmsDecodeError::UnknownVehicleCode(fields[3].to_owned()))?;

        let seconds: i64 = fields[4]
            .parse()
            .map_err(|_| SmsDecodeError::InvalidTimestamp(fields[4].to_owned()))?;
        let recorded_at = match Utc.timestamp_opt(seconds, 0) {
            chrono::LocalResult::Single(ts) => ts,
            _ => return Err(SmsDecodeError::InvalidTimestamp(fields[4].to_owned())),
        };
        if recorded_at > now + clock_skew_tolerance {
            return Err(SmsDecodeError::InvalidTimestamp(fields[4].to_owned()));
        }

        Ok(Self {
            checkpost_code: fields[1].to_owned(),
            plate_number: fields[2].to_owned(),
            vehicle_type,
            recorded_at,
            ranger_phone_suffix: fields[5].to_owned(),
        })
    }
}

#[cfg(test)]
#[path = "sms_tests.rs"]
mod tests;
