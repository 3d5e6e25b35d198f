// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of vehicle categories a ranger can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Car,
    Jeep,
    Pickup,
    Van,
    Minibus,
    Bus,
    Truck,
    Tanker,
    Motorcycle,
    Auto,
    Tractor,
    Other,
}

impl VehicleType {
    pub const ALL: [VehicleType; 12] = [
        Self::Car,
        Self::Jeep,
        Self::Pickup,
        Self::Van,
        Self::Minibus,
        Self::Bus,
        Self::Truck,
        Self::Tanker,
        Self::Motorcycle,
        Self::Auto,
        Self::Tractor,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Jeep => "jeep",
            Self::Pickup => "pickup",
            Self::Van => "van",
            Self::Minibus => "minibus",
            Self::Bus => "bus",
            Self::Truck => "truck",
            Self::Tanker => "tanker",
            Self::Motorcycle => "motorcycle",
            Self::Auto => "auto",
            Self::Tractor => "tractor",
            Self::Other => "other",
        }
    }

    /// Three-letter code used on the SMS V1 wire. The mapping is total and
    /// bijective; changing any code requires an SMS version bump.
    pub fn sms_code(&self) -> &'static str {
        match self {
            Self::Car => "CAR",
            Self::Jeep => "JEP",
            Self::Pickup => "MTK",
            Self::Van => "VAN",
            Self::Minibus => "MNB",
            Self::Bus => "BUS",
            Self::Truck => "TRK",
            Self::Tanker => "TNK",
            Self::Motorcycle => "MOT",
            Self::Auto => "AUT",
            Self::Tractor => "TRC",
            Self::Other => "OTH",
        }
    }

    /// Inverse of [`VehicleType::sms_code`].
    pub fn from_sms_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.sms_code() == code)
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown vehicle type: {s}"))
    }
}

#[cfg(test)]
#[path = "vehicle_tests.rs"]
mod tests;
