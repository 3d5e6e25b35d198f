// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for unit tests and the end-to-end scenario suite.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use chowki_core::{Checkpost, PassageSource, Segment, VehicleType};

use crate::directory::{Directory, DirectoryFile, Ranger, Role};
use crate::store::{NewPassage, Store};

/// `2024-06-15T10:00:00Z` — the reference instant used across scenarios.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).single().unwrap_or_default()
}

/// One 45 km segment (40/10 km/h limits, so 67.5 and 270 minute
/// thresholds) with checkposts `BNP-A` / `BNP-B`, two rangers, one admin.
pub fn banpale_directory_file() -> DirectoryFile {
    DirectoryFile {
        segments: vec![Segment {
            id: "seg-bnp".to_owned(),
            name: "Banpale".to_owned(),
            distance_km: 45.0,
            max_speed_kmh: 40.0,
            min_speed_kmh: 10.0,
        }],
        checkposts: vec![
            Checkpost {
                id: "cp-bnp-a".to_owned(),
                code: "BNP-A".to_owned(),
                segment_id: "seg-bnp".to_owned(),
                position_index: 0,
            },
            Checkpost {
                id: "cp-bnp-b".to_owned(),
                code: "BNP-B".to_owned(),
                segment_id: "seg-bnp".to_owned(),
                position_index: 1,
            },
        ],
        rangers: vec![
            Ranger {
                id: "rng-asha".to_owned(),
                name: "Asha".to_owned(),
                phone: "+9779841234567".to_owned(),
                token: "token-asha".to_owned(),
                checkpost_id: Some("cp-bnp-a".to_owned()),
                active: true,
                role: Role::Ranger,
            },
            Ranger {
                id: "rng-bikram".to_owned(),
                name: "Bikram".to_owned(),
                phone: "+9779847654321".to_owned(),
                token: "token-bikram".to_owned(),
                checkpost_id: Some("cp-bnp-b".to_owned()),
                active: true,
                role: Role::Ranger,
            },
            Ranger {
                id: "adm-hq".to_owned(),
                name: "HQ".to_owned(),
                phone: "+9779800000000".to_owned(),
                token: "token-admin".to_owned(),
                checkpost_id: None,
                active: true,
                role: Role::Admin,
            },
        ],
    }
}

pub fn banpale_directory() -> Arc<Directory> {
    match Directory::from_file(banpale_directory_file()) {
        Ok(dir) => Arc::new(dir),
        Err(e) => unreachable!("fixture directory must validate: {e}"),
    }
}

pub fn banpale_store() -> Arc<Store> {
    Arc::new(Store::new(banpale_directory()))
}

/// Passage intake payload at checkpost A by Asha; override fields as needed.
pub fn passage_at_a(client_id: &str, recorded_at: DateTime<Utc>) -> NewPassage {
    NewPassage {
        client_id: client_id.to_owned(),
        plate_number: "BA1PA1234".to_owned(),
        plate_number_raw: None,
        vehicle_type: VehicleType::Car,
        checkpost_id: "cp-bnp-a".to_owned(),
        segment_id: "seg-bnp".to_owned(),
        recorded_at,
        ranger_id: "rng-asha".to_owned(),
        source: PassageSource::App,
        photo_ref: None,
    }
}

/// Same as [`passage_at_a`] but at checkpost B by Bikram.
pub fn passage_at_b(client_id: &str, recorded_at: DateTime<Utc>) -> NewPassage {
    NewPassage {
        checkpost_id: "cp-bnp-b".to_owned(),
        ranger_id: "rng-bikram".to_owned(),
        ..passage_at_a(client_id, recorded_at)
    }
}
