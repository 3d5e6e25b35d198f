// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for unit tests.

use std::path::Path;

use clap::Parser;

use crate::config::Config;

/// Device config for ranger Asha at checkpost `BNP-A` on the 45 km
/// Banpale segment.
pub fn device_config(store_dir: &Path) -> Config {
    let dir = store_dir.to_string_lossy().into_owned();
    Config::parse_from([
        "chowki",
        "--server-url",
        "http://127.0.0.1:9310",
        "--auth-token",
        "token-asha",
        "--store-dir",
        &dir,
        "--ranger-id",
        "rng-asha",
        "--checkpost-id",
        "cp-bnp-a",
        "--checkpost-code",
        "BNP-A",
        "--segment-id",
        "seg-bnp",
        "--segment-distance-km",
        "45",
        "--segment-max-speed-kmh",
        "40",
        "--segment-min-speed-kmh",
        "10",
        "--phone-suffix",
        "4567",
        "--sms-gateway-number",
        "+9779800000099",
        "--sms-send-command",
        "true",
    ])
}
