// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use super::Config;

fn base_args() -> Vec<&'static str> {
    vec![
        "chowki",
        "--auth-token",
        "token-asha",
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
    ]
}

#[test]
fn minimal_config() -> anyhow::Result<()> {
    let config = Config::parse_from(base_args());
    config.validate()?;
    assert_eq!(config.sync_interval, 30);
    assert_eq!(config.sms_fallback_age, 300);
    assert_eq!(config.max_sync_attempts, 5);
    assert_eq!(config.pull_limit, 500);
    Ok(())
}

#[test]
fn segment_geometry() -> anyhow::Result<()> {
    let config = Config::parse_from(base_args());
    let segment = config.segment();
    assert!((segment.min_travel_time_minutes() - 67.5).abs() < 1e-9);
    assert!((segment.max_travel_time_minutes() - 270.0).abs() < 1e-9);
    // Lookback covers max travel plus the default 30-minute buffer.
    assert_eq!(config.pull_lookback(), chrono::Duration::minutes(300));
    Ok(())
}

#[test]
fn sms_settings_must_pair() {
    let mut args = base_args();
    args.extend(["--sms-gateway-number", "+9779800000001"]);
    let config = Config::parse_from(args);
    assert!(config.validate().is_err());
}

#[test]
fn short_phone_suffix_rejected() {
    let mut args = base_args();
    let idx = args
        .iter()
        .position(|a| *a == "4567")
        .unwrap_or(args.len() - 1);
    args[idx] = "42";
    let config = Config::parse_from(args);
    assert!(config.validate().is_err());
}

#[test]
fn inverted_speeds_rejected() {
    let mut args = base_args();
    let idx = args
        .iter()
        .position(|a| *a == "10")
        .unwrap_or(args.len() - 1);
    args[idx] = "80";
    let config = Config::parse_from(args);
    assert!(config.validate().is_err());
}
