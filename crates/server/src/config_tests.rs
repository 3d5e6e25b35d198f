// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use super::Config;

fn parse(args: &[&str]) -> Config {
    Config::parse_from(args)
}

#[test]
fn minimal_config() -> anyhow::Result<()> {
    let config = parse(&["chowkihub", "--directory", "/etc/chowki/directory.json"]);
    config.validate()?;
    assert_eq!(config.port, 9310);
    assert_eq!(config.overstay_scan_interval, 900);
    assert_eq!(config.pull_limit, 500);
    assert_eq!(config.clock_skew_tolerance, 120);
    Ok(())
}

#[test]
fn sms_secret_requires_webhook_url() {
    let config = parse(&[
        "chowkihub",
        "--directory",
        "/etc/chowki/directory.json",
        "--sms-auth-secret",
        "s3cret",
    ]);
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("--sms-webhook-url"), "unexpected error: {err}");
}

#[test]
fn sms_fully_configured() -> anyhow::Result<()> {
    let config = parse(&[
        "chowkihub",
        "--directory",
        "/etc/chowki/directory.json",
        "--sms-auth-secret",
        "s3cret",
        "--sms-webhook-url",
        "https://hub.example.org/api/v1/sms/webhook",
    ]);
    config.validate()?;
    Ok(())
}

#[test]
fn invalid_log_format() {
    let config = parse(&[
        "chowkihub",
        "--directory",
        "/etc/chowki/directory.json",
        "--log-format",
        "yaml",
    ]);
    assert!(config.validate().is_err());
}

#[test]
fn zero_batch_size_rejected() {
    let config = parse(&[
        "chowkihub",
        "--directory",
        "/etc/chowki/directory.json",
        "--scan-batch-size",
        "0",
    ]);
    assert!(config.validate().is_err());
}
