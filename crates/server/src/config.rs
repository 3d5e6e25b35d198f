// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// Passage ingestion and violation detection server.
#[derive(Debug, Clone, Parser)]
#[command(name = "chowkihub", version, about)]
pub struct Config {
    /// Host address to bind to.
    #[arg(long, env = "CHOWKIHUB_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP port to listen on.
    #[arg(long, env = "CHOWKIHUB_PORT", default_value_t = 9310)]
    pub port: u16,

    /// Path to the directory file (segments, checkposts, rangers).
    #[arg(long, env = "CHOWKIHUB_DIRECTORY")]
    pub directory: PathBuf,

    /// Shared secret for SMS webhook signature verification.
    /// If unset, the SMS intake route refuses all requests.
    #[arg(long, env = "CHOWKIHUB_SMS_AUTH_SECRET")]
    pub sms_auth_secret: Option<String>,

    /// Public URL of the SMS webhook, as seen by the gateway. Part of the
    /// signed payload.
    #[arg(long, env = "CHOWKIHUB_SMS_WEBHOOK_URL")]
    pub sms_webhook_url: Option<String>,

    /// Overstay scanner interval in seconds.
    #[arg(long, env = "CHOWKIHUB_OVERSTAY_SCAN_INTERVAL", default_value_t = 900)]
    pub overstay_scan_interval: u64,

    /// Max unmatched entries examined per scanner run.
    #[arg(long, env = "CHOWKIHUB_SCAN_BATCH_SIZE", default_value_t = 500)]
    pub scan_batch_size: usize,

    /// How far in the future a `recorded_at` may lie before intake rejects
    /// it, in seconds.
    #[arg(long, env = "CHOWKIHUB_CLOCK_SKEW_TOLERANCE", default_value_t = 120)]
    pub clock_skew_tolerance: u64,

    /// Hard cap on the inbound-pull page size.
    #[arg(long, env = "CHOWKIHUB_PULL_LIMIT", default_value_t = 500)]
    pub pull_limit: usize,

    /// Log format (json or text).
    #[arg(long, env = "CHOWKIHUB_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CHOWKIHUB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sms_auth_secret.is_some() && self.sms_webhook_url.is_none() {
            anyhow::bail!("--sms-webhook-url is required when --sms-auth-secret is set");
        }
        if self.scan_batch_size == 0 {
            anyhow::bail!("--scan-batch-size must be at least 1");
        }
        if self.pull_limit == 0 {
            anyhow::bail!("--pull-limit must be at least 1");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.overstay_scan_interval)
    }

    pub fn clock_skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.clock_skew_tolerance as i64)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
