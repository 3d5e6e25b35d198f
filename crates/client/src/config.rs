// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

use chowki_core::Segment;

/// Ranger-device recording and sync engine.
///
/// A device is provisioned for one ranger at one checkpost: identity,
/// segment geometry, and server credentials all arrive with deployment
/// config, never over the air.
#[derive(Debug, Clone, Parser)]
#[command(name = "chowki", version, about)]
pub struct Config {
    /// Base URL of the chowkihub server.
    #[arg(long, env = "CHOWKI_SERVER_URL", default_value = "http://127.0.0.1:9310")]
    pub server_url: String,

    /// Bearer token identifying this ranger.
    #[arg(long, env = "CHOWKI_AUTH_TOKEN")]
    pub auth_token: String,

    /// Local store directory.
    #[arg(long, env = "CHOWKI_STORE_DIR", default_value = ".chowki")]
    pub store_dir: PathBuf,

    /// This device's ranger id.
    #[arg(long, env = "CHOWKI_RANGER_ID")]
    pub ranger_id: String,

    /// Assigned checkpost id.
    #[arg(long, env = "CHOWKI_CHECKPOST_ID")]
    pub checkpost_id: String,

    /// Assigned checkpost wire code (used in SMS frames).
    #[arg(long, env = "CHOWKI_CHECKPOST_CODE")]
    pub checkpost_code: String,

    /// Segment the checkpost sits on.
    #[arg(long, env = "CHOWKI_SEGMENT_ID")]
    pub segment_id: String,

    /// Segment length in kilometres.
    #[arg(long, env = "CHOWKI_SEGMENT_DISTANCE_KM")]
    pub segment_distance_km: f64,

    /// Segment speed limit in km/h.
    #[arg(long, env = "CHOWKI_SEGMENT_MAX_SPEED_KMH")]
    pub segment_max_speed_kmh: f64,

    /// Segment minimum expected speed in km/h.
    #[arg(long, env = "CHOWKI_SEGMENT_MIN_SPEED_KMH")]
    pub segment_min_speed_kmh: f64,

    /// Last digits of this ranger's phone number, sent in SMS frames so the
    /// server can attribute the passage.
    #[arg(long, env = "CHOWKI_PHONE_SUFFIX")]
    pub phone_suffix: String,

    /// Sync cycle interval in seconds.
    #[arg(long, env = "CHOWKI_SYNC_INTERVAL", default_value_t = 30)]
    pub sync_interval: u64,

    /// Age after which an unsynced passage becomes SMS-eligible, in seconds.
    #[arg(long, env = "CHOWKI_SMS_FALLBACK_AGE", default_value_t = 300)]
    pub sms_fallback_age: u64,

    /// HTTP attempts before a queue entry is marked failed.
    #[arg(long, env = "CHOWKI_MAX_SYNC_ATTEMPTS", default_value_t = 5)]
    pub max_sync_attempts: u32,

    /// Max passages fetched per inbound pull.
    #[arg(long, env = "CHOWKI_PULL_LIMIT", default_value_t = 500)]
    pub pull_limit: usize,

    /// Slack added to the segment's max travel time for the pull cutoff, in
    /// minutes.
    #[arg(long, env = "CHOWKI_PULL_BUFFER_MINUTES", default_value_t = 30)]
    pub pull_buffer_minutes: i64,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "CHOWKI_HTTP_TIMEOUT", default_value_t = 10)]
    pub http_timeout: u64,

    /// Destination number for SMS fallback frames.
    #[arg(long, env = "CHOWKI_SMS_GATEWAY_NUMBER")]
    pub sms_gateway_number: Option<String>,

    /// Shell command that hands a frame to the device SMS channel. Receives
    /// `CHOWKI_SMS_TO` and `CHOWKI_SMS_BODY` in its environment.
    #[arg(long, env = "CHOWKI_SMS_SEND_COMMAND")]
    pub sms_send_command: Option<String>,

    /// Log format (json or text).
    #[arg(long, env = "CHOWKI_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CHOWKI_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.segment_distance_km <= 0.0 {
            anyhow::bail!("--segment-distance-km must be positive");
        }
        if self.segment_min_speed_kmh <= 0.0
            || self.segment_max_speed_kmh < self.segment_min_speed_kmh
        {
            anyhow::bail!("segment speeds must satisfy 0 < min <= max");
        }
        if self.phone_suffix.len() < 4 {
            anyhow::bail!("--phone-suffix must be at least 4 digits");
        }
        if self.sms_gateway_number.is_some() != self.sms_send_command.is_some() {
            anyhow::bail!("--sms-gateway-number and --sms-send-command must be set together");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    /// The provisioned segment geometry.
    pub fn segment(&self) -> Segment {
        Segment {
            id: self.segment_id.clone(),
            name: self.segment_id.clone(),
            distance_km: self.segment_distance_km,
            max_speed_kmh: self.segment_max_speed_kmh,
            min_speed_kmh: self.segment_min_speed_kmh,
        }
    }

    pub fn sync_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sync_interval)
    }

    pub fn sms_fallback_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.sms_fallback_age as i64)
    }

    /// Inbound pull lookback: max travel time plus the configured buffer.
    pub fn pull_lookback(&self) -> chrono::Duration {
        let max_travel = self.segment().max_travel_time_minutes();
        chrono::Duration::milliseconds((max_travel * 60_000.0) as i64)
            + chrono::Duration::minutes(self.pull_buffer_minutes)
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
