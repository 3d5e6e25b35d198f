// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SMS fallback channel.
//!
//! When HTTP sync has been unable to deliver a passage for long enough and
//! the device is offline, the passage is encoded as a V1 frame and handed
//! to the device SMS channel once. The queue entry keeps trying HTTP
//! afterwards; the server's `client_id` uniqueness absorbs whichever copy
//! lands first.

use chowki_core::{Passage, SmsEncodeError, SmsPassageV1};

use crate::config::Config;

/// Hands a frame to the device SMS transport.
pub trait SmsSender: Send + Sync {
    fn send(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// Shells out to a configured command with the destination and frame in the
/// environment. The command is expected to queue the message with the
/// device modem and return promptly; it is not awaited.
pub struct CommandSender {
    command: String,
}

impl CommandSender {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

impl SmsSender for CommandSender {
    fn send(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.args(["-c", &self.command]);
        cmd.env("CHOWKI_SMS_TO", to);
        cmd.env("CHOWKI_SMS_BODY", body);
        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::null());
        cmd.stderr(std::process::Stdio::null());
        cmd.spawn()?;
        Ok(())
    }
}

/// Encode a passage for the SMS wire using this device's provisioned
/// checkpost code and phone suffix.
pub fn encode_frame(config: &Config, passage: &Passage) -> Result<String, SmsEncodeError> {
    SmsPassageV1 {
        checkpost_code: config.checkpost_code.clone(),
        plate_number: passage.plate_number.clone(),
        vehicle_type: passage.vehicle_type,
        recorded_at: passage.recorded_at,
        ranger_phone_suffix: config.phone_suffix.clone(),
    }
    .encode()
}

#[cfg(test)]
#[path = "sms_fallback_tests.rs"]
mod tests;
