// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the chowkihub API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use chowki_core::Passage;

/// Outcome of a successful push. Both variants mean the passage is on the
/// server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Created,
    Duplicate,
}

/// Error taxonomy driving the queue state machine.
#[derive(Debug, Clone)]
pub enum SyncError {
    /// Network failure, timeout, or 5xx — worth retrying.
    Transient(String),
    /// 401/403 — retrying an identical request cannot succeed.
    PolicyRefused(String),
    /// 400 — the payload itself is bad.
    Malformed(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(msg) => write!(f, "transient: {msg}"),
            Self::PolicyRefused(msg) => write!(f, "refused: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}

#[derive(Debug, Serialize)]
struct PassagePayload<'a> {
    client_id: &'a str,
    plate_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    plate_number_raw: Option<&'a str>,
    vehicle_type: &'a str,
    checkpost_id: &'a str,
    segment_id: &'a str,
    recorded_at: DateTime<Utc>,
    ranger_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_ref: Option<&'a str>,
}

pub struct ServerApi {
    client: reqwest::Client,
    base: String,
    token: String,
}

impl ServerApi {
    pub fn new(
        base_url: &str,
        token: &str,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    /// Push one passage. Created and Duplicate are both success.
    pub async fn push_passage(&self, passage: &Passage) -> Result<PushOutcome, SyncError> {
        let payload = PassagePayload {
            client_id: &passage.client_id,
            plate_number: &passage.plate_number,
            plate_number_raw: passage.plate_number_raw.as_deref(),
            vehicle_type: passage.vehicle_type.as_str(),
            checkpost_id: &passage.checkpost_id,
            segment_id: &passage.segment_id,
            recorded_at: passage.recorded_at,
            ranger_id: &passage.ranger_id,
            photo_ref: passage.photo_ref.as_deref(),
        };
        let resp = self
            .client
            .post(format!("{}/api/v1/passages", self.base))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SyncError::Transient(e.to_string()))?;

        match resp.status().as_u16() {
            201 => Ok(PushOutcome::Created),
            // 200 is the duplicate-equivalent success body; 409 is the
            // explicit duplicate form some deployments prefer.
            200 | 409 => Ok(PushOutcome::Duplicate),
            400 => Err(SyncError::Malformed(body_snippet(resp).await)),
            401 | 403 => Err(SyncError::PolicyRefused(body_snippet(resp).await)),
            status => Err(SyncError::Transient(format!("http {status}"))),
        }
    }

    /// Inbound pull: opposite-checkpost unmatched passages since `cutoff`.
    pub async fn pull_unmatched(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Passage>, SyncError> {
        let resp = self
            .client
            .get(format!("{}/api/v1/passages/unmatched", self.base))
            .bearer_auth(&self.token)
            .query(&[("cutoff", cutoff.to_rfc3339()), ("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| SyncError::Transient(e.to_string()))?;

        match resp.status().as_u16() {
            200 => resp
                .json::<Vec<Passage>>()
                .await
                .map_err(|e| SyncError::Transient(e.to_string())),
            401 | 403 => Err(SyncError::PolicyRefused(body_snippet(resp).await)),
            400 => Err(SyncError::Malformed(body_snippet(resp).await)),
            status => Err(SyncError::Transient(format!("http {status}"))),
        }
    }
}

async fn body_snippet(resp: reqwest::Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let mut snippet: String = body.chars().take(200).collect();
    if snippet.is_empty() {
        snippet = "<empty body>".to_owned();
    }
    format!("http {status}: {snippet}")
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
