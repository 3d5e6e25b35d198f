// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end scenario tests.
//!
//! Spawns a chowkihub instance with the Banpale fixture directory on an
//! ephemeral port and exercises it over real HTTP, optionally driving a
//! chowki client engine against it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use clap::Parser;

use chowkihub::test_support::banpale_store;
use chowkihub::transport::sms::{compute_signature, SIGNATURE_HEADER};
use chowkihub::transport::{build_router, AppState};

/// The reference instant used across scenarios: `2024-06-15T10:00:00Z`.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).single().unwrap_or_default()
}

pub const SMS_SECRET: &str = "spec-secret";
pub const SMS_WEBHOOK_URL: &str = "https://hub.test/api/v1/sms/webhook";

/// A chowkihub serving the Banpale fixture on an ephemeral port. The server
/// task is aborted on drop.
pub struct TestHub {
    pub base_url: String,
    pub state: Arc<AppState>,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestHub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestHub {
    pub async fn spawn() -> anyhow::Result<Self> {
        let config = chowkihub::config::Config::parse_from([
            "chowkihub",
            "--directory",
            "unused.json",
            "--sms-auth-secret",
            SMS_SECRET,
            "--sms-webhook-url",
            SMS_WEBHOOK_URL,
        ]);
        let state = Arc::new(AppState { store: banpale_store(), config });
        let router = build_router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(Self { base_url: format!("http://{addr}"), state, handle })
    }

    /// POST a passage as the given ranger token. Returns (status, body).
    pub async fn push_passage(
        &self,
        token: &str,
        body: &serde_json::Value,
    ) -> anyhow::Result<(u16, serde_json::Value)> {
        let resp = reqwest::Client::new()
            .post(format!("{}/api/v1/passages", self.base_url))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.json().await.unwrap_or(serde_json::Value::Null);
        Ok((status, body))
    }

    /// GET an authenticated JSON endpoint.
    pub async fn get_json(&self, token: &str, path: &str) -> anyhow::Result<serde_json::Value> {
        let resp = reqwest::Client::new()
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;
        anyhow::ensure!(resp.status().is_success(), "GET {path}: {}", resp.status());
        Ok(resp.json().await?)
    }

    /// Deliver an SMS frame through the signed webhook, exactly as the
    /// gateway would.
    pub async fn deliver_sms(&self, body: &str, from: &str) -> anyhow::Result<String> {
        let form = BTreeMap::from([
            ("Body".to_owned(), body.to_owned()),
            ("From".to_owned(), from.to_owned()),
        ]);
        let signature = compute_signature(SMS_SECRET, SMS_WEBHOOK_URL, &form);
        let resp = reqwest::Client::new()
            .post(format!("{}/api/v1/sms/webhook", self.base_url))
            .header(SIGNATURE_HEADER, signature)
            .form(&form)
            .send()
            .await?;
        anyhow::ensure!(resp.status().is_success(), "webhook: {}", resp.status());
        Ok(resp.text().await?)
    }
}

/// Passage payload for the Banpale fixture; override fields per scenario.
pub fn passage_json(
    client_id: &str,
    checkpost_id: &str,
    ranger_id: &str,
    recorded_at: DateTime<Utc>,
) -> serde_json::Value {
    serde_json::json!({
        "client_id": client_id,
        "plate_number": "BA1PA1234",
        "vehicle_type": "car",
        "checkpost_id": checkpost_id,
        "segment_id": "seg-bnp",
        "recorded_at": recorded_at.to_rfc3339(),
        "ranger_id": ranger_id,
    })
}

/// Device config for a chowki client pointed at the hub.
pub fn device_config(
    base_url: &str,
    store_dir: &std::path::Path,
    token: &str,
    ranger_id: &str,
    checkpost_id: &str,
    checkpost_code: &str,
    phone_suffix: &str,
) -> chowki::config::Config {
    let dir = store_dir.to_string_lossy().into_owned();
    chowki::config::Config::parse_from([
        "chowki",
        "--server-url",
        base_url,
        "--auth-token",
        token,
        "--store-dir",
        &dir,
        "--ranger-id",
        ranger_id,
        "--checkpost-id",
        checkpost_id,
        "--checkpost-code",
        checkpost_code,
        "--segment-id",
        "seg-bnp",
        "--segment-distance-km",
        "45",
        "--segment-max-speed-kmh",
        "40",
        "--segment-min-speed-kmh",
        "10",
        "--phone-suffix",
        phone_suffix,
    ])
}
