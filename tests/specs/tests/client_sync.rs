// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client engine driven against a live chowkihub.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};

use chowki::local_match::LocalMatcher;
use chowki::sms_fallback::SmsSender;
use chowki::store::{build_local_passage, LocalStore};
use chowki::sync::SyncEngine;
use chowki_core::{VehicleType, ViolationKind};
use chowki_specs::{device_config, TestHub};

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
}

impl SmsSender for RecordingSender {
    fn send(&self, to: &str, body: &str) -> anyhow::Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((to.to_owned(), body.to_owned()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn two_devices_detect_speeding_through_the_hub() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;
    let now = Utc::now();

    // Asha's device records the entry twenty minutes ago and syncs it.
    let dir_a = tempfile::tempdir()?;
    let config_a = device_config(
        &hub.base_url,
        dir_a.path(),
        "token-asha",
        "rng-asha",
        "cp-bnp-a",
        "BNP-A",
        "4567",
    );
    let store_a = Arc::new(LocalStore::open(dir_a.path())?);
    let entry = build_local_passage(
        &config_a,
        "BA1PA1234",
        VehicleType::Car,
        now - Duration::minutes(20),
        None,
    );
    store_a.record(entry, now - Duration::minutes(20)).await?;
    let engine_a = SyncEngine::new(config_a, Arc::clone(&store_a), None)?;
    let stats = engine_a.run_cycle(now).await;
    assert_eq!(stats.pushed, 1);

    // Bikram's device pulls the unmatched entry into its cache...
    let dir_b = tempfile::tempdir()?;
    let config_b = device_config(
        &hub.base_url,
        dir_b.path(),
        "token-bikram",
        "rng-bikram",
        "cp-bnp-b",
        "BNP-B",
        "4321",
    );
    let store_b = Arc::new(LocalStore::open(dir_b.path())?);
    let engine_b = SyncEngine::new(config_b.clone(), Arc::clone(&store_b), None)?;
    let stats = engine_b.run_cycle(now).await;
    assert_eq!(stats.pulled_new, 1);

    // ...so recording the exit raises an immediate local alert.
    let exit = build_local_passage(
        &config_b,
        "BA1PA1234",
        VehicleType::Car,
        now - Duration::minutes(5),
        None,
    );
    store_b.record(exit.clone(), now - Duration::minutes(5)).await?;
    let matcher = LocalMatcher::new(config_b.segment(), config_b.checkpost_id.clone());
    let alert = matcher
        .check(&store_b, &exit)
        .await
        .ok_or_else(|| anyhow::anyhow!("expected local alert"))?;
    assert_eq!(alert.kind, ViolationKind::Speeding);

    // The authoritative violation appears once the exit reaches the hub.
    let stats = engine_b.run_cycle(now).await;
    assert_eq!(stats.pushed, 1);
    let violations = hub.get_json("token-admin", "/api/v1/violations").await?;
    assert_eq!(violations.as_array().map(Vec::len), Some(1));
    assert_eq!(violations[0]["kind"], "speeding");
    Ok(())
}

#[tokio::test]
async fn offline_device_falls_back_to_sms_and_later_https_lands_as_twin() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;
    let now = Utc::now();
    let recorded_at = now - Duration::minutes(10);

    // The device cannot reach the hub at all.
    let dir = tempfile::tempdir()?;
    let mut offline_config = device_config(
        "http://127.0.0.1:1",
        dir.path(),
        "token-asha",
        "rng-asha",
        "cp-bnp-a",
        "BNP-A",
        "4567",
    );
    offline_config.http_timeout = 2;
    offline_config.sms_gateway_number = Some("+9779800000099".to_owned());
    let store = Arc::new(LocalStore::open(dir.path())?);
    let passage =
        build_local_passage(&offline_config, "BA1PA1234", VehicleType::Car, recorded_at, None);
    let app_cid = passage.client_id.clone();
    store.record(passage, recorded_at).await?;

    let sender = Arc::new(RecordingSender::default());
    let engine = SyncEngine::new(
        offline_config,
        Arc::clone(&store),
        Some(Arc::clone(&sender) as Arc<dyn SmsSender>),
    )?;
    let stats = engine.run_cycle(now).await;
    assert!(!stats.online);
    assert_eq!(stats.sms_sent, 1);

    // The frame reaches the hub through the gateway webhook.
    let frame = sender
        .sent
        .lock()
        .map(|s| s.first().map(|(_, body)| body.clone()))
        .unwrap_or_default()
        .ok_or_else(|| anyhow::anyhow!("no frame sent"))?;
    hub.deliver_sms(&frame, "+9779841234567").await?;

    // Connectivity returns; the HTTP copy lands under its own client id.
    let online_config = device_config(
        &hub.base_url,
        dir.path(),
        "token-asha",
        "rng-asha",
        "cp-bnp-a",
        "BNP-A",
        "4567",
    );
    let engine = SyncEngine::new(online_config, Arc::clone(&store), None)?;
    let stats = engine.run_cycle(now).await;
    assert_eq!(stats.pushed, 1);
    assert_eq!(store.counts().await.synced, 1);

    // Twin records: one sms-sourced, one app-sourced, distinct client ids.
    // `Z`-suffixed so the raw query string stays URL-safe.
    let cutoff =
        (now - Duration::hours(1)).to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let passages = hub
        .get_json(
            "token-admin",
            &format!("/api/v1/passages/unmatched?cutoff={cutoff}&checkpost_id=cp-bnp-b"),
        )
        .await?;
    let list = passages.as_array().cloned().unwrap_or_default();
    assert_eq!(list.len(), 2);
    let sources: Vec<&str> =
        list.iter().filter_map(|p| p["source"].as_str()).collect();
    assert!(sources.contains(&"sms"));
    assert!(sources.contains(&"app"));
    assert!(list.iter().any(|p| p["client_id"] == app_cid.as_str()));
    Ok(())
}
