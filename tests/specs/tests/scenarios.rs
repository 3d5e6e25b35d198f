// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios over real HTTP: a 45 km segment (67.5 / 270 minute
//! thresholds) between checkposts `BNP-A` and `BNP-B`, plate `BA1PA1234`.

use chrono::Duration;

use chowki_core::sms_client_id;
use chowki_specs::{passage_json, t0, TestHub};

const ASHA: &str = "token-asha";
const BIKRAM: &str = "token-bikram";
const ADMIN: &str = "token-admin";

#[tokio::test]
async fn happy_path_matches_without_violation() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;

    let (status, entry) = hub
        .push_passage(ASHA, &passage_json("cid-entry", "cp-bnp-a", "rng-asha", t0()))
        .await?;
    assert_eq!(status, 201);

    let (status, exit) = hub
        .push_passage(
            BIKRAM,
            &passage_json("cid-exit", "cp-bnp-b", "rng-bikram", t0() + Duration::minutes(120)),
        )
        .await?;
    assert_eq!(status, 201);

    let entry_full =
        hub.get_json(ADMIN, &format!("/api/v1/passages/{}", entry["id"].as_str().unwrap_or("")))
            .await?;
    let exit_full =
        hub.get_json(ADMIN, &format!("/api/v1/passages/{}", exit["id"].as_str().unwrap_or("")))
            .await?;
    assert_eq!(entry_full["matched_passage_id"], exit["id"]);
    assert_eq!(exit_full["matched_passage_id"], entry["id"]);
    assert_eq!(entry_full["is_entry"], true);
    assert_eq!(exit_full["is_entry"], false);

    let violations = hub.get_json(ADMIN, "/api/v1/violations").await?;
    assert_eq!(violations.as_array().map(Vec::len), Some(0));
    let alerts = hub.get_json(ADMIN, "/api/v1/alerts").await?;
    assert_eq!(alerts.as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn speeding_violation_with_snapshot_values() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;

    hub.push_passage(ASHA, &passage_json("cid-entry", "cp-bnp-a", "rng-asha", t0())).await?;
    let (status, resp) = hub
        .push_passage(
            BIKRAM,
            &passage_json("cid-exit", "cp-bnp-b", "rng-bikram", t0() + Duration::minutes(15)),
        )
        .await?;
    assert_eq!(status, 201);
    assert_eq!(resp["violation"], "speeding");

    let violations = hub.get_json(ADMIN, "/api/v1/violations").await?;
    let v = &violations[0];
    assert_eq!(v["kind"], "speeding");
    assert_eq!(v["travel_time_minutes"], 15.0);
    assert_eq!(v["threshold_minutes"], 67.5);
    assert_eq!(v["calculated_speed_kmh"], 180.0);
    assert_eq!(v["speed_limit_kmh"], 40.0);
    assert_eq!(v["distance_km"], 45.0);
    Ok(())
}

#[tokio::test]
async fn overstay_alert_then_late_exit_resolves() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;

    hub.push_passage(ASHA, &passage_json("cid-entry", "cp-bnp-a", "rng-asha", t0())).await?;

    // Scanner runs at T0 + 280 min with no exit in sight.
    let stats =
        chowkihub::scanner::run_once(&hub.state.store, t0() + Duration::minutes(280), 100).await;
    assert_eq!(stats.created, 1);

    let alerts = hub.get_json(ADMIN, "/api/v1/alerts").await?;
    assert_eq!(alerts[0]["resolved"], false);
    let expected_exit = chrono::DateTime::parse_from_rfc3339(
        alerts[0]["expected_exit_by"].as_str().unwrap_or(""),
    )?;
    assert_eq!(expected_exit.with_timezone(&chrono::Utc), t0() + Duration::minutes(270));

    // A second run right after changes nothing.
    let stats =
        chowkihub::scanner::run_once(&hub.state.store, t0() + Duration::minutes(281), 100).await;
    assert_eq!(stats.created, 0);

    // The exit finally arrives at T0 + 300 min.
    let (_, exit) = hub
        .push_passage(
            BIKRAM,
            &passage_json("cid-exit", "cp-bnp-b", "rng-bikram", t0() + Duration::minutes(300)),
        )
        .await?;

    let violations = hub.get_json(ADMIN, "/api/v1/violations").await?;
    assert_eq!(violations[0]["kind"], "overstay");
    assert_eq!(violations[0]["travel_time_minutes"], 300.0);
    assert_eq!(violations[0]["threshold_minutes"], 270.0);

    let alerts = hub.get_json(ADMIN, "/api/v1/alerts").await?;
    assert_eq!(alerts[0]["resolved"], true);
    assert_eq!(alerts[0]["resolved_by_passage_id"], exit["id"]);
    Ok(())
}

#[tokio::test]
async fn duplicate_submission_keeps_one_passage() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;
    let body = passage_json("cid-x", "cp-bnp-a", "rng-asha", t0());

    let (status, first) = hub.push_passage(ASHA, &body).await?;
    assert_eq!(status, 201);
    assert_eq!(first["status"], "created");

    let (status, second) = hub.push_passage(ASHA, &body).await?;
    assert_eq!(status, 200);
    assert_eq!(second["status"], "duplicate");
    assert_eq!(second["id"], first["id"]);
    Ok(())
}

#[tokio::test]
async fn sms_and_app_records_coexist_under_distinct_client_ids() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;

    // The device was offline; the frame goes over SMS first.
    let frame = format!("V1|BNP-A|BA1PA1234|CAR|{}|4567", t0().timestamp());
    let ack = hub.deliver_sms(&frame, "+9779841234567").await?;
    assert!(ack.contains("received"));

    let sms_cid = sms_client_id(&frame).to_string();
    let sms_passage =
        hub.get_json(ADMIN, "/api/v1/passages/unmatched?cutoff=2024-06-15T00:00:00Z&checkpost_id=cp-bnp-b").await?;
    assert_eq!(sms_passage.as_array().map(Vec::len), Some(1));
    assert_eq!(sms_passage[0]["source"], "sms");
    assert_eq!(sms_passage[0]["client_id"], sms_cid.as_str());

    // Resending the identical frame is absorbed by the derived client id.
    hub.deliver_sms(&frame, "+9779841234567").await?;

    // Back online, the app pushes its own copy under its own client id.
    let app_cid = uuid::Uuid::new_v4().to_string();
    let (status, _) = hub
        .push_passage(ASHA, &passage_json(&app_cid, "cp-bnp-a", "rng-asha", t0()))
        .await?;
    assert_eq!(status, 201);
    assert_ne!(app_cid, sms_cid);

    // Both records exist; reconciliation of twins is an admin concern.
    let all = hub
        .get_json(ADMIN, "/api/v1/passages/unmatched?cutoff=2024-06-15T00:00:00Z&checkpost_id=cp-bnp-b")
        .await?;
    assert_eq!(all.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn concurrent_entry_and_exit_produce_one_violation() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;

    let entry_body = passage_json("cid-a", "cp-bnp-a", "rng-asha", t0());
    let exit_body = passage_json("cid-b", "cp-bnp-b", "rng-bikram", t0() + Duration::minutes(15));
    let entry = hub.push_passage(ASHA, &entry_body);
    let exit = hub.push_passage(BIKRAM, &exit_body);
    let (entry, exit) = tokio::join!(entry, exit);
    let (entry_status, _) = entry?;
    let (exit_status, _) = exit?;
    assert_eq!(entry_status, 201);
    assert_eq!(exit_status, 201);

    let violations = hub.get_json(ADMIN, "/api/v1/violations").await?;
    assert_eq!(violations.as_array().map(Vec::len), Some(1));
    assert_eq!(violations[0]["kind"], "speeding");
    Ok(())
}

#[tokio::test]
async fn sms_entry_matches_app_exit_across_transports() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;

    let frame = format!("V1|BNP-A|BA1PA1234|CAR|{}|4567", t0().timestamp());
    hub.deliver_sms(&frame, "+9779841234567").await?;

    let (status, resp) = hub
        .push_passage(
            BIKRAM,
            &passage_json("cid-exit", "cp-bnp-b", "rng-bikram", t0() + Duration::minutes(15)),
        )
        .await?;
    assert_eq!(status, 201);
    assert_eq!(resp["violation"], "speeding");

    let violations = hub.get_json(ADMIN, "/api/v1/violations").await?;
    assert_eq!(violations.as_array().map(Vec::len), Some(1));
    Ok(())
}
