// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Duration;

use super::{run_once, ScanStats};
use crate::test_support::{banpale_store, passage_at_a, passage_at_b, t0};

#[tokio::test]
async fn raises_alert_once_past_deadline() -> anyhow::Result<()> {
    let store = banpale_store();
    store.insert_passage(passage_at_a("cid-entry", t0())).await?;

    // Deadline is T0 + 270 min; nothing to do before it.
    let stats = run_once(&store, t0() + Duration::minutes(260), 100).await;
    assert_eq!(stats, ScanStats::default());

    let stats = run_once(&store, t0() + Duration::minutes(280), 100).await;
    assert_eq!(stats.created, 1);

    let alerts = store.list_alerts(Some("seg-bnp")).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].expected_exit_by, t0() + Duration::minutes(270));
    assert!(!alerts[0].resolved);
    Ok(())
}

#[tokio::test]
async fn back_to_back_runs_are_idempotent() -> anyhow::Result<()> {
    let store = banpale_store();
    store.insert_passage(passage_at_a("cid-entry", t0())).await?;

    let now = t0() + Duration::minutes(280);
    let first = run_once(&store, now, 100).await;
    let second = run_once(&store, now, 100).await;
    assert_eq!(first.created, 1);
    assert_eq!(second.created, 0);
    assert_eq!(store.list_alerts(None).await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_runs_create_one_alert() -> anyhow::Result<()> {
    let store = banpale_store();
    store.insert_passage(passage_at_a("cid-entry", t0())).await?;

    let now = t0() + Duration::minutes(280);
    let s1 = std::sync::Arc::clone(&store);
    let s2 = std::sync::Arc::clone(&store);
    let (a, b) = tokio::join!(
        tokio::spawn(async move { run_once(&s1, now, 100).await }),
        tokio::spawn(async move { run_once(&s2, now, 100).await }),
    );
    assert_eq!(a?.created + b?.created, 1);
    assert_eq!(store.list_alerts(None).await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn matched_entries_are_ignored() -> anyhow::Result<()> {
    let store = banpale_store();
    store.insert_passage(passage_at_a("cid-a", t0())).await?;
    store.insert_passage(passage_at_b("cid-b", t0() + Duration::minutes(120))).await?;

    let stats = run_once(&store, t0() + Duration::minutes(600), 100).await;
    assert_eq!(stats, ScanStats::default());
    assert!(store.list_alerts(None).await.is_empty());
    Ok(())
}
