// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound/inbound sync engine.
//!
//! A single cooperative worker: every cycle reloads the store (to pick up
//! passages recorded by the CLI), pushes pending queue entries FIFO, runs
//! the SMS-fallback pass when offline, then pulls opposite-checkpost
//! passages into the inbound cache. Connectivity is inferred from
//! transport outcomes; an offline-to-online transition with work still
//! queued triggers an immediate extra cycle instead of waiting out the
//! interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{PushOutcome, ServerApi, SyncError};
use crate::config::Config;
use crate::sms_fallback::{encode_frame, SmsSender};
use crate::store::LocalStore;

/// Counters for one sync cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleStats {
    pub pushed: usize,
    pub push_failures: usize,
    pub rejected: usize,
    pub sms_sent: usize,
    pub pulled_new: usize,
    pub online: bool,
    pub came_online: bool,
}

pub struct SyncEngine {
    config: Config,
    store: Arc<LocalStore>,
    api: ServerApi,
    sms: Option<Arc<dyn SmsSender>>,
    // Optimistic until the first transport failure says otherwise.
    online: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        config: Config,
        store: Arc<LocalStore>,
        sms: Option<Arc<dyn SmsSender>>,
    ) -> anyhow::Result<Self> {
        let api = ServerApi::new(&config.server_url, &config.auth_token, config.http_timeout())?;
        Ok(Self { config, store, api, sms, online: AtomicBool::new(true) })
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::Relaxed);
        if was != online {
            if online {
                info!("connectivity restored");
            } else {
                info!("connectivity lost, queue will drain later");
            }
        }
    }

    /// Run until shutdown.
    pub async fn run(&self, shutdown: CancellationToken) {
        loop {
            let stats = self.run_cycle(Utc::now()).await;
            debug!(
                pushed = stats.pushed,
                failures = stats.push_failures,
                sms = stats.sms_sent,
                pulled = stats.pulled_new,
                online = stats.online,
                "sync cycle complete"
            );

            // Connectivity-up transition: drain the backlog now.
            if stats.came_online && self.store.counts().await.pending > 0 {
                continue;
            }

            // Jitter keeps a fleet of devices from thundering in lockstep.
            let jitter = std::time::Duration::from_millis(rand::rng().random_range(0..2000u64));
            tokio::select! {
                _ = tokio::time::sleep(self.config.sync_interval() + jitter) => {}
                _ = shutdown.cancelled() => break,
            }
        }
    }

    /// One push + fallback + pull pass.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleStats {
        let was_online = self.is_online();
        let mut stats = CycleStats::default();

        if let Err(e) = self.store.reload().await {
            warn!(err = %e, "local store reload failed, using in-memory state");
        }

        self.push_phase(now, &mut stats).await;
        if !self.is_online() {
            self.sms_phase(now, &mut stats).await;
        }
        self.pull_phase(now, &mut stats).await;

        stats.online = self.is_online();
        stats.came_online = !was_online && stats.online;
        stats
    }

    async fn push_phase(&self, now: DateTime<Utc>, stats: &mut CycleStats) {
        for entry in self.store.pending_fifo().await {
            let cid = entry.passage_client_id.clone();
            let passage = match self.store.begin_attempt(&cid).await {
                Ok(Some(p)) => p,
                Ok(None) => continue,
                Err(e) => {
                    warn!(client_id = %cid, err = %e, "queue pickup failed");
                    continue;
                }
            };
            match self.api.push_passage(&passage).await {
                Ok(outcome) => {
                    self.set_online(true);
                    if let Err(e) = self.store.finish_success(&cid, now).await {
                        warn!(client_id = %cid, err = %e, "queue update failed");
                    }
                    stats.pushed += 1;
                    debug!(
                        client_id = %cid,
                        duplicate = outcome == PushOutcome::Duplicate,
                        "passage synced"
                    );
                }
                Err(SyncError::Transient(msg)) => {
                    self.set_online(false);
                    stats.push_failures += 1;
                    match self.store.finish_failure(&cid, now, self.config.max_sync_attempts).await
                    {
                        Ok(status) => {
                            debug!(client_id = %cid, ?status, %msg, "push failed, will retry")
                        }
                        Err(e) => warn!(client_id = %cid, err = %e, "queue update failed"),
                    }
                    // The link is down; the rest of the queue would only
                    // burn attempts.
                    break;
                }
                Err(e @ (SyncError::PolicyRefused(_) | SyncError::Malformed(_))) => {
                    stats.rejected += 1;
                    warn!(client_id = %cid, err = %e, "server refused passage");
                    if let Err(e) = self.store.finish_rejection(&cid, now).await {
                        warn!(client_id = %cid, err = %e, "queue update failed");
                    }
                }
            }
        }
    }

    async fn sms_phase(&self, now: DateTime<Utc>, stats: &mut CycleStats) {
        let (Some(sender), Some(gateway)) =
            (self.sms.as_deref(), self.config.sms_gateway_number.as_deref())
        else {
            return;
        };
        for passage in self.store.sms_eligible(now, self.config.sms_fallback_age()).await {
            let frame = match encode_frame(&self.config, &passage) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(client_id = %passage.client_id, err = %e, "sms encode failed");
                    continue;
                }
            };
            if let Err(e) = sender.send(gateway, &frame) {
                warn!(client_id = %passage.client_id, err = %e, "sms send failed");
                continue;
            }
            if let Err(e) = self.store.mark_sms_sent(&passage.client_id).await {
                warn!(client_id = %passage.client_id, err = %e, "queue update failed");
            }
            stats.sms_sent += 1;
            info!(client_id = %passage.client_id, "passage handed to sms fallback");
        }
    }

    async fn pull_phase(&self, now: DateTime<Utc>, stats: &mut CycleStats) {
        let cutoff = now - self.config.pull_lookback();
        match self.api.pull_unmatched(cutoff, self.config.pull_limit).await {
            Ok(passages) => {
                self.set_online(true);
                match self.store.upsert_remote(passages, now).await {
                    Ok(fresh) => stats.pulled_new = fresh,
                    Err(e) => warn!(err = %e, "inbound cache update failed"),
                }
            }
            Err(SyncError::Transient(msg)) => {
                self.set_online(false);
                debug!(%msg, "inbound pull skipped");
            }
            Err(e) => {
                // Policy or validation problems here mean bad provisioning,
                // not bad connectivity.
                warn!(err = %e, "inbound pull refused");
            }
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
