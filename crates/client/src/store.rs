// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Offline-first local store.
//!
//! Three files in the store directory:
//! - `passages.jsonl` — append-only log of locally recorded passages
//! - `queue.json` — sync-queue state, rewritten on every transition
//! - `remote_cache.json` — inbound cache of opposite-checkpost passages
//!
//! Queue mutations persist before they are acted on, so a crash mid-push
//! loses at most one in-flight marker — and those revert to `pending` on
//! the next open. Reads are line-tolerant: a torn trailing line in the
//! passage log is skipped, not fatal.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use chowki_core::{canonical_plate, Passage, PassageSource, VehicleType};

use crate::config::Config;
use crate::queue::{SyncQueueEntry, SyncStatus};

/// A server-side passage mirrored into the device cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRemotePassage {
    pub passage: Passage,
    pub cached_at: DateTime<Utc>,
}

/// Queue tallies for the status display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub in_flight: usize,
    pub synced: usize,
    pub failed: usize,
    pub sms_sent: usize,
}

#[derive(Default)]
struct Inner {
    passages: Vec<Passage>,
    by_client_id: HashMap<String, usize>,
    queue: BTreeMap<String, SyncQueueEntry>,
    remote_cache: HashMap<Uuid, CachedRemotePassage>,
}

/// Single-writer local database: only the sync engine and the local matcher
/// touch it.
pub struct LocalStore {
    dir: PathBuf,
    inner: RwLock<Inner>,
}

/// Build a locally recorded passage from this device's provisioned
/// identity. The client id is minted here, once, and survives every retry
/// and transport from now on.
pub fn build_local_passage(
    config: &Config,
    plate_raw: &str,
    vehicle_type: VehicleType,
    recorded_at: DateTime<Utc>,
    photo_ref: Option<String>,
) -> Passage {
    Passage {
        id: Uuid::new_v4(),
        client_id: Uuid::new_v4().to_string(),
        plate_number: canonical_plate(plate_raw),
        plate_number_raw: Some(plate_raw.to_owned()),
        vehicle_type,
        checkpost_id: config.checkpost_id.clone(),
        segment_id: config.segment_id.clone(),
        recorded_at,
        server_received_at: None,
        ranger_id: config.ranger_id.clone(),
        source: PassageSource::App,
        matched_passage_id: None,
        is_entry: None,
        photo_ref,
    }
}

impl LocalStore {
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let mut inner = load_inner(dir)?;

        // Picker invariant: an in-flight entry left by a crash reverts to
        // pending so it can be picked again.
        let mut reverted = false;
        for entry in inner.queue.values_mut() {
            if entry.status == SyncStatus::InFlight {
                entry.status = SyncStatus::Pending;
                reverted = true;
            }
        }
        if reverted {
            persist_queue(dir, &inner.queue)?;
        }

        Ok(Self { dir: dir.to_owned(), inner: RwLock::new(inner) })
    }

    /// Re-read all files, picking up passages recorded by another process
    /// (the `record` subcommand) since the last cycle.
    pub async fn reload(&self) -> anyhow::Result<()> {
        let fresh = load_inner(&self.dir)?;
        *self.inner.write().await = fresh;
        Ok(())
    }

    /// Append a passage and create its queue entry. Recording always
    /// succeeds locally; sync state is the engine's problem.
    pub async fn record(&self, passage: Passage, now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        if inner.by_client_id.contains_key(&passage.client_id) {
            anyhow::bail!("client_id already recorded: {}", passage.client_id);
        }

        append_passage(&self.dir, &passage)?;
        inner
            .queue
            .insert(passage.client_id.clone(), SyncQueueEntry::new(passage.client_id.clone(), now));
        persist_queue(&self.dir, &inner.queue)?;

        let idx = inner.passages.len();
        inner.by_client_id.insert(passage.client_id.clone(), idx);
        inner.passages.push(passage);
        Ok(())
    }

    pub async fn passage_by_client_id(&self, client_id: &str) -> Option<Passage> {
        let inner = self.inner.read().await;
        inner.by_client_id.get(client_id).and_then(|&i| inner.passages.get(i)).cloned()
    }

    /// Pending entries, FIFO by creation time.
    pub async fn pending_fifo(&self) -> Vec<SyncQueueEntry> {
        let inner = self.inner.read().await;
        let mut out: Vec<SyncQueueEntry> =
            inner.queue.values().filter(|e| e.status == SyncStatus::Pending).cloned().collect();
        out.sort_by(|a, b| {
            a.created_at.cmp(&b.created_at).then(a.passage_client_id.cmp(&b.passage_client_id))
        });
        out
    }

    /// Pick up one entry: pending → in_flight. Returns the passage to push,
    /// or `None` if the entry is not currently pickable.
    pub async fn begin_attempt(&self, client_id: &str) -> anyhow::Result<Option<Passage>> {
        let mut inner = self.inner.write().await;
        match inner.queue.get_mut(client_id) {
            Some(entry) if entry.status == SyncStatus::Pending => {
                entry.status = SyncStatus::InFlight;
            }
            _ => return Ok(None),
        }
        persist_queue(&self.dir, &inner.queue)?;
        let passage =
            inner.by_client_id.get(client_id).and_then(|&i| inner.passages.get(i)).cloned();
        Ok(passage)
    }

    /// Resolve an in-flight attempt as success.
    pub async fn finish_success(&self, client_id: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
        self.finish_with(client_id, |e| e.record_success(now)).await
    }

    /// Resolve an in-flight attempt as a transient failure.
    pub async fn finish_failure(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> anyhow::Result<SyncStatus> {
        let mut status = SyncStatus::Pending;
        self.finish_with(client_id, |e| {
            e.record_failure(now, max_attempts);
            status = e.status;
        })
        .await?;
        Ok(status)
    }

    /// Resolve an in-flight attempt as a definitive refusal.
    pub async fn finish_rejection(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.finish_with(client_id, |e| e.record_rejection(now)).await
    }

    async fn finish_with(
        &self,
        client_id: &str,
        f: impl FnOnce(&mut SyncQueueEntry),
    ) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.queue.get_mut(client_id) {
            f(entry);
            persist_queue(&self.dir, &inner.queue)?;
        }
        Ok(())
    }

    /// Passages whose queue entries may go over the SMS channel now.
    pub async fn sms_eligible(
        &self,
        now: DateTime<Utc>,
        min_age: chrono::Duration,
    ) -> Vec<Passage> {
        let inner = self.inner.read().await;
        let mut out: Vec<Passage> = inner
            .queue
            .values()
            .filter(|e| e.sms_eligible(now, min_age))
            .filter_map(|e| {
                inner.by_client_id.get(&e.passage_client_id).and_then(|&i| inner.passages.get(i))
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        out
    }

    pub async fn mark_sms_sent(&self, client_id: &str) -> anyhow::Result<()> {
        self.finish_with(client_id, |e| e.sms_sent = true).await
    }

    /// Merge pulled passages into the inbound cache. Returns how many were
    /// new.
    pub async fn upsert_remote(
        &self,
        passages: Vec<Passage>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<usize> {
        let mut inner = self.inner.write().await;
        let mut fresh = 0;
        for passage in passages {
            let id = passage.id;
            if inner
                .remote_cache
                .insert(id, CachedRemotePassage { passage, cached_at: now })
                .is_none()
            {
                fresh += 1;
            }
        }
        persist_remote_cache(&self.dir, &inner.remote_cache)?;
        Ok(fresh)
    }

    /// Best local counterpart for a just-recorded passage: same plate and
    /// segment, opposite checkpost, not yet matched server-side; latest
    /// sighting wins, ties by id.
    pub async fn cached_opposite_candidate(
        &self,
        plate_number: &str,
        segment_id: &str,
        my_checkpost_id: &str,
    ) -> Option<Passage> {
        let inner = self.inner.read().await;
        inner
            .remote_cache
            .values()
            .map(|c| &c.passage)
            .filter(|p| {
                p.plate_number == plate_number
                    && p.segment_id == segment_id
                    && p.checkpost_id != my_checkpost_id
                    && p.matched_passage_id.is_none()
            })
            .max_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)))
            .cloned()
    }

    pub async fn remote_cache_len(&self) -> usize {
        self.inner.read().await.remote_cache.len()
    }

    pub async fn counts(&self) -> QueueCounts {
        let inner = self.inner.read().await;
        let mut counts = QueueCounts::default();
        for entry in inner.queue.values() {
            match entry.status {
                SyncStatus::Pending => counts.pending += 1,
                SyncStatus::InFlight => counts.in_flight += 1,
                SyncStatus::Synced => counts.synced += 1,
                SyncStatus::Failed => counts.failed += 1,
            }
            if entry.sms_sent {
                counts.sms_sent += 1;
            }
        }
        counts
    }
}

// -- File layer ---------------------------------------------------------------

fn passages_path(dir: &Path) -> PathBuf {
    dir.join("passages.jsonl")
}

fn queue_path(dir: &Path) -> PathBuf {
    dir.join("queue.json")
}

fn remote_cache_path(dir: &Path) -> PathBuf {
    dir.join("remote_cache.json")
}

fn load_inner(dir: &Path) -> anyhow::Result<Inner> {
    let mut inner = Inner::default();

    if let Ok(contents) = std::fs::read_to_string(passages_path(dir)) {
        for passage in contents.lines().filter_map(|l| serde_json::from_str::<Passage>(l).ok()) {
            let idx = inner.passages.len();
            inner.by_client_id.insert(passage.client_id.clone(), idx);
            inner.passages.push(passage);
        }
    }

    if let Ok(contents) = std::fs::read_to_string(queue_path(dir)) {
        inner.queue = serde_json::from_str(&contents)?;
    }
    // Every logged passage has a queue entry; restore any the file lost.
    for passage in &inner.passages {
        inner.queue.entry(passage.client_id.clone()).or_insert_with(|| {
            SyncQueueEntry::new(passage.client_id.clone(), passage.recorded_at)
        });
    }

    if let Ok(contents) = std::fs::read_to_string(remote_cache_path(dir)) {
        let cached: Vec<CachedRemotePassage> = serde_json::from_str(&contents)?;
        for c in cached {
            inner.remote_cache.insert(c.passage.id, c);
        }
    }

    Ok(inner)
}

fn append_passage(dir: &Path, passage: &Passage) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(passage)?;
    line.push('\n');
    let mut file =
        std::fs::OpenOptions::new().create(true).append(true).open(passages_path(dir))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

fn persist_queue(dir: &Path, queue: &BTreeMap<String, SyncQueueEntry>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(queue)?;
    std::fs::write(queue_path(dir), json)?;
    Ok(())
}

fn persist_remote_cache(
    dir: &Path,
    cache: &HashMap<Uuid, CachedRemotePassage>,
) -> anyhow::Result<()> {
    let mut entries: Vec<&CachedRemotePassage> = cache.values().collect();
    entries.sort_by(|a, b| a.passage.id.cmp(&b.passage.id));
    let json = serde_json::to_string(&entries)?;
    std::fs::write(remote_cache_path(dir), json)?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
