// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment directory: segments, checkposts, and rangers.
//!
//! Administrative CRUD is handled elsewhere; the server loads the directory
//! from a JSON file at startup and treats it as immutable. Structural
//! invariants (two checkposts per segment at positions 0 and 1, unique wire
//! codes, unique bearer tokens) are enforced at load time so the matcher and
//! gateway can rely on them.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use chowki_core::{Checkpost, Segment};

/// Caller role attached to a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Ranger,
    Admin,
}

/// A field officer (or admin identity) known to the deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranger {
    pub id: String,
    pub name: String,
    /// E.164-ish phone number; SMS senders are resolved by suffix match.
    pub phone: String,
    /// Bearer token for the HTTP API.
    pub token: String,
    /// Assigned checkpost. Required for rangers, absent for admins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpost_id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub role: Role,
}

fn default_active() -> bool {
    true
}

/// On-disk shape of the directory file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryFile {
    pub segments: Vec<Segment>,
    pub checkposts: Vec<Checkpost>,
    pub rangers: Vec<Ranger>,
}

/// Why an SMS sender could not be resolved to a ranger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderResolveError {
    /// No active ranger's phone ends with the given suffix.
    UnknownSender,
    /// More than one active ranger's phone ends with the given suffix.
    AmbiguousSender,
}

/// Immutable lookup tables built from a validated [`DirectoryFile`].
#[derive(Debug)]
pub struct Directory {
    segments: HashMap<String, Segment>,
    checkposts: HashMap<String, Checkpost>,
    checkpost_by_code: HashMap<String, String>,
    rangers: HashMap<String, Ranger>,
    ranger_by_token: HashMap<String, String>,
}

impl Directory {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read directory file {}: {e}", path.display()))?;
        let file: DirectoryFile = serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("invalid directory file {}: {e}", path.display()))?;
        Self::from_file(file)
    }

    pub fn from_file(file: DirectoryFile) -> anyhow::Result<Self> {
        let mut segments = HashMap::new();
        for seg in file.segments {
            if seg.distance_km <= 0.0 {
                anyhow::bail!("segment {}: distance must be positive", seg.id);
            }
            if seg.min_speed_kmh <= 0.0 || seg.max_speed_kmh < seg.min_speed_kmh {
                anyhow::bail!("segment {}: speeds must satisfy 0 < min <= max", seg.id);
            }
            if segments.insert(seg.id.clone(), seg).is_some() {
                anyhow::bail!("duplicate segment id");
            }
        }

        let mut checkposts = HashMap::new();
        let mut checkpost_by_code = HashMap::new();
        let mut positions: HashMap<String, Vec<u8>> = HashMap::new();
        for cp in file.checkposts {
            if !segments.contains_key(&cp.segment_id) {
                anyhow::bail!("checkpost {}: unknown segment {}", cp.id, cp.segment_id);
            }
            if cp.position_index > 1 {
                anyhow::bail!("checkpost {}: position_index must be 0 or 1", cp.id);
            }
            if checkpost_by_code.insert(cp.code.clone(), cp.id.clone()).is_some() {
                anyhow::bail!("duplicate checkpost code {}", cp.code);
            }
            positions.entry(cp.segment_id.clone()).or_default().push(cp.position_index);
            if checkposts.insert(cp.id.clone(), cp).is_some() {
                anyhow::bail!("duplicate checkpost id");
            }
        }
        for (seg_id, mut pos) in positions {
            pos.sort_unstable();
            if pos != [0, 1] {
                anyhow::bail!("segment {seg_id}: must have exactly two checkposts at positions 0 and 1");
            }
        }
        for seg_id in segments.keys() {
            if !checkposts.values().any(|cp| cp.segment_id == *seg_id) {
                anyhow::bail!("segment {seg_id}: has no checkposts");
            }
        }

        let mut rangers = HashMap::new();
        let mut ranger_by_token = HashMap::new();
        for ranger in file.rangers {
            match ranger.role {
                Role::Ranger => {
                    let cp = ranger.checkpost_id.as_deref().ok_or_else(|| {
                        anyhow::anyhow!("ranger {}: checkpost assignment required", ranger.id)
                    })?;
                    if !checkposts.contains_key(cp) {
                        anyhow::bail!("ranger {}: unknown checkpost {cp}", ranger.id);
                    }
                }
                Role::Admin => {}
            }
            if ranger_by_token.insert(ranger.token.clone(), ranger.id.clone()).is_some() {
                anyhow::bail!("duplicate bearer token");
            }
            if rangers.insert(ranger.id.clone(), ranger).is_some() {
                anyhow::bail!("duplicate ranger id");
            }
        }

        Ok(Self { segments, checkposts, checkpost_by_code, rangers, ranger_by_token })
    }

    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments.get(id)
    }

    pub fn checkpost(&self, id: &str) -> Option<&Checkpost> {
        self.checkposts.get(id)
    }

    pub fn checkpost_by_code(&self, code: &str) -> Option<&Checkpost> {
        self.checkpost_by_code.get(code).and_then(|id| self.checkposts.get(id))
    }

    pub fn ranger(&self, id: &str) -> Option<&Ranger> {
        self.rangers.get(id)
    }

    /// Resolve a bearer token to its ranger in constant time per candidate.
    pub fn ranger_by_token(&self, token: &str) -> Option<&Ranger> {
        // Constant-time comparison over the full token set: do not
        // short-circuit on the map lookup alone, since HashMap eq on String
        // is not timing-safe. The set is small (one deployment's staff).
        let mut found: Option<&str> = None;
        for (candidate, id) in &self.ranger_by_token {
            if constant_time_eq(candidate, token) {
                found = Some(id.as_str());
            }
        }
        found.and_then(|id| self.rangers.get(id)).filter(|r| r.active)
    }

    /// Resolve an SMS sender by phone suffix among active rangers.
    pub fn ranger_by_phone_suffix(&self, suffix: &str) -> Result<&Ranger, SenderResolveError> {
        if suffix.is_empty() {
            return Err(SenderResolveError::UnknownSender);
        }
        let mut matches =
            self.rangers.values().filter(|r| r.active && r.phone.ends_with(suffix));
        let first = matches.next().ok_or(SenderResolveError::UnknownSender)?;
        if matches.next().is_some() {
            return Err(SenderResolveError::AmbiguousSender);
        }
        Ok(first)
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }
}

/// Constant-time string comparison to prevent timing side-channel attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;
