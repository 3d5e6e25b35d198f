// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Role- and segment-scoped authorization, layered over the store.
//!
//! A ranger sees only the segment their checkpost sits on and may insert
//! only at that checkpost, as themselves. Admins are unrestricted.

use crate::directory::{Directory, Ranger, Role};
use crate::error::ApiError;

/// Authenticated caller identity, derived from the bearer token by the auth
/// middleware and attached to the request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub ranger_id: String,
    pub role: Role,
    /// Assigned checkpost; `None` for admins.
    pub checkpost_id: Option<String>,
    /// Segment of the assigned checkpost; `None` for admins.
    pub segment_id: Option<String>,
}

impl Caller {
    pub fn from_ranger(ranger: &Ranger, directory: &Directory) -> Self {
        let segment_id = ranger
            .checkpost_id
            .as_deref()
            .and_then(|cp| directory.checkpost(cp))
            .map(|cp| cp.segment_id.clone());
        Self {
            ranger_id: ranger.id.clone(),
            role: ranger.role,
            checkpost_id: ranger.checkpost_id.clone(),
            segment_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Reads are scoped to the caller's segment.
    pub fn ensure_can_read_segment(&self, segment_id: &str) -> Result<(), ApiError> {
        if self.is_admin() || self.segment_id.as_deref() == Some(segment_id) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Inserts must be for the caller themselves, at their own checkpost.
    pub fn ensure_can_insert(&self, checkpost_id: &str, ranger_id: &str) -> Result<(), ApiError> {
        if self.is_admin() {
            return Ok(());
        }
        if ranger_id != self.ranger_id {
            return Err(ApiError::Forbidden);
        }
        if self.checkpost_id.as_deref() != Some(checkpost_id) {
            return Err(ApiError::Forbidden);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
