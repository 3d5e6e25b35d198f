// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic client-id derivation for SMS intake.
//!
//! An app-recorded passage carries a random v4 client id generated at
//! capture. An SMS frame has no room for one, so the server derives it from
//! the message body itself: the same frame processed twice (gateway retry,
//! duplicated webhook delivery) yields the same client id and therefore a
//! single stored passage.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Derive the client id for an SMS submission from the trimmed message body.
///
/// Version-5-style UUID over the SHA-256 digest of the body: the first 16
/// digest bytes with RFC 4122 version/variant bits applied.
pub fn sms_client_id(body: &str) -> Uuid {
    let digest = Sha256::digest(body.trim().as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    uuid::Builder::from_bytes(bytes)
        .with_variant(uuid::Variant::RFC4122)
        .with_version(uuid::Version::Sha1)
        .into_uuid()
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
