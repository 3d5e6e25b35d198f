// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SMS webhook intake.
//!
//! The gateway POSTs a form-encoded `{Body, From}` payload signed with
//! HMAC-SHA1 over the public webhook URL concatenated with the form fields
//! in sorted key order. Once the signature passes, the response is always a
//! 200-class acknowledgement with a short static body; decode and
//! resolution failures are logged but never surfaced to the SMS side.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use ring::hmac;

use chowki_core::{canonical_plate, sms_client_id, PassageSource, SmsPassageV1};

use crate::directory::SenderResolveError;
use crate::store::{InsertOutcome, NewPassage};
use crate::transport::AppState;

/// Header carrying the base64 HMAC-SHA1 signature.
pub const SIGNATURE_HEADER: &str = "x-chowki-signature";

const ACK_OK: &str = "chowki: passage received";
const ACK_FAILED: &str = "chowki: message not processed";

/// Canonical signing payload: the public URL followed by every form field,
/// key then value, in sorted key order.
pub fn signed_payload(url: &str, form: &BTreeMap<String, String>) -> String {
    let mut payload = String::from(url);
    for (key, value) in form {
        payload.push_str(key);
        payload.push_str(value);
    }
    payload
}

/// Compute the signature the gateway is expected to send.
pub fn compute_signature(secret: &str, url: &str, form: &BTreeMap<String, String>) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret.as_bytes());
    let tag = hmac::sign(&key, signed_payload(url, form).as_bytes());
    BASE64.encode(tag.as_ref())
}

fn verify_signature(
    secret: &str,
    url: &str,
    form: &BTreeMap<String, String>,
    supplied: &str,
) -> bool {
    let Ok(tag) = BASE64.decode(supplied) else {
        return false;
    };
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret.as_bytes());
    hmac::verify(&key, signed_payload(url, form).as_bytes(), &tag).is_ok()
}

/// `POST /api/v1/sms/webhook`
pub async fn webhook(
    State(s): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<BTreeMap<String, String>>,
) -> axum::response::Response {
    let (Some(secret), Some(url)) =
        (s.config.sms_auth_secret.as_deref(), s.config.sms_webhook_url.as_deref())
    else {
        return (StatusCode::FORBIDDEN, "sms intake not configured").into_response();
    };

    let supplied = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let Some(supplied) = supplied else {
        tracing::warn!("sms webhook refused: missing signature");
        return (StatusCode::FORBIDDEN, "missing signature").into_response();
    };
    if !verify_signature(secret, url, &form, supplied) {
        tracing::warn!("sms webhook refused: bad signature");
        return (StatusCode::FORBIDDEN, "invalid signature").into_response();
    }

    // Signature verified. From here on the gateway always gets an ack; a
    // retry of an unprocessable message would fail the same way.
    let body = form.get("Body").map(String::as_str).unwrap_or_default();
    let from = form.get("From").map(String::as_str).unwrap_or_default();

    let frame = match SmsPassageV1::decode(body, Utc::now(), s.config.clock_skew()) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(from = %from, err = %e, "sms frame rejected");
            return failure_ack();
        }
    };

    let directory = s.store.directory();
    let Some(checkpost) = directory.checkpost_by_code(&frame.checkpost_code) else {
        tracing::warn!(code = %frame.checkpost_code, "sms frame names unknown checkpost");
        return failure_ack();
    };
    let ranger = match directory.ranger_by_phone_suffix(&frame.ranger_phone_suffix) {
        Ok(r) => r,
        Err(SenderResolveError::UnknownSender) => {
            tracing::warn!(suffix = %frame.ranger_phone_suffix, "sms sender unknown");
            return failure_ack();
        }
        Err(SenderResolveError::AmbiguousSender) => {
            tracing::warn!(suffix = %frame.ranger_phone_suffix, "sms sender ambiguous");
            return failure_ack();
        }
    };

    let new = NewPassage {
        // Deterministic: the same SMS delivered twice maps to one passage.
        client_id: sms_client_id(body).to_string(),
        plate_number: canonical_plate(&frame.plate_number),
        plate_number_raw: Some(frame.plate_number.clone()),
        vehicle_type: frame.vehicle_type,
        checkpost_id: checkpost.id.clone(),
        segment_id: checkpost.segment_id.clone(),
        recorded_at: frame.recorded_at,
        ranger_id: ranger.id.clone(),
        source: PassageSource::Sms,
        photo_ref: None,
    };
    match s.store.insert_passage(new).await {
        Ok(InsertOutcome::Created { passage, violation, .. }) => {
            tracing::info!(
                passage_id = %passage.id,
                plate = %passage.plate_number,
                violation = ?violation.as_ref().map(|v| v.kind),
                "sms passage stored"
            );
        }
        Ok(InsertOutcome::Duplicate { existing_id }) => {
            tracing::debug!(passage_id = %existing_id, "sms passage replay absorbed");
        }
        Err(e) => {
            tracing::error!(err = %e, "sms passage insert failed");
            return failure_ack();
        }
    }
    (StatusCode::OK, ACK_OK).into_response()
}

fn failure_ack() -> axum::response::Response {
    (StatusCode::OK, ACK_FAILED).into_response()
}

#[cfg(test)]
#[path = "sms_tests.rs"]
mod tests;
