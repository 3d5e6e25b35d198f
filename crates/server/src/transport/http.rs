// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for passage intake and segment-scoped reads.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chowki_core::{
    is_canonical_plate, OverstayAlert, Passage, PassageSource, VehicleType, Violation,
    ViolationKind,
};

use crate::error::ApiError;
use crate::policy::Caller;
use crate::store::{InsertOutcome, NewPassage};
use crate::transport::AppState;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub passage_count: usize,
    pub violation_count: usize,
    pub alert_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct PassageRequest {
    pub client_id: String,
    pub plate_number: String,
    #[serde(default)]
    pub plate_number_raw: Option<String>,
    /// Vehicle type name; parsed by hand so an out-of-enum value gets the
    /// standard error envelope instead of a deserializer rejection.
    pub vehicle_type: String,
    pub checkpost_id: String,
    pub segment_id: String,
    pub recorded_at: DateTime<Utc>,
    pub ranger_id: String,
    #[serde(default)]
    pub photo_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PassageResponse {
    /// `created` or `duplicate`; both are success to the caller.
    pub status: String,
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<ViolationKind>,
}

#[derive(Debug, Deserialize)]
pub struct UnmatchedQuery {
    pub cutoff: DateTime<Utc>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Admin-only override; rangers always pull against their assignment.
    #[serde(default)]
    pub checkpost_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SegmentQuery {
    #[serde(default)]
    pub segment_id: Option<String>,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    let (passage_count, violation_count, alert_count) = s.store.counts().await;
    Json(HealthResponse {
        status: "running".to_owned(),
        passage_count,
        violation_count,
        alert_count,
    })
}

/// `POST /api/v1/passages` — authenticated passage intake.
///
/// `201 created` on first sight of a `client_id`, `200 duplicate` on any
/// replay; callers treat both as success.
pub async fn insert_passage(
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<PassageRequest>,
) -> axum::response::Response {
    if req.client_id.trim().is_empty() {
        return ApiError::BadRequest.to_http_response("client_id must not be empty").into_response();
    }
    let Ok(vehicle_type) = req.vehicle_type.parse::<VehicleType>() else {
        return ApiError::BadRequest
            .to_http_response(format!("unknown vehicle_type: {}", req.vehicle_type))
            .into_response();
    };
    if !is_canonical_plate(&req.plate_number) {
        return ApiError::BadRequest
            .to_http_response("plate_number is not in canonical form")
            .into_response();
    }
    if req.recorded_at > Utc::now() + s.config.clock_skew() {
        return ApiError::BadRequest
            .to_http_response("recorded_at lies in the future")
            .into_response();
    }
    if let Err(e) = caller.ensure_can_insert(&req.checkpost_id, &req.ranger_id) {
        return e.to_http_response("passage insert not allowed for caller").into_response();
    }

    let new = NewPassage {
        client_id: req.client_id,
        plate_number: req.plate_number,
        plate_number_raw: req.plate_number_raw,
        vehicle_type,
        checkpost_id: req.checkpost_id,
        segment_id: req.segment_id,
        recorded_at: req.recorded_at,
        ranger_id: req.ranger_id,
        source: PassageSource::App,
        photo_ref: req.photo_ref,
    };
    match s.store.insert_passage(new).await {
        Ok(InsertOutcome::Created { passage, violation, resolved_alerts }) => {
            tracing::info!(
                passage_id = %passage.id,
                plate = %passage.plate_number,
                checkpost = %passage.checkpost_id,
                matched = passage.matched_passage_id.is_some(),
                violation = ?violation.as_ref().map(|v| v.kind),
                resolved_alerts,
                "passage stored"
            );
            let body = PassageResponse {
                status: "created".to_owned(),
                id: passage.id,
                violation: violation.map(|v| v.kind),
            };
            (axum::http::StatusCode::CREATED, Json(body)).into_response()
        }
        Ok(InsertOutcome::Duplicate { existing_id }) => {
            tracing::debug!(passage_id = %existing_id, "duplicate passage submission");
            let body =
                PassageResponse { status: "duplicate".to_owned(), id: existing_id, violation: None };
            Json(body).into_response()
        }
        // Every store-side failure here is a referential validation error.
        Err(e) => ApiError::BadRequest.to_http_response(e.to_string()).into_response(),
    }
}

/// `GET /api/v1/passages/{id}`
pub async fn get_passage(
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    let Some(passage) = s.store.get_passage(id).await else {
        return ApiError::NotFound.to_http_response("no such passage").into_response();
    };
    if let Err(e) = caller.ensure_can_read_segment(&passage.segment_id) {
        return e.to_http_response("passage is outside the caller's segment").into_response();
    }
    Json(passage).into_response()
}

/// `GET /api/v1/passages/unmatched?cutoff=&limit=` — inbound pull.
///
/// Returns unmatched passages on the caller's segment from the opposite
/// checkpost, newest first, capped at the configured pull limit.
pub async fn list_unmatched(
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(q): Query<UnmatchedQuery>,
) -> axum::response::Response {
    let checkpost_id = if caller.is_admin() {
        match q.checkpost_id {
            Some(cp) => cp,
            None => {
                return ApiError::BadRequest
                    .to_http_response("admin pull requires checkpost_id")
                    .into_response()
            }
        }
    } else {
        match caller.checkpost_id.clone() {
            Some(cp) => cp,
            None => {
                return ApiError::Forbidden
                    .to_http_response("caller has no checkpost assignment")
                    .into_response()
            }
        }
    };
    let Some(checkpost) = s.store.directory().checkpost(&checkpost_id) else {
        return ApiError::BadRequest.to_http_response("unknown checkpost").into_response();
    };
    let segment_id = checkpost.segment_id.clone();

    let limit = q.limit.unwrap_or(s.config.pull_limit).min(s.config.pull_limit);
    let passages: Vec<Passage> =
        s.store.list_unmatched_opposite(&segment_id, &checkpost_id, q.cutoff, limit).await;
    Json(passages).into_response()
}

/// `GET /api/v1/violations`
pub async fn list_violations(
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(q): Query<SegmentQuery>,
) -> axum::response::Response {
    match scoped_segment(&caller, q.segment_id) {
        Ok(filter) => {
            let list: Vec<Violation> = s.store.list_violations(filter.as_deref()).await;
            Json(list).into_response()
        }
        Err(e) => e.to_http_response("segment outside the caller's scope").into_response(),
    }
}

/// `GET /api/v1/alerts`
pub async fn list_alerts(
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(q): Query<SegmentQuery>,
) -> axum::response::Response {
    match scoped_segment(&caller, q.segment_id) {
        Ok(filter) => {
            let list: Vec<OverstayAlert> = s.store.list_alerts(filter.as_deref()).await;
            Json(list).into_response()
        }
        Err(e) => e.to_http_response("segment outside the caller's scope").into_response(),
    }
}

/// Resolve the effective segment filter for a read: rangers are pinned to
/// their own segment, admins may filter freely or read everything.
fn scoped_segment(
    caller: &Caller,
    requested: Option<String>,
) -> Result<Option<String>, ApiError> {
    if caller.is_admin() {
        return Ok(requested);
    }
    let own = caller.segment_id.clone().ok_or(ApiError::Forbidden)?;
    match requested {
        Some(seg) if seg != own => Err(ApiError::Forbidden),
        _ => Ok(Some(own)),
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
