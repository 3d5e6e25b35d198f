// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::policy::Caller;
use crate::transport::AppState;

/// Routes that do not carry a bearer token: health is public, the SMS
/// webhook authenticates by signature instead.
fn is_exempt(path: &str) -> bool {
    matches!(path, "/api/v1/health" | "/api/v1/sms/webhook")
}

/// Axum middleware resolving the bearer token to a [`Caller`] and attaching
/// it to the request. Unknown or missing tokens are refused.
pub async fn auth_layer(
    State(state): State<Arc<AppState>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if is_exempt(req.uri().path()) {
        return next.run(req).await;
    }

    let token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let Some(token) = token else {
        return ApiError::Unauthorized.to_http_response("missing bearer token").into_response();
    };

    let directory = state.store.directory();
    let Some(ranger) = directory.ranger_by_token(token) else {
        return ApiError::Unauthorized.to_http_response("invalid bearer token").into_response();
    };

    let caller = Caller::from_ranger(ranger, directory);
    req.extensions_mut().insert(caller);
    next.run(req).await
}
