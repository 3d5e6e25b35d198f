// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport: router assembly, bearer auth, intake and read handlers,
//! and the SMS webhook.

pub mod auth;
pub mod http;
pub mod sms;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::store::Store;

/// Shared application state passed to all handlers.
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Config,
}

/// Assemble the `/api/v1` router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::health))
        .route("/api/v1/passages", post(http::insert_passage))
        .route("/api/v1/passages/unmatched", get(http::list_unmatched))
        .route("/api/v1/passages/{id}", get(http::get_passage))
        .route("/api/v1/violations", get(http::list_violations))
        .route("/api/v1/alerts", get(http::list_alerts))
        .route("/api/v1/sms/webhook", post(sms::webhook))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), auth::auth_layer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
