//! Kernel HTTP endpoints.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::http::server::AppState;
use crate::modules::{StatusReport, Summary};
use crate::observability::KernelStats;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub modules: Summary,
}

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub token: String,
}

/// `degraded` when any module failed to load or initialize.
pub async fn get_health(State(state): State<AppState>) -> Json<HealthStatus> {
    let modules = state.registry.summary();
    Json(HealthStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if modules.errors == 0 { "ok" } else { "degraded" },
        modules,
    })
}

pub async fn get_modules(State(state): State<AppState>) -> Json<BTreeMap<String, StatusReport>> {
    Json(state.registry.all_statuses())
}

pub async fn get_module_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.registry.get(&name) {
        Some(module) => Json(module.status()).into_response(),
        None => not_ready(&name),
    }
}

pub async fn get_module_health(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.registry.get(&name) {
        Some(module) => {
            let health = module.health();
            let code = if health.healthy {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            (code, Json(health)).into_response()
        }
        None => not_ready(&name),
    }
}

pub async fn issue_csrf_token(State(state): State<AppState>) -> Json<CsrfTokenResponse> {
    Json(CsrfTokenResponse {
        token: state.gateway.issue_csrf_token(),
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<KernelStats> {
    Json(state.stats.snapshot())
}

fn not_ready(name: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": format!("module '{name}' is not ready"),
            "status": StatusCode::NOT_FOUND.as_u16(),
        })),
    )
        .into_response()
}
