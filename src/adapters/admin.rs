//! Administrative and infrastructure endpoints: health, readiness, logs,
//! stats, rules, and the hard blocklist.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    adapters::AppState,
    core::types::{BlockedIp, LogView, Rule, TrafficStats},
    ports::StoreError,
};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Store(error) => {
                tracing::error!(%error, "admin query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "Internal server error"})),
                )
                    .into_response()
            }
            ApiError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, Json(json!({"detail": detail}))).into_response()
            }
        }
    }
}

/// Build the CORS layer for the admin endpoints from the comma-separated
/// `CORS_ORIGINS` value.
pub fn cors_layer(origins: &str) -> eyre::Result<CorsLayer> {
    let parsed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| eyre::eyre!("invalid CORS origin '{origin}': {e}"))
        })
        .collect::<eyre::Result<_>>()?;

    Ok(CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "service": "warden"}))
}

pub async fn ready(State(state): State<AppState>) -> Response {
    let db = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "ok",
        Err(error) => {
            tracing::warn!(%error, "readiness: database probe failed");
            "error"
        }
    };
    let redis = match state.soft_blocks.ping().await {
        Ok(()) => "ok",
        Err(error) => {
            tracing::warn!(%error, "readiness: ephemeral store probe failed");
            "error"
        }
    };

    let status = if db == "ok" && redis == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({"db": db, "redis": redis}))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(params): Query<LogQuery>,
) -> Result<Json<Vec<LogView>>, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0).max(0);
    let logs = state.logs.list(limit, offset).await?;
    Ok(Json(logs.into_iter().map(LogView::from).collect()))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<TrafficStats>, ApiError> {
    Ok(Json(state.logs.stats().await?))
}

pub async fn list_rules(State(state): State<AppState>) -> Result<Json<Vec<Rule>>, ApiError> {
    Ok(Json(state.rules.list_all().await?))
}

pub async fn toggle_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Rule>, ApiError> {
    match state.rules.toggle(id).await? {
        Some(rule) => {
            tracing::info!(rule = %rule.name, enabled = rule.enabled, "rule toggled");
            Ok(Json(rule))
        }
        None => Err(ApiError::NotFound("Rule not found".to_string())),
    }
}

pub async fn list_blocked_ips(
    State(state): State<AppState>,
) -> Result<Json<Vec<BlockedIp>>, ApiError> {
    Ok(Json(state.hard_blocks.list().await?))
}

pub async fn unblock_ip(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.hard_blocks.remove(&ip).await? {
        tracing::info!(%ip, "ip unblocked");
        Ok(Json(json!({"message": format!("{ip} has been unblocked")})))
    } else {
        Err(ApiError::NotFound("IP not found in blocklist".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_layer_accepts_origin_list() {
        assert!(cors_layer("http://localhost:3000, http://dash.example").is_ok());
    }

    #[test]
    fn cors_layer_rejects_garbage() {
        assert!(cors_layer("http://ok.example, \u{0}bad").is_err());
    }

    #[test]
    fn log_query_clamps_to_contract() {
        let params = LogQuery {
            limit: Some(10_000),
            offset: Some(-3),
        };
        assert_eq!(params.limit.unwrap_or(50).clamp(1, 200), 200);
        assert_eq!(params.offset.unwrap_or(0).max(0), 0);
    }
}
