//! Health Check Endpoints
//!
//! - /health - combined status including a store round trip
//! - /health/live - liveness, always UP while the process serves requests

use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Individual health check result
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Time taken for the check in milliseconds
    pub duration_ms: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<HealthCheck>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

#[derive(Clone)]
pub struct HealthState {
    pub pool: SqlitePool,
    pub version: String,
}

async fn check_database(pool: &SqlitePool) -> HealthCheck {
    let start = Instant::now();
    let result = sqlx::query("SELECT 1").execute(pool).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheck {
            name: "sqlite".to_string(),
            status: HealthStatus::Up,
            message: None,
            duration_ms,
        },
        Err(e) => HealthCheck {
            name: "sqlite".to_string(),
            status: HealthStatus::Down,
            message: Some(format!("Query failed: {}", e)),
            duration_ms,
        },
    }
}

/// Combined health check
#[utoipa::path(
    get,
    path = "",
    tag = "health",
    operation_id = "getHealth",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<HealthState>) -> Response {
    let check = check_database(&state.pool).await;
    let status = check.status;

    let response = HealthResponse {
        status,
        timestamp: Utc::now(),
        version: state.version.clone(),
        checks: vec![check],
    };

    let status_code = match status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response)).into_response()
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/live",
    tag = "health",
    operation_id = "getLiveness",
    responses((status = 200, description = "Service is alive", body = SimpleHealthResponse))
)]
pub async fn get_liveness() -> Json<SimpleHealthResponse> {
    Json(SimpleHealthResponse { status: HealthStatus::Up })
}

pub fn health_router(state: HealthState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_health))
        .routes(routes!(get_liveness))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::db;

    #[test]
    fn test_health_status_serialization() {
        assert_eq!(serde_json::to_string(&HealthStatus::Up).unwrap(), "\"UP\"");
        assert_eq!(serde_json::to_string(&HealthStatus::Down).unwrap(), "\"DOWN\"");
    }

    #[tokio::test]
    async fn test_database_check() {
        let pool = db::connect_in_memory().await.unwrap();
        assert_eq!(check_database(&pool).await.status, HealthStatus::Up);

        pool.close().await;
        let check = check_database(&pool).await;
        assert_eq!(check.status, HealthStatus::Down);
        assert!(check.message.is_some());
    }
}
