//! Health Check Handlers
//!
//! - `GET /health` - process is up, with the version
//! - `GET /health/live` - liveness probe
//! - `GET /health/ready` - readiness: shared store, database and gateway
//!
//! The shared store carries every session, presence marker and call, so the
//! gateway is unusable without it. The database only backs contacts and
//! stories; losing it degrades the server but keeps presence and calls up.

use std::future::Future;
use std::time::{Duration, Instant};

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::shared::error::AppError;
use crate::startup::AppState;

static STARTED: Lazy<(Instant, DateTime<Utc>)> = Lazy::new(|| (Instant::now(), Utc::now()));

const SLOW_DATABASE: Duration = Duration::from_millis(100);
const SLOW_STORE: Duration = Duration::from_millis(50);

/// Pin the start time used for uptime (call during startup)
pub fn init_server_start() {
    Lazy::force(&STARTED);
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'static str>,
}

/// Result of probing one dependency.
#[derive(Debug, Serialize)]
pub struct DependencyCheck {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GatewayCheck {
    pub status: HealthStatus,
    pub active_connections: usize,
    pub authenticated_connections: usize,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub redis: DependencyCheck,
    pub database: DependencyCheck,
    pub websocket: GatewayCheck,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: ReadinessChecks,
}

/// GET /health
pub async fn health_check() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "healthy",
        version: Some(env!("CARGO_PKG_VERSION")),
    })
}

/// GET /health/live
pub async fn liveness() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive",
        version: None,
    })
}

/// GET /health/ready. 503 only when the shared store is down.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let redis = probe(state.store.ping(), SLOW_STORE).await;
    let database = probe(
        async {
            sqlx::query("SELECT 1")
                .execute(&state.db)
                .await
                .map(|_| ())
                .map_err(AppError::from)
        },
        SLOW_DATABASE,
    )
    .await;

    let status = overall_status(&redis, &database);
    let code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    let (started, started_at) = *STARTED;
    let response = ReadinessResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: started.elapsed().as_secs(),
        started_at: started_at.to_rfc3339(),
        checks: ReadinessChecks {
            redis,
            database,
            websocket: GatewayCheck {
                status: HealthStatus::Healthy,
                active_connections: state.gateway.connection_count(),
                authenticated_connections: state.gateway.authenticated_count(),
            },
        },
    };

    (code, Json(response))
}

/// Time one round trip; slower than `slow` counts as degraded.
async fn probe<F>(check: F, slow: Duration) -> DependencyCheck
where
    F: Future<Output = Result<(), AppError>>,
{
    let start = Instant::now();
    match check.await {
        Ok(()) => {
            let elapsed = start.elapsed();
            DependencyCheck {
                status: if elapsed < slow {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded
                },
                latency_ms: Some(elapsed.as_millis() as u64),
                message: None,
            }
        }
        Err(e) => DependencyCheck {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(e.to_string()),
        },
    }
}

fn overall_status(redis: &DependencyCheck, database: &DependencyCheck) -> HealthStatus {
    match (redis.status, database.status) {
        (HealthStatus::Unhealthy, _) => HealthStatus::Unhealthy,
        (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
        _ => HealthStatus::Degraded,
    }
}
