use std::time::Instant;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::SERVICE_NAME;

/// State for the health endpoint
#[derive(Clone)]
pub struct HealthState {
    pub port: u16,
    pub started_at: Instant,
}

impl HealthState {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            started_at: Instant::now(),
        }
    }
}

/// Health payload consumed by the front-side load balancer
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponseDto {
    pub status: String,
    pub service: String,
    pub port: u16,
    pub pid: u32,
    pub uptime_secs: u64,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponseDto)
    )
)]
pub async fn health_check(State(state): State<HealthState>) -> Json<HealthResponseDto> {
    Json(HealthResponseDto {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        port: state.port,
        pid: std::process::id(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::health::routes;
    use axum_test::TestServer;

    #[tokio::test]
    async fn health_reports_identity_and_uptime() {
        let server = TestServer::new(routes::routes(HealthState::new(3000))).unwrap();

        let response = server.get("/api/health").await;
        response.assert_status_ok();

        let body: HealthResponseDto = response.json();
        assert_eq!(body.status, "ok");
        assert_eq!(body.service, "lapor-core");
        assert_eq!(body.port, 3000);
        assert_eq!(body.pid, std::process::id());
    }
}
