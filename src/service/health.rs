//! Health check reporting
//!
//! Liveness, readiness and a detailed component report for the matchmaking
//! service.

use crate::model::LoadOutcome;
use crate::service::app::{AppState, EngineStats};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Gauge value exported as `squadmatch_health_status`
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    fn worst(self, other: &HealthStatus) -> HealthStatus {
        if other.as_gauge() < self.as_gauge() {
            other.clone()
        } else {
            self
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional detail when not healthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    #[serde(flatten)]
    pub engine: EngineStats,
    pub uptime_seconds: u64,
    /// Where the serving weights came from
    pub weights: String,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(app_state: Arc<AppState>) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        let service_check = Self::check_service_running(&app_state).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        for check in [
            Self::check_engine(&app_state),
            Self::check_profiles(&app_state),
            Self::check_model(&app_state),
        ] {
            overall_status = overall_status.worst(&check.status);
            checks.push(check);
        }

        let stats = Self::gather_service_stats(&app_state).await;

        let metrics = app_state.metrics();
        metrics.update_health_status(overall_status.as_gauge());
        for check in &checks {
            metrics.update_component_health(&check.name, check.status == HealthStatus::Healthy);
        }

        Ok(HealthCheck {
            status: overall_status,
            service: app_state.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if app_state.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - the service is running and its profile store answers
    pub async fn readiness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if !app_state.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        Ok(Self::check_profiles(&app_state).status)
    }

    async fn check_service_running(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = if app_state.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// The engine is busy while a request or training step holds it
    fn check_engine(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let engine = app_state.engine();
        let (status, message) = match engine.try_lock() {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(_) => (
                HealthStatus::Degraded,
                Some("Engine is busy with another request".to_string()),
            ),
        };

        ComponentCheck {
            name: "engine".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn check_profiles(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = match app_state.repository().profile_count() {
            Ok(0) => (
                HealthStatus::Degraded,
                Some("No player profiles loaded".to_string()),
            ),
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("Profile repository check failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("Profile repository unavailable: {}", e)),
                )
            }
        };

        ComponentCheck {
            name: "profile_repository".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Rejected snapshots leave the service on fresh weights
    fn check_model(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = match app_state.weights_source() {
            LoadOutcome::Loaded(_) | LoadOutcome::Missing => (HealthStatus::Healthy, None),
            LoadOutcome::Rejected(reason) => (
                HealthStatus::Degraded,
                Some(format!("Saved weights rejected: {}", reason)),
            ),
        };

        ComponentCheck {
            name: "model".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn gather_service_stats(app_state: &AppState) -> ServiceStats {
        let engine = app_state.engine();
        let engine_stats = match engine.try_lock() {
            Ok(engine) => EngineStats {
                profiles: engine.profile_count().unwrap_or(0),
                cached_states: engine.cached_states(),
                buffer_size: engine.buffer_len(),
                train_steps: engine.train_steps(),
            },
            Err(_) => {
                debug!("Engine busy, reporting empty stats in health check");
                EngineStats::default()
            }
        };

        let weights = match app_state.weights_source() {
            LoadOutcome::Loaded(path) => format!("loaded from {}", path.display()),
            LoadOutcome::Missing => "fresh".to_string(),
            LoadOutcome::Rejected(_) => "fresh (snapshot rejected)".to_string(),
        };

        ServiceStats {
            engine: engine_stats,
            uptime_seconds: app_state.uptime().as_secs(),
            weights,
        }
    }
}

impl HealthCheck {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    async fn test_state() -> Arc<AppState> {
        let mut config = AppConfig::default();
        config.model.hidden_units = 8;
        config.model.save_on_update = false;
        config.model.seed = Some(5);
        config.model.weights_dir =
            std::env::temp_dir().join(format!("squadmatch-health-{}", uuid::Uuid::new_v4()));
        config.matching.demo_profile_count = 5;
        Arc::new(AppState::new(config).await.unwrap())
    }

    #[test]
    fn test_worst_status() {
        assert_eq!(
            HealthStatus::Healthy.worst(&HealthStatus::Degraded),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::Unhealthy.worst(&HealthStatus::Degraded),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_not_running_is_unhealthy() {
        let state = test_state().await;
        let check = HealthCheck::check(state.clone()).await.unwrap();
        assert_eq!(check.status, HealthStatus::Unhealthy);
        assert_eq!(
            HealthCheck::liveness_check(state).await.unwrap(),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_running_service_is_healthy() {
        let state = test_state().await;
        state.start().await.unwrap();

        let check = HealthCheck::check(state.clone()).await.unwrap();
        assert_eq!(check.status, HealthStatus::Healthy);
        assert_eq!(check.checks.len(), 4);
        assert_eq!(check.stats.engine.profiles, 5);
        assert_eq!(check.stats.weights, "fresh");
        assert_eq!(state.metrics().service().health_status.get(), 2);

        let json = check.to_json().unwrap();
        assert!(json.contains("\"bufferSize\""));

        assert_eq!(
            HealthCheck::readiness_check(state.clone()).await.unwrap(),
            HealthStatus::Healthy
        );
        state.shutdown().await.unwrap();
    }
}
