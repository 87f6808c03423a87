//! Main application state and service coordination
//!
//! `AppState` is built once at startup and shared with every request handler.
//! It owns the matchmaking engine behind a mutex, so requests that touch the
//! encoder, the replay buffer or the networks run one at a time.

use crate::config::AppConfig;
use crate::error::MatchmakingError;
use crate::matching::MatchEngine;
use crate::metrics::MetricsCollector;
use crate::model::{write_snapshot, LoadOutcome, WeightSnapshot};
use crate::profile::{seed_demo_profiles, InMemoryProfileRepository, ProfileRepository};
use crate::types::{MatchmakingOutcome, MatchmakingRequest, OutcomeUpdate, UpdateSummary};
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Engine counters reported by health checks and the shutdown log
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub profiles: usize,
    pub cached_states: usize,
    pub buffer_size: usize,
    pub train_steps: u64,
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Encoder, replay buffer, networks and RNG
    engine: Arc<Mutex<MatchEngine>>,

    /// Shared profile store
    repository: Arc<dyn ProfileRepository>,

    /// Metrics for every request path
    metrics: Arc<MetricsCollector>,

    /// Where the initial weights came from
    weights_source: LoadOutcome,

    /// Background task handles
    background_tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    started_at: Instant,
}

impl AppState {
    /// Initialize the application with an in-memory profile store
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        Self::with_repository(config, Arc::new(InMemoryProfileRepository::new())).await
    }

    /// Initialize the application around an existing profile store
    pub async fn with_repository(
        config: AppConfig,
        repository: Arc<dyn ProfileRepository>,
    ) -> Result<Self, ServiceError> {
        info!("Initializing {} matchmaking service", config.service.name);

        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        Self::seed_profiles(&config, repository.as_ref())?;

        let mut engine = MatchEngine::new(
            repository.clone(),
            config.model.clone(),
            config.matching.clone(),
        );
        let weights_source = engine.load_weights();

        let profiles = repository.profile_count().unwrap_or(0);
        metrics.update_state_gauges(engine.buffer_len(), profiles);

        info!(
            "Matchmaking engine ready - profiles: {}, weights: {:?}",
            profiles, weights_source
        );

        Ok(Self {
            config,
            engine: Arc::new(Mutex::new(engine)),
            repository,
            metrics,
            weights_source,
            background_tasks: Mutex::new(Vec::new()),
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    fn seed_profiles(
        config: &AppConfig,
        repository: &dyn ProfileRepository,
    ) -> Result<(), ServiceError> {
        let count = config.matching.demo_profile_count;
        if count == 0 {
            debug!("Demo profile seeding disabled");
            return Ok(());
        }

        let mut rng = match config.model.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_os_rng(),
        };

        seed_demo_profiles(repository, count, &mut rng).map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to seed demo profiles: {}", e),
            }
        })?;
        Ok(())
    }

    /// Mark the service as running and start background maintenance
    pub async fn start(&self) -> Result<(), ServiceError> {
        info!("Starting {} matchmaking service", self.config.service.name);

        *self.is_running.write().await = true;
        self.start_background_tasks().await;

        info!("✅ Matchmaking service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of matchmaking service");

        *self.is_running.write().await = false;

        let handles: Vec<JoinHandle<()>> = self.background_tasks.lock().await.drain(..).collect();
        for handle in handles {
            handle.abort();
        }

        let stats = self.engine_stats().await.map_err(|e| ServiceError::BackgroundTask {
            message: format!("Failed to get final stats: {}", e),
        })?;
        info!("Final engine statistics: {:?}", stats);

        info!("✅ Matchmaking service shutdown completed");
        Ok(())
    }

    async fn start_background_tasks(&self) {
        let metrics = self.metrics.clone();
        let engine = self.engine.clone();
        let repository = self.repository.clone();
        let is_running = self.is_running.clone();
        let started_at = self.started_at;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            info!("Metrics refresh task started");

            while *is_running.read().await {
                interval.tick().await;

                metrics
                    .service()
                    .uptime_seconds
                    .set(started_at.elapsed().as_secs() as i64);

                let buffer_size = engine.lock().await.buffer_len();
                match repository.profile_count() {
                    Ok(profiles) => {
                        metrics.update_state_gauges(buffer_size, profiles);
                        metrics.update_component_health("profile_repository", true);
                    }
                    Err(e) => {
                        warn!("Failed to count profiles for metrics update: {}", e);
                        metrics.update_component_health("profile_repository", false);
                    }
                }
                metrics.update_component_health("engine", true);
            }

            info!("Metrics refresh task stopped");
        });

        self.background_tasks.lock().await.push(task);
    }

    /// Handle a matchmaking request and record its metrics
    pub async fn matchmake(&self, request: &MatchmakingRequest) -> Result<MatchmakingOutcome> {
        let timer = self.metrics.start_timer();

        let result = {
            let mut engine = self.engine.lock().await;
            engine.matchmake(request)
        };
        let duration = timer.stop();

        match &result {
            Ok(outcome) => {
                info!(
                    "Matchmaking for '{}' ({}) returned {} with confidence {:.1} in {:.2}ms",
                    request.player_id,
                    request.sport,
                    outcome.kind(),
                    outcome.confidence(),
                    duration.as_secs_f64() * 1000.0
                );
                self.metrics
                    .record_matchmaking(outcome.kind(), Some(outcome.confidence()), duration);
            }
            Err(e) => {
                let label = if is_invalid_request(e) {
                    warn!("Rejected matchmaking request for '{}': {}", request.player_id, e);
                    "invalid"
                } else {
                    error!("Matchmaking for '{}' failed: {:#}", request.player_id, e);
                    "error"
                };
                self.metrics.record_matchmaking(label, None, duration);
            }
        }

        result
    }

    /// Apply a match outcome and record training metrics
    pub async fn record_outcome(&self, update: &OutcomeUpdate) -> Result<UpdateSummary> {
        let timer = self.metrics.start_timer();

        let (result, buffer_size, snapshot) = {
            let mut engine = self.engine.lock().await;
            let result = engine.apply_outcome(update);
            let snapshot = (result.is_ok() && self.config.model.save_on_update)
                .then(|| engine.weight_snapshot());
            (result, engine.buffer_len(), snapshot)
        };

        let result = match (result, snapshot) {
            (Ok(mut summary), Some(snapshot)) => {
                summary.weights_saved = self.persist_snapshot(snapshot).await;
                Ok(summary)
            }
            (result, _) => result,
        };
        let duration = timer.stop();

        match &result {
            Ok(summary) => {
                info!(
                    "Outcome for '{}' in match '{}' recorded - trained: {}, buffer: {}, time: {:.2}ms",
                    update.player_id,
                    update.match_id,
                    summary.trained,
                    summary.buffer_size,
                    duration.as_secs_f64() * 1000.0
                );
                self.metrics.record_update("success", summary.loss, duration);
                if self.config.model.save_on_update {
                    self.metrics.record_weight_save(summary.weights_saved);
                }
            }
            Err(e) => {
                let status = if is_invalid_request(e) { "invalid" } else { "error" };
                error!("Outcome update for '{}' failed: {:#}", update.player_id, e);
                self.metrics.record_update(status, None, duration);
            }
        }

        let profiles = self.repository.profile_count().unwrap_or(0);
        self.metrics.update_state_gauges(buffer_size, profiles);

        result
    }

    /// Write a snapshot on the blocking pool, off the engine lock
    async fn persist_snapshot(&self, snapshot: WeightSnapshot) -> bool {
        let dir = self.config.model.weights_dir.clone();
        match tokio::task::spawn_blocking(move || write_snapshot(&snapshot, &dir)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!("Failed to save model weights: {:#}", e);
                false
            }
            Err(e) => {
                warn!("Weight snapshot task failed: {}", e);
                false
            }
        }
    }

    /// Current engine counters
    pub async fn engine_stats(&self) -> Result<EngineStats> {
        let engine = self.engine.lock().await;
        Ok(EngineStats {
            profiles: engine.profile_count()?,
            cached_states: engine.cached_states(),
            buffer_size: engine.buffer_len(),
            train_steps: engine.train_steps(),
        })
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn engine(&self) -> Arc<Mutex<MatchEngine>> {
        self.engine.clone()
    }

    pub fn repository(&self) -> Arc<dyn ProfileRepository> {
        self.repository.clone()
    }

    pub fn weights_source(&self) -> &LoadOutcome {
        &self.weights_source
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// True when the error is a rejected request rather than a service failure
pub fn is_invalid_request(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<MatchmakingError>(),
        Some(MatchmakingError::InvalidRequest { .. })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use tokio_test::assert_ok;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.model = ModelConfig {
            hidden_units: 16,
            batch_size: 2,
            replay_capacity: 16,
            save_on_update: false,
            seed: Some(11),
            weights_dir: std::env::temp_dir().join(format!(
                "squadmatch-app-{}",
                uuid::Uuid::new_v4().simple()
            )),
            ..ModelConfig::default()
        };
        config.matching.demo_profile_count = 20;
        config
    }

    fn create_request(player_id: &str, skill: u8) -> MatchmakingRequest {
        MatchmakingRequest {
            player_id: player_id.to_string(),
            skill_level: skill,
            sport: "Tennis".to_string(),
            location: "Delhi".to_string(),
            availability: "Flexible".to_string(),
        }
    }

    #[test]
    fn test_app_state_seeds_profiles() {
        let state = assert_ok!(tokio_test::block_on(AppState::new(test_config())));
        let stats = assert_ok!(tokio_test::block_on(state.engine_stats()));
        assert_eq!(stats.profiles, 20);
        assert_eq!(stats.buffer_size, 0);
        assert_eq!(state.weights_source(), &LoadOutcome::Missing);
        assert!(!tokio_test::block_on(state.is_running()));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let state = AppState::new(test_config()).await.unwrap();
        state.start().await.unwrap();
        assert!(state.is_running().await);

        state.shutdown().await.unwrap();
        assert!(!state.is_running().await);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = test_config();
        config.model.batch_size = 0;
        assert!(matches!(
            AppState::new(config).await,
            Err(ServiceError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_matchmake_records_metrics() {
        let state = AppState::new(test_config()).await.unwrap();

        let outcome = state.matchmake(&create_request("me", 3)).await.unwrap();
        assert!((0.0..=99.0).contains(&outcome.confidence()));

        let err = state.matchmake(&create_request("me", 0)).await.unwrap_err();
        assert!(is_invalid_request(&err));

        let metrics = state.metrics();
        let counter = &metrics.matchmaking().requests_total;
        assert_eq!(counter.with_label_values(&["invalid"]).get(), 1);
        assert_eq!(counter.with_label_values(&[outcome.kind()]).get(), 1);
    }

    #[tokio::test]
    async fn test_record_outcome_trains_after_batch() {
        let state = AppState::new(test_config()).await.unwrap();
        state.matchmake(&create_request("me", 3)).await.unwrap();

        let update = OutcomeUpdate {
            player_id: "me".to_string(),
            match_id: "m1".to_string(),
            reward: 1.0,
            sport: "Tennis".to_string(),
            teammates: vec!["player_1".to_string()],
            opponents: vec![],
        };

        let first = state.record_outcome(&update).await.unwrap();
        assert!(!first.trained);
        let second = state.record_outcome(&update).await.unwrap();
        assert!(second.trained);

        let stats = state.engine_stats().await.unwrap();
        assert_eq!(stats.buffer_size, 2);
        assert_eq!(stats.train_steps, 1);
        assert_eq!(state.metrics().model().training_steps_total.get(), 1);
    }

    #[tokio::test]
    async fn test_outcome_snapshot_written_after_engine_released() {
        let mut config = test_config();
        config.model.save_on_update = true;
        let dir = config.model.weights_dir.clone();
        let state = AppState::new(config).await.unwrap();

        let update = OutcomeUpdate {
            player_id: "me".to_string(),
            match_id: "m1".to_string(),
            reward: 1.0,
            sport: "Tennis".to_string(),
            teammates: vec![],
            opponents: vec![],
        };
        let summary = state.record_outcome(&update).await.unwrap();
        assert!(summary.weights_saved);
        assert!(dir.join(crate::model::persistence::LATEST_SNAPSHOT).exists());
        assert!(state.engine().try_lock().is_ok());

        let saved = crate::model::persistence::read_snapshot(
            &dir.join(crate::model::persistence::LATEST_SNAPSHOT),
        )
        .unwrap()
        .into_network()
        .unwrap();
        assert_eq!(&saved, state.engine().lock().await.dqn().main_network());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
