//! Metrics collection using Prometheus
//!
//! Counters, gauges and histograms for matchmaking requests, outcome updates
//! and model training, grouped the way the service reports them.

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Matchmaking request metrics
    matchmaking_metrics: MatchmakingMetrics,

    /// Replay, training and persistence metrics
    model_metrics: ModelMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,

    /// Known player profiles
    pub profiles: IntGauge,
}

/// Matchmaking request metrics
#[derive(Clone)]
pub struct MatchmakingMetrics {
    /// Requests by outcome (ranked_teammates, two_teams, invalid, error)
    pub requests_total: IntCounterVec,

    /// End-to-end matchmaking time
    pub request_duration: Histogram,

    /// Confidence of successful responses, in percent
    pub confidence: Histogram,
}

/// Replay, training and persistence metrics
#[derive(Clone)]
pub struct ModelMetrics {
    /// Outcome updates by status
    pub updates_total: IntCounterVec,

    /// Completed training steps
    pub training_steps_total: IntCounter,

    /// Batch loss of each training step
    pub training_loss: Histogram,

    /// Time spent handling an outcome update, training included
    pub update_duration: Histogram,

    /// Experiences currently held by the replay buffer
    pub replay_buffer_size: IntGauge,

    /// Weight snapshot attempts by status
    pub weight_saves_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let matchmaking_metrics = MatchmakingMetrics::new(&registry)?;
        let model_metrics = ModelMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            matchmaking_metrics,
            model_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn matchmaking(&self) -> &MatchmakingMetrics {
        &self.matchmaking_metrics
    }

    pub fn model(&self) -> &ModelMetrics {
        &self.model_metrics
    }

    /// Record a handled matchmaking request
    pub fn record_matchmaking(&self, outcome: &str, confidence: Option<f32>, duration: Duration) {
        self.matchmaking_metrics
            .requests_total
            .with_label_values(&[outcome])
            .inc();

        self.matchmaking_metrics
            .request_duration
            .observe(duration.as_secs_f64());

        if let Some(confidence) = confidence {
            self.matchmaking_metrics
                .confidence
                .observe(f64::from(confidence));
        }
    }

    /// Record a handled outcome update
    pub fn record_update(&self, status: &str, loss: Option<f32>, duration: Duration) {
        self.model_metrics
            .updates_total
            .with_label_values(&[status])
            .inc();

        self.model_metrics
            .update_duration
            .observe(duration.as_secs_f64());

        if let Some(loss) = loss {
            self.model_metrics.training_steps_total.inc();
            self.model_metrics.training_loss.observe(f64::from(loss));
        }
    }

    pub fn record_weight_save(&self, success: bool) {
        let status = if success { "success" } else { "failed" };
        self.model_metrics
            .weight_saves_total
            .with_label_values(&[status])
            .inc();
    }

    /// Refresh the gauges that mirror engine state
    pub fn update_state_gauges(&self, buffer_size: usize, profiles: usize) {
        self.model_metrics
            .replay_buffer_size
            .set(buffer_size as i64);
        self.service_metrics.profiles.set(profiles as i64);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("squadmatch_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "squadmatch_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("squadmatch_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        let profiles = IntGauge::new("squadmatch_profiles", "Known player profiles")?;
        registry.register(Box::new(profiles.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
            profiles,
        })
    }
}

impl MatchmakingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new(
                "squadmatch_matchmaking_requests_total",
                "Matchmaking requests by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "squadmatch_matchmaking_duration_seconds",
                "Matchmaking request time",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let confidence = Histogram::with_opts(
            HistogramOpts::new(
                "squadmatch_matchmaking_confidence",
                "Confidence of matchmaking responses in percent",
            )
            .buckets(vec![10.0, 25.0, 40.0, 50.0, 60.0, 75.0, 90.0, 99.0]),
        )?;
        registry.register(Box::new(confidence.clone()))?;

        Ok(Self {
            requests_total,
            request_duration,
            confidence,
        })
    }
}

impl ModelMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let updates_total = IntCounterVec::new(
            Opts::new("squadmatch_updates_total", "Outcome updates by status"),
            &["status"],
        )?;
        registry.register(Box::new(updates_total.clone()))?;

        let training_steps_total = IntCounter::new(
            "squadmatch_training_steps_total",
            "Completed training steps",
        )?;
        registry.register(Box::new(training_steps_total.clone()))?;

        let training_loss = Histogram::with_opts(
            HistogramOpts::new("squadmatch_training_loss", "Batch loss per training step")
                .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(training_loss.clone()))?;

        let update_duration = Histogram::with_opts(
            HistogramOpts::new(
                "squadmatch_update_duration_seconds",
                "Outcome update time including training",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(update_duration.clone()))?;

        let replay_buffer_size = IntGauge::new(
            "squadmatch_replay_buffer_size",
            "Experiences held by the replay buffer",
        )?;
        registry.register(Box::new(replay_buffer_size.clone()))?;

        let weight_saves_total = IntCounterVec::new(
            Opts::new("squadmatch_weight_saves_total", "Weight snapshots by status"),
            &["status"],
        )?;
        registry.register(Box::new(weight_saves_total.clone()))?;

        Ok(Self {
            updates_total,
            training_steps_total,
            training_loss,
            update_duration,
            replay_buffer_size,
            weight_saves_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _service = collector.service();
        let _matchmaking = collector.matchmaking();
        let _model = collector.model();
    }

    #[test]
    fn test_matchmaking_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_matchmaking("two_teams", Some(72.5), Duration::from_millis(3));
        collector.record_matchmaking("invalid", None, Duration::from_millis(1));

        let counter = &collector.matchmaking().requests_total;
        assert_eq!(counter.with_label_values(&["two_teams"]).get(), 1);
        assert_eq!(counter.with_label_values(&["invalid"]).get(), 1);
        assert_eq!(collector.matchmaking().confidence.get_sample_count(), 1);
    }

    #[test]
    fn test_update_recording_counts_training() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_update("success", None, Duration::from_millis(2));
        collector.record_update("success", Some(0.3), Duration::from_millis(20));
        collector.record_weight_save(true);
        collector.update_state_gauges(64, 51);

        let model = collector.model();
        assert_eq!(model.updates_total.with_label_values(&["success"]).get(), 2);
        assert_eq!(model.training_steps_total.get(), 1);
        assert_eq!(model.replay_buffer_size.get(), 64);
        assert_eq!(collector.service().profiles.get(), 51);
    }

    #[test]
    fn test_render_text_format() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        collector.update_health_status(2);
        collector.update_component_health("engine", true);

        let text = collector.render().unwrap();
        assert!(text.contains("squadmatch_health_status 2"));
        assert!(text.contains("squadmatch_component_health{component=\"engine\"} 1"));
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
    }
}
