//! Metrics for the squadmatch matchmaking service
//!
//! Prometheus counters, gauges and histograms covering matchmaking requests,
//! outcome updates and model training.

pub mod collector;

pub use collector::{
    MatchmakingMetrics, MetricsCollector, MetricsTimer, ModelMetrics, ServiceMetrics,
};
