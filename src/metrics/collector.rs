//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the player watch service
//! using Prometheus metrics.

use crate::types::PollOutcome;
use anyhow::Result;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the player watch service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Poll cycle metrics
    poll_metrics: PollMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Number of servers being watched
    pub servers_configured: IntGauge,
}

/// Per-server poll cycle metrics
#[derive(Clone)]
pub struct PollMetrics {
    /// Poll cycles by outcome
    pub polls_total: IntCounterVec,

    /// Players reported as newly online
    pub new_players_total: IntCounterVec,

    /// Notification attempts by status
    pub notifications_total: IntCounterVec,

    /// Distinct players seen since start
    pub known_players: IntGaugeVec,

    /// Wall time of a full poll cycle
    pub poll_duration_seconds: HistogramVec,
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
        let poll_metrics = PollMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            poll_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get poll metrics
    pub fn poll(&self) -> &PollMetrics {
        &self.poll_metrics
    }

    /// Record a finished poll cycle
    pub fn record_poll(
        &self,
        server: &str,
        outcome: &PollOutcome,
        known_players: usize,
        duration: Duration,
    ) {
        self.poll_metrics
            .polls_total
            .with_label_values(&[server, outcome.label()])
            .inc();

        let new_players = outcome.new_players().len() as u64;
        if new_players > 0 {
            self.poll_metrics
                .new_players_total
                .with_label_values(&[server])
                .inc_by(new_players);
        }

        let notification_status = match outcome {
            PollOutcome::Notified { .. } => Some("success"),
            PollOutcome::NotifyFailed { .. } => Some("failed"),
            _ => None,
        };
        if let Some(status) = notification_status {
            self.poll_metrics
                .notifications_total
                .with_label_values(&[server, status])
                .inc();
        }

        self.poll_metrics
            .known_players
            .with_label_values(&[server])
            .set(known_players as i64);

        self.poll_metrics
            .poll_duration_seconds
            .with_label_values(&[server])
            .observe(duration.as_secs_f64());
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Set the number of watched servers
    pub fn set_servers_configured(&self, count: usize) {
        self.service_metrics.servers_configured.set(count as i64);
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("player_watch_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "player_watch_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let servers_configured = IntGauge::new(
            "player_watch_servers_configured",
            "Number of game servers being polled",
        )?;
        registry.register(Box::new(servers_configured.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            servers_configured,
        })
    }
}

impl PollMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let polls_total = IntCounterVec::new(
            Opts::new("player_watch_polls_total", "Poll cycles by outcome"),
            &["server", "status"],
        )?;
        registry.register(Box::new(polls_total.clone()))?;

        let new_players_total = IntCounterVec::new(
            Opts::new(
                "player_watch_new_players_total",
                "Players reported as newly online",
            ),
            &["server"],
        )?;
        registry.register(Box::new(new_players_total.clone()))?;

        let notifications_total = IntCounterVec::new(
            Opts::new(
                "player_watch_notifications_total",
                "Notification attempts by status",
            ),
            &["server", "status"],
        )?;
        registry.register(Box::new(notifications_total.clone()))?;

        let known_players = IntGaugeVec::new(
            Opts::new(
                "player_watch_known_players",
                "Distinct players seen since start",
            ),
            &["server"],
        )?;
        registry.register(Box::new(known_players.clone()))?;

        let poll_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "player_watch_poll_duration_seconds",
                "Duration of a full poll cycle",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["server"],
        )?;
        registry.register(Box::new(poll_duration_seconds.clone()))?;

        Ok(Self {
            polls_total,
            new_players_total,
            notifications_total,
            known_players,
            poll_duration_seconds,
        })
    }
}
