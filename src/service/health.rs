//! Health checks and monitoring
//!
//! This module provides health check functionality for the player watch
//! service, including readiness and liveness probes.

use crate::scheduler::Scheduler;
use crate::types::ServerStats;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::debug;

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Numeric form for the health gauge
    pub fn as_gauge(self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    fn worst(self, other: HealthStatus) -> HealthStatus {
        match (self, other) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
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

/// Cloneable view of the running service used by health checks
#[derive(Clone)]
pub struct StatusHandle {
    pub service_name: String,
    pub scheduler: Arc<RwLock<Scheduler>>,
    pub is_running: Arc<RwLock<bool>>,
    pub started_at: Instant,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Seconds since the service was created
    pub uptime_seconds: u64,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Per-server counters
    pub servers: BTreeMap<String, ServerStats>,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional message if not healthy
    pub message: Option<String>,
}

impl HealthCheck {
    /// Perform a full health check of the service
    pub async fn check(handle: &StatusHandle) -> Result<Self> {
        let mut checks = Vec::new();

        let running = *handle.is_running.read().await;
        checks.push(ComponentCheck {
            name: "service".to_string(),
            status: if running {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            message: (!running).then(|| "service is not running".to_string()),
        });

        let (servers, scheduler_check) = {
            let scheduler = handle.scheduler.read().await;
            let alive = scheduler.running_tasks();
            let expected = scheduler.len();
            let check = ComponentCheck {
                name: "scheduler".to_string(),
                status: if expected > 0 && alive == expected {
                    HealthStatus::Healthy
                } else if alive > 0 {
                    HealthStatus::Degraded
                } else {
                    HealthStatus::Unhealthy
                },
                message: (alive != expected || expected == 0)
                    .then(|| format!("{} of {} pollers running", alive, expected)),
            };
            (scheduler.snapshot().await, check)
        };
        checks.push(scheduler_check);

        for (name, stats) in &servers {
            checks.push(Self::check_server(name, stats));
        }

        let status = checks
            .iter()
            .fold(HealthStatus::Healthy, |acc, check| acc.worst(check.status));
        debug!("Health check completed: {}", status);

        Ok(HealthCheck {
            status,
            service: handle.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            uptime_seconds: handle.started_at.elapsed().as_secs(),
            checks,
            servers,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(handle: &StatusHandle) -> Result<HealthStatus> {
        if *handle.is_running.read().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// A server whose last cycle failed is degraded; not yet polled counts as healthy
    fn check_server(name: &str, stats: &ServerStats) -> ComponentCheck {
        let (status, message) = match stats.last_outcome.as_deref() {
            Some("query_failed") => (
                HealthStatus::Degraded,
                Some("last player query failed".to_string()),
            ),
            Some("notify_failed") => (
                HealthStatus::Degraded,
                Some("last notification failed".to_string()),
            ),
            _ => (HealthStatus::Healthy, None),
        };

        ComponentCheck {
            name: format!("server:{}", name),
            status,
            message,
        }
    }
}
