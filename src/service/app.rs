//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the RCON
//! queries, the notifier, the per-server pollers and the health server
//! together, and tears them down again on shutdown.

use crate::config::AppConfig;
use crate::metrics::{HealthServer, HealthServerConfig, MetricsCollector};
use crate::notify::{Notifier, TelegramConfig, TelegramNotifier};
use crate::poller::ServerPoller;
use crate::rcon::{PlayerQuery, RconPlayerQuery};
use crate::scheduler::Scheduler;
use crate::service::health::StatusHandle;
use crate::types::ServerProfile;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Server '{server}' is unreachable: {message}")]
    ServerUnreachable { server: String, message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Shutdown error: {message}")]
    Shutdown { message: String },
}

/// A configured server together with the query used to poll it
pub struct ServerBinding {
    pub profile: ServerProfile,
    pub query: Arc<dyn PlayerQuery>,
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Servers to poll, consumed when polling starts
    bindings: Vec<ServerBinding>,

    /// Shared notifier used by every poller
    notifier: Arc<dyn Notifier>,

    /// Per-server polling tasks
    scheduler: Arc<RwLock<Scheduler>>,

    /// Prometheus metrics
    metrics: Arc<MetricsCollector>,

    /// Health and metrics HTTP server
    health_server: Option<Arc<HealthServer>>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    started_at: Instant,
}

impl AppState {
    /// Initialize the application with the production RCON and Telegram adapters
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!(
            "Initializing player-watch for {} server(s)",
            config.servers.len()
        );

        let notifier = TelegramNotifier::new(TelegramConfig::new(config.notify.api.clone()))
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to create Telegram notifier: {}", e),
            })?;

        let bindings = config
            .server_profiles()
            .into_iter()
            .map(|profile| ServerBinding {
                query: Arc::new(RconPlayerQuery::from_profile(&profile)),
                profile,
            })
            .collect();

        Self::with_components(config, bindings, Arc::new(notifier))
    }

    /// Initialize the application with explicit query and notifier implementations
    pub fn with_components(
        config: AppConfig,
        bindings: Vec<ServerBinding>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ServiceError> {
        if bindings.is_empty() {
            return Err(ServiceError::Configuration {
                message: "no servers configured".to_string(),
            });
        }

        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        Ok(Self {
            config,
            bindings,
            notifier,
            scheduler: Arc::new(RwLock::new(Scheduler::new())),
            metrics,
            health_server: None,
            background_tasks: Vec::new(),
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    /// Verify servers, start polling and the health server
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting player-watch service");

        if self.config.service.verify_servers_on_startup {
            self.verify_servers().await?;
        } else {
            info!("Startup server verification disabled");
        }

        *self.is_running.write().await = true;

        self.start_pollers().await;

        if self.config.service.enable_health_server {
            self.start_health_server();
        } else {
            info!("Health server disabled");
        }

        info!("✅ player-watch service started");
        Ok(())
    }

    /// Dial and authenticate every server once
    pub async fn verify_servers(&self) -> Result<(), ServiceError> {
        info!("Verifying {} server(s)", self.bindings.len());

        for binding in &self.bindings {
            info!(
                "Verifying server '{}' at {}",
                binding.profile.name, binding.profile.address
            );
            binding
                .query
                .check()
                .await
                .map_err(|e| ServiceError::ServerUnreachable {
                    server: binding.profile.name.clone(),
                    message: format!("{:#}", e),
                })?;
        }

        info!("All servers verified");
        Ok(())
    }

    async fn start_pollers(&mut self) {
        let notification = self.config.notification_profile();
        let mut scheduler = self.scheduler.write().await;

        for binding in self.bindings.drain(..) {
            let poller = ServerPoller::with_metrics(
                binding.profile,
                notification.clone(),
                binding.query,
                self.notifier.clone(),
                self.metrics.clone(),
            );
            scheduler.schedule(poller);
        }

        self.metrics.set_servers_configured(scheduler.len());
        info!("{} server poller(s) scheduled", scheduler.len());
    }

    fn start_health_server(&mut self) {
        let health_config = HealthServerConfig {
            port: self.config.service.health_port,
            ..HealthServerConfig::default()
        };
        let server = Arc::new(HealthServer::new(
            health_config,
            self.metrics.clone(),
            self.status_handle(),
        ));

        let task_server = server.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = task_server.start().await {
                error!("Health server failed: {:#}", e);
            }
        });

        self.health_server = Some(server);
        self.background_tasks.push(handle);
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of player-watch");

        *self.is_running.write().await = false;

        let timeout = self.config.shutdown_timeout();
        let stopped = tokio::time::timeout(timeout, async {
            self.scheduler.write().await.shutdown().await;
        })
        .await;

        if let Some(server) = self.health_server.take() {
            if let Err(e) = server.stop().await {
                warn!("Failed to stop health server: {}", e);
            }
        }

        let task_count = self.background_tasks.len();
        for task in self.background_tasks.drain(..) {
            if tokio::time::timeout(std::time::Duration::from_secs(1), task)
                .await
                .is_err()
            {
                debug!("Background task did not stop in time");
            }
        }
        debug!("{} background task(s) stopped", task_count);

        let final_stats = self.scheduler.read().await.snapshot().await;
        info!("Final server statistics: {:?}", final_stats);

        if stopped.is_err() {
            return Err(ServiceError::Shutdown {
                message: format!("pollers did not stop within {}s", timeout.as_secs()),
            });
        }

        info!("✅ player-watch shutdown completed");
        Ok(())
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

    pub fn scheduler(&self) -> Arc<RwLock<Scheduler>> {
        self.scheduler.clone()
    }

    /// Cloneable view used by health checks
    pub fn status_handle(&self) -> StatusHandle {
        StatusHandle {
            service_name: "player-watch".to_string(),
            scheduler: self.scheduler.clone(),
            is_running: self.is_running.clone(),
            started_at: self.started_at,
        }
    }
}
