//! Metrics and monitoring for the player watch service
//!
//! This module provides Prometheus metrics collection and the HTTP server
//! exposing health and metrics endpoints.

pub mod collector;
pub mod health;

pub use collector::{MetricsCollector, PollMetrics, ServiceMetrics};
pub use health::{HealthServer, HealthServerConfig};
