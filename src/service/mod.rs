//! Service layer for the player watch service
//!
//! This module contains the main application state, service coordination,
//! and health checks for the production service.

pub mod app;
pub mod health;

pub use app::{AppState, ServerBinding, ServiceError};
pub use health::{HealthCheck, HealthStatus, StatusHandle};
