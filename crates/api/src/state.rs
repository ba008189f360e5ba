//! Shared application state for the Axum API server.

use std::sync::Arc;

use slack_common::config::AppConfig;
use slack_engine::coordinator::NotificationCoordinator;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<NotificationCoordinator>,
}

impl AppState {
    pub fn new(coordinator: NotificationCoordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }

    /// State wired to the real Slack and CircleCI clients.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(NotificationCoordinator::from_config(config))
    }
}
