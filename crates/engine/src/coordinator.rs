//! Entry point for notification requests.
//!
//! 1. The webhook comes from the request or the configured default; without
//!    one the request is rejected.
//! 2. Without a build id the message is posted right away.
//! 3. With a build id and a token (from the request or the configuration) a
//!    monitor is started and the request is accepted immediately. Without a
//!    token the message is posted right away instead.

use std::sync::Arc;

use slack_common::config::AppConfig;
use slack_common::types::NotificationRequest;
use slack_notifier::{Notifier, SlackMessage};

use crate::circleci::{BuildStatusSource, CircleCiClient};
use crate::error::CoordinatorError;
use crate::monitor::{BuildMonitor, MonitorSettings};
use crate::registry::{MonitorHandle, MonitorRegistry};

/// Text used when a message is posted without one.
pub const DEFAULT_TEXT: &str = "Build completed";

/// Result of a successfully handled request.
#[derive(Debug)]
pub enum NotifyOutcome {
    /// The message was delivered.
    Sent,
    /// A monitor was started; delivery happens later, out of band.
    Accepted(MonitorHandle),
}

impl NotifyOutcome {
    /// HTTP status reported to the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            NotifyOutcome::Sent => 200,
            NotifyOutcome::Accepted(_) => 204,
        }
    }
}

pub struct NotificationCoordinator {
    notifier: Arc<Notifier>,
    source: Arc<dyn BuildStatusSource>,
    registry: Arc<MonitorRegistry>,
    settings: MonitorSettings,
    default_webhook: Option<String>,
    default_token: Option<String>,
}

impl NotificationCoordinator {
    pub fn new(
        config: &AppConfig,
        notifier: Arc<Notifier>,
        source: Arc<dyn BuildStatusSource>,
        registry: Arc<MonitorRegistry>,
    ) -> Self {
        Self {
            notifier,
            source,
            registry,
            settings: MonitorSettings::from_config(config),
            default_webhook: config.default_webhook.clone(),
            default_token: config.circleci_token.clone(),
        }
    }

    /// Coordinator that talks HTTP to Slack and CircleCI.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(Notifier::http(config.template_helpers)),
            Arc::new(CircleCiClient::new(config.circleci_api_host.clone())),
            Arc::new(MonitorRegistry::new(config.max_active_monitors)),
        )
    }

    pub fn registry(&self) -> &Arc<MonitorRegistry> {
        &self.registry
    }

    /// Handle one request. See the module docs for the decision rules.
    pub async fn notify(
        &self,
        request: NotificationRequest,
    ) -> Result<NotifyOutcome, CoordinatorError> {
        let mut message = SlackMessage::from(&request);
        if message.webhook.is_empty() {
            message.webhook = self.default_webhook.clone().unwrap_or_default();
        }
        if message.webhook.is_empty() {
            return Err(CoordinatorError::WebhookMissing);
        }

        if !request.has_build_id() {
            return self.send_now(message).await;
        }

        let token = Some(request.token)
            .filter(|token| !token.is_empty())
            .or_else(|| self.default_token.clone());

        match token {
            Some(token) => {
                let monitor = BuildMonitor::new(
                    request.build_id,
                    token,
                    message,
                    Arc::clone(&self.source),
                    Arc::clone(&self.notifier),
                    self.settings.clone(),
                );
                Ok(NotifyOutcome::Accepted(self.registry.spawn(monitor)))
            }
            None => {
                tracing::warn!(
                    build_id = %request.build_id,
                    "No token found, but build id specified"
                );
                self.send_now(message).await
            }
        }
    }

    async fn send_now(&self, message: SlackMessage) -> Result<NotifyOutcome, CoordinatorError> {
        let message = message.with_default_text(DEFAULT_TEXT);
        self.notifier.send(&message).await?;
        Ok(NotifyOutcome::Sent)
    }
}
