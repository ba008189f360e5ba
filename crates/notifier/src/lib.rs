//! Message rendering and Slack webhook delivery.
//!
//! A [`SlackMessage`] goes through three steps before it is posted:
//!
//! 1. its text is rendered as a template against the current environment
//!    ([`template`]),
//! 2. a highlight color is chosen ([`color`]),
//! 3. the resulting [`RenderedMessage`] is posted by a [`WebhookDispatcher`] and
//!    the HTTP status is checked ([`webhook`]).
//!
//! [`Notifier`] runs those steps; both front ends (the HTTP service and the
//! one-shot plugin) and the build monitor go through it.

pub mod color;
pub mod error;
pub mod payload;
pub mod template;
pub mod webhook;

pub use error::{NotifyError, TemplateError};
pub use payload::{Attachment, RenderedMessage, SlackMessage};
pub use template::TemplateRenderer;
pub use webhook::{HttpWebhookDispatcher, WebhookDispatcher};

use std::sync::Arc;

use slack_common::env::EnvSnapshot;

/// Renders messages and hands them to a webhook dispatcher.
pub struct Notifier {
    renderer: TemplateRenderer,
    dispatcher: Arc<dyn WebhookDispatcher>,
}

impl Notifier {
    pub fn new(renderer: TemplateRenderer, dispatcher: Arc<dyn WebhookDispatcher>) -> Self {
        Self {
            renderer,
            dispatcher,
        }
    }

    /// Notifier that posts over HTTP.
    pub fn http(helpers: bool) -> Self {
        Self::new(
            TemplateRenderer::new(helpers),
            Arc::new(HttpWebhookDispatcher::default()),
        )
    }

    /// Render `message` into the payload that would be posted.
    pub fn build_payload(
        &self,
        message: &SlackMessage,
        env: &EnvSnapshot,
    ) -> Result<RenderedMessage, NotifyError> {
        let text = self.renderer.render_with_env(&message.text, env)?;
        let color = color::select_color(&message.color, env);

        Ok(RenderedMessage::new(
            color,
            text,
            &message.title,
            &message.channel,
        ))
    }

    /// Send `message`, templating against the environment as it is right now.
    pub async fn send(&self, message: &SlackMessage) -> Result<(), NotifyError> {
        self.send_with_env(message, &EnvSnapshot::capture()).await
    }

    /// Send `message`, templating against `env`.
    pub async fn send_with_env(
        &self,
        message: &SlackMessage,
        env: &EnvSnapshot,
    ) -> Result<(), NotifyError> {
        if message.text.is_empty() || message.webhook.is_empty() {
            return Err(NotifyError::MissingParameters);
        }

        let payload = self.build_payload(message, env)?;
        let status = self.dispatcher.post(&message.webhook, &payload).await?;
        webhook::check_status(status)
    }
}
