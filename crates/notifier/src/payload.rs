//! Slack message types: what callers ask for and what goes over the wire.

use serde::{Deserialize, Serialize};

use slack_common::types::NotificationRequest;

/// A message to post, before templating and color selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessage {
    pub text: String,
    pub channel: String,
    pub color: String,
    pub title: String,
    pub webhook: String,
}

impl SlackMessage {
    /// Use `text` when the message has none.
    pub fn with_default_text(mut self, text: &str) -> Self {
        if self.text.is_empty() {
            self.text = text.to_string();
        }
        self
    }
}

impl From<&NotificationRequest> for SlackMessage {
    fn from(request: &NotificationRequest) -> Self {
        Self {
            text: request.text.clone(),
            channel: request.channel.clone(),
            color: request.color.clone(),
            title: request.title.clone(),
            webhook: request.webhook.clone(),
        }
    }
}

/// Webhook payload with a single attachment.
///
/// Serializes to `{"attachments":[{"color":..,"text":..,"title":..}],"channel":..}`
/// with `title` and `channel` left out when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub color: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl RenderedMessage {
    pub fn new(color: String, text: String, title: &str, channel: &str) -> Self {
        Self {
            attachments: vec![Attachment {
                color,
                text,
                title: non_empty(title),
            }],
            channel: non_empty(channel),
        }
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachments.first()
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
