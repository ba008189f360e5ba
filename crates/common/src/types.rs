use serde::{Deserialize, Serialize};

/// Incoming request to post a notification, either right away or once a
/// CircleCI workflow finishes.
///
/// Every field is optional on the wire; empty strings and missing keys mean the
/// same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationRequest {
    /// Message text, rendered as a template
    pub text: String,
    /// Slack channel override
    pub channel: String,
    /// Highlight color override
    pub color: String,
    /// Attachment title
    pub title: String,
    /// Webhook URL; falls back to the configured default
    pub webhook: String,
    /// CircleCI token; falls back to the configured default
    pub token: String,
    /// CircleCI workflow id to wait for
    pub build_id: String,
}

impl NotificationRequest {
    pub fn has_build_id(&self) -> bool {
        !self.build_id.is_empty()
    }
}

/// What a build monitor does when the CI status endpoint cannot be reached or
/// rejects the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportFailurePolicy {
    /// Stop monitoring without sending anything.
    #[default]
    Abandon,
    /// Send a failure notification before stopping.
    Notify,
}

impl std::fmt::Display for TransportFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportFailurePolicy::Abandon => write!(f, "abandon"),
            TransportFailurePolicy::Notify => write!(f, "notify"),
        }
    }
}

impl std::str::FromStr for TransportFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abandon" => Ok(TransportFailurePolicy::Abandon),
            "notify" => Ok(TransportFailurePolicy::Notify),
            other => Err(format!("unknown policy '{}', expected abandon or notify", other)),
        }
    }
}
