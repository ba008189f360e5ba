//! Build monitor. Polls a CircleCI workflow until it reaches a terminal status,
//! then posts the completion message.
//!
//! State machine:
//! - every iteration queries the workflow status;
//! - a terminal status (`success`, `failed` and optionally `failing`) renders
//!   the completion message, dispatches it once and ends the monitor;
//! - `running` or any unrecognized status sleeps for the poll interval and
//!   queries again, without an iteration limit;
//! - a failed query ends the monitor as decided by its
//!   [`TransportFailurePolicy`] (silently, by default).
//!
//! Dispatch failures are logged and never retried.

use std::sync::Arc;
use std::time::Duration;

use slack_common::config::AppConfig;
use slack_common::types::TransportFailurePolicy;
use slack_notifier::color::{FAILURE_COLOR, SUCCESS_COLOR};
use slack_notifier::{Notifier, NotifyError, SlackMessage};

use crate::circleci::{BuildStatusSnapshot, BuildStatusSource, StatusQueryError};

/// Workflow status as seen by the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Running,
    Success,
    Failed,
    Failing,
    Unknown(String),
}

impl PollState {
    pub fn parse(status: &str) -> Self {
        match status {
            "running" => PollState::Running,
            "success" => PollState::Success,
            "failed" => PollState::Failed,
            "failing" => PollState::Failing,
            other => PollState::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PollState::Running => "running",
            PollState::Success => "success",
            PollState::Failed => "failed",
            PollState::Failing => "failing",
            PollState::Unknown(status) => status,
        }
    }

    /// Whether monitoring stops at this status. `failing` only counts when
    /// `failing_is_terminal` is set.
    pub fn is_terminal(&self, failing_is_terminal: bool) -> bool {
        match self {
            PollState::Success | PollState::Failed => true,
            PollState::Failing => failing_is_terminal,
            PollState::Running | PollState::Unknown(_) => false,
        }
    }

    /// Status with its first letter capitalized, e.g. `Success`.
    pub fn display_name(&self) -> String {
        let status = self.as_str();
        let mut chars = status.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            PollState::Success => SUCCESS_COLOR,
            _ => FAILURE_COLOR,
        }
    }
}

impl std::fmt::Display for PollState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables shared by every monitor.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub failing_is_terminal: bool,
    pub transport_failure: TransportFailurePolicy,
}

impl MonitorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            failing_is_terminal: config.failing_is_terminal,
            transport_failure: config.transport_failure,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// How a monitor ended. Nothing upstream consumes this beyond logging.
#[derive(Debug)]
pub enum MonitorOutcome {
    /// The completion message was delivered.
    Notified { state: PollState, polls: u64 },
    /// The build finished but the completion message could not be delivered.
    DispatchFailed {
        state: PollState,
        polls: u64,
        error: NotifyError,
    },
    /// The status query failed. `notified` tells whether a failure message
    /// went out under [`TransportFailurePolicy::Notify`].
    Abandoned {
        error: StatusQueryError,
        polls: u64,
        notified: bool,
    },
}

/// Text posted when the caller gave none.
pub fn completion_text(snapshot: &BuildStatusSnapshot, state: &PollState) -> String {
    let mut text = format!("{}: {}", state.display_name(), snapshot.pipeline_link());
    if let Some(name) = snapshot.name.as_deref().filter(|name| !name.is_empty()) {
        text.push_str(&format!("({})", name));
    }
    text
}

/// Watches a single workflow. Consumed by [`BuildMonitor::run`].
pub struct BuildMonitor {
    build_id: String,
    token: String,
    message: SlackMessage,
    source: Arc<dyn BuildStatusSource>,
    notifier: Arc<Notifier>,
    settings: MonitorSettings,
}

impl BuildMonitor {
    pub fn new(
        build_id: String,
        token: String,
        message: SlackMessage,
        source: Arc<dyn BuildStatusSource>,
        notifier: Arc<Notifier>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            build_id,
            token,
            message,
            source,
            notifier,
            settings,
        }
    }

    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    /// Poll until the workflow reaches a terminal status or the status query
    /// fails. Runs indefinitely while the workflow keeps running.
    pub async fn run(self) -> MonitorOutcome {
        tracing::info!(build_id = %self.build_id, "Monitoring build");
        let mut polls = 0u64;

        loop {
            polls += 1;

            let snapshot = match self.source.fetch(&self.build_id, &self.token).await {
                Ok(snapshot) => snapshot,
                Err(error) => return self.on_query_failure(error, polls).await,
            };

            let state = PollState::parse(&snapshot.status);
            if state.is_terminal(self.settings.failing_is_terminal) {
                tracing::info!(
                    build_id = %self.build_id,
                    status = %state,
                    polls,
                    "Build reached terminal status"
                );
                return self.on_completion(&snapshot, state, polls).await;
            }

            tracing::debug!(
                build_id = %self.build_id,
                status = %state,
                "Waiting for build"
            );
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn on_completion(
        &self,
        snapshot: &BuildStatusSnapshot,
        state: PollState,
        polls: u64,
    ) -> MonitorOutcome {
        let mut message = self
            .message
            .clone()
            .with_default_text(&completion_text(snapshot, &state));
        message.color = state.color().to_string();

        match self.notifier.send(&message).await {
            Ok(()) => MonitorOutcome::Notified { state, polls },
            Err(error) => {
                tracing::error!(
                    build_id = %self.build_id,
                    error = %error,
                    "Completion notification failed"
                );
                MonitorOutcome::DispatchFailed {
                    state,
                    polls,
                    error,
                }
            }
        }
    }

    async fn on_query_failure(&self, error: StatusQueryError, polls: u64) -> MonitorOutcome {
        tracing::error!(
            build_id = %self.build_id,
            error = %error,
            policy = %self.settings.transport_failure,
            "Build status query failed"
        );

        let notified = match self.settings.transport_failure {
            TransportFailurePolicy::Abandon => false,
            TransportFailurePolicy::Notify => {
                let message = SlackMessage {
                    text: format!("Unable to determine status of build {}", self.build_id),
                    color: FAILURE_COLOR.to_string(),
                    ..self.message.clone()
                };
                match self.notifier.send(&message).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(
                            build_id = %self.build_id,
                            error = %e,
                            "Failure notification failed"
                        );
                        false
                    }
                }
            }
        };

        MonitorOutcome::Abandoned {
            error,
            polls,
            notified,
        }
    }
}
