//! One-shot Slack notification, run as a CI pipeline step.
//!
//! Every option can also be given through the environment, which is how
//! Drone, Vela and CircleCI orbs pass plugin settings.

use clap::Parser;

use slack_common::config::AppConfig;
use slack_common::env::EnvSnapshot;
use slack_notifier::{Notifier, NotifyError, SlackMessage};

const COLOR_VARS: &[&str] = &["COLOR", "PLUGIN_COLOR", "PARAMETER_COLOR"];
const TEXT_VARS: &[&str] = &["TEXT", "PLUGIN_TEXT", "PARAMETER_TEXT"];
const TITLE_VARS: &[&str] = &["TITLE", "PLUGIN_TITLE", "PARAMETER_TITLE"];
const CHANNEL_VARS: &[&str] = &["CHANNEL", "PLUGIN_CHANNEL", "PARAMETER_CHANNEL"];
const WEBHOOK_VARS: &[&str] = &["WEBHOOK", "PLUGIN_WEBHOOK", "SLACK_WEBHOOK"];

/// Posts a message to a Slack webhook
#[derive(Debug, Default, Parser)]
#[command(name = "slack-plugin")]
#[command(about = "Posts a message to a Slack webhook")]
#[command(version)]
pub struct PluginArgs {
    /// Color of the attachment bar
    #[arg(short, long)]
    pub color: Option<String>,

    /// Message text; may reference environment variables as {{CamelCaseName}}
    #[arg(short, long)]
    pub text: Option<String>,

    /// Message title
    #[arg(long, visible_alias = "ti")]
    pub title: Option<String>,

    /// Channel to post to, instead of the webhook's default
    #[arg(long, visible_alias = "ch")]
    pub channel: Option<String>,

    /// Slack webhook URL
    #[arg(short = 'u', long)]
    pub webhook: Option<String>,
}

impl PluginArgs {
    /// Fill unset options from `env` and build the message to send.
    pub fn into_message(self, env: &EnvSnapshot) -> Result<SlackMessage, NotifyError> {
        let message = SlackMessage {
            text: resolve(self.text, env, TEXT_VARS),
            channel: resolve(self.channel, env, CHANNEL_VARS),
            color: resolve(self.color, env, COLOR_VARS),
            title: resolve(self.title, env, TITLE_VARS),
            webhook: resolve(self.webhook, env, WEBHOOK_VARS),
        };

        if message.text.is_empty() || message.webhook.is_empty() {
            return Err(NotifyError::MissingParameters);
        }
        Ok(message)
    }
}

fn resolve(value: Option<String>, env: &EnvSnapshot, vars: &[&str]) -> String {
    value
        .filter(|v| !v.is_empty())
        .or_else(|| env.first_of(vars).map(str::to_string))
        .unwrap_or_default()
}

/// Notifier for a single run. Only `TEMPLATE_HELPERS` is read; the service
/// settings do not apply here.
pub fn notifier(env: &EnvSnapshot) -> anyhow::Result<Notifier> {
    let helpers = AppConfig::template_helpers_from_lookup(|key| env.get(key).map(str::to_string))?;
    Ok(Notifier::http(helpers))
}

/// Resolve `args` against `env` and send the message.
pub async fn run(
    args: PluginArgs,
    notifier: &Notifier,
    env: &EnvSnapshot,
) -> Result<(), NotifyError> {
    let message = args.into_message(env)?;
    notifier.send_with_env(&message, env).await
}
