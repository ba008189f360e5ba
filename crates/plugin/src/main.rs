//! Simple Slack plugin binary entrypoint.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use slack_common::env::EnvSnapshot;
use slack_plugin::PluginArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("slack_plugin=info,slack_notifier=info")
        }))
        .init();

    let args = PluginArgs::parse();
    let env = EnvSnapshot::capture();
    let notifier = slack_plugin::notifier(&env)?;

    if let Err(e) = slack_plugin::run(args, &notifier, &env).await {
        tracing::error!(error = %e, "Notification not sent");
        return Err(e.into());
    }

    tracing::info!("Notification sent");
    Ok(())
}
