//! In-memory fakes for the status source and the webhook.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use slack_notifier::{Notifier, NotifyError, RenderedMessage, TemplateRenderer, WebhookDispatcher};

use crate::circleci::{BuildStatusSnapshot, BuildStatusSource, StatusQueryError};

pub fn snapshot(status: &str) -> BuildStatusSnapshot {
    BuildStatusSnapshot {
        project: "gh/devatherock/email-sender".to_string(),
        pipeline_number: 292,
        status: status.to_string(),
        name: None,
    }
}

/// Answers status queries from a script; reports `running` once it runs out.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<BuildStatusSnapshot, StatusQueryError>>>,
    calls: AtomicUsize,
    last_token: Mutex<Option<String>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<BuildStatusSnapshot, StatusQueryError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            last_token: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildStatusSource for ScriptedSource {
    async fn fetch(
        &self,
        _build_id: &str,
        token: &str,
    ) -> Result<BuildStatusSnapshot, StatusQueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(token.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(snapshot("running")))
    }
}

/// Records every payload and answers with a fixed status.
pub struct RecordingDispatcher {
    status: u16,
    posted: Mutex<Vec<(String, RenderedMessage)>>,
}

impl RecordingDispatcher {
    pub fn new(status: u16) -> Arc<Self> {
        Arc::new(Self {
            status,
            posted: Mutex::new(Vec::new()),
        })
    }

    pub fn notifier(self: &Arc<Self>) -> Notifier {
        Notifier::new(TemplateRenderer::default(), self.clone())
    }

    pub fn posted(&self) -> Vec<(String, RenderedMessage)> {
        self.posted.lock().unwrap().clone()
    }

    /// Wait until at least `count` payloads were posted.
    pub async fn wait_for(&self, count: usize) -> Vec<(String, RenderedMessage)> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let posted = self.posted();
                if posted.len() >= count {
                    return posted;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for webhook posts")
    }
}

#[async_trait]
impl WebhookDispatcher for RecordingDispatcher {
    async fn post(&self, url: &str, payload: &RenderedMessage) -> Result<u16, NotifyError> {
        self.posted
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        Ok(self.status)
    }
}
