//! CircleCI workflow status queries.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Path of the workflow endpoint, relative to the API host.
pub const WORKFLOW_PATH: &str = "/api/v2/workflow";

/// Header carrying the API token.
pub const TOKEN_HEADER: &str = "Circle-Token";

/// Web UI base used to link to a pipeline.
pub const PIPELINE_BASE_URL: &str = "https://app.circleci.com/pipelines";

/// Latest known state of a workflow. Only the most recent snapshot matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStatusSnapshot {
    pub project: String,
    pub pipeline_number: u64,
    pub status: String,
    pub name: Option<String>,
}

impl BuildStatusSnapshot {
    /// Read a workflow response field by field. A field that is missing or has
    /// an unexpected type is left empty without affecting the others.
    pub fn from_json(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            project: text("project_slug").unwrap_or_default(),
            pipeline_number: value
                .get("pipeline_number")
                .and_then(Value::as_u64)
                .unwrap_or_default(),
            status: text("status").unwrap_or_default(),
            name: text("name"),
        }
    }

    /// Link to the pipeline in Slack's `<url|label>` markup.
    pub fn pipeline_link(&self) -> String {
        format!(
            "<{}/{}/{}|{}-{}>",
            PIPELINE_BASE_URL, self.project, self.pipeline_number, self.project, self.pipeline_number
        )
    }
}

#[derive(Debug, Error)]
pub enum StatusQueryError {
    /// CircleCI could not be reached
    #[error("CircleCI request failed: {0}")]
    Transport(String),

    /// CircleCI answered with a status above 399
    #[error("CircleCI rejected the status query with status {status}")]
    Rejected { status: u16 },
}

/// Source of workflow status snapshots.
#[async_trait]
pub trait BuildStatusSource: Send + Sync {
    async fn fetch(
        &self,
        build_id: &str,
        token: &str,
    ) -> Result<BuildStatusSnapshot, StatusQueryError>;
}

/// [`BuildStatusSource`] that queries the CircleCI v2 API.
#[derive(Debug, Clone)]
pub struct CircleCiClient {
    host: String,
    client: reqwest::Client,
}

impl CircleCiClient {
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_client(host, reqwest::Client::new())
    }

    pub fn with_client(host: impl Into<String>, client: reqwest::Client) -> Self {
        let host = host.into().trim_end_matches('/').to_string();
        Self { host, client }
    }

    pub fn workflow_url(&self, build_id: &str) -> String {
        format!("{}{}/{}", self.host, WORKFLOW_PATH, build_id)
    }
}

#[async_trait]
impl BuildStatusSource for CircleCiClient {
    async fn fetch(
        &self,
        build_id: &str,
        token: &str,
    ) -> Result<BuildStatusSnapshot, StatusQueryError> {
        let response = self
            .client
            .get(self.workflow_url(build_id))
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(|e| StatusQueryError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status > 399 {
            return Err(StatusQueryError::Rejected { status });
        }

        let body = response
            .text()
            .await
            .map_err(|e| StatusQueryError::Transport(e.to_string()))?;

        // An unreadable body carries no status, which keeps the monitor polling
        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Ok(BuildStatusSnapshot::from_json(&value)),
            Err(e) => {
                tracing::debug!(build_id, error = %e, "Unparseable workflow response");
                Ok(BuildStatusSnapshot::default())
            }
        }
    }
}
