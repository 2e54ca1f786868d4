//! reqwest-backed [`AgentInvoker`]

use std::time::{Duration, Instant};

use async_trait::async_trait;
use customs_engine::{AgentError, AgentInvoker, AgentOutcome, AgentRequest, JobContext};
use customs_types::{Action, Facts};
use reqwest::Client;
use serde_json::Value;

use crate::config::AgentsConfig;
use crate::normalize::normalize_response;

const MAX_ERROR_BODY_CHARS: usize = 320;

#[derive(Debug, thiserror::Error)]
pub enum AgentsError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Calls each agent over HTTP and normalizes its answer.
#[derive(Debug, Clone)]
pub struct HttpAgentInvoker {
    client: Client,
    config: AgentsConfig,
}

impl HttpAgentInvoker {
    pub fn new(config: AgentsConfig) -> Result<Self, AgentsError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs.max(1)));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    pub fn config(&self) -> &AgentsConfig {
        &self.config
    }
}

#[async_trait]
impl AgentInvoker for HttpAgentInvoker {
    async fn invoke(
        &self,
        action: &Action,
        context: &JobContext,
        facts: &Facts,
    ) -> Result<AgentOutcome, AgentError> {
        let url = self
            .config
            .url_for(action.kind)
            .ok_or(AgentError::Unsupported(action.kind))?;
        let payload = AgentRequest::build(action, context, facts);

        let mut request = self.client.post(&url).json(&payload);
        if let Some(token) = self.config.api_token.as_deref() {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| AgentError::Transport(format!("{} request failed: {e}", action.kind)))?;

        let status = response.status();
        tracing::debug!(
            job_id = %context.job_id,
            action = %action.kind,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Agent responded"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::Malformed(format!("invalid JSON body: {e}")))?;

        normalize_response(action.kind, body)
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}
