//! Anthropic Messages API client.
//!
//! Speaks the subset of the API the orchestrator needs: system text, a
//! message sequence with text / tool_use / tool_result blocks, optional tool
//! declarations, and the `stop_reason` signal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ChatMessage, ContentBlock, ModelReply, ModelService, StopReason};
use crate::tools::ToolSchema;
use crate::types::RagError;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 800;

pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSchema]>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[async_trait]
impl ModelService for AnthropicClient {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ModelReply, RagError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: 0.0,
            system,
            messages,
            tools,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|err| RagError::Model(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(RagError::Model(format!(
                "messages endpoint returned {status}: {snippet}"
            )));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|err| RagError::Model(err.to_string()))?;

        let stop_reason = match body.stop_reason.as_deref() {
            Some("tool_use") => StopReason::ToolUse,
            Some("end_turn") | None => StopReason::EndTurn,
            Some(other) => {
                tracing::debug!(stop_reason = other, "non-terminal stop reason treated as final");
                StopReason::Other
            }
        };

        Ok(ModelReply {
            content: body.content,
            stop_reason,
        })
    }
}
