//! Model-service capability: chat message types, tool schemas on the wire,
//! and the `ModelService` trait the orchestrator drives.
//!
//! The content-block shapes mirror the Anthropic Messages API so the HTTP
//! provider can serialize them verbatim; nothing here depends on any one
//! provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tools::ToolSchema;
use crate::types::RagError;

/// Message author. Tool results travel in `User` messages, paired to the
/// assistant's tool-use blocks by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One block of message content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

/// A message in the running sequence handed to the model service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Concatenated text blocks; empty when the message is all tool traffic.
    pub fn text(&self) -> String {
        collect_text(&self.content)
    }
}

/// Why the model stopped. Anything other than `ToolUse` ends the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    Other,
}

/// One model-issued request to run a named capability.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// A complete model response: its content blocks plus the stop signal.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelReply {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            stop_reason: StopReason::EndTurn,
        }
    }

    pub fn tool_use(requests: Vec<ToolRequest>) -> Self {
        Self {
            content: requests
                .into_iter()
                .map(|req| ContentBlock::ToolUse {
                    id: req.id,
                    name: req.name,
                    input: req.input,
                })
                .collect(),
            stop_reason: StopReason::ToolUse,
        }
    }

    pub fn needs_tools(&self) -> bool {
        self.stop_reason == StopReason::ToolUse
    }

    /// Every tool-use block, in content order.
    pub fn tool_requests(&self) -> Vec<ToolRequest> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolRequest {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn flat_text(&self) -> String {
        collect_text(&self.content)
    }
}

fn collect_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Language-model capability: system text + message sequence + optional tool
/// schemas in, one [`ModelReply`] out.
#[async_trait]
pub trait ModelService: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ModelReply, RagError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_blocks_serialize_to_wire_tags() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "tool_456".into(),
            content: "MCP content from search".into(),
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "tool_result",
                "tool_use_id": "tool_456",
                "content": "MCP content from search"
            })
        );

        let message = ChatMessage::user("What is RAG?");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"][0]["type"], "text");
    }

    #[test]
    fn tool_use_blocks_round_trip() {
        let wire = json!({
            "type": "tool_use",
            "id": "tool_123",
            "name": "search_course_content",
            "input": {"query": "What is RAG?"}
        });
        let block: ContentBlock = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(serde_json::to_value(&block).unwrap(), wire);
    }

    #[test]
    fn reply_extracts_requests_and_text() {
        let reply = ModelReply {
            content: vec![
                ContentBlock::Text {
                    text: "Let me look that up.".into(),
                },
                ContentBlock::ToolUse {
                    id: "t1".into(),
                    name: "search_course_content".into(),
                    input: json!({"query": "embeddings"}),
                },
            ],
            stop_reason: StopReason::ToolUse,
        };
        assert!(reply.needs_tools());
        let requests = reply.tool_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].name, "search_course_content");
        assert_eq!(reply.flat_text(), "Let me look that up.");
    }
}
