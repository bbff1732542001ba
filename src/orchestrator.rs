//! Bounded tool-call loop between the model service and the tool registry.
//!
//! The loop is an explicit two-state machine over the accumulated message
//! sequence. Tool schemas are offered on the first model call only; the
//! re-entry after dispatch withdraws them, so the machine can never chain a
//! second tool round no matter what the model answers.

use std::sync::Arc;

use crate::model::{ChatMessage, ContentBlock, ModelService, Role};
use crate::tools::{ToolOutput, ToolRegistry};
use crate::types::{RagError, SourceRef};

/// System instructions sent with every query.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an AI assistant specialized in course materials and educational content.

Tool Usage Guidelines:
- Course outline queries (structure, lesson lists, what a course covers): use get_course_outline.
- Content-specific questions (what a lesson teaches, details inside the material): use search_course_content.
- One search per query maximum; synthesize the tool result into your answer.
- If a tool returns no relevant content, say so plainly instead of inventing material.

Answer concisely and ground every claim in the retrieved content. For general
knowledge questions that the course corpus cannot answer, reply from your own
knowledge without using tools.";

/// Final product of one loop run.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopOutcome {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

enum LoopState {
    AwaitingModel { offer_tools: bool },
    Done(String),
}

/// Drives the bounded loop. Stateless between calls; safe to share.
pub struct Orchestrator {
    model: Arc<dyn ModelService>,
    system_prompt: String,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn ModelService>) -> Self {
        Self {
            model,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Run one query through the loop: at most two model calls and at most
    /// one batch of tool dispatches.
    pub async fn respond(
        &self,
        query: &str,
        history: &[ChatMessage],
        registry: &ToolRegistry,
    ) -> Result<LoopOutcome, RagError> {
        let mut messages: Vec<ChatMessage> = history.to_vec();
        messages.push(ChatMessage::user(query));

        let mut sources: Vec<SourceRef> = Vec::new();
        let mut state = LoopState::AwaitingModel { offer_tools: true };

        loop {
            state = match state {
                LoopState::AwaitingModel { offer_tools } => {
                    let schemas = if offer_tools && !registry.is_empty() {
                        Some(registry.schemas())
                    } else {
                        None
                    };
                    let reply = self
                        .model
                        .complete(&self.system_prompt, &messages, schemas.as_deref())
                        .await?;

                    if reply.needs_tools() && offer_tools {
                        let requests = reply.tool_requests();
                        tracing::debug!(count = requests.len(), "dispatching tool batch");
                        messages.push(ChatMessage {
                            role: Role::Assistant,
                            content: reply.content,
                        });

                        let mut results = Vec::with_capacity(requests.len());
                        for request in requests {
                            let output = match registry
                                .dispatch(&request.name, request.input.clone())
                                .await
                            {
                                Ok(output) => output,
                                // A failed dispatch is an answer for the model,
                                // not the end of the loop.
                                Err(err) => ToolOutput::text_only(format!(
                                    "Tool '{}' failed: {err}",
                                    request.name
                                )),
                            };
                            sources.extend(output.sources);
                            results.push(ContentBlock::ToolResult {
                                tool_use_id: request.id,
                                content: output.text,
                            });
                        }
                        messages.push(ChatMessage {
                            role: Role::User,
                            content: results,
                        });
                        LoopState::AwaitingModel { offer_tools: false }
                    } else {
                        // Terminal either way: no tool request, or a second
                        // response after the tool round was closed.
                        LoopState::Done(reply.flat_text())
                    }
                }
                LoopState::Done(answer) => {
                    return Ok(LoopOutcome { answer, sources });
                }
            };
        }
    }
}
