//! Scripted model service for deterministic tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::model::{ChatMessage, ModelReply, ModelService};
use crate::tools::ToolSchema;
use crate::types::RagError;

/// One observed `complete` call, kept for assertions.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub message_count: usize,
    pub tools_offered: bool,
    pub tool_names: Vec<String>,
}

/// Pops one scripted [`ModelReply`] per call and records what it was asked.
/// An exhausted script answers with `RagError::Model`.
pub struct MockModelService {
    script: Mutex<VecDeque<ModelReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockModelService {
    pub fn scripted(replies: Vec<ModelReply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ModelService for MockModelService {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ModelReply, RagError> {
        self.calls.lock().push(RecordedCall {
            system: system.to_string(),
            messages: messages.to_vec(),
            message_count: messages.len(),
            tools_offered: tools.is_some(),
            tool_names: tools
                .map(|schemas| schemas.iter().map(|s| s.name.clone()).collect())
                .unwrap_or_default(),
        });
        self.script
            .lock()
            .pop_front()
            .ok_or_else(|| RagError::Model("mock model script exhausted".into()))
    }
}
