//! Scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::llm::{CompletionRequest, CompletionResponse, LLMClient, StopReason, TokenUsage};
use crate::memory::UserId;
use crate::prompt::PromptSink;

/// One scripted provider reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail,
    /// Never completes
    Hang,
}

impl MockReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }
}

/// LLM client that replays scripted replies and records prompts.
///
/// Once the script is exhausted it answers with an empty extraction.
pub struct MockLLMClient {
    replies: Mutex<VecDeque<MockReply>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLLMClient {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockReply::text(r#"{"new_memories": [], "updates": []}"#));

        let content = match reply {
            MockReply::Text(content) => content,
            MockReply::Fail => return Err(Error::llm_api("mock", "scripted failure")),
            MockReply::Hang => std::future::pending().await,
        };

        Ok(CompletionResponse {
            model: "test-model".to_string(),
            content,
            stop_reason: Some(StopReason::EndTurn),
            usage: TokenUsage::default(),
        })
    }
}

/// Prompt sink that records every push.
#[derive(Default)]
pub struct RecordingSink {
    pushes: Mutex<Vec<(UserId, String)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose pushes always fail (nothing is recorded).
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn pushes(&self) -> Vec<(UserId, String)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }
}

#[async_trait]
impl PromptSink for RecordingSink {
    async fn sync_prompt(&self, user_id: &UserId, rendered: &str) -> Result<()> {
        if self.fail {
            return Err(Error::prompt_sync("scripted failure"));
        }
        self.pushes
            .lock()
            .unwrap()
            .push((user_id.clone(), rendered.to_string()));
        Ok(())
    }
}
