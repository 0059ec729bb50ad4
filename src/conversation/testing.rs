//! Test doubles for the conversation modules.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::{CompletionRequest, CompletionResponse, LlmProvider};

/// Replies with queued outputs in order and records every prompt it sees.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.prompts.lock().unwrap().push(request.prompt);

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(content) => Ok(CompletionResponse {
                content,
                input_tokens: 0,
                output_tokens: 0,
            }),
            None => Err(LlmError::RequestFailed {
                provider: "scripted".to_string(),
                reason: "script exhausted".to_string(),
            }),
        }
    }
}
