//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 默认回显最后一条 User 消息；scripted 模式按顺序返回预置回复，便于驱动多轮团队对话。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, LlmReply, Message, Role};

/// Mock 客户端：回显或按脚本出词，每次调用记固定 token 用量
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按顺序返回预置回复，脚本耗尽后回落到回显
    pub fn scripted<S: Into<String>>(replies: Vec<S>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// 设置每次调用记账的 token 用量
    pub fn with_usage(mut self, prompt: u64, completion: u64) -> Self {
        self.prompt_tokens = prompt;
        self.completion_tokens = completion;
        self
    }

    fn echo(&self, messages: &[Message]) -> String {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        format!("Echo from Mock: {}", last_user)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<LlmReply, LlmError> {
        let scripted = self
            .replies
            .lock()
            .map_err(|e| LlmError::ApiError(e.to_string()))?
            .pop_front();

        Ok(LlmReply {
            content: scripted.unwrap_or_else(|| self.echo(messages)),
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
        })
    }
}
